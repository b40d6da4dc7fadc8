/*!
The internal error taxonomy shared across the state-manager core.

These are the error kinds handlers exchange with the datapath collaborators
and return to the dispatcher. They are deliberately coarse; the wire-visible
error replies are produced separately through the version-coded tables in
`openflow::error_codes`.
*/

use std::error;
use std::fmt;
use std::result;

/// Internal error kinds. The "no error" member of the taxonomy is simply
/// `Ok(())`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfError {
    /// An argument was malformed or inconsistent
    Param,
    /// A resource (table space, memory) was exhausted
    Resource,
    /// The referenced object does not exist
    NotFound,
    /// An index or identifier was out of range
    Range,
    /// The operation is not supported by this implementation
    NotSupported,
    /// An unspecified failure
    Unknown,
}

impl fmt::Display for OfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match *self {
            OfError::Param => "bad parameter",
            OfError::Resource => "out of resources",
            OfError::NotFound => "not found",
            OfError::Range => "out of range",
            OfError::NotSupported => "not supported",
            OfError::Unknown => "unknown error",
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for OfError {}

/// The Result for operations that can fail with an internal error kind
pub type OfResult<T> = result::Result<T, OfError>;
