/*!
Protocol-level vocabulary shared by the message model and the state core.

The constants follow the openflow.h headers of the OpenFlow Switch
Specifications 1.0 to 1.3.5; names are aligned with the Rust conventions.
*/

pub mod error;
pub mod error_codes;
pub mod match_fields;
pub mod messages;

use std::fmt;

/// An OpenFlow wire version. Every message and every installed flow entry
/// carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    /// OpenFlow 1.0, wire value 0x01
    V1_0 = 1,
    /// OpenFlow 1.1, wire value 0x02
    V1_1 = 2,
    /// OpenFlow 1.2, wire value 0x03
    V1_2 = 3,
    /// OpenFlow 1.3, wire value 0x04
    V1_3 = 4,
}

impl Version {
    /// The version byte as it appears in the message header
    pub fn wire(self) -> u8 {
        self as u8
    }

    /// Maps a header version byte back to a `Version`
    pub fn from_wire(byte: u8) -> Option<Version> {
        match byte {
            1 => Some(Version::V1_0),
            2 => Some(Version::V1_1),
            3 => Some(Version::V1_2),
            4 => Some(Version::V1_3),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Version::V1_0 => "1.0",
            Version::V1_1 => "1.1",
            Version::V1_2 => "1.2",
            Version::V1_3 => "1.3",
        };
        write!(f, "{}", s)
    }
}

/// Maximum number of physical and logical switch ports. Ports are numbered
/// starting from 1.
pub const OFPP_MAX: u32 = 0xffff_ff00;

/// Wildcard port, used where a request places no restriction on the output
/// port. Decoders normalize the 1.0 `OFPP_NONE` sentinel to this value.
pub const OFPP_ANY: u32 = 0xffff_ffff;

/// Wildcard table id, used where a flow mod or query applies to all tables
pub const TABLE_ID_ANY: u8 = 0xff;

/// Value used in `idle_timeout` and `hard_timeout` to indicate that the
/// entry is permanent.
pub const OFP_FLOW_PERMANENT: u16 = 0;

/// By default, choose a priority in the middle.
pub const OFP_DEFAULT_PRIORITY: u16 = 0x8000;

/// Default number of bytes forwarded to the controller on a table miss
pub const OFP_DEFAULT_MISS_SEND_LEN: u16 = 128;

/// Flow mod flag: send a flow removed message when the entry expires or is
/// deleted
pub const OFPFF_SEND_FLOW_REM: u16 = 1 << 0;

/// Flow mod flag: check for overlapping entries before adding
pub const OFPFF_CHECK_OVERLAP: u16 = 1 << 1;

/// Flow mod flag: emergency flow (OpenFlow 1.0 only; the bit was reassigned
/// to RESET_COUNTS from 1.1 on)
pub const OFPFF_EMERG: u16 = 1 << 2;

/// The emergency-flow flag mask valid for `ver`, zero where the version has
/// no such flag
pub fn emerg_flag(ver: Version) -> u16 {
    if ver == Version::V1_0 {
        OFPFF_EMERG
    } else {
        0
    }
}

/// Why a flow entry is being removed from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The entry saw no traffic for its idle timeout
    IdleTimeout,
    /// The entry reached its hard timeout
    HardTimeout,
    /// The controller deleted the entry
    Delete,
    /// The entry was replaced by an add with an identical strict match
    Overwrite,
}

impl RemovalReason {
    /// The `ofp_flow_removed_reason` wire code. Overwrite has no wire
    /// representation; no flow removed message is generated for it.
    pub fn wire_code(self) -> Option<u8> {
        match self {
            RemovalReason::IdleTimeout => Some(0),
            RemovalReason::HardTimeout => Some(1),
            RemovalReason::Delete => Some(2),
            RemovalReason::Overwrite => None,
        }
    }
}
