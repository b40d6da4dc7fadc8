/*!
Version-coded wire error constants.

The numeric values of the `ofp_error_msg` type and code fields moved around
between OpenFlow 1.0 and 1.1, and several codes exist in one family only.
Each function here returns the `(type, code)` pair appropriate for the given
wire version, so handlers never touch raw numbers.
*/

use openflow::error::OfError;
use openflow::Version;

fn is_1_0(ver: Version) -> bool {
    ver == Version::V1_0
}

/// `OFPET_FLOW_MOD_FAILED`: 3 in 1.0, 5 from 1.1 on
fn flow_mod_failed_type(ver: Version) -> u16 {
    if is_1_0(ver) {
        3
    } else {
        5
    }
}

/// `OFPET_BAD_REQUEST` is 1 in every version
fn bad_request_type(_ver: Version) -> u16 {
    1
}

/// `OFPET_PORT_MOD_FAILED`: 4 in 1.0, 7 from 1.1 on
fn port_mod_failed_type(ver: Version) -> u16 {
    if is_1_0(ver) {
        4
    } else {
        7
    }
}

/// `OFPET_QUEUE_OP_FAILED`: 5 in 1.0, 9 from 1.1 on
fn queue_op_failed_type(ver: Version) -> u16 {
    if is_1_0(ver) {
        5
    } else {
        9
    }
}

/// Maps an internal error from a failed flow mod to the wire pair.
///
/// 1.0 has `ALL_TABLES_FULL` and `UNSUPPORTED`; the later versions replaced
/// them with `TABLE_FULL` and `BAD_COMMAND` and introduced `UNKNOWN` for the
/// catch-all (1.0 falls back to `EPERM` there).
pub fn flow_mod_failed(ver: Version, err: OfError) -> (u16, u16) {
    let code = match err {
        OfError::Resource => {
            if is_1_0(ver) {
                0 // ALL_TABLES_FULL
            } else {
                1 // TABLE_FULL
            }
        }
        OfError::NotSupported => {
            if is_1_0(ver) {
                5 // UNSUPPORTED
            } else {
                6 // BAD_COMMAND
            }
        }
        _ => {
            if is_1_0(ver) {
                2 // EPERM
            } else {
                0 // UNKNOWN
            }
        }
    };
    (flow_mod_failed_type(ver), code)
}

/// Overlap rejected by `CHECK_OVERLAP`
pub fn flow_mod_overlap(ver: Version) -> (u16, u16) {
    let code = if is_1_0(ver) { 1 } else { 3 };
    (flow_mod_failed_type(ver), code)
}

/// Emergency flow carrying a timeout (1.0 only; later versions have no
/// emergency flows)
pub fn flow_mod_bad_emerg_timeout(ver: Version) -> (u16, u16) {
    (flow_mod_failed_type(ver), 3)
}

/// A message type the agent does not handle
pub fn bad_request_bad_type(ver: Version) -> (u16, u16) {
    (bad_request_type(ver), 1)
}

/// An experimenter id neither the forwarding nor the port module supports
/// (code 3 is named `BAD_VENDOR` in 1.0)
pub fn bad_request_bad_experimenter(ver: Version) -> (u16, u16) {
    (bad_request_type(ver), 3)
}

/// A request naming a port the switch does not have. Only 1.2 introduced a
/// dedicated `BAD_PORT` request code; earlier versions get `EPERM`.
pub fn bad_request_bad_port(ver: Version) -> (u16, u16) {
    let code = if ver >= Version::V1_2 { 11 } else { 5 };
    (bad_request_type(ver), code)
}

/// Generic request refusal
pub fn bad_request_eperm(ver: Version) -> (u16, u16) {
    (bad_request_type(ver), 5)
}

/// Port mod naming an unknown port
pub fn port_mod_failed_bad_port(ver: Version) -> (u16, u16) {
    (port_mod_failed_type(ver), 0)
}

/// Queue operation naming an unknown port
pub fn queue_op_failed_bad_port(ver: Version) -> (u16, u16) {
    (queue_op_failed_type(ver), 0)
}

/// Queue operation naming an unknown queue
pub fn queue_op_failed_bad_queue(ver: Version) -> (u16, u16) {
    (queue_op_failed_type(ver), 1)
}
