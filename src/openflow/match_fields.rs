/*!
The normalized flow match structure and its comparison algebra.

A match is a set of field TLVs, each holding a value and an optional mask in
network byte order. A field that is absent is wildcarded. Three relations are
defined on matches:

* strict equality -- both matches constrain exactly the same bits to the same
  values,
* covering -- a query's constrained bits are all constrained identically by an
  entry's match (the non-strict relation),
* overlap -- the two match bitspaces share at least one point.
*/

use byteorder::{ByteOrder, NetworkEndian};
use ipnetwork::Ipv4Network;

use openflow::Version;

/// Flow match field types, following the OXM basic class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldId {
    /// Switch input port.
    InPort = 0,
    /// Ethernet frame type.
    EthType = 5,
    /// IP protocol.
    IpProto = 10,
    /// IPv4 source address.
    Ipv4Src = 11,
    /// IPv4 destination address.
    Ipv4Dst = 12,
    /// TCP source port.
    TcpSrc = 13,
    /// TCP destination port.
    TcpDst = 14,
    /// UDP source port.
    UdpSrc = 15,
    /// UDP destination port.
    UdpDst = 16,
}

/// The endpoint of any end-to-end network protocol
#[derive(Debug, Clone, Copy)]
pub enum Endpoint {
    /// The endpoint is the source
    Src,
    /// The endpoint is the destination
    Dst,
}

/// One match field: a value and an optional mask, both in network byte order
/// and of equal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchField {
    field: FieldId,
    value: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl MatchField {
    fn new(field: FieldId, value: Vec<u8>, mask: Option<Vec<u8>>) -> MatchField {
        if let Some(ref m) = mask {
            debug_assert_eq!(value.len(), m.len());
        }
        MatchField { field, value, mask }
    }

    /// OpenFlow port on which the packet was received.
    /// Format: 32-bit integer in network byte order.
    pub fn in_port(port: u32) -> MatchField {
        let mut body = vec![0; 4];
        NetworkEndian::write_u32(&mut body, port);
        MatchField::new(FieldId::InPort, body, None)
    }

    /// Packet's Ethernet type.
    /// Format: 16-bit integer in network byte order.
    pub fn eth_type(eth_type: u16) -> MatchField {
        let mut body = vec![0; 2];
        NetworkEndian::write_u16(&mut body, eth_type);
        MatchField::new(FieldId::EthType, body, None)
    }

    /// The "protocol" byte in the IP header.
    /// Prereqs: the eth type must be either 0x0800 or 0x86dd.
    pub fn ip_proto(proto: u8) -> MatchField {
        MatchField::new(FieldId::IpProto, vec![proto], None)
    }

    /// The source or destination address in the IP header.
    /// Prereqs: the eth type must match 0x0800 exactly.
    /// Masking: arbitrary masks, taken from the CIDR prefix.
    pub fn ipv4(cidr: &Ipv4Network, endpoint: Endpoint) -> MatchField {
        let field = match endpoint {
            Endpoint::Src => FieldId::Ipv4Src,
            Endpoint::Dst => FieldId::Ipv4Dst,
        };
        let value = cidr.network().octets().to_vec();
        let mask = cidr.mask().octets().to_vec();
        MatchField::new(field, value, Some(mask))
    }

    /// The source or destination port in the TCP header.
    /// Prereqs: the IP protocol must match 6 exactly.
    pub fn tcp_port(port: u16, endpoint: Endpoint) -> MatchField {
        let field = match endpoint {
            Endpoint::Src => FieldId::TcpSrc,
            Endpoint::Dst => FieldId::TcpDst,
        };
        MatchField::new(field, u16_body(port), None)
    }

    /// The source or destination port in the UDP header.
    /// Prereqs: the IP protocol must match 17 exactly.
    pub fn udp_port(port: u16, endpoint: Endpoint) -> MatchField {
        let field = match endpoint {
            Endpoint::Src => FieldId::UdpSrc,
            Endpoint::Dst => FieldId::UdpDst,
        };
        MatchField::new(field, u16_body(port), None)
    }

    /// Gets the field type
    pub fn field(&self) -> FieldId {
        self.field
    }

    /// Length of the field as an OXM TLV, header included
    fn tlv_len(&self) -> usize {
        let mask_len = self.mask.as_ref().map_or(0, Vec::len);
        4 + self.value.len() + mask_len
    }

    /// The effective mask byte at `i`: an absent mask constrains every bit
    fn mask_byte(&self, i: usize) -> u8 {
        self.mask.as_ref().map_or(0xff, |m| m[i])
    }

    /// True if every bit this field constrains is constrained to the same
    /// value by `entry`
    fn covered_by(&self, entry: &MatchField) -> bool {
        debug_assert_eq!(self.field, entry.field);
        for i in 0..self.value.len() {
            let qm = self.mask_byte(i);
            if entry.mask_byte(i) & qm != qm {
                return false;
            }
            if self.value[i] & qm != entry.value[i] & qm {
                return false;
            }
        }
        true
    }

    /// True if the two fields agree on every bit both constrain
    fn overlaps(&self, other: &MatchField) -> bool {
        debug_assert_eq!(self.field, other.field);
        for i in 0..self.value.len() {
            let both = self.mask_byte(i) & other.mask_byte(i);
            if (self.value[i] ^ other.value[i]) & both != 0 {
                return false;
            }
        }
        true
    }
}

fn u16_body(val: u16) -> Vec<u8> {
    let mut body = vec![0; 2];
    NetworkEndian::write_u16(&mut body, val);
    body
}

/// Fields to match against flows. At most one field per `FieldId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match {
    fields: Vec<MatchField>,
}

impl Match {
    /// Constructs an empty (all wildcard) match
    pub fn new() -> Match {
        Match { fields: vec![] }
    }

    /// Adds a field to the match, replacing any earlier field of the same
    /// type
    pub fn add(&mut self, field: MatchField) -> &mut Match {
        self.fields.retain(|f| f.field != field.field);
        self.fields.push(field);
        self
    }

    /// Looks up a field by type
    pub fn get(&self, id: FieldId) -> Option<&MatchField> {
        self.fields.iter().find(|f| f.field == id)
    }

    /// True if the match wildcards everything
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Strict equality: both matches constrain exactly the same bits to the
    /// same values
    pub fn strict_eq(&self, other: &Match) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .all(|f| other.get(f.field) == Some(f))
    }

    /// The non-strict relation: every bit this match (the query) constrains
    /// is constrained identically by `entry`. An entry that wildcards a
    /// queried field does not match.
    pub fn covers(&self, entry: &Match) -> bool {
        self.fields.iter().all(|qf| match entry.get(qf.field) {
            Some(ef) => qf.covered_by(ef),
            None => false,
        })
    }

    /// True if the two match bitspaces share at least one point. A field
    /// absent on either side is a wildcard and never excludes overlap.
    pub fn overlaps(&self, other: &Match) -> bool {
        self.fields.iter().all(|f| match other.get(f.field) {
            Some(of) => f.overlaps(of),
            None => true,
        })
    }

    /// The encoded size of the match for the given wire version: the fixed
    /// structures of 1.0 and 1.1, or the padded OXM TLV list of 1.2 on
    pub fn wire_len(&self, ver: Version) -> usize {
        match ver {
            Version::V1_0 => 40,
            Version::V1_1 => 88,
            _ => {
                let len = 4 + self.fields.iter().map(MatchField::tlv_len).sum::<usize>();
                (len + 7) / 8 * 8
            }
        }
    }
}
