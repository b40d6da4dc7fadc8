/*!
The decoded OpenFlow message model.

The wire codec (outside this crate) turns controller bytes into the inbound
[`Message`] objects below and serializes the outbound [`Reply`] objects. Both
directions are plain owned data: an inbound message is moved into its handler
and dropped on exactly one path, a reply is moved into the connection layer.

Only the fields the state core consumes are modeled; every message carries
its wire version and transaction id. Messages re-encode their fixed 8-byte
header so error replies can quote the offending request.
*/

use byteorder::{ByteOrder, NetworkEndian};

use openflow::match_fields::Match;
use openflow::Version;

/// An OpenFlow action. Forwarding effects beyond plain output are consumed
/// opaquely by the datapath and are not modeled here.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send the packet out of a switch port
    Output {
        /// Output port
        port: u32,
        /// Max length to send to controller
        max_len: u16,
    },
}

impl Action {
    fn wire_len(&self, ver: Version) -> usize {
        // the 1.0 output action is 8 bytes, the 1.1+ one is 16
        match *self {
            Action::Output { .. } => {
                if ver == Version::V1_0 {
                    8
                } else {
                    16
                }
            }
        }
    }
}

/// An OpenFlow instruction (1.1 and later)
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Apply the actions immediately
    ApplyActions(Vec<Action>),
}

impl Instruction {
    fn wire_len(&self, ver: Version) -> usize {
        match *self {
            Instruction::ApplyActions(ref actions) => {
                8 + actions.iter().map(|a| a.wire_len(ver)).sum::<usize>()
            }
        }
    }
}

/// The forwarding effects of a flow entry: an action list under 1.0, an
/// instruction set from 1.1 on. The variant fixes the wire version the
/// effects were expressed in, so a mixed form cannot exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Effects {
    /// OpenFlow 1.0 action list
    Actions {
        /// The wire version the effects were decoded under (always 1.0)
        version: Version,
        /// The actions, applied in order
        actions: Vec<Action>,
    },
    /// OpenFlow 1.1+ instruction set
    Instructions {
        /// The wire version the effects were decoded under
        version: Version,
        /// The instructions
        instructions: Vec<Instruction>,
    },
}

impl Effects {
    /// Effects sending matched packets out of `port`, in the form
    /// appropriate for `ver`
    pub fn output(ver: Version, port: u32) -> Effects {
        let action = Action::Output { port, max_len: 0 };
        if ver == Version::V1_0 {
            Effects::Actions {
                version: ver,
                actions: vec![action],
            }
        } else {
            Effects::Instructions {
                version: ver,
                instructions: vec![Instruction::ApplyActions(vec![action])],
            }
        }
    }

    /// Empty effects for `ver`, as decoded from delete requests
    pub fn none(ver: Version) -> Effects {
        if ver == Version::V1_0 {
            Effects::Actions {
                version: ver,
                actions: vec![],
            }
        } else {
            Effects::Instructions {
                version: ver,
                instructions: vec![],
            }
        }
    }

    /// The wire version the effects were expressed in
    pub fn version(&self) -> Version {
        match *self {
            Effects::Actions { version, .. } | Effects::Instructions { version, .. } => version,
        }
    }

    /// True if any contained output action sends to `port`
    pub fn outputs_to(&self, port: u32) -> bool {
        let matches_port = |a: &Action| match *a {
            Action::Output { port: p, .. } => p == port,
        };
        match *self {
            Effects::Actions { ref actions, .. } => actions.iter().any(matches_port),
            Effects::Instructions { ref instructions, .. } => {
                instructions.iter().any(|i| match *i {
                    Instruction::ApplyActions(ref actions) => actions.iter().any(matches_port),
                })
            }
        }
    }

    /// Encoded size of the effects
    pub fn wire_len(&self) -> usize {
        let ver = self.version();
        match *self {
            Effects::Actions { ref actions, .. } => {
                actions.iter().map(|a| a.wire_len(ver)).sum()
            }
            Effects::Instructions { ref instructions, .. } => {
                instructions.iter().map(|i| i.wire_len(ver)).sum()
            }
        }
    }
}

/// The command embedded in a flow mod message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModCommand {
    /// New flow.
    Add = 0,
    /// Modify all matching flows.
    Modify = 1,
    /// Modify entry strictly matching wildcards and priority.
    ModifyStrict = 2,
    /// Delete all matching flows.
    Delete = 3,
    /// Delete entry strictly matching wildcards and priority.
    DeleteStrict = 4,
}

/// Flow setup and teardown (controller -> datapath)
#[derive(Debug, Clone, PartialEq)]
pub struct FlowMod {
    /// Wire version the message was decoded under
    pub version: Version,
    /// Transaction id
    pub xid: u32,
    /// Opaque controller-issued identifier
    pub cookie: u64,
    /// Restricts the cookie bits that must match on modify/delete.
    /// Zero means no restriction. Absent on the 1.0 wire, decoded as zero.
    pub cookie_mask: u64,
    /// Target table. Absent on the 1.0 wire, decoded as zero.
    pub table_id: u8,
    /// The operation
    pub command: FlowModCommand,
    /// Idle time before discarding (seconds)
    pub idle_timeout: u16,
    /// Max time before discarding (seconds)
    pub hard_timeout: u16,
    /// Priority level of flow entry
    pub priority: u16,
    /// Buffered packet to apply to, or OFP_NO_BUFFER
    pub buffer_id: u32,
    /// For delete commands, require matching entries to output here.
    /// OFPP_ANY indicates no restriction.
    pub out_port: u32,
    /// Bitmap of OFPFF flags
    pub flags: u16,
    /// Fields to match
    pub match_field: Match,
    /// Actions or instructions, by version
    pub effects: Effects,
}

/// A reserved buffer ID to express that no buffer is assigned
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/// Re-encodes a fixed message header; the length field covers the retained
/// prefix
fn encode_header(version: Version, typ: u8, xid: u32) -> [u8; 8] {
    let mut buf = [0; 8];
    buf[0] = version.wire();
    buf[1] = typ;
    NetworkEndian::write_u16(&mut buf[2..4], 8);
    NetworkEndian::write_u32(&mut buf[4..8], xid);
    buf
}

impl FlowMod {
    /// The fixed header, as quoted in flow mod error replies
    pub fn header_bytes(&self) -> [u8; 8] {
        encode_header(self.version, 14, self.xid)
    }
}

/// Symmetric hello
#[derive(Debug, Clone, PartialEq)]
pub struct Hello {
    pub version: Version,
    pub xid: u32,
}

/// An echo request; answered with an `EchoReply` carrying the same payload
#[derive(Debug, Clone, PartialEq)]
pub struct EchoRequest {
    pub version: Version,
    pub xid: u32,
    /// Arbitrary request payload, echoed back verbatim
    pub payload: Vec<u8>,
}

/// An echo reply, inbound (answering our echo) or outbound
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    pub version: Version,
    pub xid: u32,
    pub payload: Vec<u8>,
}

/// Features request
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturesRequest {
    pub version: Version,
    pub xid: u32,
}

/// Switch configuration request
#[derive(Debug, Clone, PartialEq)]
pub struct GetConfigRequest {
    pub version: Version,
    pub xid: u32,
}

/// Switch configuration set
#[derive(Debug, Clone, PartialEq)]
pub struct SetConfig {
    pub version: Version,
    pub xid: u32,
    /// OFPC fragment handling flags
    pub flags: u16,
    /// Bytes of a missed packet forwarded to the controller
    pub miss_send_len: u16,
}

/// Packet injection into the datapath
#[derive(Debug, Clone, PartialEq)]
pub struct PacketOut {
    pub version: Version,
    pub xid: u32,
    pub buffer_id: u32,
    pub in_port: u32,
    pub actions: Vec<Action>,
    /// Raw packet data when no buffer is referenced
    pub data: Vec<u8>,
}

/// Port administration
#[derive(Debug, Clone, PartialEq)]
pub struct PortMod {
    pub version: Version,
    pub xid: u32,
    pub port_no: u32,
    pub hw_addr: [u8; 6],
    pub config: u32,
    pub mask: u32,
    pub advertise: u32,
}

impl PortMod {
    /// The fixed header, as quoted in port mod error replies
    pub fn header_bytes(&self) -> [u8; 8] {
        let typ = if self.version == Version::V1_0 { 15 } else { 16 };
        encode_header(self.version, typ, self.xid)
    }
}

/// Table configuration (1.1+; no table properties are configurable here)
#[derive(Debug, Clone, PartialEq)]
pub struct TableMod {
    pub version: Version,
    pub xid: u32,
    pub table_id: u8,
    pub config: u32,
}

/// Individual flow statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStatsRequest {
    pub version: Version,
    pub xid: u32,
    pub table_id: u8,
    pub out_port: u32,
    /// Cookie filter (1.1+, decoded as zero under 1.0)
    pub cookie: u64,
    pub cookie_mask: u64,
    pub match_field: Match,
}

/// Aggregate flow statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStatsRequest {
    pub version: Version,
    pub xid: u32,
    pub table_id: u8,
    pub out_port: u32,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub match_field: Match,
}

/// Table statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatsRequest {
    pub version: Version,
    pub xid: u32,
}

/// Port statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct PortStatsRequest {
    pub version: Version,
    pub xid: u32,
    /// Port to report on, or OFPP_ANY for all
    pub port_no: u32,
}

/// Queue configuration request
#[derive(Debug, Clone, PartialEq)]
pub struct QueueGetConfigRequest {
    pub version: Version,
    pub xid: u32,
    pub port: u32,
}

/// Queue statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatsRequest {
    pub version: Version,
    pub xid: u32,
    pub port_no: u32,
    /// Queue to report on, or OFPQ_ALL
    pub queue_id: u32,
}

/// Switch description request
#[derive(Debug, Clone, PartialEq)]
pub struct DescStatsRequest {
    pub version: Version,
    pub xid: u32,
}

/// Port description request
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescStatsRequest {
    pub version: Version,
    pub xid: u32,
}

/// Experimenter (1.0: vendor) message. Cloned so the forwarding and port
/// modules each receive an independently owned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Experimenter {
    pub version: Version,
    pub xid: u32,
    pub experimenter: u32,
    pub subtype: u32,
    pub data: Vec<u8>,
}

/// Experimenter statistics request; not supported here
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimenterStatsRequest {
    pub version: Version,
    pub xid: u32,
    pub experimenter: u32,
    pub data: Vec<u8>,
}

/// BSN extension: write one slot of the IP mask table
#[derive(Debug, Clone, PartialEq)]
pub struct BsnSetIpMask {
    pub version: Version,
    pub xid: u32,
    pub index: u8,
    pub mask: u32,
}

/// BSN extension: read one slot of the IP mask table
#[derive(Debug, Clone, PartialEq)]
pub struct BsnGetIpMaskRequest {
    pub version: Version,
    pub xid: u32,
    pub index: u8,
}

/// BSN extension: query hybrid forwarding mode
#[derive(Debug, Clone, PartialEq)]
pub struct BsnHybridGetRequest {
    pub version: Version,
    pub xid: u32,
}

/// A decoded inbound controller message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(Hello),
    EchoRequest(EchoRequest),
    EchoReply(EchoReply),
    FeaturesRequest(FeaturesRequest),
    GetConfigRequest(GetConfigRequest),
    SetConfig(SetConfig),
    PacketOut(PacketOut),
    PortMod(PortMod),
    TableMod(TableMod),
    FlowMod(FlowMod),
    FlowStatsRequest(FlowStatsRequest),
    AggregateStatsRequest(AggregateStatsRequest),
    TableStatsRequest(TableStatsRequest),
    PortStatsRequest(PortStatsRequest),
    QueueGetConfigRequest(QueueGetConfigRequest),
    QueueStatsRequest(QueueStatsRequest),
    DescStatsRequest(DescStatsRequest),
    PortDescStatsRequest(PortDescStatsRequest),
    Experimenter(Experimenter),
    ExperimenterStatsRequest(ExperimenterStatsRequest),
    BsnSetIpMask(BsnSetIpMask),
    BsnGetIpMaskRequest(BsnGetIpMaskRequest),
    BsnHybridGetRequest(BsnHybridGetRequest),
}

impl Message {
    /// Version, xid and per-version message type code of the fixed header
    fn header_parts(&self) -> (Version, u32, u8) {
        // the OFPT numbering: stable up to FLOW_MOD (14); 1.1 inserted
        // GROUP_MOD and shifted everything after it
        let stats_request = |v: Version| if v == Version::V1_0 { 16 } else { 18 };
        match *self {
            Message::Hello(ref m) => (m.version, m.xid, 0),
            Message::EchoRequest(ref m) => (m.version, m.xid, 2),
            Message::EchoReply(ref m) => (m.version, m.xid, 3),
            Message::FeaturesRequest(ref m) => (m.version, m.xid, 5),
            Message::GetConfigRequest(ref m) => (m.version, m.xid, 7),
            Message::SetConfig(ref m) => (m.version, m.xid, 9),
            Message::PacketOut(ref m) => (m.version, m.xid, 13),
            Message::PortMod(ref m) => {
                let t = if m.version == Version::V1_0 { 15 } else { 16 };
                (m.version, m.xid, t)
            }
            Message::TableMod(ref m) => (m.version, m.xid, 17),
            Message::FlowMod(ref m) => (m.version, m.xid, 14),
            Message::FlowStatsRequest(ref m) => (m.version, m.xid, stats_request(m.version)),
            Message::AggregateStatsRequest(ref m) => {
                (m.version, m.xid, stats_request(m.version))
            }
            Message::TableStatsRequest(ref m) => (m.version, m.xid, stats_request(m.version)),
            Message::PortStatsRequest(ref m) => (m.version, m.xid, stats_request(m.version)),
            Message::QueueGetConfigRequest(ref m) => {
                let t = if m.version == Version::V1_0 { 20 } else { 22 };
                (m.version, m.xid, t)
            }
            Message::QueueStatsRequest(ref m) => (m.version, m.xid, stats_request(m.version)),
            Message::DescStatsRequest(ref m) => (m.version, m.xid, stats_request(m.version)),
            Message::PortDescStatsRequest(ref m) => {
                (m.version, m.xid, stats_request(m.version))
            }
            Message::Experimenter(ref m) => (m.version, m.xid, 4),
            Message::ExperimenterStatsRequest(ref m) => {
                (m.version, m.xid, stats_request(m.version))
            }
            Message::BsnSetIpMask(ref m) => (m.version, m.xid, 4),
            Message::BsnGetIpMaskRequest(ref m) => (m.version, m.xid, 4),
            Message::BsnHybridGetRequest(ref m) => (m.version, m.xid, 4),
        }
    }

    /// The message's wire version
    pub fn version(&self) -> Version {
        self.header_parts().0
    }

    /// The message's transaction id
    pub fn xid(&self) -> u32 {
        self.header_parts().1
    }

    /// Re-encodes the fixed message header for use as the quoted prefix of
    /// an error reply. The length field covers the retained prefix.
    pub fn header_bytes(&self) -> [u8; 8] {
        let (version, xid, typ) = self.header_parts();
        encode_header(version, typ, xid)
    }
}

/* ## ------------------- ## */
/* ## Outbound messages.  ## */
/* ## ------------------- ## */

/// Description of a switch port, filled in by the port manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDesc {
    pub port_no: u32,
    pub hw_addr: [u8; 6],
    pub name: String,
    pub config: u32,
    pub state: u32,
}

/// Switch configuration reply
#[derive(Debug, Clone, PartialEq)]
pub struct GetConfigReply {
    pub version: Version,
    pub xid: u32,
    pub flags: u16,
    pub miss_send_len: u16,
}

/// Switch features reply. The forwarding and port managers fill in the
/// capability and port fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturesReply {
    pub version: Version,
    pub xid: u32,
    /// Datapath unique ID. The lower 48 bits are for a MAC address, the
    /// upper 16 bits are implementer-defined.
    pub datapath_id: u64,
    /// Max packets buffered at once
    pub n_buffers: u32,
    /// Number of tables supported by the datapath
    pub n_tables: u8,
    pub auxiliary_id: u8,
    /// Bitmap of OFPC capabilities
    pub capabilities: u32,
    /// 1.0: supported action bitmap; later versions: reserved
    pub reserved: u32,
    /// Port list (1.0-1.2; 1.3 moved it to port desc stats)
    pub ports: Vec<PortDesc>,
}

impl FeaturesReply {
    /// An empty reply echoing the request, before the datapath fills it in
    pub fn new(req: &FeaturesRequest, datapath_id: u64) -> FeaturesReply {
        FeaturesReply {
            version: req.version,
            xid: req.xid,
            datapath_id,
            n_buffers: 0,
            n_tables: 0,
            auxiliary_id: 0,
            capabilities: 0,
            reserved: 0,
            ports: vec![],
        }
    }
}

/// One flow entry of a flow stats reply
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStatsEntry {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    /// Entry flags; reported from 1.3 on, zero before
    pub flags: u16,
    pub cookie: u64,
    pub packet_count: u64,
    pub byte_count: u64,
    pub match_field: Match,
    pub effects: Effects,
}

impl FlowStatsEntry {
    fn wire_len(&self, ver: Version) -> usize {
        48 + self.match_field.wire_len(ver) + self.effects.wire_len()
    }
}

/// Individual flow statistics reply segment
#[derive(Debug, Clone, PartialEq)]
pub struct FlowStatsReply {
    pub version: Version,
    pub xid: u32,
    /// True on every segment but the last of a multi-part reply
    pub more: bool,
    pub entries: Vec<FlowStatsEntry>,
}

impl FlowStatsReply {
    /// An empty segment answering `req` with the more flag set
    pub fn new(req: &FlowStatsRequest) -> FlowStatsReply {
        FlowStatsReply {
            version: req.version,
            xid: req.xid,
            more: true,
            entries: vec![],
        }
    }

    /// The encoded size of the segment, headers included
    pub fn wire_len(&self) -> usize {
        16 + self
            .entries
            .iter()
            .map(|e| e.wire_len(self.version))
            .sum::<usize>()
    }
}

/// Aggregate flow statistics reply
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStatsReply {
    pub version: Version,
    pub xid: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

/// One table of a table stats reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStatsEntry {
    pub table_id: u8,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

/// Table statistics reply, produced by the forwarding module
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatsReply {
    pub version: Version,
    pub xid: u32,
    pub entries: Vec<TableStatsEntry>,
}

/// One port of a port stats reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortStatsEntry {
    pub port_no: u32,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

/// Port statistics reply, produced by the port manager
#[derive(Debug, Clone, PartialEq)]
pub struct PortStatsReply {
    pub version: Version,
    pub xid: u32,
    pub entries: Vec<PortStatsEntry>,
}

/// A queue attached to a port
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketQueue {
    pub queue_id: u32,
    pub port: u32,
    /// Guaranteed minimum rate in 1/10 percent, 0xffff if disabled
    pub min_rate: u16,
}

/// Queue configuration reply
#[derive(Debug, Clone, PartialEq)]
pub struct QueueGetConfigReply {
    pub version: Version,
    pub xid: u32,
    pub port: u32,
    pub queues: Vec<PacketQueue>,
}

/// One queue of a queue stats reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStatsEntry {
    pub port_no: u32,
    pub queue_id: u32,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
}

/// Queue statistics reply, produced by the port manager
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStatsReply {
    pub version: Version,
    pub xid: u32,
    pub entries: Vec<QueueStatsEntry>,
}

/// Switch description reply
#[derive(Debug, Clone, PartialEq)]
pub struct DescStatsReply {
    pub version: Version,
    pub xid: u32,
    pub flags: u16,
    pub mfr_desc: String,
    pub hw_desc: String,
    pub sw_desc: String,
    pub serial_num: String,
    pub dp_desc: String,
}

/// Port description reply
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescStatsReply {
    pub version: Version,
    pub xid: u32,
    pub ports: Vec<PortDesc>,
}

/// BSN extension: IP mask table slot reply
#[derive(Debug, Clone, PartialEq)]
pub struct BsnGetIpMaskReply {
    pub version: Version,
    pub xid: u32,
    pub index: u8,
    pub mask: u32,
}

/// BSN extension: hybrid forwarding mode reply
#[derive(Debug, Clone, PartialEq)]
pub struct BsnHybridGetReply {
    pub version: Version,
    pub xid: u32,
    pub hybrid_enable: u8,
    pub hybrid_version: u16,
}

/// Asynchronous notification that a flow entry left the table
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRemoved {
    pub version: Version,
    pub xid: u32,
    pub cookie: u64,
    pub priority: u16,
    /// One of the ofp_flow_removed_reason codes
    pub reason: u8,
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub idle_timeout: u16,
    /// Reported from 1.3 on, zero before
    pub hard_timeout: u16,
    pub packet_count: u64,
    pub byte_count: u64,
    pub match_field: Match,
}

/// Error message (datapath -> controller)
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMsg {
    pub version: Version,
    pub xid: u32,
    pub typ: u16,
    pub code: u16,
    /// Up to 64 bytes of the offending request
    pub data: Vec<u8>,
}

impl ErrorMsg {
    /// Constructs an error reply, trimming the quoted request data to the
    /// 64 bytes the protocol allows
    pub fn new(version: Version, xid: u32, typ: u16, code: u16, mut data: Vec<u8>) -> ErrorMsg {
        data.truncate(64);
        ErrorMsg {
            version,
            xid,
            typ,
            code,
            data,
        }
    }
}

/// An outbound message: a reply to a request or an asynchronous
/// notification
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    EchoReply(EchoReply),
    FeaturesReply(FeaturesReply),
    GetConfigReply(GetConfigReply),
    FlowStatsReply(FlowStatsReply),
    AggregateStatsReply(AggregateStatsReply),
    TableStatsReply(TableStatsReply),
    PortStatsReply(PortStatsReply),
    QueueGetConfigReply(QueueGetConfigReply),
    QueueStatsReply(QueueStatsReply),
    DescStatsReply(DescStatsReply),
    PortDescStatsReply(PortDescStatsReply),
    BsnGetIpMaskReply(BsnGetIpMaskReply),
    BsnHybridGetReply(BsnHybridGetReply),
    FlowRemoved(FlowRemoved),
    Error(ErrorMsg),
}

impl Reply {
    /// The transaction id carried by the message
    pub fn xid(&self) -> u32 {
        match *self {
            Reply::EchoReply(ref m) => m.xid,
            Reply::FeaturesReply(ref m) => m.xid,
            Reply::GetConfigReply(ref m) => m.xid,
            Reply::FlowStatsReply(ref m) => m.xid,
            Reply::AggregateStatsReply(ref m) => m.xid,
            Reply::TableStatsReply(ref m) => m.xid,
            Reply::PortStatsReply(ref m) => m.xid,
            Reply::QueueGetConfigReply(ref m) => m.xid,
            Reply::QueueStatsReply(ref m) => m.xid,
            Reply::DescStatsReply(ref m) => m.xid,
            Reply::PortDescStatsReply(ref m) => m.xid,
            Reply::BsnGetIpMaskReply(ref m) => m.xid,
            Reply::BsnHybridGetReply(ref m) => m.xid,
            Reply::FlowRemoved(ref m) => m.xid,
            Reply::Error(ref m) => m.xid,
        }
    }
}
