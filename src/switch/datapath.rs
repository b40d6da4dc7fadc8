/*!
The collaborator seams of the state core.

The core itself never touches sockets or forwarding hardware. It drives four
collaborators: the forwarding module, the port manager, the controller
connection layer and the cooperative scheduler. Implementations live outside
this crate; the tests provide mock ones.
*/

use openflow::error::OfResult;
use openflow::messages::{
    Experimenter, FeaturesReply, FlowMod, PacketOut, PortDescStatsReply, PortMod,
    PortStatsReply, PortStatsRequest, QueueGetConfigReply, QueueGetConfigRequest,
    QueueStatsReply, QueueStatsRequest, Reply, TableStatsReply, TableStatsRequest,
};
use openflow::Version;
use switch::ft::FlowId;

/// Handle of a controller connection, issued by the connection layer
pub type CxnId = u32;

/// Packet and byte counters of one flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowCounters {
    pub packets: u64,
    pub bytes: u64,
}

/// The forwarding module: the actual datapath behind the flow table
pub trait Forwarding {
    /// Injects a packet into the datapath
    fn packet_out(&mut self, msg: PacketOut) -> OfResult<()>;

    /// Installs a flow in the datapath and returns the table it landed in
    fn flow_create(&mut self, flow_id: FlowId, msg: &FlowMod) -> OfResult<u8>;

    /// Replaces the effects of an installed flow
    fn flow_modify(&mut self, flow_id: FlowId, msg: &FlowMod) -> OfResult<()>;

    /// Removes a flow and returns its final counters
    fn flow_delete(&mut self, flow_id: FlowId) -> OfResult<FlowCounters>;

    /// Reads the current counters of a flow
    fn flow_stats_get(&mut self, flow_id: FlowId) -> OfResult<FlowCounters>;

    /// Produces a table stats reply for the datapath's tables
    fn table_stats_get(&mut self, req: &TableStatsRequest) -> OfResult<TableStatsReply>;

    /// Fills the forwarding capabilities into a features reply
    fn forwarding_features_get(&mut self, reply: &mut FeaturesReply);

    /// Offers an experimenter message to the forwarding module.
    /// `Err(NotSupported)` means the experimenter id is unknown here.
    fn experimenter(&mut self, msg: Experimenter, cxn_id: CxnId) -> OfResult<()>;
}

/// The port manager: physical and logical switch ports and their queues
pub trait PortManager {
    /// Applies a port mod
    fn modify(&mut self, msg: &PortMod) -> OfResult<()>;

    /// Produces a port stats reply
    fn stats_get(&mut self, req: &PortStatsRequest) -> OfResult<PortStatsReply>;

    /// Produces a queue configuration reply
    fn queue_config_get(&mut self, req: &QueueGetConfigRequest)
        -> OfResult<QueueGetConfigReply>;

    /// Produces a queue stats reply
    fn queue_stats_get(&mut self, req: &QueueStatsRequest) -> OfResult<QueueStatsReply>;

    /// Fills the port list into a port desc stats reply
    fn desc_stats_get(&mut self, reply: &mut PortDescStatsReply);

    /// Fills the port list into a features reply
    fn features_get(&mut self, reply: &mut FeaturesReply);

    /// Offers an experimenter message to the port manager
    fn experimenter(&mut self, msg: Experimenter, cxn_id: CxnId) -> OfResult<()>;
}

/// The controller connection layer.
///
/// `send` consumes the reply on success and failure alike; a failed send is
/// logged by the caller and never retried.
pub trait CxnManager {
    /// Sends a reply to one controller connection
    fn send(&mut self, cxn_id: CxnId, reply: Reply) -> OfResult<()>;

    /// Sends an asynchronous message to every connection that subscribed
    /// to it
    fn send_async(&mut self, reply: Reply) -> OfResult<()>;

    /// Sends an error reply carrying up to 64 bytes of the offending
    /// request
    fn send_error(
        &mut self,
        ver: Version,
        cxn_id: CxnId,
        xid: u32,
        typ: u16,
        code: u16,
        data: Vec<u8>,
    ) -> OfResult<()> {
        use openflow::messages::ErrorMsg;
        self.send(cxn_id, Reply::Error(ErrorMsg::new(ver, xid, typ, code, data)))
    }
}

/// The cooperative scheduler the iteration tasks run under
pub trait Scheduler {
    /// True when the current slice's budget (10 ms by default) is used up
    /// and the running task should yield
    fn should_yield(&mut self) -> bool;

    /// Monotonic time in milliseconds
    fn current_time(&self) -> u64;
}

/// The collaborator bundle handed to every handler invocation
pub struct Datapath<'a> {
    pub fwd: &'a mut dyn Forwarding,
    pub port: &'a mut dyn PortManager,
    pub cxn: &'a mut dyn CxnManager,
    pub soc: &'a mut dyn Scheduler,
}
