/*!
Mock collaborators and a test harness for the switch core.

The mocks record every call so tests can assert on the traffic that crossed
the collaborator seams; error injection points let tests drive the failure
paths.
*/

use conf::SwitchConfig;
use openflow::error::{OfError, OfResult};
use openflow::match_fields::Match;
use openflow::messages::{
    Effects, ErrorMsg, Experimenter, FeaturesReply, FlowMod, FlowModCommand, Message,
    PacketOut, PortDesc, PortDescStatsReply, PortMod, PortStatsReply, PortStatsRequest,
    QueueGetConfigReply, QueueGetConfigRequest, QueueStatsReply, QueueStatsRequest, Reply,
    TableStatsEntry, TableStatsReply, TableStatsRequest, OFP_NO_BUFFER,
};
use openflow::{Version, OFPP_ANY};
use switch::datapath::{CxnId, CxnManager, Datapath, FlowCounters, Forwarding, PortManager,
                       Scheduler};
use switch::ft::FlowId;
use switch::OfSwitch;

use std::collections::HashMap;

/// The connection id used by all harness traffic
pub(crate) const CXN_ID: CxnId = 13;

/// A flow mod with wildcard match and empty effects; tests fill in the rest
pub(crate) fn flow_mod_msg(ver: Version, command: FlowModCommand) -> FlowMod {
    FlowMod {
        version: ver,
        xid: 1,
        cookie: 0,
        cookie_mask: 0,
        table_id: 0,
        command,
        idle_timeout: 0,
        hard_timeout: 0,
        priority: 100,
        buffer_id: OFP_NO_BUFFER,
        out_port: OFPP_ANY,
        flags: 0,
        match_field: Match::new(),
        effects: Effects::none(ver),
    }
}

/// Recording forwarding module
#[derive(Default)]
pub(crate) struct MockFwd {
    pub created: Vec<FlowId>,
    pub modified: Vec<FlowId>,
    pub deleted: Vec<FlowId>,
    pub counters: HashMap<FlowId, FlowCounters>,
    pub create_error: Option<OfError>,
    pub modify_error: Option<OfError>,
    pub experimenter_error: Option<OfError>,
    pub packet_outs: usize,
    pub n_tables: u8,
    pub assigned_table: u8,
}

impl Forwarding for MockFwd {
    fn packet_out(&mut self, _msg: PacketOut) -> OfResult<()> {
        self.packet_outs += 1;
        Ok(())
    }

    fn flow_create(&mut self, flow_id: FlowId, _msg: &FlowMod) -> OfResult<u8> {
        if let Some(e) = self.create_error {
            return Err(e);
        }
        self.created.push(flow_id);
        Ok(self.assigned_table)
    }

    fn flow_modify(&mut self, flow_id: FlowId, _msg: &FlowMod) -> OfResult<()> {
        if let Some(e) = self.modify_error {
            return Err(e);
        }
        self.modified.push(flow_id);
        Ok(())
    }

    fn flow_delete(&mut self, flow_id: FlowId) -> OfResult<FlowCounters> {
        self.deleted.push(flow_id);
        Ok(self.counters.get(&flow_id).cloned().unwrap_or_default())
    }

    fn flow_stats_get(&mut self, flow_id: FlowId) -> OfResult<FlowCounters> {
        Ok(self.counters.get(&flow_id).cloned().unwrap_or_default())
    }

    fn table_stats_get(&mut self, req: &TableStatsRequest) -> OfResult<TableStatsReply> {
        Ok(TableStatsReply {
            version: req.version,
            xid: 0,
            entries: vec![TableStatsEntry::default()],
        })
    }

    fn forwarding_features_get(&mut self, reply: &mut FeaturesReply) {
        reply.n_tables = self.n_tables;
    }

    fn experimenter(&mut self, _msg: Experimenter, _cxn_id: CxnId) -> OfResult<()> {
        match self.experimenter_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Recording port manager
#[derive(Default)]
pub(crate) struct MockPort {
    pub modified: Vec<u32>,
    pub modify_error: Option<OfError>,
    pub stats_error: Option<OfError>,
    pub queue_config_error: Option<OfError>,
    pub queue_stats_error: Option<OfError>,
    pub experimenter_error: Option<OfError>,
    pub port_count: usize,
}

impl MockPort {
    fn ports(&self) -> Vec<PortDesc> {
        (0..self.port_count)
            .map(|i| PortDesc {
                port_no: (i + 1) as u32,
                ..PortDesc::default()
            })
            .collect()
    }
}

impl PortManager for MockPort {
    fn modify(&mut self, msg: &PortMod) -> OfResult<()> {
        if let Some(e) = self.modify_error {
            return Err(e);
        }
        self.modified.push(msg.port_no);
        Ok(())
    }

    fn stats_get(&mut self, req: &PortStatsRequest) -> OfResult<PortStatsReply> {
        match self.stats_error {
            Some(e) => Err(e),
            None => Ok(PortStatsReply {
                version: req.version,
                xid: 0,
                entries: vec![],
            }),
        }
    }

    fn queue_config_get(
        &mut self,
        req: &QueueGetConfigRequest,
    ) -> OfResult<QueueGetConfigReply> {
        match self.queue_config_error {
            Some(e) => Err(e),
            None => Ok(QueueGetConfigReply {
                version: req.version,
                xid: 0,
                port: 0,
                queues: vec![],
            }),
        }
    }

    fn queue_stats_get(&mut self, req: &QueueStatsRequest) -> OfResult<QueueStatsReply> {
        match self.queue_stats_error {
            Some(e) => Err(e),
            None => Ok(QueueStatsReply {
                version: req.version,
                xid: 0,
                entries: vec![],
            }),
        }
    }

    fn desc_stats_get(&mut self, reply: &mut PortDescStatsReply) {
        reply.ports = self.ports();
    }

    fn features_get(&mut self, reply: &mut FeaturesReply) {
        reply.ports = self.ports();
    }

    fn experimenter(&mut self, _msg: Experimenter, _cxn_id: CxnId) -> OfResult<()> {
        match self.experimenter_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Recording connection layer
#[derive(Default)]
pub(crate) struct MockCxn {
    pub sent: Vec<(CxnId, Reply)>,
    pub async_sent: Vec<Reply>,
    pub fail_send: bool,
}

impl CxnManager for MockCxn {
    fn send(&mut self, cxn_id: CxnId, reply: Reply) -> OfResult<()> {
        if self.fail_send {
            return Err(OfError::Unknown);
        }
        self.sent.push((cxn_id, reply));
        Ok(())
    }

    fn send_async(&mut self, reply: Reply) -> OfResult<()> {
        if self.fail_send {
            return Err(OfError::Unknown);
        }
        self.async_sent.push(reply);
        Ok(())
    }
}

/// Deterministic scheduler clock. With `yield_every` set to n, every n-th
/// `should_yield` call ends the slice.
#[derive(Default)]
pub(crate) struct MockSoc {
    pub now: u64,
    pub yield_every: usize,
    pub calls: usize,
}

impl Scheduler for MockSoc {
    fn should_yield(&mut self) -> bool {
        self.calls += 1;
        self.yield_every != 0 && self.calls % self.yield_every == 0
    }

    fn current_time(&self) -> u64 {
        self.now
    }
}

/// A switch core wired to the four mocks
pub(crate) struct Harness {
    pub sw: OfSwitch,
    pub fwd: MockFwd,
    pub port: MockPort,
    pub cxn: MockCxn,
    pub soc: MockSoc,
}

impl Harness {
    pub fn new() -> Harness {
        Harness::with_config(SwitchConfig::default())
    }

    pub fn with_config(config: SwitchConfig) -> Harness {
        Harness {
            sw: OfSwitch::new(config),
            fwd: MockFwd::default(),
            port: MockPort::default(),
            cxn: MockCxn::default(),
            soc: MockSoc::default(),
        }
    }

    /// Dispatches one message on the harness connection
    pub fn handle(&mut self, msg: Message) -> OfResult<()> {
        let mut dp = Datapath {
            fwd: &mut self.fwd,
            port: &mut self.port,
            cxn: &mut self.cxn,
            soc: &mut self.soc,
        };
        self.sw.handle_message(&mut dp, msg, CXN_ID)
    }

    /// Runs scheduler turns until no iteration task remains
    pub fn run_until_idle(&mut self) {
        loop {
            let mut dp = Datapath {
                fwd: &mut self.fwd,
                port: &mut self.port,
                cxn: &mut self.cxn,
                soc: &mut self.soc,
            };
            if !self.sw.run_tasks(&mut dp) {
                break;
            }
        }
    }

    /// One expiry sweep
    pub fn expire(&mut self) {
        let mut dp = Datapath {
            fwd: &mut self.fwd,
            port: &mut self.port,
            cxn: &mut self.cxn,
            soc: &mut self.soc,
        };
        self.sw.expire_flows(&mut dp);
    }

    /// Shuts the switch down, draining all tasks
    pub fn shutdown(&mut self) {
        let mut dp = Datapath {
            fwd: &mut self.fwd,
            port: &mut self.port,
            cxn: &mut self.cxn,
            soc: &mut self.soc,
        };
        self.sw.shutdown(&mut dp);
    }

    /// Every error reply sent on the harness connection, in order
    pub fn errors(&self) -> Vec<&ErrorMsg> {
        self.cxn
            .sent
            .iter()
            .filter_map(|&(_, ref reply)| match *reply {
                Reply::Error(ref err) => Some(err),
                _ => None,
            })
            .collect()
    }
}
