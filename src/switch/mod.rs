/*!
The top-level switch state and the message dispatcher.

`OfSwitch` owns everything the protocol engines mutate: the flow table, the
controller-set configuration, the BSN IP mask table, the xid and flow-id
allocators and the registered iteration tasks. All of it is driven from one
thread; handlers receive the datapath collaborators per call and complete
before the next handler runs, so no locking is involved.
*/

pub mod datapath;
pub mod flow_mod;
pub mod ft;
pub mod stats;
pub mod task;

#[cfg(test)]
pub(crate) mod testutil;

use conf::SwitchConfig;
use openflow::error::{OfError, OfResult};
use openflow::error_codes;
use openflow::messages::{
    BsnGetIpMaskReply, BsnGetIpMaskRequest, BsnHybridGetReply, BsnHybridGetRequest,
    BsnSetIpMask, EchoReply, EchoRequest, Experimenter, FeaturesReply, FeaturesRequest,
    GetConfigReply, GetConfigRequest, Hello, Message, PacketOut, PortMod, Reply, SetConfig,
    TableMod,
};
use openflow::RemovalReason;
use switch::datapath::{CxnId, Datapath};
use switch::ft::{FlowId, FlowTable};
use switch::task::IterTask;

use std::collections::VecDeque;

/// A process-wide monotonic 32-bit allocator that skips zero on wrap
#[derive(Debug)]
struct Counter32 {
    next: u32,
}

impl Counter32 {
    fn new(start: u32) -> Counter32 {
        debug_assert_ne!(0, start);
        Counter32 { next: start }
    }

    fn next(&mut self) -> u32 {
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        if self.next == 0 {
            self.next = 1;
        }
        value
    }
}

/// Number of slots in the BSN IP mask table
const IP_MASK_SLOTS: usize = 256;

/// The BSN extension's table of IP masks, addressable by a byte index
#[derive(Debug)]
struct IpMaskTable {
    masks: [u32; IP_MASK_SLOTS],
}

impl IpMaskTable {
    fn new() -> IpMaskTable {
        IpMaskTable {
            masks: [0; IP_MASK_SLOTS],
        }
    }

    fn set(&mut self, index: usize, mask: u32) -> OfResult<()> {
        if index >= IP_MASK_SLOTS {
            return Err(OfError::Range);
        }
        self.masks[index] = mask;
        Ok(())
    }

    fn get(&self, index: usize) -> OfResult<u32> {
        if index >= IP_MASK_SLOTS {
            return Err(OfError::Range);
        }
        Ok(self.masks[index])
    }
}

/// Splits a millisecond interval into the seconds and nanoseconds fields of
/// the duration replies
pub(crate) fn duration_since(now_ms: u64, start_ms: u64) -> (u32, u32) {
    let delta = now_ms.saturating_sub(start_ms);
    ((delta / 1000) as u32, ((delta % 1000) * 1_000_000) as u32)
}

/// The state-manager core of the switch agent. One instance lives per
/// process.
#[derive(Debug)]
pub struct OfSwitch {
    config: SwitchConfig,
    ft: FlowTable,
    ip_mask: IpMaskTable,
    xids: Counter32,
    flow_ids: Counter32,
    tasks: VecDeque<IterTask>,
}

impl OfSwitch {
    /// Constructs the switch core from its loaded configuration
    pub fn new(config: SwitchConfig) -> OfSwitch {
        let max_flows = config.max_flows;
        OfSwitch {
            config,
            ft: FlowTable::new(max_flows),
            ip_mask: IpMaskTable::new(),
            // unsolicited switch messages use their own xid space
            xids: Counter32::new(1000),
            flow_ids: Counter32::new(1),
            tasks: VecDeque::new(),
        }
    }

    /// The flow table
    pub fn ft(&self) -> &FlowTable {
        &self.ft
    }

    /// The switch configuration, including the controller-set part
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    /// Mutable access to the switch configuration
    pub fn config_mut(&mut self) -> &mut SwitchConfig {
        &mut self.config
    }

    /// Dispatches one decoded controller message. Ownership of `msg` moves
    /// here; every path drops it exactly once, possibly after transferring
    /// it into an iteration task.
    pub fn handle_message(
        &mut self,
        dp: &mut Datapath,
        msg: Message,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        match msg {
            Message::Hello(m) => self.handle_hello(m, cxn_id),
            Message::EchoRequest(m) => self.handle_echo_request(dp, m, cxn_id),
            Message::EchoReply(m) => self.handle_echo_reply(m, cxn_id),
            Message::FeaturesRequest(m) => self.handle_features_request(dp, m, cxn_id),
            Message::GetConfigRequest(m) => self.handle_get_config_request(dp, m, cxn_id),
            Message::SetConfig(m) => self.handle_set_config(m, cxn_id),
            Message::PacketOut(m) => self.handle_packet_out(dp, m, cxn_id),
            Message::PortMod(m) => self.handle_port_mod(dp, m, cxn_id),
            Message::TableMod(m) => self.handle_table_mod(m, cxn_id),
            Message::FlowMod(m) => self.handle_flow_mod(dp, m, cxn_id),
            Message::FlowStatsRequest(m) => self.handle_flow_stats_request(dp, m, cxn_id),
            Message::AggregateStatsRequest(m) => {
                self.handle_aggregate_stats_request(dp, m, cxn_id)
            }
            Message::TableStatsRequest(m) => self.handle_table_stats_request(dp, m, cxn_id),
            Message::PortStatsRequest(m) => self.handle_port_stats_request(dp, m, cxn_id),
            Message::QueueGetConfigRequest(m) => {
                self.handle_queue_get_config_request(dp, m, cxn_id)
            }
            Message::QueueStatsRequest(m) => self.handle_queue_stats_request(dp, m, cxn_id),
            Message::DescStatsRequest(m) => self.handle_desc_stats_request(dp, m, cxn_id),
            Message::PortDescStatsRequest(m) => {
                self.handle_port_desc_stats_request(dp, m, cxn_id)
            }
            Message::Experimenter(m) => self.handle_experimenter(dp, m, cxn_id),
            Message::BsnSetIpMask(m) => self.handle_bsn_set_ip_mask(dp, m, cxn_id),
            Message::BsnGetIpMaskRequest(m) => {
                self.handle_bsn_get_ip_mask_request(dp, m, cxn_id)
            }
            Message::BsnHybridGetRequest(m) => {
                self.handle_bsn_hybrid_get_request(dp, m, cxn_id)
            }
            other => self.unhandled_message(dp, &other, cxn_id),
        }
    }

    /// Answers a message type the agent does not handle with a bad request
    /// error
    fn unhandled_message(
        &mut self,
        dp: &mut Datapath,
        msg: &Message,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        let ver = msg.version();
        error!("Unhandled message from {}: {:?}", cxn_id, msg);
        let (typ, code) = error_codes::bad_request_bad_type(ver);
        if dp
            .cxn
            .send_error(ver, cxn_id, msg.xid(), typ, code, vec![])
            .is_err()
        {
            error!("Error sending error message for unhandled msg, cxn {}", cxn_id);
        }
        Err(OfError::Unknown)
    }

    fn handle_hello(&mut self, msg: Hello, cxn_id: CxnId) -> OfResult<()> {
        trace!("Received HELLO message from {}, version {}", cxn_id, msg.version);
        Ok(())
    }

    fn handle_echo_request(
        &mut self,
        dp: &mut Datapath,
        msg: EchoRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling echo request from {}", cxn_id);
        let reply = EchoReply {
            version: msg.version,
            xid: msg.xid,
            payload: msg.payload,
        };
        if dp.cxn.send(cxn_id, Reply::EchoReply(reply)).is_err() {
            error!("Error sending echo reply to {}", cxn_id);
        }
        Ok(())
    }

    fn handle_echo_reply(&mut self, msg: EchoReply, cxn_id: CxnId) -> OfResult<()> {
        trace!("Handling echo reply from {}, xid {}", cxn_id, msg.xid);
        Ok(())
    }

    fn handle_features_request(
        &mut self,
        dp: &mut Datapath,
        msg: FeaturesRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling features request from {}", cxn_id);
        let mut reply = FeaturesReply::new(&msg, self.config.dpid);
        dp.fwd.forwarding_features_get(&mut reply);
        dp.port.features_get(&mut reply);
        if dp.cxn.send(cxn_id, Reply::FeaturesReply(reply)).is_err() {
            error!("Error sending features response to {}", cxn_id);
        }
        Ok(())
    }

    fn handle_get_config_request(
        &mut self,
        dp: &mut Datapath,
        msg: GetConfigRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling get config request from {}", cxn_id);
        let reply = GetConfigReply {
            version: msg.version,
            xid: msg.xid,
            flags: self.config.flags,
            miss_send_len: self.config.miss_send_len,
        };
        if dp.cxn.send(cxn_id, Reply::GetConfigReply(reply)).is_err() {
            error!("Error sending get config reply to {}", cxn_id);
        }
        Ok(())
    }

    fn handle_set_config(&mut self, msg: SetConfig, cxn_id: CxnId) -> OfResult<()> {
        trace!("Handling set config from {}", cxn_id);
        self.config.config_set_done = true;
        self.config.flags = msg.flags;
        debug!("Config flags set to {:#x}", self.config.flags);
        self.config.miss_send_len = msg.miss_send_len;
        debug!("Miss send len set to {}", self.config.miss_send_len);
        Ok(())
    }

    fn handle_packet_out(
        &mut self,
        dp: &mut Datapath,
        msg: PacketOut,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling packet out from {}", cxn_id);
        if let Err(e) = dp.fwd.packet_out(msg) {
            debug!("Forwarding refused packet out: {}", e);
        }
        Ok(())
    }

    fn handle_port_mod(
        &mut self,
        dp: &mut Datapath,
        msg: PortMod,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling port mod from {}", cxn_id);
        match dp.port.modify(&msg) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Port modify failed: {}", e);
                let (typ, code) = error_codes::port_mod_failed_bad_port(msg.version);
                let sent = dp.cxn.send_error(
                    msg.version,
                    cxn_id,
                    msg.xid,
                    typ,
                    code,
                    msg.header_bytes().to_vec(),
                );
                if sent.is_err() {
                    error!("Error sending port mod error message");
                }
                Err(e)
            }
        }
    }

    fn handle_table_mod(&mut self, msg: TableMod, cxn_id: CxnId) -> OfResult<()> {
        // accepted and ignored: no table properties are configurable
        trace!(
            "Ignoring table mod for table {} from {}",
            msg.table_id,
            cxn_id
        );
        Ok(())
    }

    /// Experimenter messages are offered to both the forwarding module and
    /// the port manager, each on its own copy. Only a unanimous
    /// `NotSupported` is answered with an error reply; otherwise one
    /// success is success.
    fn handle_experimenter(
        &mut self,
        dp: &mut Datapath,
        msg: Experimenter,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling experimenter {:#x} from {}", msg.experimenter, cxn_id);
        let ver = msg.version;
        let xid = msg.xid;

        let fwd_rv = dp.fwd.experimenter(msg.clone(), cxn_id);
        if let Err(e) = fwd_rv {
            trace!("Error {} from forwarding experimenter", e);
        }
        let port_rv = dp.port.experimenter(msg, cxn_id);
        if let Err(e) = port_rv {
            trace!("Error {} from port experimenter", e);
        }

        match (fwd_rv, port_rv) {
            (Err(OfError::NotSupported), Err(OfError::NotSupported)) => {
                let (typ, code) = error_codes::bad_request_bad_experimenter(ver);
                if dp.cxn.send_error(ver, cxn_id, xid, typ, code, vec![]).is_err() {
                    error!("Error sending experimenter error message");
                }
                Ok(())
            }
            (Ok(()), _) | (_, Ok(())) => Ok(()),
            (Err(fwd_err), Err(_)) => {
                debug!("Error handling experimenter message in port or forwarding");
                Err(fwd_err)
            }
        }
    }

    fn handle_bsn_set_ip_mask(
        &mut self,
        dp: &mut Datapath,
        msg: BsnSetIpMask,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Received BSN set IP mask message from {}", cxn_id);
        if self.ip_mask.set(msg.index as usize, msg.mask).is_err() {
            error!("Bad index for set ip mask: {}", msg.index);
            let (typ, code) = error_codes::bad_request_eperm(msg.version);
            if dp
                .cxn
                .send_error(msg.version, cxn_id, msg.xid, typ, code, vec![])
                .is_err()
            {
                error!("Error sending error message for set ip mask msg");
            }
            return Ok(());
        }
        trace!("ip mask: set index {} to {:#x}", msg.index, msg.mask);
        Ok(())
    }

    fn handle_bsn_get_ip_mask_request(
        &mut self,
        dp: &mut Datapath,
        msg: BsnGetIpMaskRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Received BSN get IP mask request from {}", cxn_id);
        let mask = match self.ip_mask.get(msg.index as usize) {
            Ok(mask) => mask,
            Err(_) => {
                error!("Bad index for get ip mask: {}", msg.index);
                let (typ, code) = error_codes::bad_request_eperm(msg.version);
                if dp
                    .cxn
                    .send_error(msg.version, cxn_id, msg.xid, typ, code, vec![])
                    .is_err()
                {
                    error!("Error sending error message for get ip mask msg");
                }
                return Ok(());
            }
        };
        let reply = BsnGetIpMaskReply {
            version: msg.version,
            xid: msg.xid,
            index: msg.index,
            mask,
        };
        if dp.cxn.send(cxn_id, Reply::BsnGetIpMaskReply(reply)).is_err() {
            error!("Error sending get ip mask response to {}", cxn_id);
        }
        Ok(())
    }

    fn handle_bsn_hybrid_get_request(
        &mut self,
        dp: &mut Datapath,
        msg: BsnHybridGetRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Received BSN hybrid get message from {}", cxn_id);
        let reply = BsnHybridGetReply {
            version: msg.version,
            xid: msg.xid,
            hybrid_enable: 1,
            hybrid_version: 0,
        };
        if dp.cxn.send(cxn_id, Reply::BsnHybridGetReply(reply)).is_err() {
            error!("Error sending hybrid get response to {}", cxn_id);
        }
        Ok(())
    }

    /// Sweeps the table for entries past their timeouts and removes them
    /// through the regular deletion routine. Idle expiry samples the
    /// forwarding counters; a counter change refreshes the activity stamp.
    /// The embedding agent calls this periodically.
    pub fn expire_flows(&mut self, dp: &mut Datapath) {
        let now = dp.soc.current_time();
        let mut expired: Vec<(FlowId, RemovalReason)> = Vec::new();
        let mut idle_candidates: Vec<FlowId> = Vec::new();

        for entry in self.ft.iter() {
            let hard = u64::from(entry.hard_timeout()) * 1000;
            if hard != 0 && now.saturating_sub(entry.insert_time()) >= hard {
                expired.push((entry.id(), RemovalReason::HardTimeout));
            } else if entry.idle_timeout() != 0 {
                idle_candidates.push(entry.id());
            }
        }

        for id in idle_candidates {
            let counters = match dp.fwd.flow_stats_get(id) {
                Ok(counters) => counters,
                Err(e) => {
                    debug!("No counters for flow {} during expiry: {}", id, e);
                    continue;
                }
            };
            if let Some(entry) = self.ft.get_mut(id) {
                if counters.packets != entry.last_packets() {
                    entry.note_activity(counters.packets, now);
                } else {
                    let idle = u64::from(entry.idle_timeout()) * 1000;
                    if now.saturating_sub(entry.last_activity()) >= idle {
                        expired.push((id, RemovalReason::IdleTimeout));
                    }
                }
            }
        }

        for (id, reason) in expired {
            debug!("Expiring flow {} ({:?})", id, reason);
            self.flow_entry_delete(dp, id, reason);
        }
    }

    /// Runs every registered iteration task to its terminal step with an
    /// empty remainder, so each task releases its request and state. Called
    /// when the switch shuts down.
    pub fn shutdown(&mut self, dp: &mut Datapath) {
        while let Some(task) = self.tasks.pop_front() {
            self.finish_task(dp, task.into_kind());
        }
    }
}
