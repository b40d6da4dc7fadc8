/*!
The statistics engine.

Individual flow stats and aggregate stats run as cooperative iteration tasks
over the flow table; the flow stats task streams multi-part reply segments,
flushing whenever the pending segment would outgrow 32 KiB and marking the
last segment by clearing the more flag. The remaining statistics (table,
port, queue, description, port description) are synchronous delegations to
the forwarding and port collaborators.
*/

use openflow::error::{OfError, OfResult};
use openflow::error_codes;
use openflow::match_fields::Match;
use openflow::messages::{
    AggregateStatsReply, AggregateStatsRequest, DescStatsReply, DescStatsRequest,
    FlowStatsEntry, FlowStatsReply, FlowStatsRequest, PortDescStatsReply,
    PortDescStatsRequest, PortStatsRequest, QueueGetConfigRequest, QueueStatsRequest,
    Reply, TableStatsRequest,
};
use openflow::Version;
use switch::datapath::{CxnId, Datapath};
use switch::duration_since;
use switch::ft::{FlowId, FlowQuery, MatchMode};
use switch::task::TaskKind;
use switch::OfSwitch;

/// A pending flow stats reply segment is flushed once it grows past this
const REPLY_FLUSH_LEN: usize = 32 * 1024;

/// State of a streaming flow stats task. Owns the request for the lifetime
/// of the task.
#[derive(Debug)]
pub(crate) struct FlowStatsState {
    pub request: FlowStatsRequest,
    pub cxn_id: CxnId,
    /// Sampled once at request time so every entry reports a duration
    /// against the same instant
    pub current_time: u64,
    /// The segment being filled, allocated lazily
    pub reply: Option<FlowStatsReply>,
}

/// State of an aggregate stats task
#[derive(Debug)]
pub(crate) struct AggregateStatsState {
    pub request: AggregateStatsRequest,
    pub cxn_id: CxnId,
    pub packets: u64,
    pub bytes: u64,
    pub flows: u32,
}

/// Builds the non-strict table query of a stats request
fn stats_query(
    ver: Version,
    table_id: u8,
    out_port: u32,
    cookie: u64,
    cookie_mask: u64,
    match_field: &Match,
) -> FlowQuery {
    let (cookie, cookie_mask) = if ver >= Version::V1_1 {
        (cookie, cookie_mask)
    } else {
        (0, 0)
    };
    FlowQuery {
        table_id,
        match_field: match_field.clone(),
        mode: MatchMode::NonStrict,
        priority: 0,
        out_port,
        cookie,
        cookie_mask,
    }
}

impl OfSwitch {
    /// Spawns the streaming flow stats task; the request now belongs to it
    pub(crate) fn handle_flow_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: FlowStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling flow stats request from {}", cxn_id);
        let query = stats_query(
            msg.version,
            msg.table_id,
            msg.out_port,
            msg.cookie,
            msg.cookie_mask,
            &msg.match_field,
        );
        let state = FlowStatsState {
            request: msg,
            cxn_id,
            current_time: dp.soc.current_time(),
            reply: None,
        };
        self.spawn_iter_task(query, TaskKind::FlowStats(state));
        Ok(())
    }

    /// Per-entry step of the flow stats task: appends one entry to the
    /// pending segment, flushing first-come segments as they fill up
    pub(crate) fn flow_stats_entry(
        &mut self,
        dp: &mut Datapath,
        state: &mut FlowStatsState,
        id: FlowId,
    ) {
        let entry = match self.ft.get(id) {
            Some(entry) => entry,
            None => return,
        };

        if state.reply.is_none() {
            state.reply = Some(FlowStatsReply::new(&state.request));
        }

        let counters = match dp.fwd.flow_stats_get(id) {
            Ok(counters) => counters,
            Err(e) => {
                error!("Failed to get stats for flow {}: {}", id, e);
                return;
            }
        };

        // a flow only shows up in stats requests of its own wire version
        if state.request.version != entry.version() {
            trace!(
                "Stats request version ({}) differs from entry version ({}), entry skipped",
                state.request.version,
                entry.version()
            );
            return;
        }

        let (secs, nsecs) = duration_since(state.current_time, entry.insert_time());
        let flags = if state.request.version >= Version::V1_3 {
            entry.flags()
        } else {
            0
        };

        let reply = match state.reply {
            Some(ref mut reply) => reply,
            None => return,
        };
        reply.entries.push(FlowStatsEntry {
            table_id: entry.table_id(),
            duration_sec: secs,
            duration_nsec: nsecs,
            priority: entry.priority(),
            idle_timeout: entry.idle_timeout(),
            hard_timeout: entry.hard_timeout(),
            flags,
            cookie: entry.cookie(),
            packet_count: counters.packets,
            byte_count: counters.bytes,
            match_field: entry.match_field().clone(),
            effects: entry.effects().clone(),
        });

        if reply.wire_len() > REPLY_FLUSH_LEN {
            let full = match state.reply.take() {
                Some(full) => full,
                None => return,
            };
            if dp.cxn.send(state.cxn_id, Reply::FlowStatsReply(full)).is_err() {
                error!("Error sending flow stats segment to {}", state.cxn_id);
            }
        }
    }

    /// Terminal step of the flow stats task: marks and sends the last
    /// segment, then releases the request
    pub(crate) fn flow_stats_done(&mut self, dp: &mut Datapath, mut state: FlowStatsState) {
        let mut last = state
            .reply
            .take()
            .unwrap_or_else(|| FlowStatsReply::new(&state.request));
        last.more = false;
        if dp.cxn.send(state.cxn_id, Reply::FlowStatsReply(last)).is_err() {
            error!("Error sending flow stats reply to {}", state.cxn_id);
        }
        trace!("Finished flow stats task");
    }

    /// Spawns the aggregate stats task
    pub(crate) fn handle_aggregate_stats_request(
        &mut self,
        _dp: &mut Datapath,
        msg: AggregateStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling aggregate stats request from {}", cxn_id);
        let query = stats_query(
            msg.version,
            msg.table_id,
            msg.out_port,
            msg.cookie,
            msg.cookie_mask,
            &msg.match_field,
        );
        let state = AggregateStatsState {
            request: msg,
            cxn_id,
            packets: 0,
            bytes: 0,
            flows: 0,
        };
        self.spawn_iter_task(query, TaskKind::AggregateStats(state));
        Ok(())
    }

    /// Per-entry step of the aggregate stats task
    pub(crate) fn aggregate_stats_entry(
        &mut self,
        dp: &mut Datapath,
        state: &mut AggregateStatsState,
        id: FlowId,
    ) {
        let counters = match dp.fwd.flow_stats_get(id) {
            Ok(counters) => counters,
            Err(e) => {
                error!("Failed to get stats for flow {}: {}", id, e);
                return;
            }
        };
        state.packets += counters.packets;
        state.bytes += counters.bytes;
        state.flows += 1;
    }

    /// Terminal step of the aggregate stats task: emits the single summary
    /// reply
    pub(crate) fn aggregate_stats_done(
        &mut self,
        dp: &mut Datapath,
        state: AggregateStatsState,
    ) {
        let reply = AggregateStatsReply {
            version: state.request.version,
            xid: state.request.xid,
            packet_count: state.packets,
            byte_count: state.bytes,
            flow_count: state.flows,
        };
        if dp
            .cxn
            .send(state.cxn_id, Reply::AggregateStatsReply(reply))
            .is_err()
        {
            error!("Error sending aggregate stats reply to {}", state.cxn_id);
        }
    }

    /// Table stats are delegated to the forwarding module
    pub(crate) fn handle_table_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: TableStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling table stats request from {}", cxn_id);
        let mut reply = match dp.fwd.table_stats_get(&msg) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Table stats returned error {}", e);
                return Err(e);
            }
        };
        reply.xid = msg.xid;
        if dp.cxn.send(cxn_id, Reply::TableStatsReply(reply)).is_err() {
            error!("Error sending table stats reply to {}", cxn_id);
        }
        Ok(())
    }

    /// Port stats are delegated to the port manager
    pub(crate) fn handle_port_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: PortStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling port stats request from {}", cxn_id);
        match dp.port.stats_get(&msg) {
            Ok(mut reply) => {
                reply.xid = msg.xid;
                if dp.cxn.send(cxn_id, Reply::PortStatsReply(reply)).is_err() {
                    error!("Error sending port stats reply to {}", cxn_id);
                }
                Ok(())
            }
            Err(e) => {
                error!("Failed to get stats for port {}: {}", msg.port_no, e);
                let (typ, code) = error_codes::bad_request_bad_port(msg.version);
                if dp
                    .cxn
                    .send_error(msg.version, cxn_id, msg.xid, typ, code, vec![])
                    .is_err()
                {
                    error!("Error sending error message for port stats msg");
                }
                Err(e)
            }
        }
    }

    /// Queue configuration is delegated to the port manager
    pub(crate) fn handle_queue_get_config_request(
        &mut self,
        dp: &mut Datapath,
        msg: QueueGetConfigRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling queue get config request from {}", cxn_id);
        match dp.port.queue_config_get(&msg) {
            Ok(mut reply) => {
                reply.xid = msg.xid;
                reply.port = msg.port;
                if dp
                    .cxn
                    .send(cxn_id, Reply::QueueGetConfigReply(reply))
                    .is_err()
                {
                    error!("Error sending queue config reply to {}", cxn_id);
                }
                Ok(())
            }
            Err(e) => {
                error!("Failed to get queue config on port {}: {}", msg.port, e);
                let (typ, code) = error_codes::queue_op_failed_bad_port(msg.version);
                if dp
                    .cxn
                    .send_error(msg.version, cxn_id, msg.xid, typ, code, vec![])
                    .is_err()
                {
                    error!("Error sending error message for queue config msg");
                }
                Err(e)
            }
        }
    }

    /// Queue stats are delegated to the port manager
    pub(crate) fn handle_queue_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: QueueStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling queue stats request from {}", cxn_id);
        match dp.port.queue_stats_get(&msg) {
            Ok(mut reply) => {
                reply.xid = msg.xid;
                if dp.cxn.send(cxn_id, Reply::QueueStatsReply(reply)).is_err() {
                    error!("Error sending queue stats reply to {}", cxn_id);
                }
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to get stats for queue {} on port {}: {}",
                    msg.queue_id, msg.port_no, e
                );
                let (typ, code) = match e {
                    OfError::Range => error_codes::queue_op_failed_bad_queue(msg.version),
                    _ => error_codes::queue_op_failed_bad_port(msg.version),
                };
                if dp
                    .cxn
                    .send_error(msg.version, cxn_id, msg.xid, typ, code, vec![])
                    .is_err()
                {
                    error!("Error sending error message for queue stats msg");
                }
                Err(e)
            }
        }
    }

    /// Switch description, answered from the loaded configuration
    pub(crate) fn handle_desc_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: DescStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling desc stats request from {}", cxn_id);
        let desc = &self.config.desc;
        let reply = DescStatsReply {
            version: msg.version,
            xid: msg.xid,
            flags: 0,
            mfr_desc: desc.manufacturer.clone(),
            hw_desc: desc.hardware.clone(),
            sw_desc: desc.software.clone(),
            serial_num: desc.serial.clone(),
            dp_desc: desc.datapath.clone(),
        };
        if dp.cxn.send(cxn_id, Reply::DescStatsReply(reply)).is_err() {
            error!("Error sending desc stats reply to {}", cxn_id);
        }
        Ok(())
    }

    /// Port descriptions, filled in by the port manager
    pub(crate) fn handle_port_desc_stats_request(
        &mut self,
        dp: &mut Datapath,
        msg: PortDescStatsRequest,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling port desc stats request from {}", cxn_id);
        let mut reply = PortDescStatsReply {
            version: msg.version,
            xid: msg.xid,
            ports: vec![],
        };
        dp.port.desc_stats_get(&mut reply);
        if dp
            .cxn
            .send(cxn_id, Reply::PortDescStatsReply(reply))
            .is_err()
        {
            error!("Error sending port desc stats reply to {}", cxn_id);
        }
        Ok(())
    }
}
