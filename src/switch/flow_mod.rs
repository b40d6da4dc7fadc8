/*!
The flow-mod protocol engine.

Implements the add, modify, modify-strict, delete and delete-strict commands
with the OpenFlow semantics: overlap checking, overwrite of an identical
strict match, the treat-as-add fallback for modifies that match nothing, and
version-dependent error replies. The non-strict commands run as cooperative
iteration tasks; ownership of the request moves into the task and the task's
terminal step releases it.
*/

use openflow::error::{OfError, OfResult};
use openflow::error_codes;
use openflow::match_fields::Match;
use openflow::messages::{FlowMod, FlowModCommand, FlowRemoved, Reply};
use openflow::{
    emerg_flag, RemovalReason, Version, OFPFF_CHECK_OVERLAP, OFPFF_SEND_FLOW_REM, OFPP_ANY,
    TABLE_ID_ANY,
};
use switch::datapath::{CxnId, Datapath, FlowCounters};
use switch::duration_since;
use switch::ft::{FlowId, FlowQuery, MatchMode};
use switch::task::TaskKind;
use switch::OfSwitch;

/// State of a non-strict modify or delete iteration. Owns the request for
/// the lifetime of the task.
#[derive(Debug)]
pub(crate) struct FlowModState {
    pub request: FlowMod,
    pub cxn_id: CxnId,
    pub num_matched: u32,
}

/// Builds the table query for a flow mod. Works for add, modify and delete.
fn setup_query(msg: &FlowMod, mode: MatchMode, force_wildcard_port: bool) -> FlowQuery {
    let mut query = FlowQuery {
        table_id: TABLE_ID_ANY,
        match_field: Match::new(),
        mode,
        priority: 0,
        out_port: OFPP_ANY,
        cookie: 0,
        cookie_mask: 0,
    };
    if msg.version > Version::V1_0 {
        query.table_id = msg.table_id;
    }
    query.match_field = msg.match_field.clone();
    if mode == MatchMode::Strict || mode == MatchMode::Overlap {
        query.priority = msg.priority;
    }
    if !force_wildcard_port {
        query.out_port = msg.out_port;
    }
    if mode != MatchMode::Overlap && msg.version >= Version::V1_1 {
        query.cookie = msg.cookie;
        query.cookie_mask = msg.cookie_mask;
    }
    query
}

/// Translates the error into the code pair for the request's version and
/// sends the error message to the controller
fn err_msg_send(dp: &mut Datapath, err: OfError, cxn_id: CxnId, flow_mod: &FlowMod) {
    let pair = error_codes::flow_mod_failed(flow_mod.version, err);
    send_flow_mod_error(dp, flow_mod, cxn_id, pair);
}

fn send_flow_mod_error(dp: &mut Datapath, flow_mod: &FlowMod, cxn_id: CxnId, pair: (u16, u16)) {
    let (typ, code) = pair;
    let sent = dp.cxn.send_error(
        flow_mod.version,
        cxn_id,
        flow_mod.xid,
        typ,
        code,
        flow_mod.header_bytes().to_vec(),
    );
    if sent.is_err() {
        error!("Error sending flow mod error message to {}", cxn_id);
    }
}

impl OfSwitch {
    /// Routes a flow mod to the command's handler
    pub(crate) fn handle_flow_mod(
        &mut self,
        dp: &mut Datapath,
        msg: FlowMod,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        match msg.command {
            FlowModCommand::Add => self.flow_add(dp, msg, cxn_id),
            FlowModCommand::Modify => self.flow_modify(msg, cxn_id),
            FlowModCommand::ModifyStrict => self.flow_modify_strict(dp, msg, cxn_id),
            FlowModCommand::Delete => self.flow_delete(msg, cxn_id),
            FlowModCommand::DeleteStrict => self.flow_delete_strict(dp, msg, cxn_id),
        }
    }

    /// Installs a new flow. An existing entry with an identical strict
    /// match is replaced; protocol violations are answered on the wire and
    /// the request is released on every path.
    pub(crate) fn flow_add(
        &mut self,
        dp: &mut Datapath,
        msg: FlowMod,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        let ver = msg.version;
        trace!("Handling flow add from {}, version {}", cxn_id, ver);

        if msg.flags & OFPFF_CHECK_OVERLAP != 0 {
            let query = setup_query(&msg, MatchMode::Overlap, true);
            if self.ft.iter().any(|e| query.matches(e)) {
                debug!("Overlap found when adding flow");
                send_flow_mod_error(dp, &msg, cxn_id, error_codes::flow_mod_overlap(ver));
                return Ok(());
            }
        }

        if msg.flags & emerg_flag(ver) != 0
            && (msg.idle_timeout != 0 || msg.hard_timeout != 0)
        {
            debug!("Attempted to set a timeout on an emergency flow");
            send_flow_mod_error(
                dp,
                &msg,
                cxn_id,
                error_codes::flow_mod_bad_emerg_timeout(ver),
            );
            return Err(OfError::Param);
        }

        let query = setup_query(&msg, MatchMode::Strict, true);
        if let Some(existing) = self.ft.strict_match(&query) {
            self.flow_entry_delete(dp, existing, RemovalReason::Overwrite);
        }

        trace!("Adding new flow");
        let flow_id = self.flow_ids.next();
        if let Err(e) = self.ft.add(flow_id, &msg) {
            error!("Flow table insertion failed: {}", e);
            return Err(e);
        }

        match dp.fwd.flow_create(flow_id, &msg) {
            Ok(table_id) => {
                let now = dp.soc.current_time();
                if let Some(entry) = self.ft.get_mut(flow_id) {
                    entry.activate(table_id, now);
                }
                trace!("Flow table now has {} entries", self.ft.count());
            }
            Err(e) => {
                debug!("Error from forwarding while inserting flow: {}", e);
                self.ft.note_forwarding_add_error();
                err_msg_send(dp, e, cxn_id, &msg);
                if let Err(e) = self.ft.delete(flow_id) {
                    error!("Could not back out flow {}: {}", flow_id, e);
                }
            }
        }

        Ok(())
    }

    /// Non-strict modify: spawns an iteration task; the request now belongs
    /// to the task
    fn flow_modify(&mut self, msg: FlowMod, cxn_id: CxnId) -> OfResult<()> {
        trace!("Handling flow modify from {}", cxn_id);
        let query = setup_query(&msg, MatchMode::NonStrict, true);
        self.spawn_iter_task(
            query,
            TaskKind::FlowModify(FlowModState {
                request: msg,
                cxn_id,
                num_matched: 0,
            }),
        );
        Ok(())
    }

    /// Strict modify, synchronous. A modify that matches nothing is treated
    /// as an add.
    fn flow_modify_strict(
        &mut self,
        dp: &mut Datapath,
        msg: FlowMod,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling flow modify strict from {}", cxn_id);
        let query = setup_query(&msg, MatchMode::Strict, true);
        let id = match self.ft.strict_match(&query) {
            None => {
                debug!("No entries to modify strict, treat as add");
                return self.flow_add(dp, msg, cxn_id);
            }
            Some(id) => id,
        };
        match dp.fwd.flow_modify(id, &msg) {
            Ok(()) => {
                self.ft.modify_effects(id, &msg);
                Ok(())
            }
            Err(e) => {
                debug!("Flow modify error: {}", e);
                err_msg_send(dp, e, cxn_id, &msg);
                Err(e)
            }
        }
    }

    /// Non-strict delete: spawns an iteration task honoring the request's
    /// out-port filter. Matching nothing is not an error.
    fn flow_delete(&mut self, msg: FlowMod, cxn_id: CxnId) -> OfResult<()> {
        trace!("Handling flow delete from {}", cxn_id);
        let query = setup_query(&msg, MatchMode::NonStrict, false);
        self.spawn_iter_task(
            query,
            TaskKind::FlowDelete(FlowModState {
                request: msg,
                cxn_id,
                num_matched: 0,
            }),
        );
        Ok(())
    }

    /// Strict delete, synchronous
    fn flow_delete_strict(
        &mut self,
        dp: &mut Datapath,
        msg: FlowMod,
        cxn_id: CxnId,
    ) -> OfResult<()> {
        trace!("Handling flow delete strict from {}", cxn_id);
        let query = setup_query(&msg, MatchMode::Strict, false);
        if let Some(id) = self.ft.strict_match(&query) {
            self.flow_entry_delete(dp, id, RemovalReason::Delete);
        }
        Ok(())
    }

    /// Per-entry step of a modify task
    pub(crate) fn flow_modify_entry(
        &mut self,
        dp: &mut Datapath,
        state: &mut FlowModState,
        id: FlowId,
    ) {
        state.num_matched += 1;
        match dp.fwd.flow_modify(id, &state.request) {
            Ok(()) => self.ft.modify_effects(id, &state.request),
            Err(e) => {
                debug!("Flow modify error: {}", e);
                err_msg_send(dp, e, state.cxn_id, &state.request);
            }
        }
    }

    /// Terminal step of a modify task. A modify that matched nothing is
    /// treated as an add; ownership of the request moves on to the add
    /// path, which releases it.
    pub(crate) fn flow_modify_done(&mut self, dp: &mut Datapath, state: FlowModState) {
        if state.num_matched == 0 {
            debug!("No entries to modify, treat as add");
            if let Err(e) = self.flow_add(dp, state.request, state.cxn_id) {
                debug!("Modify fallback add failed: {}", e);
            }
        } else {
            trace!("Finished flow modify task");
        }
    }

    /// Per-entry step of a delete task
    pub(crate) fn flow_delete_entry(
        &mut self,
        dp: &mut Datapath,
        state: &mut FlowModState,
        id: FlowId,
    ) {
        state.num_matched += 1;
        self.flow_entry_delete(dp, id, RemovalReason::Delete);
    }

    /// Terminal step of a delete task; releases the request
    pub(crate) fn flow_delete_done(&mut self, state: FlowModState) {
        trace!(
            "Finished flow delete task, {} entries removed",
            state.num_matched
        );
    }

    /// The entry deletion routine: tears the flow out of the forwarding
    /// module, notifies the controller when the entry asked for it, and
    /// unlinks the entry. `Overwrite` removals are never announced.
    pub(crate) fn flow_entry_delete(
        &mut self,
        dp: &mut Datapath,
        id: FlowId,
        reason: RemovalReason,
    ) {
        let counters = match dp.fwd.flow_delete(id) {
            Ok(counters) => counters,
            Err(e) => {
                warn!("Forwarding delete for flow {} failed: {}", id, e);
                FlowCounters::default()
            }
        };
        let entry = match self.ft.delete(id) {
            Ok(entry) => entry,
            Err(e) => {
                error!("Flow {} left the table before deletion: {}", id, e);
                return;
            }
        };

        if entry.flags() & OFPFF_SEND_FLOW_REM == 0 {
            return;
        }
        let code = match reason.wire_code() {
            Some(code) => code,
            None => return,
        };

        let ver = entry.version();
        let (secs, nsecs) = duration_since(dp.soc.current_time(), entry.insert_time());
        let removed = FlowRemoved {
            version: ver,
            xid: self.xids.next(),
            cookie: entry.cookie(),
            priority: entry.priority(),
            reason: code,
            table_id: entry.table_id(),
            duration_sec: secs,
            duration_nsec: nsecs,
            idle_timeout: entry.idle_timeout(),
            hard_timeout: if ver >= Version::V1_3 {
                entry.hard_timeout()
            } else {
                0
            },
            packet_count: counters.packets,
            byte_count: counters.bytes,
            match_field: entry.match_field().clone(),
        };
        if dp.cxn.send_async(Reply::FlowRemoved(removed)).is_err() {
            warn!("Failed to send flow removed message for flow {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openflow::match_fields::{Endpoint, MatchField};
    use openflow::messages::{Effects, Message};
    use switch::testutil::{flow_mod_msg, Harness};

    fn add_msg(ver: Version, priority: u16, out: u32) -> FlowMod {
        let mut msg = flow_mod_msg(ver, FlowModCommand::Add);
        msg.priority = priority;
        msg.effects = Effects::output(ver, out);
        msg
    }

    fn tcp_match(dst_port: u16) -> Match {
        let mut m = Match::new();
        m.add(MatchField::eth_type(0x0800))
            .add(MatchField::ip_proto(6))
            .add(MatchField::tcp_port(dst_port, Endpoint::Dst));
        m
    }

    #[test]
    fn add_then_overwrite_replaces_the_entry() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.match_field.add(MatchField::eth_type(0x0800));
        h.handle(Message::FlowMod(a)).unwrap();
        let first_id = h.fwd.created[0];

        let mut b = add_msg(Version::V1_0, 100, 2);
        b.match_field.add(MatchField::eth_type(0x0800));
        h.handle(Message::FlowMod(b)).unwrap();

        assert_eq!(1, h.sw.ft().count());
        let entry = h.sw.ft().iter().next().unwrap();
        assert!(entry.effects().outputs_to(2));
        assert_eq!(vec![first_id], h.fwd.deleted);
        // overwrite is silent: no flow removed, no error
        assert!(h.cxn.async_sent.is_empty());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn overwrite_never_announces_flow_removed() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.flags = OFPFF_SEND_FLOW_REM;
        h.handle(Message::FlowMod(a.clone())).unwrap();

        a.effects = Effects::output(Version::V1_0, 2);
        h.handle(Message::FlowMod(a)).unwrap();

        assert_eq!(1, h.sw.ft().count());
        assert!(h.cxn.async_sent.is_empty());
    }

    #[test]
    fn overlap_is_rejected_when_the_flag_is_set() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.match_field.add(MatchField::in_port(1));
        h.handle(Message::FlowMod(a)).unwrap();

        // wildcards in_port entirely, so it overlaps the installed flow
        let mut b = add_msg(Version::V1_0, 100, 2);
        b.xid = 42;
        b.flags = OFPFF_CHECK_OVERLAP;
        h.handle(Message::FlowMod(b)).unwrap();

        assert_eq!(1, h.sw.ft().count());
        assert_eq!(1, h.fwd.created.len());
        let err = h.errors()[0].clone();
        assert_eq!(42, err.xid);
        assert_eq!((3, 1), (err.typ, err.code));
    }

    #[test]
    fn overlap_needs_equal_priority() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.match_field.add(MatchField::in_port(1));
        h.handle(Message::FlowMod(a)).unwrap();

        let mut b = add_msg(Version::V1_0, 200, 2);
        b.flags = OFPFF_CHECK_OVERLAP;
        h.handle(Message::FlowMod(b)).unwrap();

        assert_eq!(2, h.sw.ft().count());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn emergency_flow_with_timeout_is_rejected() {
        let mut h = Harness::new();
        let mut msg = add_msg(Version::V1_0, 100, 1);
        msg.flags = super::emerg_flag(Version::V1_0);
        msg.idle_timeout = 5;
        let result = h.handle(Message::FlowMod(msg));

        assert_eq!(Err(OfError::Param), result);
        assert_eq!(0, h.sw.ft().count());
        let err = h.errors()[0].clone();
        assert_eq!((3, 3), (err.typ, err.code));
    }

    #[test]
    fn forwarding_failure_backs_the_entry_out() {
        let mut h = Harness::new();
        h.fwd.create_error = Some(OfError::Resource);
        let mut msg = add_msg(Version::V1_0, 100, 1);
        msg.xid = 9;
        h.handle(Message::FlowMod(msg)).unwrap();

        assert_eq!(0, h.sw.ft().count());
        assert_eq!(1, h.sw.ft().status().forwarding_add_errors);
        let err = h.errors()[0].clone();
        assert_eq!(9, err.xid);
        // 1.0 reports ALL_TABLES_FULL for a resource failure
        assert_eq!((3, 0), (err.typ, err.code));
    }

    #[test]
    fn forwarding_failure_codes_follow_the_version() {
        let mut h = Harness::new();
        h.fwd.create_error = Some(OfError::Resource);
        h.handle(Message::FlowMod(add_msg(Version::V1_3, 100, 1)))
            .unwrap();
        let err = h.errors()[0].clone();
        // 1.3 reports TABLE_FULL
        assert_eq!((5, 1), (err.typ, err.code));
    }

    #[test]
    fn modify_with_no_match_is_treated_as_add() {
        let mut h = Harness::new();
        let mut msg = flow_mod_msg(Version::V1_0, FlowModCommand::Modify);
        msg.match_field.add(MatchField::in_port(2));
        msg.effects = Effects::output(Version::V1_0, 3);
        h.handle(Message::FlowMod(msg)).unwrap();

        assert!(h.sw.has_tasks());
        h.run_until_idle();

        assert_eq!(1, h.sw.ft().count());
        assert_eq!(1, h.fwd.created.len());
        assert!(h.errors().is_empty());
        let entry = h.sw.ft().iter().next().unwrap();
        assert!(entry.effects().outputs_to(3));
    }

    #[test]
    fn modify_strict_with_no_match_is_treated_as_add() {
        let mut h = Harness::new();
        let mut msg = flow_mod_msg(Version::V1_0, FlowModCommand::ModifyStrict);
        msg.effects = Effects::output(Version::V1_0, 3);
        h.handle(Message::FlowMod(msg)).unwrap();

        // synchronous: no task was needed
        assert!(!h.sw.has_tasks());
        assert_eq!(1, h.sw.ft().count());
        assert_eq!(1, h.fwd.created.len());
    }

    #[test]
    fn modify_replaces_effects_without_resetting_insert_time() {
        let mut h = Harness::new();
        h.soc.now = 1000;
        h.handle(Message::FlowMod(add_msg(Version::V1_0, 100, 1)))
            .unwrap();

        h.soc.now = 9000;
        let mut msg = flow_mod_msg(Version::V1_0, FlowModCommand::Modify);
        msg.effects = Effects::output(Version::V1_0, 9);
        h.handle(Message::FlowMod(msg)).unwrap();
        h.run_until_idle();

        assert_eq!(1, h.sw.ft().count());
        let entry = h.sw.ft().iter().next().unwrap();
        assert!(entry.effects().outputs_to(9));
        assert_eq!(1000, entry.insert_time());
        assert_eq!(1, h.fwd.modified.len());
    }

    #[test]
    fn modify_failure_reports_each_entry() {
        let mut h = Harness::new();
        h.handle(Message::FlowMod(add_msg(Version::V1_0, 100, 1)))
            .unwrap();
        h.fwd.modify_error = Some(OfError::NotSupported);

        let mut msg = flow_mod_msg(Version::V1_0, FlowModCommand::Modify);
        msg.effects = Effects::output(Version::V1_0, 9);
        h.handle(Message::FlowMod(msg)).unwrap();
        h.run_until_idle();

        let err = h.errors()[0].clone();
        // 1.0 reports UNSUPPORTED
        assert_eq!((3, 5), (err.typ, err.code));
        // the old effects stay
        let entry = h.sw.ft().iter().next().unwrap();
        assert!(entry.effects().outputs_to(1));
    }

    #[test]
    fn non_strict_delete_removes_every_match_and_is_idempotent() {
        let mut h = Harness::new();
        for port in &[80u16, 443, 8080] {
            let mut msg = add_msg(Version::V1_0, 100, 1);
            msg.match_field = tcp_match(*port);
            h.handle(Message::FlowMod(msg)).unwrap();
        }
        assert_eq!(3, h.sw.ft().count());

        let mut del = flow_mod_msg(Version::V1_0, FlowModCommand::Delete);
        del.match_field.add(MatchField::eth_type(0x0800));
        del.match_field.add(MatchField::ip_proto(6));
        h.handle(Message::FlowMod(del.clone())).unwrap();
        h.run_until_idle();

        assert_eq!(0, h.sw.ft().count());
        assert_eq!(3, h.fwd.deleted.len());
        assert!(h.errors().is_empty());

        // deleting again matches nothing and raises no error
        h.handle(Message::FlowMod(del)).unwrap();
        h.run_until_idle();
        assert_eq!(0, h.sw.ft().count());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn delete_honors_the_out_port_filter() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.match_field.add(MatchField::in_port(1));
        h.handle(Message::FlowMod(a)).unwrap();
        let mut b = add_msg(Version::V1_0, 100, 2);
        b.match_field.add(MatchField::in_port(2));
        h.handle(Message::FlowMod(b)).unwrap();

        let mut del = flow_mod_msg(Version::V1_0, FlowModCommand::Delete);
        del.out_port = 1;
        h.handle(Message::FlowMod(del)).unwrap();
        h.run_until_idle();

        assert_eq!(1, h.sw.ft().count());
        let survivor = h.sw.ft().iter().next().unwrap();
        assert!(survivor.effects().outputs_to(2));
    }

    #[test]
    fn delete_strict_requires_the_exact_priority() {
        let mut h = Harness::new();
        let mut a = add_msg(Version::V1_0, 100, 1);
        a.match_field.add(MatchField::in_port(1));
        h.handle(Message::FlowMod(a.clone())).unwrap();

        let mut miss = a.clone();
        miss.command = FlowModCommand::DeleteStrict;
        miss.priority = 200;
        h.handle(Message::FlowMod(miss)).unwrap();
        assert_eq!(1, h.sw.ft().count());

        let mut hit = a;
        hit.command = FlowModCommand::DeleteStrict;
        h.handle(Message::FlowMod(hit)).unwrap();
        assert_eq!(0, h.sw.ft().count());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn delete_announces_flow_removed_when_requested() {
        let mut h = Harness::new();
        h.soc.now = 1000;
        let mut msg = add_msg(Version::V1_0, 100, 1);
        msg.flags = OFPFF_SEND_FLOW_REM;
        msg.cookie = 0xfeed;
        h.handle(Message::FlowMod(msg.clone())).unwrap();
        h.fwd
            .counters
            .insert(h.fwd.created[0], FlowCounters { packets: 4, bytes: 400 });

        h.soc.now = 3500;
        let mut del = msg;
        del.command = FlowModCommand::DeleteStrict;
        h.handle(Message::FlowMod(del)).unwrap();

        assert_eq!(1, h.cxn.async_sent.len());
        match h.cxn.async_sent[0] {
            Reply::FlowRemoved(ref removed) => {
                assert_eq!(2, removed.reason);
                assert_eq!(0xfeed, removed.cookie);
                assert_eq!(2, removed.duration_sec);
                assert_eq!(500_000_000, removed.duration_nsec);
                assert_eq!(4, removed.packet_count);
                assert_eq!(400, removed.byte_count);
            }
            ref other => panic!("unexpected async message {:?}", other),
        }
    }

    #[test]
    fn treat_as_add_produces_the_same_state_as_add() {
        let mut direct = Harness::new();
        let mut via_modify = Harness::new();

        let mut msg = flow_mod_msg(Version::V1_3, FlowModCommand::Add);
        msg.match_field.add(MatchField::in_port(4));
        msg.priority = 77;
        msg.effects = Effects::output(Version::V1_3, 2);
        direct.handle(Message::FlowMod(msg.clone())).unwrap();

        msg.command = FlowModCommand::Modify;
        via_modify.handle(Message::FlowMod(msg)).unwrap();
        via_modify.run_until_idle();

        assert_eq!(1, direct.sw.ft().count());
        assert_eq!(1, via_modify.sw.ft().count());
        let a = direct.sw.ft().iter().next().unwrap();
        let b = via_modify.sw.ft().iter().next().unwrap();
        assert_eq!(a.priority(), b.priority());
        assert_eq!(a.match_field(), b.match_field());
        assert_eq!(a.effects(), b.effects());
    }
}
