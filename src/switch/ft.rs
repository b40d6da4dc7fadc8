/*!
The flow table: the owning store of installed flow entries.

Entries are keyed by their process-wide flow id; since ids are allocated
monotonically, iteration order is insertion order. Iteration tasks keep a
cursor (the last visited id) instead of a reference, so entries deleted
between slices are silently skipped and entries added behind the cursor are
never revisited.
*/

use openflow::match_fields::Match;
use openflow::messages::{Effects, FlowMod};
use openflow::{Version, OFPP_ANY, TABLE_ID_ANY};
use openflow::error::{OfError, OfResult};

use std::collections::BTreeMap;
use std::ops::Bound;

/// Process-wide unique identifier of an installed flow. Zero is reserved as
/// "invalid" and never allocated.
pub type FlowId = u32;

/// How a query compares against table entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Match, masks, priority and masked cookie must be equal
    Strict,
    /// The query's constrained bits must be a subset of the entry's match
    NonStrict,
    /// The match bitspaces must intersect at equal priority
    Overlap,
}

/// A normalized predicate over flow entries
#[derive(Debug, Clone)]
pub struct FlowQuery {
    /// Table to search, or `TABLE_ID_ANY`
    pub table_id: u8,
    /// Fields to compare
    pub match_field: Match,
    /// The comparison mode
    pub mode: MatchMode,
    /// Consulted for `Strict` and `Overlap` only
    pub priority: u16,
    /// Entries must output here, `OFPP_ANY` places no restriction
    pub out_port: u32,
    /// Cookie filter; consulted outside `Overlap` for entries installed
    /// under 1.1 or later. A zero mask places no restriction.
    pub cookie: u64,
    pub cookie_mask: u64,
}

impl FlowQuery {
    /// Checks the query against one entry
    pub fn matches(&self, entry: &FlowEntry) -> bool {
        if self.table_id != TABLE_ID_ANY && self.table_id != entry.table_id {
            return false;
        }
        if self.out_port != OFPP_ANY && !entry.effects.outputs_to(self.out_port) {
            return false;
        }
        match self.mode {
            MatchMode::Strict => {
                entry.priority == self.priority
                    && self.match_field.strict_eq(&entry.match_field)
                    && self.cookie_matches(entry)
            }
            MatchMode::NonStrict => {
                self.match_field.covers(&entry.match_field) && self.cookie_matches(entry)
            }
            MatchMode::Overlap => {
                entry.priority == self.priority
                    && self.match_field.overlaps(&entry.match_field)
            }
        }
    }

    fn cookie_matches(&self, entry: &FlowEntry) -> bool {
        if self.cookie_mask == 0 || entry.version() < Version::V1_1 {
            return true;
        }
        (entry.cookie ^ self.cookie) & self.cookie_mask == 0
    }
}

/// One installed flow entry
#[derive(Debug, Clone)]
pub struct FlowEntry {
    id: FlowId,
    table_id: u8,
    priority: u16,
    match_field: Match,
    cookie: u64,
    idle_timeout: u16,
    hard_timeout: u16,
    flags: u16,
    effects: Effects,
    /// Millisecond timestamp of the successful forwarding insertion;
    /// never mutated afterwards
    insert_time: u64,
    /// Expiry bookkeeping: packet count seen at the last activity check
    last_packets: u64,
    /// Expiry bookkeeping: timestamp of the last observed activity
    last_activity: u64,
}

impl FlowEntry {
    fn from_flow_mod(id: FlowId, msg: &FlowMod) -> FlowEntry {
        FlowEntry {
            id,
            table_id: msg.table_id,
            priority: msg.priority,
            match_field: msg.match_field.clone(),
            cookie: msg.cookie,
            idle_timeout: msg.idle_timeout,
            hard_timeout: msg.hard_timeout,
            flags: msg.flags,
            effects: msg.effects.clone(),
            insert_time: 0,
            last_packets: 0,
            last_activity: 0,
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }
    pub fn table_id(&self) -> u8 {
        self.table_id
    }
    pub fn priority(&self) -> u16 {
        self.priority
    }
    pub fn match_field(&self) -> &Match {
        &self.match_field
    }
    pub fn cookie(&self) -> u64 {
        self.cookie
    }
    pub fn idle_timeout(&self) -> u16 {
        self.idle_timeout
    }
    pub fn hard_timeout(&self) -> u16 {
        self.hard_timeout
    }
    pub fn flags(&self) -> u16 {
        self.flags
    }
    pub fn effects(&self) -> &Effects {
        &self.effects
    }
    pub fn insert_time(&self) -> u64 {
        self.insert_time
    }

    /// The wire version the entry's effects were installed or last
    /// modified under
    pub fn version(&self) -> Version {
        self.effects.version()
    }

    pub(crate) fn last_packets(&self) -> u64 {
        self.last_packets
    }
    pub(crate) fn last_activity(&self) -> u64 {
        self.last_activity
    }

    /// Records the successful forwarding insertion
    pub(crate) fn activate(&mut self, table_id: u8, now: u64) {
        self.table_id = table_id;
        self.insert_time = now;
        self.last_activity = now;
    }

    /// Refreshes the expiry bookkeeping after a counter sample
    pub(crate) fn note_activity(&mut self, packets: u64, now: u64) {
        self.last_packets = packets;
        self.last_activity = now;
    }
}

/// Status counters of the flow table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FtStatus {
    /// Number of entries currently linked
    pub current_count: usize,
    /// Entries added over the table's lifetime
    pub adds: u64,
    /// Entries deleted over the table's lifetime
    pub deletes: u64,
    /// Flow adds refused by the forwarding module
    pub forwarding_add_errors: u64,
}

/// The owning store of flow entries
#[derive(Debug)]
pub struct FlowTable {
    entries: BTreeMap<FlowId, FlowEntry>,
    max_flows: usize,
    status: FtStatus,
}

impl FlowTable {
    /// Constructs an empty table bounded to `max_flows` entries
    pub fn new(max_flows: usize) -> FlowTable {
        FlowTable {
            entries: BTreeMap::new(),
            max_flows,
            status: FtStatus::default(),
        }
    }

    /// Allocates an entry populated from `msg` and links it under `id`.
    /// Fails with `Resource` when the table is full.
    pub fn add(&mut self, id: FlowId, msg: &FlowMod) -> OfResult<()> {
        debug_assert_ne!(0, id);
        if self.entries.len() >= self.max_flows {
            return Err(OfError::Resource);
        }
        if self.entries.contains_key(&id) {
            return Err(OfError::Param);
        }
        self.entries.insert(id, FlowEntry::from_flow_mod(id, msg));
        self.status.adds += 1;
        self.status.current_count = self.entries.len();
        Ok(())
    }

    /// Unlinks and returns the entry. Fails with `NotFound` if the entry is
    /// not linked.
    pub fn delete(&mut self, id: FlowId) -> OfResult<FlowEntry> {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.status.deletes += 1;
                self.status.current_count = self.entries.len();
                Ok(entry)
            }
            None => Err(OfError::NotFound),
        }
    }

    /// Linear scan returning the first strict match for `query`
    pub fn strict_match(&self, query: &FlowQuery) -> Option<FlowId> {
        debug_assert_eq!(MatchMode::Strict, query.mode);
        self.entries
            .values()
            .find(|e| query.matches(e))
            .map(FlowEntry::id)
    }

    /// Looks up an entry by id
    pub fn get(&self, id: FlowId) -> Option<&FlowEntry> {
        self.entries.get(&id)
    }

    /// Looks up an entry by id for mutation
    pub(crate) fn get_mut(&mut self, id: FlowId) -> Option<&mut FlowEntry> {
        self.entries.get_mut(&id)
    }

    /// Replaces an entry's effects from a modify request without touching
    /// its identity, timers or counters. The replacement is a single enum
    /// store, so a concurrent iterator sees either the old or the new
    /// effects in full.
    pub fn modify_effects(&mut self, id: FlowId, msg: &FlowMod) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.effects = msg.effects.clone();
        }
    }

    /// The id of the first entry after `after` that matches `query`; the
    /// resume point of a cooperative iteration slice
    pub fn next_match_after(&self, after: Option<FlowId>, query: &FlowQuery) -> Option<FlowId> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        self.entries
            .range((lower, Bound::Unbounded))
            .find(|&(_, e)| query.matches(e))
            .map(|(&id, _)| id)
    }

    /// In-place iteration over all linked entries, for scanners that do not
    /// yield
    pub fn iter(&self) -> impl Iterator<Item = &FlowEntry> {
        self.entries.values()
    }

    /// The status counters
    pub fn status(&self) -> &FtStatus {
        &self.status
    }

    pub(crate) fn note_forwarding_add_error(&mut self) {
        self.status.forwarding_add_errors += 1;
    }

    /// Number of linked entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openflow::match_fields::MatchField;
    use openflow::messages::{FlowModCommand, OFP_NO_BUFFER};

    fn flow_mod(ver: Version, in_port: u32, priority: u16, out: u32) -> FlowMod {
        let mut match_field = Match::new();
        match_field.add(MatchField::in_port(in_port));
        FlowMod {
            version: ver,
            xid: 1,
            cookie: 0,
            cookie_mask: 0,
            table_id: 0,
            command: FlowModCommand::Add,
            idle_timeout: 0,
            hard_timeout: 0,
            priority,
            buffer_id: OFP_NO_BUFFER,
            out_port: OFPP_ANY,
            flags: 0,
            match_field,
            effects: Effects::output(ver, out),
        }
    }

    fn strict_query(msg: &FlowMod) -> FlowQuery {
        FlowQuery {
            table_id: TABLE_ID_ANY,
            match_field: msg.match_field.clone(),
            mode: MatchMode::Strict,
            priority: msg.priority,
            out_port: OFPP_ANY,
            cookie: 0,
            cookie_mask: 0,
        }
    }

    #[test]
    fn add_and_delete_keep_counters_coherent() {
        let mut ft = FlowTable::new(8);
        ft.add(1, &flow_mod(Version::V1_0, 1, 100, 2)).unwrap();
        ft.add(2, &flow_mod(Version::V1_0, 2, 100, 2)).unwrap();
        assert_eq!(2, ft.count());
        assert_eq!(2, ft.status().current_count);
        assert_eq!(2, ft.status().adds);

        ft.delete(1).unwrap();
        assert_eq!(1, ft.count());
        assert_eq!(1, ft.status().current_count);
        assert_eq!(1, ft.status().deletes);

        assert_eq!(Err(OfError::NotFound), ft.delete(1).map(|e| e.id()));
    }

    #[test]
    fn add_beyond_bound_fails_with_resource() {
        let mut ft = FlowTable::new(1);
        ft.add(1, &flow_mod(Version::V1_0, 1, 100, 2)).unwrap();
        assert_eq!(
            Err(OfError::Resource),
            ft.add(2, &flow_mod(Version::V1_0, 2, 100, 2))
        );
        assert_eq!(1, ft.count());
    }

    #[test]
    fn strict_match_requires_equal_priority() {
        let mut ft = FlowTable::new(8);
        let msg = flow_mod(Version::V1_0, 1, 100, 2);
        ft.add(1, &msg).unwrap();

        assert_eq!(Some(1), ft.strict_match(&strict_query(&msg)));

        let mut other_priority = strict_query(&msg);
        other_priority.priority = 200;
        assert_eq!(None, ft.strict_match(&other_priority));
    }

    #[test]
    fn strict_match_honors_out_port() {
        let mut ft = FlowTable::new(8);
        let msg = flow_mod(Version::V1_0, 1, 100, 7);
        ft.add(1, &msg).unwrap();

        let mut query = strict_query(&msg);
        query.out_port = 7;
        assert_eq!(Some(1), ft.strict_match(&query));
        query.out_port = 8;
        assert_eq!(None, ft.strict_match(&query));
    }

    #[test]
    fn cookie_filter_applies_to_1_1_entries_only() {
        let mut ft = FlowTable::new(8);
        let mut v13 = flow_mod(Version::V1_3, 1, 100, 2);
        v13.cookie = 0xab;
        ft.add(1, &v13).unwrap();
        let mut v10 = flow_mod(Version::V1_0, 2, 100, 2);
        v10.cookie = 0xab;
        ft.add(2, &v10).unwrap();

        let filter = FlowQuery {
            table_id: TABLE_ID_ANY,
            match_field: Match::new(),
            mode: MatchMode::NonStrict,
            priority: 0,
            out_port: OFPP_ANY,
            cookie: 0xcd,
            cookie_mask: 0xff,
        };
        // the 1.3 entry is filtered by its cookie, the 1.0 entry is not
        assert!(!filter.matches(ft.get(1).unwrap()));
        assert!(filter.matches(ft.get(2).unwrap()));
    }

    #[test]
    fn modify_effects_keeps_identity_and_times() {
        let mut ft = FlowTable::new(8);
        ft.add(1, &flow_mod(Version::V1_0, 1, 100, 2)).unwrap();
        ft.get_mut(1).unwrap().activate(0, 5000);

        let mut replacement = flow_mod(Version::V1_0, 1, 100, 9);
        replacement.idle_timeout = 60;
        ft.modify_effects(1, &replacement);

        let entry = ft.get(1).unwrap();
        assert!(entry.effects().outputs_to(9));
        assert_eq!(5000, entry.insert_time());
        // timers are not touched by a modify
        assert_eq!(0, entry.idle_timeout());
    }

    #[test]
    fn cursor_iteration_skips_deleted_entries() {
        let mut ft = FlowTable::new(8);
        for i in 1..=4 {
            ft.add(i, &flow_mod(Version::V1_0, i, 100, 2)).unwrap();
        }
        let query = FlowQuery {
            table_id: TABLE_ID_ANY,
            match_field: Match::new(),
            mode: MatchMode::NonStrict,
            priority: 0,
            out_port: OFPP_ANY,
            cookie: 0,
            cookie_mask: 0,
        };

        let first = ft.next_match_after(None, &query).unwrap();
        assert_eq!(1, first);
        // delete the next entry mid-iteration; the cursor steps over it
        ft.delete(2).unwrap();
        assert_eq!(Some(3), ft.next_match_after(Some(first), &query));
        assert_eq!(Some(4), ft.next_match_after(Some(3), &query));
        assert_eq!(None, ft.next_match_after(Some(4), &query));
    }
}
