/*!
Cooperative iteration tasks over the flow table.

A task owns its query, a cursor and the operation state (including the
request message whose ownership was transferred to it). Each scheduler turn
the task advances entry by entry until the scheduler asks it to yield; when
the table holds no further match the task fires its terminal step exactly
once and is destroyed. The terminal step is the only place the originating
request is released.
*/

use switch::datapath::Datapath;
use switch::flow_mod::FlowModState;
use switch::ft::{FlowId, FlowQuery};
use switch::stats::{AggregateStatsState, FlowStatsState};
use switch::OfSwitch;

/// The operation a task performs per visited entry and at its terminal step
#[derive(Debug)]
pub(crate) enum TaskKind {
    /// Non-strict flow modify
    FlowModify(FlowModState),
    /// Non-strict flow delete
    FlowDelete(FlowModState),
    /// Streaming individual flow stats
    FlowStats(FlowStatsState),
    /// Aggregate flow stats
    AggregateStats(AggregateStatsState),
}

/// What a task observes when it advances
pub(crate) enum IterEvent {
    /// The next matching entry
    Entry(FlowId),
    /// The scan is complete; the task must release its state
    Done,
}

/// A registered iteration task
#[derive(Debug)]
pub(crate) struct IterTask {
    query: FlowQuery,
    cursor: Option<FlowId>,
    kind: TaskKind,
}

impl IterTask {
    pub(crate) fn new(query: FlowQuery, kind: TaskKind) -> IterTask {
        IterTask {
            query,
            cursor: None,
            kind,
        }
    }

    pub(crate) fn into_kind(self) -> TaskKind {
        self.kind
    }
}

impl OfSwitch {
    /// Registers an iteration task over the flow table. The request held in
    /// `kind` now belongs to the task.
    pub(crate) fn spawn_iter_task(&mut self, query: FlowQuery, kind: TaskKind) {
        trace!("Spawning flow table iteration task");
        self.tasks.push_back(IterTask::new(query, kind));
    }

    /// Gives every registered task one scheduler slice. Returns true while
    /// tasks remain registered.
    pub fn run_tasks(&mut self, dp: &mut Datapath) -> bool {
        let registered = self.tasks.len();
        for _ in 0..registered {
            if let Some(task) = self.tasks.pop_front() {
                if let Some(task) = self.advance_task(dp, task) {
                    self.tasks.push_back(task);
                }
            }
        }
        !self.tasks.is_empty()
    }

    /// True while iteration tasks are registered
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Runs one slice of `task`: entries until the scheduler asks to yield,
    /// or the terminal step. Returns the task if it must run again.
    fn advance_task(&mut self, dp: &mut Datapath, mut task: IterTask) -> Option<IterTask> {
        loop {
            let event = match self.ft.next_match_after(task.cursor, &task.query) {
                Some(id) => IterEvent::Entry(id),
                None => IterEvent::Done,
            };
            match event {
                IterEvent::Entry(id) => {
                    task.cursor = Some(id);
                    self.task_entry(dp, &mut task.kind, id);
                }
                IterEvent::Done => {
                    self.finish_task(dp, task.into_kind());
                    return None;
                }
            }
            if dp.soc.should_yield() {
                return Some(task);
            }
        }
    }

    /// One per-entry step of a task
    fn task_entry(&mut self, dp: &mut Datapath, kind: &mut TaskKind, id: FlowId) {
        match *kind {
            TaskKind::FlowModify(ref mut state) => self.flow_modify_entry(dp, state, id),
            TaskKind::FlowDelete(ref mut state) => self.flow_delete_entry(dp, state, id),
            TaskKind::FlowStats(ref mut state) => self.flow_stats_entry(dp, state, id),
            TaskKind::AggregateStats(ref mut state) => {
                self.aggregate_stats_entry(dp, state, id)
            }
        }
    }

    /// The terminal step: consumes the task state, which releases the
    /// request it owned
    pub(crate) fn finish_task(&mut self, dp: &mut Datapath, kind: TaskKind) {
        match kind {
            TaskKind::FlowModify(state) => self.flow_modify_done(dp, state),
            TaskKind::FlowDelete(state) => self.flow_delete_done(state),
            TaskKind::FlowStats(state) => self.flow_stats_done(dp, state),
            TaskKind::AggregateStats(state) => self.aggregate_stats_done(dp, state),
        }
    }
}
