//! Thread records.

use crate::Priority;
use serde::{Deserialize, Serialize};

/// Run state of a thread slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Admitted; stepped once per tick until it dies.
    Running,
    /// Spawned and awaiting the next admission round.
    Pending,
    /// Not scheduled. The slot is on the unused stack, or in transit to it
    /// until end-of-tick reaping.
    #[default]
    Dead,
}

/// Per-thread execution payload, owned by the execution stepper.
///
/// The hardware never inspects it; it only clears it when a thread slot is
/// reset for reuse.
pub trait ExecState: Default {
    /// Return the state to its freshly-constructed condition.
    fn clear(&mut self);
}

/// A stateless execution payload, for steppers that keep all state elsewhere.
impl ExecState for () {
    fn clear(&mut self) {}
}

/// A logical thread of execution.
///
/// The hardware owns every thread record; index views (active set, pending
/// queue, unused stack, execution order) refer to threads by [`ThreadId`]
/// only.
///
/// [`ThreadId`]: crate::ThreadId
#[derive(Debug, Clone)]
pub struct Thread<E> {
    exec_state: E,
    priority: Priority,
    run_state: RunState,
}

impl<E: ExecState> Thread<E> {
    /// Create a fresh, dead thread slot.
    pub fn new() -> Self {
        Self {
            exec_state: E::default(),
            priority: Priority::DEFAULT,
            run_state: RunState::Dead,
        }
    }

    /// Return the slot to its post-construction state: cleared execution
    /// state, default priority, dead.
    pub fn reset(&mut self) {
        self.exec_state.clear();
        self.priority = Priority::DEFAULT;
        self.run_state = RunState::Dead;
    }

    /// The backend-owned execution state.
    pub fn exec_state(&self) -> &E {
        &self.exec_state
    }

    /// Mutable access to the backend-owned execution state.
    pub fn exec_state_mut(&mut self) -> &mut E {
        &mut self.exec_state
    }

    /// This thread's scheduling priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Set this thread's scheduling priority.
    ///
    /// Takes effect at the next admission round; already-running threads keep
    /// running regardless of priority changes.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// This thread's run state.
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn is_pending(&self) -> bool {
        self.run_state == RunState::Pending
    }

    pub fn is_dead(&self) -> bool {
        self.run_state == RunState::Dead
    }

    /// Mark running. Index maintenance (active set, execution order) is the
    /// hardware's job.
    pub fn set_running(&mut self) {
        self.run_state = RunState::Running;
    }

    /// Mark pending.
    pub fn set_pending(&mut self) {
        self.run_state = RunState::Pending;
    }

    /// Mark dead.
    pub fn set_dead(&mut self) {
        self.run_state = RunState::Dead;
    }
}

impl<E: ExecState> Default for Thread<E> {
    fn default() -> Self {
        Self::new()
    }
}
