//! The hardware host: spawning, event dispatch, and the tick driver.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::state::HostState;
use tagvm_core::{Event, EventLibrary, ExecutionStepper, StepAction};
use tagvm_types::{ConfigError, HostConfig, ModuleId, Priority, Thread, ThreadId};
use tracing::{debug, trace};

/// Placeholder custom component for hosts that do not need one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultComponent;

/// Snapshot of which thread ids are active, pending, and unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadUsage {
    /// Running thread ids, sorted.
    pub active: Vec<ThreadId>,
    /// Pending thread ids, in arrival order.
    pub pending: Vec<ThreadId>,
    /// Unused thread ids, top of the stack last.
    pub unused: Vec<ThreadId>,
}

impl fmt::Display for ThreadUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_ids(f: &mut fmt::Formatter<'_>, label: &str, ids: &[ThreadId]) -> fmt::Result {
            write!(f, "{label} ({}): [", ids.len())?;
            for (i, id) in ids.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{id}")?;
            }
            writeln!(f, "]")
        }
        write_ids(f, "active", &self.active)?;
        write_ids(f, "pending", &self.pending)?;
        write_ids(f, "unused", &self.unused)
    }
}

/// A virtual hardware host.
///
/// Generic over the execution stepper `S` (which owns program semantics)
/// and an opaque per-host custom component `C`. The host owns the thread
/// pool and all scheduling state; external code drives it one [`tick`] at
/// a time.
///
/// A host is single-threaded and cooperative: exactly one OS thread may
/// drive it, and logical threads progress only when the tick driver reaches
/// them. Callers needing parallelism run disjoint hosts.
///
/// [`tick`]: Hardware::tick
pub struct Hardware<S: ExecutionStepper, C = DefaultComponent> {
    stepper: S,
    state: HostState<S::ExecState>,
    event_lib: Arc<EventLibrary<Self>>,
    custom_component: C,
}

impl<S: ExecutionStepper, C: Default> Hardware<S, C> {
    /// Create a host with the default configuration.
    pub fn new(event_lib: Arc<EventLibrary<Self>>, stepper: S) -> Self {
        Self::with_config(event_lib, stepper, HostConfig::default())
            .expect("default configuration is valid")
    }

    /// Create a host with an explicit configuration.
    pub fn with_config(
        event_lib: Arc<EventLibrary<Self>>,
        stepper: S,
        config: HostConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stepper,
            state: HostState::new(config),
            event_lib,
            custom_component: C::default(),
        })
    }
}

impl<S: ExecutionStepper, C> Hardware<S, C> {
    /// The event library this host dispatches through.
    pub fn event_lib(&self) -> &Arc<EventLibrary<Self>> {
        &self.event_lib
    }

    /// The execution stepper backing this host.
    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    /// Mutable access to the execution stepper.
    pub fn stepper_mut(&mut self) -> &mut S {
        &mut self.stepper
    }

    /// The host's custom component.
    pub fn custom_component(&self) -> &C {
        &self.custom_component
    }

    /// Mutable access to the host's custom component.
    pub fn custom_component_mut(&mut self) -> &mut C {
        &mut self.custom_component
    }

    /// Replace the host's custom component.
    pub fn set_custom_component(&mut self, component: C) {
        self.custom_component = component;
    }

    /// This host's configuration.
    pub fn config(&self) -> &HostConfig {
        &self.state.config
    }

    /// Upper bound on concurrently running threads.
    pub fn max_active_threads(&self) -> usize {
        self.state.config.max_active_threads
    }

    /// Upper bound on the thread pool (active + pending + unused).
    pub fn max_thread_space(&self) -> usize {
        self.state.config.max_thread_space
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Thread pool views
    // ═══════════════════════════════════════════════════════════════════════

    /// A thread record, by id. Panics on an out-of-pool id.
    pub fn thread(&self, id: ThreadId) -> &Thread<S::ExecState> {
        self.state.thread(id)
    }

    /// Mutable access to a thread record, by id.
    pub fn thread_mut(&mut self, id: ThreadId) -> &mut Thread<S::ExecState> {
        self.state.thread_mut(id)
    }

    /// Current pool length (allocated slots, any run state).
    pub fn thread_count(&self) -> usize {
        self.state.threads.len()
    }

    /// Number of running threads.
    pub fn num_active_threads(&self) -> usize {
        self.state.active.len()
    }

    /// Number of threads awaiting admission.
    pub fn num_pending_threads(&self) -> usize {
        self.state.pending.len()
    }

    /// Number of dead slots available for reuse.
    pub fn num_unused_threads(&self) -> usize {
        self.state.unused.len()
    }

    /// Ids of running threads (unordered).
    pub fn active_thread_ids(&self) -> &HashSet<ThreadId> {
        &self.state.active
    }

    /// Ids of pending threads, in arrival order.
    pub fn pending_thread_ids(&self) -> impl ExactSizeIterator<Item = ThreadId> + '_ {
        self.state.pending.iter().copied()
    }

    /// Ids of reusable dead slots, top of the stack last.
    pub fn unused_thread_ids(&self) -> &[ThreadId] {
        &self.state.unused
    }

    /// The order running threads are stepped in this tick. May contain ids
    /// of threads that died mid-tick.
    pub fn thread_exec_order(&self) -> &[ThreadId] {
        &self.state.exec_order
    }

    /// Whether the host is inside a tick's execution phase.
    pub fn is_executing(&self) -> bool {
        self.state.is_executing
    }

    /// Id of the thread currently being stepped, if any.
    pub fn cur_thread_id(&self) -> Option<ThreadId> {
        self.state.cur_thread
    }

    /// The thread currently being stepped.
    ///
    /// Panics unless the host is executing.
    pub fn cur_thread(&self) -> &Thread<S::ExecState> {
        assert!(
            self.state.is_executing,
            "no current thread: hardware is not executing"
        );
        let id = self
            .state
            .cur_thread
            .expect("executing hardware has a current thread");
        self.state.thread(id)
    }

    /// Mutable access to the thread currently being stepped.
    ///
    /// Panics unless the host is executing.
    pub fn cur_thread_mut(&mut self) -> &mut Thread<S::ExecState> {
        assert!(
            self.state.is_executing,
            "no current thread: hardware is not executing"
        );
        let id = self
            .state
            .cur_thread
            .expect("executing hardware has a current thread");
        self.state.thread_mut(id)
    }

    /// Number of events queued for the next tick.
    pub fn num_queued_events(&self) -> usize {
        self.state.event_queue.len()
    }

    /// Point-in-time snapshot of thread slot usage, for logs and
    /// diagnostics.
    pub fn thread_usage(&self) -> ThreadUsage {
        let mut active: Vec<ThreadId> = self.state.active.iter().copied().collect();
        active.sort();
        ThreadUsage {
            active,
            pending: self.state.pending.iter().copied().collect(),
            unused: self.state.unused.clone(),
        }
    }

    /// Check every scheduling invariant, panicking on violation.
    pub fn assert_invariants(&self) {
        self.state.assert_invariants();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Spawning
    // ═══════════════════════════════════════════════════════════════════════

    /// Spawn a pending thread running `module`.
    ///
    /// Reuses a dead slot when one is available, growing the pool otherwise.
    /// Returns `None` when thread space is exhausted; callers treat that as
    /// a non-fatal drop.
    pub fn spawn_with_module(&mut self, module: ModuleId, priority: Priority) -> Option<ThreadId> {
        let Some(id) = self.state.alloc_slot() else {
            debug!(module = %module, "spawn dropped: thread space exhausted");
            return None;
        };
        let thread = self.state.thread_mut(id);
        thread.reset();
        thread.set_priority(priority);
        self.stepper.init_thread(self.state.thread_mut(id), module);
        self.state.mark_pending(id);
        trace!(thread = %id, module = %module, priority = %priority, "thread spawned");
        Some(id)
    }

    /// Spawn a pending thread running the module that best matches `tag`.
    ///
    /// Returns `None` when no module matches or thread space is exhausted.
    pub fn spawn_with_tag(&mut self, tag: &S::Tag, priority: Priority) -> Option<ThreadId> {
        let module = self.stepper.find_module_match(tag, 1).into_iter().next()?;
        self.spawn_with_module(module, priority)
    }

    /// Spawn up to `n` pending threads over the best matches for `tag`.
    ///
    /// Partial success is legal: the result holds the ids that did spawn.
    pub fn spawn_many(&mut self, tag: &S::Tag, n: usize, priority: Priority) -> Vec<ThreadId> {
        self.stepper
            .find_module_match(tag, n)
            .into_iter()
            .filter_map(|module| self.spawn_with_module(module, priority))
            .collect()
    }

    /// Kill a thread. Takes effect immediately for scheduling purposes;
    /// if the target is mid-step, that step completes first. Idempotent on
    /// dead threads.
    pub fn kill(&mut self, id: ThreadId) {
        self.state.kill(id);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle an event on this host now, synchronously.
    pub fn handle_now(&mut self, event: &dyn Event) {
        let lib = Arc::clone(&self.event_lib);
        lib.handle_event(self, event);
    }

    /// Trigger an event from this host, fanning out through the library's
    /// dispatch path.
    pub fn trigger(&mut self, event: &dyn Event) {
        let lib = Arc::clone(&self.event_lib);
        lib.trigger_event(self, event);
    }

    /// Queue an event to be handled at the start of the next tick.
    pub fn enqueue_event(&mut self, event: Box<dyn Event>) {
        self.state.event_queue.push_back(event);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Tick driver
    // ═══════════════════════════════════════════════════════════════════════

    /// Advance the host by one logical time step.
    ///
    /// Drains the event queue (handlers may spawn), runs one admission
    /// round, steps every running thread once in execution order, and reaps
    /// dead threads back onto the unused stack. Threads spawned mid-tick run
    /// no earlier than the next tick. Event handlers must not call `tick` or
    /// `reset`.
    ///
    /// A stepper error aborts the execution phase; the host reaps, restores
    /// its invariants, and propagates the error unwrapped.
    ///
    /// Panics if called while already executing.
    pub fn tick(&mut self) -> Result<(), S::Error> {
        assert!(
            !self.state.is_executing,
            "tick re-entered while hardware is executing"
        );

        // Handle queued events, including any enqueued by handlers during
        // the drain.
        while let Some(event) = self.state.event_queue.pop_front() {
            self.handle_now(event.as_ref());
        }

        self.state.admit_pending();

        self.state.is_executing = true;
        // Freeze the roster: threads admitted after this point (spawned by
        // a step) wait for the next tick.
        let steps = self.state.exec_order.len();
        trace!(running = steps, "tick execution begins");

        let mut result = Ok(());
        for slot in 0..steps {
            let id = self.state.exec_order[slot];
            if !self.state.thread(id).is_running() {
                continue;
            }
            self.state.cur_thread = Some(id);
            let step_result = {
                // Split borrow: the stepper advances the thread, nothing else.
                let Hardware { stepper, state, .. } = &mut *self;
                stepper.single_step(id, state.thread_mut(id))
            };
            match step_result {
                Ok(actions) => self.apply_actions(id, actions),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        self.state.reap();
        self.state.cur_thread = None;
        self.state.is_executing = false;
        self.state.debug_assert_invariants();
        result
    }

    /// Advance the host by `num_ticks` steps, stopping at the first stepper
    /// error.
    pub fn run(&mut self, num_ticks: usize) -> Result<(), S::Error> {
        for _ in 0..num_ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Apply the actions one step requested, in order.
    fn apply_actions(&mut self, current: ThreadId, actions: Vec<StepAction<S::Tag>>) {
        for action in actions {
            match action {
                StepAction::SpawnWithModule { module, priority } => {
                    self.spawn_with_module(module, priority);
                }
                StepAction::SpawnWithTag { tag, priority } => {
                    self.spawn_with_tag(&tag, priority);
                }
                StepAction::KillCurrent => self.state.kill(current),
                StepAction::Kill(id) => self.state.kill(id),
                StepAction::EnqueueEvent(event) => self.enqueue_event(event),
                StepAction::TriggerEvent(event) => self.trigger(event.as_ref()),
                StepAction::HandleEvent(event) => self.handle_now(event.as_ref()),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reset & program lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Reset the scheduling state: clear the event queue and every index
    /// view, reset all thread slots, and rebuild the unused stack. Leaves
    /// the stepper and the custom component untouched.
    ///
    /// Panics if called while executing.
    pub fn reset_base_state(&mut self) {
        self.state.reset_base_state();
        debug!("hardware base state reset");
    }

    /// Full reset: scheduling state plus the stepper's internal state.
    pub fn reset(&mut self) {
        self.reset_base_state();
        self.stepper.reset_hardware_state();
    }

    /// Load a new program on the stepper.
    pub fn set_program(&mut self, program: S::Program) {
        self.stepper.set_program(program);
    }

    /// The program currently loaded on the stepper.
    pub fn program(&self) -> &S::Program {
        self.stepper.program()
    }

    /// Clear the stepper's loaded program.
    pub fn reset_program(&mut self) {
        self.stepper.reset_program();
    }
}

impl<S: ExecutionStepper, C> fmt::Debug for Hardware<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hardware")
            .field("threads", &self.state.threads.len())
            .field("active", &self.state.active.len())
            .field("pending", &self.state.pending.len())
            .field("unused", &self.state.unused.len())
            .field("queued_events", &self.state.event_queue.len())
            .field("is_executing", &self.state.is_executing)
            .field("cur_thread", &self.state.cur_thread)
            .finish()
    }
}
