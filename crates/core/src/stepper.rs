//! The execution-stepper seam.

use crate::event::Event;
use tagvm_types::{ExecState, ModuleId, Priority, Thread, ThreadId};

/// Commands a stepper returns from [`ExecutionStepper::single_step`].
///
/// Actions are applied in order by the tick driver immediately after the
/// step returns, before any other thread runs.
#[derive(Debug)]
pub enum StepAction<T> {
    /// Spawn a pending thread running `module`.
    SpawnWithModule {
        module: ModuleId,
        priority: Priority,
    },

    /// Spawn a pending thread running the closest tag match, if any.
    SpawnWithTag { tag: T, priority: Priority },

    /// Kill the thread that produced this action. Steppers emit this when a
    /// thread has nothing more to do.
    KillCurrent,

    /// Kill an arbitrary thread.
    Kill(ThreadId),

    /// Queue an event for the next tick.
    EnqueueEvent(Box<dyn Event>),

    /// Route an event through the library's trigger (host → world) path.
    TriggerEvent(Box<dyn Event>),

    /// Handle an event synchronously, within the current tick.
    HandleEvent(Box<dyn Event>),
}

/// A pluggable program executor.
///
/// The hardware host multiplexes logical threads over one stepper. The
/// stepper owns program representation, instruction semantics, and tag
/// matching; the host owns scheduling. Implementations are chosen at compile
/// time — the host is generic over this trait, so the per-tick step loop is
/// statically dispatched.
pub trait ExecutionStepper {
    /// Per-thread execution state (call stack, registers, whatever the
    /// program model needs). Cleared when a thread slot is reset.
    type ExecState: ExecState;

    /// Key used to look up modules by similarity.
    type Tag;

    /// The program representation this stepper runs.
    type Program;

    /// Error surfaced from a failed step. Propagated out of the tick driver
    /// unwrapped.
    type Error: std::error::Error;

    /// Return up to `max_matches` module ids whose registered tag best
    /// matches `tag`, in descending match quality. Empty if none match.
    fn find_module_match(&self, tag: &Self::Tag, max_matches: usize) -> Vec<ModuleId>;

    /// Install a call to `module` on the thread's execution state. The
    /// thread has been reset immediately beforehand.
    fn init_thread(&mut self, thread: &mut Thread<Self::ExecState>, module: ModuleId);

    /// Advance the thread's execution state by one unit of progress.
    ///
    /// Requests side effects on the host (spawns, kills, events) by
    /// returning [`StepAction`]s; a thread with nothing more to do returns
    /// [`StepAction::KillCurrent`]. Expected to return promptly — there are
    /// no suspension points inside a step.
    fn single_step(
        &mut self,
        thread_id: ThreadId,
        thread: &mut Thread<Self::ExecState>,
    ) -> Result<Vec<StepAction<Self::Tag>>, Self::Error>;

    /// Reset the stepper's internal state without touching the program.
    fn reset_hardware_state(&mut self);

    /// Load a new program, handling whatever cleanup switching requires.
    fn set_program(&mut self, program: Self::Program);

    /// The currently loaded program.
    fn program(&self) -> &Self::Program;

    /// Clear the loaded program.
    fn reset_program(&mut self);
}
