//! Reference execution stepper for the tagvm hardware host.
//!
//! Programs are lists of [`ScriptedModule`]s: a 64-bit tag plus a script of
//! [`Op`]s, one op per step. Tag matching ranks modules by Hamming
//! closeness. This is deliberately the smallest backend that exercises the
//! whole stepper contract — real program models plug in the same way.

use tagvm_core::{BaseEvent, ExecutionStepper, StepAction};
use tagvm_types::{EventId, ExecState, ModuleId, Priority, Thread, ThreadId};
use thiserror::Error;
use tracing::trace;

/// One scripted instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Burn one step.
    Work,
    /// Spawn the closest tag match at the given priority.
    SpawnTag { tag: u64, priority: Priority },
    /// Spawn a specific module at the given priority.
    SpawnModule { module: ModuleId, priority: Priority },
    /// Queue a [`BaseEvent`] of the given kind for the next tick.
    Emit(EventId),
    /// Trigger a [`BaseEvent`] of the given kind outward.
    Trigger(EventId),
    /// Handle a [`BaseEvent`] of the given kind synchronously.
    Handle(EventId),
    /// Kill an arbitrary thread.
    Kill(ThreadId),
    /// Finish this thread.
    Halt,
    /// Abort the step with an error.
    Fail(&'static str),
}

/// A tagged, scripted module.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedModule {
    /// Bit-vector tag this module is matched by.
    pub tag: u64,
    /// The script. Running past the end behaves as [`Op::Halt`].
    pub ops: Vec<Op>,
}

impl ScriptedModule {
    pub fn new(tag: u64, ops: Vec<Op>) -> Self {
        Self { tag, ops }
    }

    /// A module that works for `steps` steps, then halts.
    pub fn busy(tag: u64, steps: usize) -> Self {
        Self::new(tag, vec![Op::Work; steps])
    }
}

/// Per-thread execution state: the installed module and a program counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedState {
    module: Option<ModuleId>,
    pc: usize,
    steps_executed: u64,
}

impl ScriptedState {
    /// The module installed on this thread, if any.
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }

    /// Offset of the next op to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Steps this thread has executed since its last reset.
    pub fn steps_executed(&self) -> u64 {
        self.steps_executed
    }
}

impl ExecState for ScriptedState {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Error surfaced by a scripted [`Op::Fail`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("scripted step failed: {0}")]
pub struct StepError(pub &'static str);

/// The reference stepper.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStepper {
    program: Vec<ScriptedModule>,
    steps_total: u64,
}

impl ScriptedStepper {
    pub fn new(program: Vec<ScriptedModule>) -> Self {
        Self {
            program,
            steps_total: 0,
        }
    }

    /// Steps executed across all threads since the last hardware reset.
    pub fn steps_total(&self) -> u64 {
        self.steps_total
    }
}

impl ExecutionStepper for ScriptedStepper {
    type ExecState = ScriptedState;
    type Tag = u64;
    type Program = Vec<ScriptedModule>;
    type Error = StepError;

    fn find_module_match(&self, tag: &u64, max_matches: usize) -> Vec<ModuleId> {
        let mut scored: Vec<(u32, ModuleId)> = self
            .program
            .iter()
            .enumerate()
            .map(|(index, module)| ((tag ^ module.tag).count_ones(), ModuleId::from_index(index)))
            .collect();
        // Ascending Hamming distance, ties to the lower module id.
        scored.sort();
        scored
            .into_iter()
            .take(max_matches)
            .map(|(_, id)| id)
            .collect()
    }

    fn init_thread(&mut self, thread: &mut Thread<ScriptedState>, module: ModuleId) {
        let state = thread.exec_state_mut();
        state.module = Some(module);
        state.pc = 0;
    }

    fn single_step(
        &mut self,
        thread_id: ThreadId,
        thread: &mut Thread<ScriptedState>,
    ) -> Result<Vec<StepAction<u64>>, StepError> {
        let state = thread.exec_state_mut();
        let Some(module_id) = state.module else {
            // Nothing installed; nothing to do.
            return Ok(vec![StepAction::KillCurrent]);
        };
        let op = self.program[module_id.index()]
            .ops
            .get(state.pc)
            .cloned()
            .unwrap_or(Op::Halt);
        state.pc += 1;
        state.steps_executed += 1;
        self.steps_total += 1;
        trace!(thread = %thread_id, module = %module_id, ?op, "step");

        Ok(match op {
            Op::Work => vec![],
            Op::SpawnTag { tag, priority } => vec![StepAction::SpawnWithTag { tag, priority }],
            Op::SpawnModule { module, priority } => {
                vec![StepAction::SpawnWithModule { module, priority }]
            }
            Op::Emit(id) => vec![StepAction::EnqueueEvent(Box::new(BaseEvent::new(id)))],
            Op::Trigger(id) => vec![StepAction::TriggerEvent(Box::new(BaseEvent::new(id)))],
            Op::Handle(id) => vec![StepAction::HandleEvent(Box::new(BaseEvent::new(id)))],
            Op::Kill(id) => vec![StepAction::Kill(id)],
            Op::Halt => vec![StepAction::KillCurrent],
            Op::Fail(message) => return Err(StepError(message)),
        })
    }

    fn reset_hardware_state(&mut self) {
        self.steps_total = 0;
    }

    fn set_program(&mut self, program: Vec<ScriptedModule>) {
        self.reset_hardware_state();
        self.program = program;
    }

    fn program(&self) -> &Vec<ScriptedModule> {
        &self.program
    }

    fn reset_program(&mut self) {
        self.program.clear();
    }
}
