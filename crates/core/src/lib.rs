//! Seam layer for the tagvm virtual hardware.
//!
//! This crate defines the two interfaces the hardware host is parameterised
//! over:
//!
//! - [`ExecutionStepper`]: the pluggable program executor. The hardware knows
//!   nothing about program representation or instruction semantics; it hands
//!   each running thread to the stepper once per tick.
//! - [`EventLibrary`]: the registry resolving event kinds to handlers and
//!   trigger dispatchers.
//!
//! # Architecture
//!
//! The stepper is driven on a simple command model:
//!
//! ```text
//! tick → single_step(thread) → StepActions → applied by the tick driver
//! ```
//!
//! A step is:
//! - **Synchronous**: no async, no suspension points
//! - **Prompt**: one unit of progress, then return
//! - **Pure-ish**: mutates the thread's execution state, requests everything
//!   else (spawns, kills, events) as [`StepAction`] commands
//!
//! The tick driver applies the returned actions immediately after the step
//! returns, before any other thread runs: kills take effect at once for
//! scheduling purposes, and spawned threads enter the pending queue to be
//! admitted no earlier than the next tick.

mod event;
mod library;
mod stepper;

pub use event::{BaseEvent, Event};
pub use library::{DispatchFn, EventLibrary, HandlerFn, RegistryError};
pub use stepper::{ExecutionStepper, StepAction};

// The execution-state bound lives with the thread record in the foundation
// crate; re-exported here because it is part of the stepper seam.
pub use tagvm_types::ExecState;
