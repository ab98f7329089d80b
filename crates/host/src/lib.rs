//! Virtual hardware host for tag-based genetic programs.
//!
//! The host multiplexes many logical threads of execution over a pluggable
//! [`ExecutionStepper`](tagvm_core::ExecutionStepper). It owns the thread
//! lifecycle, priority-based admission control, event dispatch, and the
//! per-tick scheduling loop; everything about how programs execute is the
//! stepper's business.
//!
//! # Per-tick data flow
//!
//! ```text
//! tick()
//!   ├─ drain event queue (handlers may spawn pending threads)
//!   ├─ admit pending → running (evicting lower-priority actives when full)
//!   ├─ step each running thread once, in execution order
//!   └─ reap dead threads back onto the unused stack
//! ```
//!
//! Threads are cooperative and logical: exactly one OS thread drives a host,
//! and a logical thread progresses only when the tick driver reaches it.

mod admission;
mod hardware;
mod state;

pub use hardware::{DefaultComponent, Hardware, ThreadUsage};
