//! Foundation types for the tagvm virtual hardware.
//!
//! This crate provides the types shared by every layer of the hardware:
//!
//! - **Identifiers**: [`ThreadId`], [`ModuleId`], [`EventId`]
//! - **Scheduling**: [`Priority`], [`RunState`]
//! - **Thread records**: [`Thread`], [`ExecState`]
//! - **Configuration**: [`HostConfig`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod config;
mod identifiers;
mod priority;
mod thread;

pub use config::{ConfigError, HostConfig};
pub use identifiers::{EventId, ModuleId, ThreadId};
pub use priority::Priority;
pub use thread::{ExecState, RunState, Thread};
