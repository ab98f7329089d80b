//! Identifier newtypes used throughout the virtual hardware.
//!
//! All ids are compact 32-bit indices. Wrapping them in distinct types keeps
//! thread slots, program modules, and event kinds from being confused for one
//! another at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a thread slot in the hardware's thread pool.
///
/// A thread id is the slot's index in the pool and is stable for the life of
/// the hardware: when a dead slot is handed back for reuse it keeps its id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ThreadId(pub u32);

impl ThreadId {
    /// Index of this thread's slot in the pool.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a pool index.
    ///
    /// Panics if the index does not fit in 32 bits.
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("thread pool index exceeds u32 range"))
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Identifies a module within the program loaded on an execution stepper.
///
/// Module ids are assigned by the stepper; the hardware only carries them
/// between `find_module_match` and `init_thread`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// Index of this module in the stepper's program.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a program index.
    ///
    /// Panics if the index does not fit in 32 bits.
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("module index exceeds u32 range"))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Identifies an event kind registered in an event library.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EventId(pub u32);

impl EventId {
    /// Index of this event kind in its library.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build an id from a library index.
    ///
    /// Panics if the index does not fit in 32 bits.
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("event library index exceeds u32 range"))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ev{}", self.0)
    }
}
