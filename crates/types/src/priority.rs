//! Thread scheduling priority.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Scheduling priority of a thread. Higher values win admission.
///
/// Wraps `f64` with a total order (via [`f64::total_cmp`]) so priorities can
/// key ordered containers such as the admission controller's eviction heap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Priority(pub f64);

impl Priority {
    /// Priority assigned to threads that do not request one.
    pub const DEFAULT: Priority = Priority(1.0);

    /// The raw priority value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<f64> for Priority {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
