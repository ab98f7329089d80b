//! Hardware host configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from [`HostConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_active_threads` must be positive.
    #[error("max_active_threads must be positive")]
    ZeroActiveThreads,

    /// `max_thread_space` must be positive.
    #[error("max_thread_space must be positive")]
    ZeroThreadSpace,

    /// The pool bound must leave room for every admissible thread.
    #[error("max_thread_space ({space}) must be at least max_active_threads ({active})")]
    ThreadSpaceBelowActive { space: usize, active: usize },
}

/// Configuration for a hardware host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Upper bound on concurrently running threads.
    pub max_active_threads: usize,

    /// Upper bound on the thread pool: active + pending + unused slots.
    pub max_thread_space: usize,

    /// When false, admission is FIFO: spare capacity is filled in arrival
    /// order and no running thread is ever evicted.
    pub use_thread_priority: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_active_threads: 64,
            max_thread_space: 512,
            use_thread_priority: true,
        }
    }
}

impl HostConfig {
    /// Check the configuration's internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_threads == 0 {
            return Err(ConfigError::ZeroActiveThreads);
        }
        if self.max_thread_space == 0 {
            return Err(ConfigError::ZeroThreadSpace);
        }
        if self.max_thread_space < self.max_active_threads {
            return Err(ConfigError::ThreadSpaceBelowActive {
                space: self.max_thread_space,
                active: self.max_active_threads,
            });
        }
        Ok(())
    }

    /// Initial thread pool length: twice the active limit, capped by the
    /// total thread space. The pool grows on demand up to `max_thread_space`.
    pub fn initial_pool_size(&self) -> usize {
        (2 * self.max_active_threads).min(self.max_thread_space)
    }
}
