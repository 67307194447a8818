//! Controller configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many gates may be authorized on a region at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Concurrency {
    /// Exactly one gate (the leader) is authorized.
    #[default]
    Exclusive,
    /// Every gate whose authority matches the leader's is authorized.
    Shared,
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => f.write_str("exclusive"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Configuration for a [`crate::Controller`].
///
/// Immutable once the controller is built.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Concurrency policy applied to every region.
    pub concurrency: Concurrency,
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency policy.
    #[must_use]
    pub const fn concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Shorthand for exclusive control.
    #[must_use]
    pub const fn exclusive() -> Self {
        Self {
            concurrency: Concurrency::Exclusive,
        }
    }

    /// Shorthand for shared control.
    #[must_use]
    pub const fn shared() -> Self {
        Self {
            concurrency: Concurrency::Shared,
        }
    }
}
