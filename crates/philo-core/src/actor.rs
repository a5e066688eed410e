//! Actor identity and per-slot status.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Identity of one philosopher at the table.
///
/// Wraps the 0-based slot index used by the monitor. Everything user-facing
/// (log lines, phrases, CLI) shows the 1-based number via `Display` or
/// [`ActorId::number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(usize);

impl ActorId {
    /// Creates an id from a 0-based slot index.
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// Returns the 0-based slot index.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.0
    }

    /// Returns the 1-based external number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.0 + 1
    }

    /// Returns the neighbor to the left in a ring of `actors` seats.
    #[must_use]
    pub fn left(&self, actors: usize) -> Self {
        Self((self.0 + actors - 1) % actors)
    }

    /// Returns the neighbor to the right in a ring of `actors` seats.
    #[must_use]
    pub fn right(&self, actors: usize) -> Self {
        Self((self.0 + 1) % actors)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ============================================================================
// Actor Status (3-State Model)
// ============================================================================

/// What a philosopher is doing with respect to its two forks.
///
/// - **Thinking**: holds nothing, wants nothing
/// - **Hungry**: wants both forks, waiting in the monitor
/// - **Eating**: holds both forks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    #[default]
    Thinking,
    Hungry,
    Eating,
}

impl ActorStatus {
    /// Returns true if the actor currently holds its forks.
    #[must_use]
    pub fn is_eating(&self) -> bool {
        matches!(self, Self::Eating)
    }
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thinking => write!(f, "Thinking"),
            Self::Hungry => write!(f, "Hungry"),
            Self::Eating => write!(f, "Eating"),
        }
    }
}
