//! Table state guarded by the monitor lock.
//!
//! Everything here is synchronous and lock-free by itself; the caller holds
//! the monitor's mutex for the whole duration of any method call.

use philo_core::{ActorId, ActorStatus};

/// Statuses of every seat plus the talk-channel flag.
#[derive(Debug)]
pub(crate) struct TableState {
    statuses: Vec<ActorStatus>,
    talking: bool,
}

impl TableState {
    /// Creates a table of `actors` seats, all thinking, nobody talking.
    pub(crate) fn new(actors: usize) -> Self {
        Self {
            statuses: vec![ActorStatus::Thinking; actors],
            talking: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Returns the status of a seat, or `None` if the id is out of range.
    pub(crate) fn status(&self, actor: ActorId) -> Option<ActorStatus> {
        self.statuses.get(actor.slot()).copied()
    }

    /// Overwrites the status of a seat. Out-of-range ids are ignored.
    pub(crate) fn set(&mut self, actor: ActorId, status: ActorStatus) {
        if let Some(slot) = self.statuses.get_mut(actor.slot()) {
            *slot = status;
        }
    }

    /// Promotes `actor` from `Hungry` to `Eating` if neither neighbor eats.
    ///
    /// Returns true if the promotion happened. This is the only place a seat
    /// becomes `Eating`.
    pub(crate) fn try_promote(&mut self, actor: ActorId) -> bool {
        let actors = self.len();
        let left = self.status(actor.left(actors));
        let right = self.status(actor.right(actors));
        let this = self.status(actor);

        if this == Some(ActorStatus::Hungry)
            && left != Some(ActorStatus::Eating)
            && right != Some(ActorStatus::Eating)
        {
            self.set(actor, ActorStatus::Eating);
            return true;
        }
        false
    }

    /// Puts `actor` back to thinking and gives both neighbors a chance.
    ///
    /// Returns true if either neighbor was promoted.
    pub(crate) fn release(&mut self, actor: ActorId) -> bool {
        let actors = self.len();
        self.set(actor, ActorStatus::Thinking);
        let left = self.try_promote(actor.left(actors));
        let right = self.try_promote(actor.right(actors));
        left || right
    }

    pub(crate) fn is_talking(&self) -> bool {
        self.talking
    }

    pub(crate) fn set_talking(&mut self, talking: bool) {
        self.talking = talking;
    }

    pub(crate) fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            statuses: self.statuses.clone(),
            talking: self.talking,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time copy of the table, taken under the monitor lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Status of each seat, indexed by slot
    pub statuses: Vec<ActorStatus>,
    /// Whether someone holds the talk channel
    pub talking: bool,
}

impl TableSnapshot {
    /// Returns the status of a seat.
    pub fn status(&self, actor: ActorId) -> Option<ActorStatus> {
        self.statuses.get(actor.slot()).copied()
    }

    /// Returns the seats currently eating.
    pub fn eating(&self) -> Vec<ActorId> {
        self.with_status(ActorStatus::Eating)
    }

    /// Returns the seats currently waiting for forks.
    pub fn hungry(&self) -> Vec<ActorId> {
        self.with_status(ActorStatus::Hungry)
    }

    fn with_status(&self, wanted: ActorStatus) -> Vec<ActorId> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, status)| **status == wanted)
            .map(|(slot, _)| ActorId::new(slot))
            .collect()
    }

    /// Returns the first pair of adjacent seats that are both eating.
    ///
    /// A single seat is its own neighbor and never conflicts with itself.
    pub fn adjacent_conflict(&self) -> Option<(ActorId, ActorId)> {
        let actors = self.statuses.len();
        self.eating().into_iter().find_map(|actor| {
            let right = actor.right(actors);
            let conflict = right != actor && self.status(right) == Some(ActorStatus::Eating);
            conflict.then_some((actor, right))
        })
    }
}
