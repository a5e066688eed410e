//! Shared monitor arbitrating forks and the talk channel.
//!
//! The monitor is the single owner of the table state. Every worker holds an
//! `Arc<SharedMonitor>` and goes through its entry points; nothing else can
//! reach the statuses or the talk flag.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  acquire/release   ┌──────────────────────────────┐
//! │ Worker 1 │───────────────────▶│        SharedMonitor         │
//! └──────────┘                    │                              │
//! ┌──────────┐  talk request/end  │  Mutex<TableState>           │
//! │ Worker 2 │───────────────────▶│    statuses: [Thinking; N]   │
//! └──────────┘                    │    talking: bool             │
//!      ⋮                          │                              │
//! ┌──────────┐     wake-ups       │  Notify (broadcast)          │
//! │ Worker N │◀───────────────────│                              │
//! └──────────┘                    └──────────────────────────────┘
//! ```
//!
//! # Locking discipline
//!
//! One `std::sync::Mutex` guards all state. It is taken only inside
//! synchronous helpers and is never held across an `.await`. A waiter
//! creates its `Notified` future while still holding the lock, and every
//! broadcast happens under the lock, so a wake-up can never slip between a
//! failed check and the wait.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A poisoned lock is recovered; table updates never leave it half-written

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use philo_core::{ActorId, ActorStatus, ConfigError, MonitorError, MonitorResult};

mod table;

use table::TableState;
pub use table::TableSnapshot;

// ============================================================================
// Shared Monitor
// ============================================================================

/// Arbiter for the forks and the talk channel.
///
/// # Deadlock freedom
///
/// A seat goes from `Hungry` to `Eating` in one step that takes both forks at
/// once, and only when neither neighbor eats. Nobody ever holds one fork
/// while waiting for the other, so the circular wait of the naive solution
/// cannot form.
///
/// # Wake-ups
///
/// Every state change that could satisfy a waiter wakes all waiters. Each one
/// re-checks its own condition and goes back to sleep if it still cannot
/// proceed.
#[derive(Debug)]
pub struct SharedMonitor {
    table: Mutex<TableState>,
    changed: Notify,
    actors: usize,
}

impl SharedMonitor {
    /// Creates a monitor for a table of `actors` seats.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFieldValue` if `actors` is 0.
    pub fn new(actors: usize) -> Result<Self, ConfigError> {
        if actors == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "actors",
                value: actors.to_string(),
                expected: "at least 1",
            });
        }
        Ok(Self {
            table: Mutex::new(TableState::new(actors)),
            changed: Notify::new(),
            actors,
        })
    }

    /// Returns the number of seats.
    pub fn actor_count(&self) -> usize {
        self.actors
    }

    /// Waits until `actor` holds both of its forks.
    ///
    /// Marks the seat `Hungry`, then loops: try to promote, and if that fails
    /// sleep until the next broadcast. Returns once the seat is `Eating`.
    ///
    /// # Errors
    ///
    /// - `MonitorError::InvalidActorId` if the id has no seat; nothing changes
    /// - `MonitorError::Cancelled` if `cancel` fires while blocked; the seat
    ///   is back to `Thinking` and holds no forks
    ///
    /// Dropping the future before it completes rolls the seat back the same
    /// way.
    pub async fn acquire_resources(
        &self,
        actor: ActorId,
        cancel: &CancellationToken,
    ) -> MonitorResult<()> {
        self.check(actor)?;

        let mut wait = self.become_hungry(actor);
        let guard = HungerGuard::new(self, actor);
        while let Some(notified) = wait {
            trace!(actor = %actor, "Waiting for forks");
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Err(MonitorError::Cancelled { actor: Some(actor) });
                }

                _ = notified => {}
            }
            wait = self.attempt_promotion(actor);
        }
        guard.disarm();

        debug!(actor = %actor, "Forks acquired");
        Ok(())
    }

    /// Puts both forks of `actor` down.
    ///
    /// The seat becomes `Thinking` whatever its previous status, then the left
    /// and right neighbors (in that order) are promoted if they are hungry and
    /// can now eat. All waiters are woken afterwards.
    ///
    /// # Errors
    ///
    /// `MonitorError::InvalidActorId` if the id has no seat.
    pub fn release_resources(&self, actor: ActorId) -> MonitorResult<()> {
        self.check(actor)?;

        let mut table = self.lock();
        let promoted = table.release(actor);
        self.changed.notify_waiters();
        debug_assert!(table.snapshot().adjacent_conflict().is_none());

        debug!(actor = %actor, promoted_neighbor = promoted, "Forks released");
        Ok(())
    }

    /// Waits until the talk channel is free, then takes it.
    ///
    /// The check and the claim happen under one lock, so two callers can never
    /// both see the channel free.
    ///
    /// # Errors
    ///
    /// `MonitorError::Cancelled` if `cancel` fires while blocked. The channel
    /// is left as it was.
    pub async fn request_talk_channel(&self, cancel: &CancellationToken) -> MonitorResult<()> {
        let mut wait = self.attempt_talk();
        while let Some(notified) = wait {
            trace!("Waiting for the talk channel");
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Talk request cancelled");
                    return Err(MonitorError::Cancelled { actor: None });
                }

                _ = notified => {}
            }
            wait = self.attempt_talk();
        }
        Ok(())
    }

    /// Frees the talk channel and wakes all waiters.
    pub fn release_talk_channel(&self) {
        let mut table = self.lock();
        table.set_talking(false);
        self.changed.notify_waiters();
    }

    /// Returns the current status of one seat.
    ///
    /// # Errors
    ///
    /// `MonitorError::InvalidActorId` if the id has no seat.
    pub fn status(&self, actor: ActorId) -> MonitorResult<ActorStatus> {
        self.lock()
            .status(actor)
            .ok_or(MonitorError::InvalidActorId {
                actor,
                actors: self.actors,
            })
    }

    /// Returns true if someone holds the talk channel.
    pub fn is_talking(&self) -> bool {
        self.lock().is_talking()
    }

    /// Takes a consistent copy of the whole table.
    pub fn snapshot(&self) -> TableSnapshot {
        self.lock().snapshot()
    }

    // ========================================================================
    // Helpers (all run under the lock)
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, actor: ActorId) -> MonitorResult<()> {
        if actor.slot() < self.actors {
            Ok(())
        } else {
            Err(MonitorError::InvalidActorId {
                actor,
                actors: self.actors,
            })
        }
    }

    /// Marks the seat hungry and makes the first promotion attempt.
    fn become_hungry(&self, actor: ActorId) -> Option<Notified<'_>> {
        let mut table = self.lock();
        table.set(actor, ActorStatus::Hungry);
        trace!(actor = %actor, "Hungry");
        self.promote_or_wait(&mut table, actor)
    }

    fn attempt_promotion(&self, actor: ActorId) -> Option<Notified<'_>> {
        let mut table = self.lock();
        self.promote_or_wait(&mut table, actor)
    }

    /// Returns `None` once the seat eats, or the future for the next wake-up.
    fn promote_or_wait(&self, table: &mut TableState, actor: ActorId) -> Option<Notified<'_>> {
        if table.try_promote(actor) {
            self.changed.notify_waiters();
            debug_assert!(table.snapshot().adjacent_conflict().is_none());
        }
        match table.status(actor) {
            Some(ActorStatus::Eating) => None,
            _ => Some(self.changed.notified()),
        }
    }

    /// Rolls a cancelled acquisition back to `Thinking`.
    ///
    /// A neighbor's release may have promoted the seat just as the
    /// cancellation landed; in that case the forks are put down again so the
    /// neighbors are not starved by a seat that will never release.
    fn abandon_hunger(&self, actor: ActorId) {
        let mut table = self.lock();
        match table.status(actor) {
            Some(ActorStatus::Eating) => {
                table.release(actor);
                self.changed.notify_waiters();
                warn!(actor = %actor, "Cancelled after promotion, forks returned");
            }
            _ => {
                table.set(actor, ActorStatus::Thinking);
                debug!(actor = %actor, "Cancelled while hungry");
            }
        }
    }

    /// Claims the talk channel if free, else returns the wake-up future.
    fn attempt_talk(&self) -> Option<Notified<'_>> {
        let mut table = self.lock();
        if table.is_talking() {
            Some(self.changed.notified())
        } else {
            table.set_talking(true);
            None
        }
    }
}

// ============================================================================
// Hunger Guard
// ============================================================================

/// Rolls an unfinished acquisition back when dropped.
///
/// Armed once the seat is `Hungry`; only a completed acquire disarms it.
struct HungerGuard<'a> {
    monitor: &'a SharedMonitor,
    actor: ActorId,
    armed: bool,
}

impl<'a> HungerGuard<'a> {
    fn new(monitor: &'a SharedMonitor, actor: ActorId) -> Self {
        Self {
            monitor,
            actor,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for HungerGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.monitor.abandon_hunger(self.actor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn id(slot: usize) -> ActorId {
        ActorId::new(slot)
    }

    #[test]
    fn test_zero_seats_rejected() {
        assert!(matches!(
            SharedMonitor::new(0),
            Err(ConfigError::InvalidFieldValue { field: "actors", .. })
        ));
    }

    #[tokio::test]
    async fn test_uncontended_acquire_returns_immediately() {
        let monitor = SharedMonitor::new(5).unwrap();
        let cancel = CancellationToken::new();

        monitor.acquire_resources(id(0), &cancel).await.unwrap();
        assert_eq!(monitor.status(id(0)).unwrap(), ActorStatus::Eating);

        monitor.release_resources(id(0)).unwrap();
        assert_eq!(monitor.status(id(0)).unwrap(), ActorStatus::Thinking);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_does_not_block_free_forks() {
        // Cancellation only matters while blocked
        let monitor = SharedMonitor::new(3).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        monitor.acquire_resources(id(1), &cancel).await.unwrap();
        assert_eq!(monitor.status(id(1)).unwrap(), ActorStatus::Eating);
    }

    #[tokio::test]
    async fn test_invalid_id_has_no_side_effects() {
        let monitor = SharedMonitor::new(5).unwrap();
        let cancel = CancellationToken::new();
        let before = monitor.snapshot();

        let err = monitor.acquire_resources(id(5), &cancel).await.unwrap_err();
        assert_eq!(
            err,
            MonitorError::InvalidActorId {
                actor: id(5),
                actors: 5
            }
        );
        assert!(monitor.release_resources(id(7)).is_err());
        assert!(monitor.status(id(5)).is_err());
        assert_eq!(monitor.snapshot(), before);
    }

    #[tokio::test]
    async fn test_blocked_neighbor_promoted_on_release() {
        let monitor = Arc::new(SharedMonitor::new(5).unwrap());
        let cancel = CancellationToken::new();
        monitor.acquire_resources(id(0), &cancel).await.unwrap();

        let waiter = {
            let monitor = Arc::clone(&monitor);
            let cancel = cancel.clone();
            tokio::spawn(async move { monitor.acquire_resources(id(1), &cancel).await })
        };

        // Let the waiter reach its wait
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(monitor.status(id(1)).unwrap(), ActorStatus::Hungry);
        assert!(!waiter.is_finished());

        monitor.release_resources(id(0)).unwrap();
        timeout(WAIT, waiter).await.unwrap().unwrap().unwrap();
        assert_eq!(monitor.status(id(1)).unwrap(), ActorStatus::Eating);
    }

    #[tokio::test]
    async fn test_release_from_hungry_still_thinking() {
        let monitor = SharedMonitor::new(3).unwrap();
        let cancel = CancellationToken::new();
        monitor.acquire_resources(id(0), &cancel).await.unwrap();
        monitor.release_resources(id(0)).unwrap();
        monitor.release_resources(id(0)).unwrap();
        assert_eq!(monitor.status(id(0)).unwrap(), ActorStatus::Thinking);
    }

    #[tokio::test]
    async fn test_talk_channel_claim_and_release() {
        let monitor = SharedMonitor::new(2).unwrap();
        let cancel = CancellationToken::new();

        assert!(!monitor.is_talking());
        monitor.request_talk_channel(&cancel).await.unwrap();
        assert!(monitor.is_talking());
        monitor.release_talk_channel();
        assert!(!monitor.is_talking());
    }
}
