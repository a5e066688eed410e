//! Per-philosopher driver loop.
//!
//! A worker runs a fixed number of cycles:
//!
//! ```text
//! acquire forks → eat → release forks → think → [talk request → talk → talk release]
//! ```
//!
//! Every transition is reported to the [`EventSink`]. Delays are random in
//! `[0, max_delay]` and exist only to shake out different interleavings.
//!
//! Cancellation is honored both while blocked in the monitor and while
//! sleeping. A worker interrupted while holding forks or the talk channel
//! gives them back before it stops, and always ends with a [`WorkerOutcome`]
//! rather than taking the process down.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use philo_core::phrases::{self, PHRASE_COUNT};
use philo_core::{ActorId, EventKind, MonitorError, MonitorResult, SimulationConfig};

use crate::monitor::SharedMonitor;
use crate::sink::EventSink;

// ============================================================================
// Settings
// ============================================================================

/// Knobs of the driver loop shared by every worker of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSettings {
    /// Eat/think cycles to run before leaving
    pub cycles: u32,
    /// Upper bound for each simulated activity
    pub max_delay: Duration,
    /// Chance in [0, 1] of talking after thinking
    pub talk_probability: f64,
}

impl WorkerSettings {
    pub fn new(cycles: u32, max_delay: Duration, talk_probability: f64) -> Self {
        Self {
            cycles,
            max_delay,
            talk_probability,
        }
    }
}

impl From<&SimulationConfig> for WorkerSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self::new(config.cycles, config.max_delay(), config.talk_probability)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// How a worker's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    /// All cycles done
    Completed,
    /// Stopped early because its cancellation token fired
    Cancelled,
    /// Stopped early on a monitor error other than cancellation
    Failed(MonitorError),
    /// The worker task panicked (filled in by the supervisor)
    Panicked(String),
}

impl WorkerStatus {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// What one worker reports back to its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub actor: ActorId,
    pub cycles_completed: u32,
    pub talks: u32,
    pub status: WorkerStatus,
}

impl WorkerOutcome {
    fn new(actor: ActorId) -> Self {
        Self {
            actor,
            cycles_completed: 0,
            talks: 0,
            status: WorkerStatus::Completed,
        }
    }

    /// Outcome for a worker task that panicked before reporting.
    pub fn panicked(actor: ActorId, reason: impl Into<String>) -> Self {
        Self {
            status: WorkerStatus::Panicked(reason.into()),
            ..Self::new(actor)
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Drives one philosopher through its cycles.
pub struct Worker {
    id: ActorId,
    monitor: Arc<SharedMonitor>,
    sink: EventSink,
    settings: WorkerSettings,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: ActorId,
        monitor: Arc<SharedMonitor>,
        sink: EventSink,
        settings: WorkerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            monitor,
            sink,
            settings,
            cancel,
        }
    }

    /// Runs every cycle, stopping early on cancellation or error.
    ///
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(self) -> WorkerOutcome {
        let mut outcome = WorkerOutcome::new(self.id);
        info!(actor = %self.id, cycles = self.settings.cycles, "Philosopher sits down");

        for _ in 0..self.settings.cycles {
            match self.cycle(&mut outcome.talks).await {
                Ok(()) => outcome.cycles_completed += 1,
                Err(err) if err.is_cancelled() => {
                    warn!(
                        actor = %self.id,
                        cycles_completed = outcome.cycles_completed,
                        "Philosopher interrupted"
                    );
                    self.sink.emit(self.id, EventKind::Cancelled);
                    outcome.status = WorkerStatus::Cancelled;
                    return outcome;
                }
                Err(err) => {
                    error!(actor = %self.id, error = %err, "Philosopher failed");
                    outcome.status = WorkerStatus::Failed(err);
                    return outcome;
                }
            }
        }

        self.sink.emit(
            self.id,
            EventKind::Finished {
                cycles: outcome.cycles_completed,
            },
        );
        info!(
            actor = %self.id,
            cycles = outcome.cycles_completed,
            talks = outcome.talks,
            "Philosopher leaves the table"
        );
        outcome
    }

    async fn cycle(&self, talks: &mut u32) -> MonitorResult<()> {
        self.monitor.acquire_resources(self.id, &self.cancel).await?;
        let eaten = self.eat().await;
        // Forks go back even if eating was interrupted
        self.monitor.release_resources(self.id)?;
        eaten?;

        self.think().await?;

        if self.wants_to_talk() {
            self.monitor.request_talk_channel(&self.cancel).await?;
            let talked = self.talk().await;
            self.monitor.release_talk_channel();
            talked?;
            *talks += 1;
        }

        tokio::task::yield_now().await;
        Ok(())
    }

    // Each "done" event goes out before the matching monitor release, even
    // when the pause was interrupted.

    async fn eat(&self) -> MonitorResult<()> {
        self.sink.emit(self.id, EventKind::StartedEating);
        let paused = self.pause().await;
        self.sink.emit(self.id, EventKind::DoneEating);
        paused
    }

    async fn think(&self) -> MonitorResult<()> {
        self.sink.emit(self.id, EventKind::StartedThinking);
        let paused = self.pause().await;
        self.sink.emit(self.id, EventKind::DoneThinking);
        paused
    }

    async fn talk(&self) -> MonitorResult<()> {
        self.sink.emit(self.id, EventKind::StartedTalking);
        tokio::task::yield_now().await;
        self.sink.emit(self.id, EventKind::Said(self.pick_phrase()));
        let paused = self.pause().await;
        self.sink.emit(self.id, EventKind::DoneTalking);
        paused
    }

    /// Sleeps for a random delay, yielding on both sides.
    async fn pause(&self) -> MonitorResult<()> {
        let delay = self.random_delay();
        tokio::task::yield_now().await;
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                return Err(MonitorError::Cancelled { actor: Some(self.id) });
            }

            _ = sleep(delay) => {}
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    fn random_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.settings.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    fn wants_to_talk(&self) -> bool {
        let p = self.settings.talk_probability;
        (0.0..=1.0).contains(&p) && rand::rng().random_bool(p)
    }

    fn pick_phrase(&self) -> String {
        phrases::phrase(rand::rng().random_range(0..PHRASE_COUNT), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::EventReceiver;
    use philo_core::DiningEvent;

    fn quick(cycles: u32, talk_probability: f64) -> WorkerSettings {
        WorkerSettings::new(cycles, Duration::from_millis(2), talk_probability)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<DiningEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_settings_from_config() {
        let config = SimulationConfig::default();
        let settings = WorkerSettings::from(&config);
        assert_eq!(settings.cycles, 10);
        assert_eq!(settings.max_delay, Duration::from_millis(1000));
        assert_eq!(settings.talk_probability, 0.5);
    }

    #[tokio::test]
    async fn test_single_worker_runs_all_cycles() {
        let monitor = Arc::new(SharedMonitor::new(1).unwrap());
        let (sink, mut rx) = EventSink::channel();
        let worker = Worker::new(
            ActorId::new(0),
            Arc::clone(&monitor),
            sink,
            quick(3, 0.0),
            CancellationToken::new(),
        );

        let outcome = worker.run().await;
        assert_eq!(outcome.status, WorkerStatus::Completed);
        assert_eq!(outcome.cycles_completed, 3);
        assert_eq!(outcome.talks, 0);

        let kinds: Vec<EventKind> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        let mut expected = Vec::new();
        for _ in 0..3 {
            expected.extend([
                EventKind::StartedEating,
                EventKind::DoneEating,
                EventKind::StartedThinking,
                EventKind::DoneThinking,
            ]);
        }
        expected.push(EventKind::Finished { cycles: 3 });
        assert_eq!(kinds, expected);
        assert_eq!(monitor.status(ActorId::new(0)).unwrap(), philo_core::ActorStatus::Thinking);
    }

    #[tokio::test]
    async fn test_always_talking_worker() {
        let monitor = Arc::new(SharedMonitor::new(1).unwrap());
        let (sink, mut rx) = EventSink::channel();
        let worker = Worker::new(
            ActorId::new(0),
            Arc::clone(&monitor),
            sink,
            quick(2, 1.0),
            CancellationToken::new(),
        );

        let outcome = worker.run().await;
        assert_eq!(outcome.talks, 2);
        assert!(!monitor.is_talking());

        let events = drain(&mut rx);
        let said = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Said(_)))
            .count();
        assert_eq!(said, 2);
    }

    #[tokio::test]
    async fn test_cancelled_worker_returns_forks() {
        let monitor = Arc::new(SharedMonitor::new(3).unwrap());
        let cancel = CancellationToken::new();
        let (sink, mut rx) = EventSink::channel();
        let worker = Worker::new(
            ActorId::new(0),
            Arc::clone(&monitor),
            sink,
            WorkerSettings::new(5, Duration::from_secs(3600), 0.0),
            cancel.clone(),
        );

        let task = tokio::spawn(worker.run());
        // Wait until the worker is eating (its first sleep is an hour long)
        for _ in 0..100 {
            if monitor.status(ActorId::new(0)).unwrap().is_eating() {
                break;
            }
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        let outcome = task.await.unwrap();
        assert_eq!(outcome.status, WorkerStatus::Cancelled);
        assert_eq!(outcome.cycles_completed, 0);
        assert_eq!(
            monitor.status(ActorId::new(0)).unwrap(),
            philo_core::ActorStatus::Thinking
        );

        let kinds: Vec<EventKind> = drain(&mut rx).into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::StartedEating,
                EventKind::DoneEating,
                EventKind::Cancelled
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_seat_fails_without_retry() {
        let monitor = Arc::new(SharedMonitor::new(2).unwrap());
        let worker = Worker::new(
            ActorId::new(4),
            monitor,
            EventSink::disabled(),
            quick(3, 0.0),
            CancellationToken::new(),
        );

        let outcome = worker.run().await;
        assert!(matches!(
            outcome.status,
            WorkerStatus::Failed(MonitorError::InvalidActorId { .. })
        ));
        assert_eq!(outcome.cycles_completed, 0);
    }

    #[test]
    fn test_out_of_range_probability_never_talks() {
        let monitor = Arc::new(SharedMonitor::new(1).unwrap());
        let worker = Worker::new(
            ActorId::new(0),
            monitor,
            EventSink::disabled(),
            quick(1, 2.0),
            CancellationToken::new(),
        );
        assert!(!worker.wants_to_talk());
    }

    #[test]
    fn test_panicked_outcome() {
        let outcome = WorkerOutcome::panicked(ActorId::new(2), "boom");
        assert_eq!(outcome.status, WorkerStatus::Panicked("boom".to_string()));
        assert!(!outcome.status.is_completed());
    }
}
