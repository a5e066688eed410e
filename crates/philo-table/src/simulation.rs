//! Supervisor for one simulation run.
//!
//! Builds the shared monitor, spawns one worker task per seat, and gathers
//! each worker's [`WorkerOutcome`] into a [`SimulationReport`]. A worker that
//! stops early never takes the process down; the [`FailurePolicy`] decides
//! whether the rest of the table keeps going.
//!
//! # Cancellation tree
//!
//! ```text
//! root token (shutdown / StopAll)
//!   ├── seat 1 token
//!   ├── seat 2 token
//!   └── ...
//! ```
//!
//! Cancelling one seat token stops only that worker; cancelling the root
//! stops everybody.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use philo_core::{ActorId, ConfigError, FailurePolicy, SimulationConfig};

use crate::monitor::SharedMonitor;
use crate::sink::EventSink;
use crate::worker::{Worker, WorkerOutcome, WorkerSettings, WorkerStatus};

// ============================================================================
// Simulation
// ============================================================================

/// A validated simulation, ready to be spawned.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
}

impl Simulation {
    /// Validates `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns the validation error for malformed parameters (e.g. no seats).
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seats everyone and starts the workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        &self,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<RunningSimulation, ConfigError> {
        let monitor = Arc::new(SharedMonitor::new(self.config.actors)?);
        let settings = WorkerSettings::from(&self.config);

        let mut tasks = JoinSet::new();
        let mut seat_tokens = Vec::with_capacity(self.config.actors);
        for slot in 0..self.config.actors {
            let id = ActorId::new(slot);
            let token = cancel.child_token();
            let worker = Worker::new(
                id,
                Arc::clone(&monitor),
                sink.clone(),
                settings,
                token.clone(),
            );
            tasks.spawn(worker.run());
            seat_tokens.push(token);
        }

        info!(
            actors = self.config.actors,
            cycles = self.config.cycles,
            max_delay_ms = self.config.max_delay_ms,
            talk_probability = self.config.talk_probability,
            policy = ?self.config.failure_policy,
            "Simulation started"
        );

        Ok(RunningSimulation {
            monitor,
            tasks,
            seat_tokens,
            root: cancel,
            policy: self.config.failure_policy,
            started: Instant::now(),
        })
    }

    /// Spawns the run and waits for every worker to finish.
    pub async fn run(
        &self,
        sink: EventSink,
        cancel: CancellationToken,
    ) -> Result<SimulationReport, ConfigError> {
        Ok(self.spawn(sink, cancel)?.wait().await)
    }
}

// ============================================================================
// Running Simulation
// ============================================================================

/// Handle to a simulation whose workers are running.
///
/// Dropping it aborts any worker still running.
pub struct RunningSimulation {
    monitor: Arc<SharedMonitor>,
    tasks: JoinSet<WorkerOutcome>,
    seat_tokens: Vec<CancellationToken>,
    root: CancellationToken,
    policy: FailurePolicy,
    started: Instant,
}

impl RunningSimulation {
    /// The monitor shared by all workers of this run.
    pub fn monitor(&self) -> &Arc<SharedMonitor> {
        &self.monitor
    }

    /// Interrupts a single philosopher.
    ///
    /// Returns false if the id has no seat.
    pub fn cancel_actor(&self, actor: ActorId) -> bool {
        match self.seat_tokens.get(actor.slot()) {
            Some(token) => {
                info!(actor = %actor, "Cancelling philosopher");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Interrupts every philosopher.
    pub fn shutdown(&self) {
        info!("Shutting down the table");
        self.root.cancel();
    }

    /// Waits for all workers and collects their outcomes.
    pub async fn wait(mut self) -> SimulationReport {
        let mut outcomes: Vec<Option<WorkerOutcome>> = vec![None; self.seat_tokens.len()];

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    if !outcome.status.is_completed() {
                        self.apply_policy(outcome.actor, &outcome.status);
                    }
                    if let Some(entry) = outcomes.get_mut(outcome.actor.slot()) {
                        *entry = Some(outcome);
                    }
                }
                Err(err) => self.handle_join_error(err),
            }
        }

        let outcomes = outcomes
            .into_iter()
            .enumerate()
            .map(|(slot, outcome)| {
                outcome.unwrap_or_else(|| {
                    WorkerOutcome::panicked(ActorId::new(slot), "worker task panicked")
                })
            })
            .collect();

        let report = SimulationReport {
            outcomes,
            elapsed: self.started.elapsed(),
        };
        info!(
            completed = report.completed(),
            actors = report.outcomes.len(),
            cycles = report.total_cycles(),
            talks = report.total_talks(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "All philosophers have left"
        );
        report
    }

    fn apply_policy(&self, actor: ActorId, status: &WorkerStatus) {
        if self.policy == FailurePolicy::StopAll && !self.root.is_cancelled() {
            warn!(actor = %actor, ?status, "Philosopher stopped early, stopping the table");
            self.root.cancel();
        }
    }

    fn handle_join_error(&self, err: JoinError) {
        if err.is_panic() {
            let panic = err.into_panic();
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(reason = %reason, "Worker task panicked");
            if self.policy == FailurePolicy::StopAll {
                self.root.cancel();
            }
        } else {
            warn!(error = %err, "Worker task ended without an outcome");
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Per-seat outcomes of a finished run, ordered by seat.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub outcomes: Vec<WorkerOutcome>,
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Number of philosophers that finished all their cycles.
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_completed())
            .count()
    }

    pub fn all_completed(&self) -> bool {
        self.completed() == self.outcomes.len()
    }

    pub fn total_cycles(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| u64::from(o.cycles_completed))
            .sum()
    }

    pub fn total_talks(&self) -> u64 {
        self.outcomes.iter().map(|o| u64::from(o.talks)).sum()
    }

    /// Outcome of one seat.
    pub fn outcome(&self, actor: ActorId) -> Option<&WorkerOutcome> {
        self.outcomes.get(actor.slot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: &[WorkerStatus]) -> SimulationReport {
        SimulationReport {
            outcomes: statuses
                .iter()
                .enumerate()
                .map(|(slot, status)| WorkerOutcome {
                    actor: ActorId::new(slot),
                    cycles_completed: 2,
                    talks: 1,
                    status: status.clone(),
                })
                .collect(),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_new_rejects_empty_table() {
        let err = Simulation::new(SimulationConfig::with_actors(0)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFieldValue { .. }));
    }

    #[test]
    fn test_report_totals() {
        let report = report(&[
            WorkerStatus::Completed,
            WorkerStatus::Cancelled,
            WorkerStatus::Completed,
        ]);
        assert_eq!(report.completed(), 2);
        assert!(!report.all_completed());
        assert_eq!(report.total_cycles(), 6);
        assert_eq!(report.total_talks(), 3);
        assert_eq!(
            report.outcome(ActorId::new(1)).map(|o| &o.status),
            Some(&WorkerStatus::Cancelled)
        );
        assert!(report.outcome(ActorId::new(3)).is_none());
    }

    #[tokio::test]
    async fn test_cancel_unknown_actor() {
        let config = SimulationConfig {
            actors: 2,
            cycles: 1,
            max_delay_ms: 0,
            ..SimulationConfig::default()
        };
        let running = Simulation::new(config)
            .unwrap()
            .spawn(EventSink::disabled(), CancellationToken::new())
            .unwrap();
        assert!(!running.cancel_actor(ActorId::new(2)));
        let report = running.wait().await;
        assert!(report.all_completed());
    }
}
