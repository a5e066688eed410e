//! Philo Table - Shared monitor, workers and supervisor
//!
//! This crate provides the runtime of the dining philosophers simulation:
//! - `monitor` - The shared monitor that owns seat statuses and the talk flag
//! - `worker` - Per-philosopher driver loop
//! - `simulation` - Supervisor that seats the workers and collects outcomes
//! - `sink` / `reporter` - Lifecycle event channel and its line renderer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Simulation                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ Worker × N      │────▶│     SharedMonitor           │   │
//! │  │ (tokio tasks)   │     │  (seat + talk state owner)  │   │
//! │  └────────┬────────┘     └─────────────────────────────┘   │
//! │           │                                                 │
//! │           │ DiningEvent                                     │
//! │           ▼                                                 │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │ EventSink       │────▶│   reporter (stdout lines)   │   │
//! │  │ (mpsc sender)   │     │                             │   │
//! │  └─────────────────┘     └─────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod monitor;
pub mod reporter;
pub mod simulation;
pub mod sink;
pub mod worker;

pub use monitor::{SharedMonitor, TableSnapshot};
pub use reporter::{run_reporter, OutputFormat};
pub use simulation::{RunningSimulation, Simulation, SimulationReport};
pub use sink::{EventReceiver, EventSink};
pub use worker::{Worker, WorkerOutcome, WorkerSettings, WorkerStatus};
