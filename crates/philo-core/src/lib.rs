//! Philo Core - Shared types for the dining philosophers simulation
//!
//! This crate provides the domain types shared between the table runtime
//! (`philo-table`) and the `philosophers` binary.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod actor;
pub mod config;
pub mod error;
pub mod event;
pub mod phrases;

// Re-exports for convenience
pub use actor::{ActorId, ActorStatus};
pub use config::{FailurePolicy, SimulationConfig};
pub use error::{ConfigError, MonitorError, MonitorResult};
pub use event::{DiningEvent, EventKind};
