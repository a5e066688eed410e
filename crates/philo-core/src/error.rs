//! Domain-specific error types following panic-free policy.

use crate::ActorId;
use thiserror::Error;

/// Errors returned by the shared monitor's entry points.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    /// The caller was blocked and its wait was interrupted.
    ///
    /// `actor` is `None` for the talk channel, which is not tied to a seat.
    #[error("wait cancelled{}", .actor.map(|a| format!(" for philosopher {a}")).unwrap_or_default())]
    Cancelled { actor: Option<ActorId> },

    /// The id does not name a seat at this table.
    #[error("invalid philosopher id {actor} (table seats {actors})")]
    InvalidActorId { actor: ActorId, actors: usize },
}

impl MonitorError {
    /// Returns true if this error came from an interrupted wait.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised while loading or validating a simulation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_error_display() {
        let err = MonitorError::Cancelled {
            actor: Some(ActorId::new(2)),
        };
        assert_eq!(err.to_string(), "wait cancelled for philosopher 3");
        assert!(err.is_cancelled());

        let err = MonitorError::Cancelled { actor: None };
        assert_eq!(err.to_string(), "wait cancelled");

        let err = MonitorError::InvalidActorId {
            actor: ActorId::new(5),
            actors: 5,
        };
        assert_eq!(err.to_string(), "invalid philosopher id 6 (table seats 5)");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidFieldValue {
            field: "actors",
            value: "0".to_string(),
            expected: "at least 1",
        };
        assert_eq!(err.to_string(), "Invalid actors: 0 (expected at least 1)");
    }
}
