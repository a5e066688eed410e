//! Simulation parameters.
//!
//! Values come from three layers, lowest precedence first: the defaults
//! below, an optional TOML file, and command-line flags applied by the
//! binary on top of the loaded struct.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Number of philosophers when none is given.
pub const DEFAULT_ACTORS: usize = 4;

/// Eat/think cycles each philosopher runs when none is given.
pub const DEFAULT_CYCLES: u32 = 10;

/// Upper bound for a simulated eat, think or talk delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 1000;

/// Chance that a philosopher asks to talk after thinking.
pub const DEFAULT_TALK_PROBABILITY: f64 = 0.5;

/// What the supervisor does when one worker ends without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Only the affected philosopher leaves; the others keep going.
    #[default]
    StopActor,
    /// The whole table is shut down.
    StopAll,
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seats at the table (N)
    pub actors: usize,
    /// Eat/think cycles per philosopher
    pub cycles: u32,
    /// Upper bound in milliseconds for each simulated activity
    pub max_delay_ms: u64,
    /// Probability in [0, 1] of talking after each thinking phase
    pub talk_probability: f64,
    /// Supervisor reaction to a worker that stops early
    pub failure_policy: FailurePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            actors: DEFAULT_ACTORS,
            cycles: DEFAULT_CYCLES,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            talk_probability: DEFAULT_TALK_PROBABILITY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl SimulationConfig {
    /// Creates a default configuration for `actors` seats.
    pub fn with_actors(actors: usize) -> Self {
        Self {
            actors,
            ..Self::default()
        }
    }

    /// Parses a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&text, &shown)?;
        debug!(path = %shown, ?config, "Loaded simulation config");
        Ok(config)
    }

    /// Checks that the configuration describes a runnable table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actors == 0 {
            return Err(ConfigError::InvalidFieldValue {
                field: "actors",
                value: self.actors.to_string(),
                expected: "at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.talk_probability) {
            return Err(ConfigError::InvalidFieldValue {
                field: "talk_probability",
                value: self.talk_probability.to_string(),
                expected: "a probability between 0 and 1",
            });
        }
        Ok(())
    }

    /// Returns the activity delay bound as a `Duration`.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
