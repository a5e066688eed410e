//! Lifecycle events reported by workers to the observation sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ActorId;

/// One lifecycle transition of a philosopher.
///
/// Events carry a wall-clock timestamp and the actor that produced them.
/// Their textual form is cosmetic; tests should match on `kind` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiningEvent {
    /// When the transition happened
    pub at: DateTime<Utc>,
    /// Who made the transition
    pub actor: ActorId,
    /// What happened
    #[serde(flatten)]
    pub kind: EventKind,
}

impl DiningEvent {
    /// Creates an event stamped with the current time.
    pub fn now(actor: ActorId, kind: EventKind) -> Self {
        Self {
            at: Utc::now(),
            actor,
            kind,
        }
    }
}

impl fmt::Display for DiningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Philosopher {} {}",
            self.at.format("%H:%M:%S%.3f"),
            self.actor,
            self.kind
        )
    }
}

/// Kinds of lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail", rename_all = "snake_case")]
pub enum EventKind {
    StartedEating,
    DoneEating,
    StartedThinking,
    DoneThinking,
    StartedTalking,
    /// The phrase chosen from the phrase table
    Said(String),
    DoneTalking,
    /// The worker stopped early because its wait or work was interrupted
    Cancelled,
    /// The worker completed all of its cycles
    Finished { cycles: u32 },
}

impl EventKind {
    /// Returns a short identifier, useful as a structured log field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartedEating => "started_eating",
            Self::DoneEating => "done_eating",
            Self::StartedThinking => "started_thinking",
            Self::DoneThinking => "done_thinking",
            Self::StartedTalking => "started_talking",
            Self::Said(_) => "said",
            Self::DoneTalking => "done_talking",
            Self::Cancelled => "cancelled",
            Self::Finished { .. } => "finished",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartedEating => write!(f, "is eating"),
            Self::DoneEating => write!(f, "is done eating"),
            Self::StartedThinking => write!(f, "is thinking"),
            Self::DoneThinking => write!(f, "is done thinking"),
            Self::StartedTalking => write!(f, "has started talking"),
            Self::Said(phrase) => write!(f, "says: {phrase}"),
            Self::DoneTalking => write!(f, "is done talking"),
            Self::Cancelled => write!(f, "was interrupted and leaves the table"),
            Self::Finished { cycles } => write!(f, "has left after {cycles} cycles"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_text_uses_external_number() {
        let event = DiningEvent::now(ActorId::new(2), EventKind::StartedEating);
        let line = event.to_string();
        assert!(line.ends_with("Philosopher 3 is eating"), "got: {line}");
        assert!(line.starts_with('['));
    }

    #[test]
    fn test_said_includes_phrase() {
        let kind = EventKind::Said("2 + 2 = 5".to_string());
        assert_eq!(kind.to_string(), "says: 2 + 2 = 5");
        assert_eq!(kind.name(), "said");
    }

    #[test]
    fn test_event_json_shape() {
        let event = DiningEvent::now(ActorId::new(0), EventKind::Finished { cycles: 10 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["actor"], 0);
        assert_eq!(json["event"], "finished");
        assert_eq!(json["detail"]["cycles"], 10);

        let back: DiningEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unit_variant_json_has_no_detail() {
        let event = DiningEvent::now(ActorId::new(1), EventKind::DoneThinking);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "done_thinking");
        assert!(json.get("detail").is_none());
    }
}
