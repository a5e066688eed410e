//! Observation sink for lifecycle events.
//!
//! Workers push [`DiningEvent`]s into an unbounded channel; whoever holds the
//! receiving end (the reporter, or a test) decides what to do with them.
//! Sending never blocks a worker and never fails it: once the receiver is
//! gone, events are dropped silently.

use tokio::sync::mpsc;
use tracing::trace;

use philo_core::{ActorId, DiningEvent, EventKind};

/// Receiving end of an event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<DiningEvent>;

/// Cheap-to-clone handle for reporting lifecycle events.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<DiningEvent>>,
}

impl EventSink {
    /// Creates a connected sink and the receiver that observes it.
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Creates a sink that discards everything.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Reports one transition, stamped with the current time.
    pub fn emit(&self, actor: ActorId, kind: EventKind) {
        trace!(actor = %actor, event = kind.name(), "Lifecycle event");
        if let Some(sender) = &self.sender {
            // Ignore send error - the observer may have gone away
            let _ = sender.send(DiningEvent::now(actor, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(ActorId::new(0), EventKind::StartedEating);
        sink.emit(ActorId::new(0), EventKind::DoneEating);
        drop(sink);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::StartedEating);
        assert_eq!(second.kind, EventKind::DoneEating);
        assert!(first.at <= second.at);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(ActorId::new(1), EventKind::Cancelled);
    }

    #[test]
    fn test_disabled_sink() {
        EventSink::disabled().emit(ActorId::new(0), EventKind::StartedThinking);
    }
}
