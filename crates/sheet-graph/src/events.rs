//! Change notification
//!
//! Subscribers re-read the graph when notified. The bus is a broadcast
//! channel: a lagging subscriber loses old events, never blocks the writer.

use crate::ids::{ConnectionId, NodeId};
use tokio::sync::broadcast;

/// What changed in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    /// Node inserted
    NodeAdded(NodeId),
    /// Node removed
    NodeRemoved(NodeId),
    /// Node label, kind, data or ports changed
    NodeUpdated(NodeId),
    /// Node moved
    NodeMoved(NodeId),
    /// Connection inserted
    ConnectionAdded(ConnectionId),
    /// Connection removed
    ConnectionRemoved(ConnectionId),
    /// Evaluation errors or computed values written back
    Annotated,
    /// Whole graph replaced (load, undo of a bulk change)
    Reloaded,
}

impl GraphEvent {
    /// Whether the change affects evaluation
    #[inline]
    #[must_use]
    pub fn affects_evaluation(&self) -> bool {
        !matches!(self, Self::NodeMoved(_) | Self::Annotated)
    }
}

/// Fan-out of graph events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GraphEvent>,
}

impl EventBus {
    /// Create bus with room for `capacity` undelivered events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn notify(&self, event: GraphEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let id = NodeId::new();
        bus.notify(GraphEvent::NodeAdded(id));
        assert_eq!(rx.try_recv().unwrap(), GraphEvent::NodeAdded(id));
    }

    #[test]
    fn notify_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.notify(GraphEvent::Reloaded);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn moves_do_not_affect_evaluation() {
        assert!(!GraphEvent::NodeMoved(NodeId::new()).affects_evaluation());
        assert!(GraphEvent::NodeRemoved(NodeId::new()).affects_evaluation());
    }
}
