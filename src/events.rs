//! Stage event bus
//!
//! Listeners are registered explicitly and owned by the bus for as long as
//! they are subscribed. Publishing fans out synchronously, in registration
//! order, before `publish` returns. Every event is also mirrored onto a
//! broadcast channel for out-of-band observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Capacity of the observer tap before slow observers start lagging
const OBSERVER_CAPACITY: usize = 64;

/// Signals raised by the stage controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    PerformanceStarted,
    PerformanceEnded,
    ClappingStarted,
    ClappingStopped,
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageEvent::PerformanceStarted => write!(f, "performance-started"),
            StageEvent::PerformanceEnded => write!(f, "performance-ended"),
            StageEvent::ClappingStarted => write!(f, "clapping-started"),
            StageEvent::ClappingStopped => write!(f, "clapping-stopped"),
        }
    }
}

/// Receives stage events synchronously
pub trait StageListener {
    fn on_stage_event(&mut self, event: StageEvent);
}

/// Anything stage events can be published into
pub trait Publisher {
    fn publish(&mut self, event: StageEvent);
}

/// Recording publisher
impl Publisher for Vec<StageEvent> {
    fn publish(&mut self, event: StageEvent) {
        self.push(event);
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Explicit publish/subscribe channel for stage events
#[derive(Debug)]
pub struct EventBus<L> {
    listeners: Vec<(SubscriberId, L)>,
    next_id: u64,
    observer_tx: broadcast::Sender<StageEvent>,
}

impl<L> Default for EventBus<L> {
    fn default() -> Self {
        let (observer_tx, _) = broadcast::channel(OBSERVER_CAPACITY);
        Self {
            listeners: Vec::new(),
            next_id: 0,
            observer_tx,
        }
    }
}

impl<L: StageListener> EventBus<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it receives every event published from now on
    pub fn subscribe(&mut self, listener: L) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        tracing::debug!("Subscriber {} registered", id);
        id
    }

    /// Deregister a listener and hand it back
    pub fn unsubscribe(&mut self, id: SubscriberId) -> Option<L> {
        let index = self.listeners.iter().position(|(sid, _)| *sid == id)?;
        tracing::debug!("Subscriber {} removed", id);
        Some(self.listeners.remove(index).1)
    }

    /// Subscribe an asynchronous observer to the event mirror
    pub fn observe(&self) -> broadcast::Receiver<StageEvent> {
        self.observer_tx.subscribe()
    }

    pub fn get(&self, id: SubscriberId) -> Option<&L> {
        self.listeners
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, l)| l)
    }

    /// Listeners in registration order
    pub fn listeners(&self) -> impl Iterator<Item = &L> {
        self.listeners.iter().map(|(_, l)| l)
    }

    pub fn listeners_mut(&mut self) -> impl Iterator<Item = &mut L> {
        self.listeners.iter_mut().map(|(_, l)| l)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<L: StageListener> Publisher for EventBus<L> {
    fn publish(&mut self, event: StageEvent) {
        tracing::debug!("Publishing {} to {} listeners", event, self.listeners.len());
        for (_, listener) in &mut self.listeners {
            listener.on_stage_event(event);
        }
        // No observers is fine
        let _ = self.observer_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Appends (tag, event) to a shared log so ordering across listeners is visible
    struct Tagged {
        tag: &'static str,
        log: Rc<RefCell<Vec<(&'static str, StageEvent)>>>,
    }

    impl StageListener for Tagged {
        fn on_stage_event(&mut self, event: StageEvent) {
            self.log.borrow_mut().push((self.tag, event));
        }
    }

    fn tagged(tag: &'static str, log: &Rc<RefCell<Vec<(&'static str, StageEvent)>>>) -> Tagged {
        Tagged {
            tag,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(tagged("a", &log));
        bus.subscribe(tagged("b", &log));
        bus.subscribe(tagged("c", &log));

        bus.publish(StageEvent::ClappingStarted);

        assert_eq!(
            *log.borrow(),
            vec![
                ("a", StageEvent::ClappingStarted),
                ("b", StageEvent::ClappingStarted),
                ("c", StageEvent::ClappingStarted),
            ]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let a = bus.subscribe(tagged("a", &log));
        bus.subscribe(tagged("b", &log));

        let removed = bus.unsubscribe(a);
        assert!(removed.is_some());
        assert!(bus.unsubscribe(a).is_none());
        assert_eq!(bus.len(), 1);

        bus.publish(StageEvent::PerformanceEnded);
        assert_eq!(*log.borrow(), vec![("b", StageEvent::PerformanceEnded)]);
    }

    #[test]
    fn test_publish_with_no_subscribers() {
        let mut bus: EventBus<Tagged> = EventBus::new();
        assert!(bus.is_empty());
        bus.publish(StageEvent::PerformanceStarted);
    }

    #[test]
    fn test_observer_mirror() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(tagged("a", &log));
        let mut rx = bus.observe();

        bus.publish(StageEvent::PerformanceStarted);
        bus.publish(StageEvent::ClappingStopped);

        assert_eq!(rx.try_recv().unwrap(), StageEvent::PerformanceStarted);
        assert_eq!(rx.try_recv().unwrap(), StageEvent::ClappingStopped);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_vec_publisher_records() {
        let mut events = Vec::new();
        events.publish(StageEvent::ClappingStarted);
        assert_eq!(events, vec![StageEvent::ClappingStarted]);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(StageEvent::PerformanceStarted.to_string(), "performance-started");
        assert_eq!(StageEvent::ClappingStopped.to_string(), "clapping-stopped");
    }
}
