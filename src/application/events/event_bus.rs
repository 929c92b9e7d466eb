//! In-process observer stream
//!
//! Services publish [`Event`]s without knowing who listens. Each subscriber
//! gets its own cursor into a bounded ring; one that falls behind loses the
//! oldest events instead of slowing the publisher down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::domain::events::{Event, EventMessage};

/// Events buffered per subscriber before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscribers: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stamp `event` and hand it to every current subscriber.
    pub fn publish(&self, event: Event) {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        metrics::counter!("gateway_events_published_total", "event" => event_type).increment(1);

        trace!(
            event_type,
            station_code = message.event.station_code(),
            "Publishing event"
        );
        // No receivers is not an error; the event is simply not observed.
        let _ = self.sender.send(message);
    }

    /// Every event from now on.
    pub fn subscribe(&self) -> EventSubscriber {
        self.subscriber(None)
    }

    /// Only events about one station.
    pub fn subscribe_station(&self, station_code: impl Into<String>) -> EventSubscriber {
        self.subscriber(Some(station_code.into()))
    }

    fn subscriber(&self, station_code: Option<String>) -> EventSubscriber {
        let total = self.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(total, station_code = ?station_code, "Event subscriber added");
        EventSubscriber {
            receiver: self.sender.subscribe(),
            station_code,
            subscribers: self.subscribers.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    station_code: Option<String>,
    subscribers: Arc<AtomicUsize>,
}

impl EventSubscriber {
    fn wants(&self, message: &EventMessage) -> bool {
        self.station_code
            .as_deref()
            .map_or(true, |code| message.event.station_code() == code)
    }

    /// Next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if self.wants(&message) => return Some(message),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event subscriber lagged"),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) if self.wants(&message) => return Some(message),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::HeartbeatEvent;
    use chrono::Utc;

    fn heartbeat(code: &str) -> Event {
        Event::HeartbeatReceived(HeartbeatEvent {
            station_code: code.into(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(heartbeat("ST-001"));

        assert_eq!(a.recv().await.unwrap().event.station_code(), "ST-001");
        assert_eq!(b.recv().await.unwrap().event.station_code(), "ST-001");
    }

    #[test]
    fn station_subscription_skips_other_stations() {
        let bus = EventBus::new();
        let mut only_two = bus.subscribe_station("ST-002");

        bus.publish(heartbeat("ST-001"));
        bus.publish(heartbeat("ST-002"));
        bus.publish(heartbeat("ST-003"));

        assert_eq!(only_two.try_recv().unwrap().event.station_code(), "ST-002");
        assert!(only_two.try_recv().is_none());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(heartbeat("ST-001"));

        let sub = bus.subscribe();
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
