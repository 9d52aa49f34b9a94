//! # Event Publisher
//!
//! Services hold an `Arc<dyn EventPublisher>` and call it after commit.
//! The in-memory bus broadcasts to every live subscription and keeps
//! per-topic delivery counters the runtime reports at shutdown.

use crate::events::{EventFilter, EventTopic, PlatformEvent};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Post-commit notification sink.
///
/// Never fails: a notification nobody hears is dropped, the commit it
/// describes stands.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscriptions the event reached.
    async fn publish(&self, event: PlatformEvent) -> usize;
}

/// Snapshot of what a bus has carried since it was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Card posted / deleted notifications.
    pub cards: u64,
    pub mutations: u64,
    pub ledger: u64,
    /// Notifications published while no subscription was attached.
    pub undelivered: u64,
}

impl BusStats {
    pub fn published(&self) -> u64 {
        self.cards + self.mutations + self.ledger
    }
}

#[derive(Default)]
struct Counters {
    cards: AtomicU64,
    mutations: AtomicU64,
    ledger: AtomicU64,
    undelivered: AtomicU64,
}

impl Counters {
    fn record(&self, topic: EventTopic, receivers: usize) {
        let counter = match topic {
            EventTopic::Cards => &self.cards,
            EventTopic::Mutations => &self.mutations,
            EventTopic::Ledger | EventTopic::All => &self.ledger,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if receivers == 0 {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> BusStats {
        BusStats {
            cards: self.cards.load(Ordering::Relaxed),
            mutations: self.mutations.load(Ordering::Relaxed),
            ledger: self.ledger.load(Ordering::Relaxed),
            undelivered: self.undelivered.load(Ordering::Relaxed),
        }
    }
}

/// Single-worker bus over `tokio::sync::broadcast`.
///
/// Subscriptions filter on receipt, so every live subscription counts as a
/// receiver of every event.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PlatformEvent>,
    counters: Counters,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` events are buffered per subscription before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            counters: Counters::default(),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, cards = filter.card_ids.len(), "[bus] Subscription opened");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Live subscriptions and streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        self.counters.snapshot()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PlatformEvent) -> usize {
        let topic = event.topic();
        let card_id = event.card_id().cloned();
        // `send` only fails when nobody is subscribed.
        let receivers = self.sender.send(event).unwrap_or(0);
        self.counters.record(topic, receivers);
        trace!(?topic, card_id = ?card_id, receivers, "[bus] Published");
        receivers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{CardId, Decimal, UserId};

    fn deleted(card: &str) -> PlatformEvent {
        PlatformEvent::CardDeleted {
            card_id: CardId::new(card),
        }
    }

    fn transfer() -> PlatformEvent {
        PlatformEvent::TransactionCommitted {
            transaction_id: "t1".into(),
            originator: UserId::new("u1"),
            participants: vec![UserId::new("u1"), UserId::new("u2")],
            amount: Decimal::ONE,
            reason: "grant".into(),
        }
    }

    #[tokio::test]
    async fn test_unheard_events_are_dropped_and_counted() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(deleted("c1")).await, 0);
        assert_eq!(
            bus.stats(),
            BusStats {
                cards: 1,
                undelivered: 1,
                ..BusStats::default()
            }
        );
    }

    #[tokio::test]
    async fn test_every_subscription_receives_regardless_of_filter() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let _ledger = bus.subscribe(EventFilter::topics(vec![EventTopic::Ledger]));
        let _card = bus.event_stream(EventFilter::cards(vec![CardId::new("c9")]));

        assert_eq!(bus.subscriber_count(), 3);
        assert_eq!(bus.publish(deleted("c1")).await, 3);
        assert_eq!(bus.publish(transfer()).await, 3);

        let stats = bus.stats();
        assert_eq!((stats.cards, stats.ledger, stats.undelivered), (1, 1, 0));
        assert_eq!(stats.published(), 2);
    }

    #[test]
    fn test_capacity() {
        assert_eq!(InMemoryEventBus::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(InMemoryEventBus::with_capacity(16).capacity(), 16);
    }
}
