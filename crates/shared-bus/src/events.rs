//! # Platform Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::{Card, CardId, Decimal, MutationRecord, UserId};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlatformEvent {
    // =========================================================================
    // CX-01: CARD LIFECYCLE
    // =========================================================================
    /// A new card was posted.
    CardPosted(Card),

    /// A card was soft-deleted.
    CardDeleted {
        card_id: CardId,
    },

    // =========================================================================
    // CX-02: CARD MUTATION
    // =========================================================================
    /// A mutation was committed and the card lock released.
    MutationCommitted(MutationRecord),

    // =========================================================================
    // CX-03: VALUE LEDGER
    // =========================================================================
    /// A transfer was debited and fully credited.
    TransactionCommitted {
        transaction_id: String,
        originator: UserId,
        participants: Vec<UserId>,
        amount: Decimal,
        reason: String,
    },
}

impl PlatformEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::CardPosted(_) | Self::CardDeleted { .. } => EventTopic::Cards,
            Self::MutationCommitted(_) => EventTopic::Mutations,
            Self::TransactionCommitted { .. } => EventTopic::Ledger,
        }
    }

    /// The card this event concerns, if any.
    #[must_use]
    pub fn card_id(&self) -> Option<&CardId> {
        match self {
            Self::CardPosted(card) => Some(&card.id),
            Self::CardDeleted { card_id } => Some(card_id),
            Self::MutationCommitted(record) => Some(&record.card_id),
            Self::TransactionCommitted { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Cards,
    Mutations,
    Ledger,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Cards to include. Empty means all cards; events without a card
    /// never match a non-empty card list.
    pub card_ids: Vec<CardId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            card_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific cards.
    #[must_use]
    pub fn cards(card_ids: Vec<CardId>) -> Self {
        Self {
            topics: Vec::new(),
            card_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PlatformEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let card_match = self.card_ids.is_empty()
            || event
                .card_id()
                .is_some_and(|card_id| self.card_ids.contains(card_id));

        topic_match && card_match
    }
}
