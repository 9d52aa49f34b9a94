//! # Shared Bus - Notification Fan-out
//!
//! Carries committed changes from the core engines to whoever pushes them to
//! connected clients (websocket gateways, feed builders, mailers).
//!
//! ## Delivery Rules
//!
//! - Publication happens **after** the originating operation committed and,
//!   for card mutations, after the card lock was released.
//! - Delivery is best-effort: a publish with no subscribers is logged and
//!   dropped, never failing the originating operation.
//! - Clients that missed events recover through the mutation engine's
//!   "mutations since index N" query, not through the bus.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Mutation     │                    │ Fan-out      │
//! │ Engine / Bank│    publish()       │ Gateway      │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, PlatformEvent};
pub use publisher::{BusStats, EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
