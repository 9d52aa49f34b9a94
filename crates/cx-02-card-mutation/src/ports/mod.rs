//! Ports (hexagonal boundaries) for the mutation engine.

pub mod inbound;
pub mod outbound;

pub use inbound::CardMutationApi;
pub use outbound::CardStateStore;
