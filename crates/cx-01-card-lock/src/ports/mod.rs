//! Ports (hexagonal boundaries) for the card lock subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::{CardDirectoryApi, CardLockApi};
pub use outbound::CardStore;
