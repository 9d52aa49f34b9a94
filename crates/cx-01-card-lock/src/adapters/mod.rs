//! Adapters implementing the outbound ports.

pub mod memory;

pub use memory::InMemoryCardStore;
