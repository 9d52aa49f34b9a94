//! Domain layer for the mutation engine.
//!
//! - `state`: property/collection records and the read-side snapshot
//! - `fractional`: fractional index placement
//! - `path`: dot-path access into record values
//! - `errors`, `config`

pub mod config;
pub mod errors;
pub mod fractional;
pub mod path;
pub mod state;

pub use config::MutationConfig;
pub use errors::{MutationError, MutationResult};
pub use fractional::{place, Placement};
pub use state::{
    CardProperty, CardStateSnapshot, CollectionEntry, CollectionItem, CollectionKey, GroupState,
    PropertyKey,
};
