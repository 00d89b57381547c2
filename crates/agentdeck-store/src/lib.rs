//! agentdeck-store: the authoritative in-memory tile collection, the
//! session event router that feeds it, and the JSON document store
//! behind it.

pub mod document;
pub mod ids;
pub mod router;
pub mod store;

pub use agentdeck_core::types;
