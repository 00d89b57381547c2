//! agentdeck-core: pure data model and math for the agent session
//! console: tile records, canvas transforms, gateway frame decoding,
//! text cleaning, and heartbeat canonicalization.
//!
//! No IO, no async, no clocks: every function here is deterministic
//! and takes its inputs as parameters.

pub mod frames;
pub mod heartbeat;
pub mod text;
pub mod transcript;
pub mod transform;
pub mod types;
