//! In-process directory and router for Relaychat sessions
//!
//! Sessions register a label, a public key and a delivery handler, discover
//! each other through snapshots, and relay opaque envelopes. The directory
//! never sees plaintext.

mod delivery;
mod error;
mod router;

pub use delivery::*;
pub use error::*;
pub use router::*;

/// Capacity of the directory event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
