//! Chat sessions on top of the Relaychat directory
//!
//! A [`ChatSession`] owns one identity key pair, one directory registration,
//! one bounded inbox and one peer cache. It encrypts outgoing messages per
//! recipient and decrypts what the directory delivers to its inbox.

mod config;
mod error;
mod peers;
mod session;

pub use config::*;
pub use error::*;
pub use peers::*;
pub use session::*;
