//! Shared Protocol Definitions for Relaychat
//!
//! Identifiers, the ciphertext envelope and directory events shared by the
//! crypto, directory and session crates.

mod envelope;
mod error;
mod session;

pub use envelope::*;
pub use error::*;
pub use session::*;

/// Nonce size for the AEAD cipher (96 bits / 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// X25519 public key size (256 bits / 32 bytes)
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Raw X25519 public key as published in the directory
pub type PublicKeyBytes = [u8; PUBLIC_KEY_SIZE];
