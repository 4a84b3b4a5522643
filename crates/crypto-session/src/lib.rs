//! Crypto Session - End-to-End Encryption for Relaychat
//!
//! X25519 key agreement stretched through HKDF-SHA256, and ChaCha20Poly1305
//! authenticated encryption with a fresh random nonce per message.

mod agreement;
mod cipher;
mod error;

pub use agreement::*;
pub use cipher::*;
pub use error::*;

pub use relay_protocol::{NONCE_SIZE, PUBLIC_KEY_SIZE, PublicKeyBytes};

/// Symmetric key size (256 bits / 32 bytes)
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;
