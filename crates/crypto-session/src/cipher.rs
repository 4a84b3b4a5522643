//! Authenticated encryption with ChaCha20Poly1305
//!
//! Nonces are always drawn here from the OS random source. Callers never
//! pick one, so a nonce cannot be reused by mistake.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::{RngCore, rngs::OsRng};

use crate::{CryptoError, CryptoResult, NONCE_SIZE, SharedKey, TAG_SIZE};

/// Encrypt `plaintext` under `key`
///
/// Returns the fresh nonce and the ciphertext with its 16-byte tag appended.
/// `associated_data` is authenticated but not encrypted.
pub fn encrypt(
    key: &SharedKey,
    plaintext: &[u8],
    associated_data: Option<&[u8]>,
) -> CryptoResult<([u8; NONCE_SIZE], Vec<u8>)> {
    let cipher = new_cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let payload = Payload {
        msg: plaintext,
        aad: associated_data.unwrap_or_default(),
    };
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), payload)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok((nonce_bytes, ciphertext))
}

/// Verify and decrypt
///
/// Fails closed with [`CryptoError::AuthenticationFailed`] on any tag
/// mismatch; no partial plaintext is ever returned.
pub fn decrypt(
    key: &SharedKey,
    nonce: &[u8],
    ciphertext: &[u8],
    associated_data: Option<&[u8]>,
) -> CryptoResult<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }

    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }

    let cipher = new_cipher(key)?;
    let payload = Payload {
        msg: ciphertext,
        aad: associated_data.unwrap_or_default(),
    };

    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

fn new_cipher(key: &SharedKey) -> CryptoResult<ChaCha20Poly1305> {
    ChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))
}
