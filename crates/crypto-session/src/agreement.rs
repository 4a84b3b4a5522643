//! Identity key pairs and shared-key derivation (X25519 + HKDF-SHA256)

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, KEY_SIZE, PUBLIC_KEY_SIZE, PublicKeyBytes};

/// Domain-separation salt for HKDF
pub const HKDF_SALT: &[u8] = b"e2ee-mini-chat-hkdf-salt";

/// Context string binding derived keys to this protocol
pub const HKDF_INFO: &[u8] = b"e2ee-mini-chat-session-key";

/// Number of public-key hash bytes shown in a fingerprint
const FINGERPRINT_BYTES: usize = 8;

/// Identity key pair, generated once per session lifetime
///
/// The secret scalar has no accessor; the only thing it can be used for is
/// [`KeyPair::derive`].
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair from the OS random source
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> PublicKeyBytes {
        *self.public.as_bytes()
    }

    /// Short display fingerprint of our public key
    pub fn fingerprint(&self) -> String {
        fingerprint(self.public.as_bytes())
    }

    /// Derive the symmetric key shared with the owner of `their_public`
    ///
    /// Both sides arrive at the same key:
    /// `a.derive(b.public) == b.derive(a.public)`.
    pub fn derive(&self, their_public: &[u8]) -> CryptoResult<SharedKey> {
        let their_public = parse_public_key(their_public)?;
        let shared = self.secret.diffie_hellman(&their_public);

        // Low-order points force an all-zero secret regardless of our scalar
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKeyMaterial(
                "peer public key is a low-order point".into(),
            ));
        }

        let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared.as_bytes());
        let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
        hk.expand(HKDF_INFO, &mut okm[..])
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        Ok(SharedKey(okm))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.fingerprint())
    }
}

/// Derived 256-bit symmetric key, wiped on drop
///
/// Deliberately neither `Clone` nor `Debug`.
pub struct SharedKey(Zeroizing<[u8; KEY_SIZE]>);

impl SharedKey {
    /// Wrap existing key bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Validate raw public-key bytes
pub fn parse_public_key(bytes: &[u8]) -> CryptoResult<PublicKey> {
    let bytes: PublicKeyBytes = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKeyMaterial(format!(
            "expected {} public key bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(bytes))
}

/// Hex fingerprint of a public key (truncated SHA-256)
pub fn fingerprint(public_key: &PublicKeyBytes) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}
