//! Ciphertext envelope relayed between sessions

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{NONCE_SIZE, ProtocolResult, PublicKeyBytes, SessionId};

/// Encrypted message plus the routing-visible metadata
///
/// Everything in here is safe for the relay to observe: the sender id and
/// public key are intentionally unencrypted, the nonce is public, and the
/// ciphertext carries its authentication tag at the end.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    sender_id: SessionId,
    sender_public_key: PublicKeyBytes,
    nonce: [u8; NONCE_SIZE],
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(
        sender_id: SessionId,
        sender_public_key: PublicKeyBytes,
        nonce: [u8; NONCE_SIZE],
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            sender_id,
            sender_public_key,
            nonce,
            ciphertext,
        }
    }

    pub fn sender_id(&self) -> SessionId {
        self.sender_id
    }

    pub fn sender_public_key(&self) -> &PublicKeyBytes {
        &self.sender_public_key
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext including the trailing authentication tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Serialize to bytes for transmission
    pub fn to_bytes(&self) -> ProtocolResult<Bytes> {
        let encoded = bincode::serialize(self)?;
        Ok(Bytes::from(encoded))
    }

    /// Deserialize from received bytes
    pub fn from_bytes(data: &[u8]) -> ProtocolResult<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("sender_id", &self.sender_id)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

mod serde_bytes {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }
}
