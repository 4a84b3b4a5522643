//! Session identity and directory-visible peer records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProtocolError, ProtocolResult, PublicKeyBytes};

/// Opaque directory-assigned session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Raw 16 bytes, used when binding ids into associated data
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Format as user-friendly display string (UUID)
    pub fn to_display_string(&self) -> String {
        self.0.to_string().to_uppercase()
    }

    /// Parse from display string
    ///
    /// Accepts the hyphenated form as well as the 32 hex digits with any
    /// separators stripped.
    pub fn from_display_string(s: &str) -> ProtocolResult<Self> {
        let trimmed = s.trim();
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(Self(uuid));
        }

        let cleaned: String = trimmed.chars().filter(|c| c.is_alphanumeric()).collect();
        if cleaned.len() != 32 {
            return Err(ProtocolError::InvalidSessionId);
        }
        Uuid::parse_str(&cleaned.to_lowercase())
            .map(Self)
            .map_err(|_| ProtocolError::InvalidSessionId)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl std::str::FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_display_string(s)
    }
}

/// Public view of a directory entry
///
/// This is what `list()` snapshots contain and what sessions cache as their
/// peer view. The delivery handler is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub session_id: SessionId,
    pub display_label: String,
    pub public_key: PublicKeyBytes,
}

/// Change notification published by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectoryEvent {
    /// A session registered and is now routable
    Registered(PeerInfo),
    /// A session unregistered; its id will never be handed out again
    Unregistered(SessionId),
}
