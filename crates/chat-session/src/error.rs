//! Session error types

use crypto_session::CryptoError;
use relay_protocol::SessionId;
use thiserror::Error;

/// Session error
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Unknown peer: {0}")]
    UnknownPeer(SessionId),

    #[error("Sender {0} does not match its published public key")]
    SenderKeyMismatch(SessionId),

    #[error("Session is no longer registered")]
    NotRegistered,

    #[error("Inbox closed")]
    InboxClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Whether this failure only affects the one message it came from
    pub fn is_message_scoped(&self) -> bool {
        matches!(
            self,
            Self::Crypto(CryptoError::AuthenticationFailed)
                | Self::Crypto(CryptoError::InvalidKeyMaterial(_))
                | Self::SenderKeyMismatch(_)
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
