//! Directory error types

use relay_protocol::SessionId;
use thiserror::Error;

/// Routing failure, for callers that treat a non-delivery as an error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Routing miss: session {0} is not registered")]
    RoutingMiss(SessionId),

    #[error("Delivery queue full for session {0}")]
    QueueFull(SessionId),

    #[error("Delivery channel closed for session {0}")]
    DeliveryClosed(SessionId),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
