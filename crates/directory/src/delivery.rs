//! Delivery handlers invoked by the router
//!
//! A handler runs synchronously inside `Directory::route`, so it must return
//! promptly: no blocking I/O and no waiting on the directory. The usual
//! handler is a bounded per-session queue.

use relay_protocol::Envelope;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Result of handing one envelope to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The handler took the envelope
    Accepted,
    /// The receiving queue is at capacity; the envelope was dropped
    QueueFull,
    /// The receiving side has gone away; the envelope was dropped
    Closed,
}

/// Receiver-side callback for incoming envelopes
pub trait DeliveryHandler: Send + Sync {
    fn deliver(&self, envelope: Envelope) -> Delivery;
}

impl DeliveryHandler for mpsc::Sender<Envelope> {
    fn deliver(&self, envelope: Envelope) -> Delivery {
        match self.try_send(envelope) {
            Ok(()) => Delivery::Accepted,
            Err(TrySendError::Full(_)) => Delivery::QueueFull,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

impl DeliveryHandler for mpsc::UnboundedSender<Envelope> {
    fn deliver(&self, envelope: Envelope) -> Delivery {
        match self.send(envelope) {
            Ok(()) => Delivery::Accepted,
            Err(_) => Delivery::Closed,
        }
    }
}

/// Adapter turning a closure into a [`DeliveryHandler`]
pub struct FnHandler<F>(F);

impl<F> DeliveryHandler for FnHandler<F>
where
    F: Fn(Envelope) + Send + Sync,
{
    fn deliver(&self, envelope: Envelope) -> Delivery {
        (self.0)(envelope);
        Delivery::Accepted
    }
}

/// Wrap a closure as a delivery handler
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Envelope) + Send + Sync,
{
    FnHandler(f)
}
