//! Directory service: registration, discovery and envelope relay

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use relay_protocol::{DirectoryEvent, Envelope, NONCE_SIZE, PeerInfo, PublicKeyBytes, SessionId};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{Delivery, DeliveryHandler, DirectoryError, DirectoryResult, EVENT_CHANNEL_CAPACITY};

/// Outcome of a single `route()` call
///
/// Delivery is best-effort and at-most-once; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The target's handler accepted the envelope
    Delivered,
    /// The target is not registered; the envelope was dropped
    NotFound,
    /// The target's queue was full; the envelope was dropped
    QueueFull,
    /// The target's receiving side is gone; the envelope was dropped
    Closed,
}

impl RouteOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Treat anything but delivery to `to` as an error
    pub fn into_result(self, to: SessionId) -> DirectoryResult<()> {
        match self {
            Self::Delivered => Ok(()),
            Self::NotFound => Err(DirectoryError::RoutingMiss(to)),
            Self::QueueFull => Err(DirectoryError::QueueFull(to)),
            Self::Closed => Err(DirectoryError::DeliveryClosed(to)),
        }
    }
}

impl From<Delivery> for RouteOutcome {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Accepted => Self::Delivered,
            Delivery::QueueFull => Self::QueueFull,
            Delivery::Closed => Self::Closed,
        }
    }
}

/// Registered session
struct Entry {
    info: PeerInfo,
    handler: Arc<dyn DeliveryHandler>,
}

struct Inner {
    /// Registered sessions: SessionId -> entry
    entries: RwLock<HashMap<SessionId, Entry>>,
    events: broadcast::Sender<DirectoryEvent>,
}

/// Shared directory handle
///
/// Construct once and clone the handle into every session. All clones refer
/// to the same entry map.
#[derive(Clone)]
pub struct Directory {
    inner: Arc<Inner>,
}

impl Directory {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Register a session and return its freshly allocated id
    ///
    /// The entry is routable as soon as this returns.
    pub fn register<H>(
        &self,
        display_label: impl Into<String>,
        public_key: PublicKeyBytes,
        handler: H,
    ) -> SessionId
    where
        H: DeliveryHandler + 'static,
    {
        let display_label = display_label.into();

        let info = {
            let mut entries = self.inner.entries.write();
            let mut session_id = SessionId::new();
            while entries.contains_key(&session_id) {
                session_id = SessionId::new();
            }

            let info = PeerInfo {
                session_id,
                display_label,
                public_key,
            };
            entries.insert(
                session_id,
                Entry {
                    info: info.clone(),
                    handler: Arc::new(handler),
                },
            );
            info
        };

        info!("Session registered: {} ({})", info.session_id, info.display_label);
        let session_id = info.session_id;
        let _ = self.inner.events.send(DirectoryEvent::Registered(info));

        session_id
    }

    /// Remove a session; returns whether it was registered
    pub fn unregister(&self, session_id: SessionId) -> bool {
        let removed = self.inner.entries.write().remove(&session_id);

        match removed {
            Some(entry) => {
                info!(
                    "Session unregistered: {} ({})",
                    session_id, entry.info.display_label
                );
                let _ = self
                    .inner
                    .events
                    .send(DirectoryEvent::Unregistered(session_id));
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of every registered session
    pub fn list(&self) -> Vec<PeerInfo> {
        self.inner
            .entries
            .read()
            .values()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Look up a single session
    pub fn lookup(&self, session_id: SessionId) -> Option<PeerInfo> {
        self.inner
            .entries
            .read()
            .get(&session_id)
            .map(|entry| entry.info.clone())
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to register/unregister notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.inner.events.subscribe()
    }

    /// Relay one ciphertext from `from` to `to`
    pub fn route(
        &self,
        from: SessionId,
        to: SessionId,
        from_public_key: PublicKeyBytes,
        nonce: [u8; NONCE_SIZE],
        ciphertext: Vec<u8>,
    ) -> RouteOutcome {
        self.forward(to, Envelope::new(from, from_public_key, nonce, ciphertext))
    }

    /// Relay an already built envelope to `to`
    pub fn forward(&self, to: SessionId, envelope: Envelope) -> RouteOutcome {
        let from = envelope.sender_id();
        let len = envelope.ciphertext().len();

        // Release the lock before calling out so handlers may re-enter
        let handler = self
            .inner
            .entries
            .read()
            .get(&to)
            .map(|entry| Arc::clone(&entry.handler));

        let Some(handler) = handler else {
            warn!("Routing miss: {} -> {} (not registered)", from, to);
            return RouteOutcome::NotFound;
        };

        let outcome = RouteOutcome::from(handler.deliver(envelope));
        match outcome {
            RouteOutcome::Delivered => debug!("Routed {} bytes: {} -> {}", len, from, to),
            _ => warn!("Delivery dropped: {} -> {} ({:?})", from, to, outcome),
        }

        outcome
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
