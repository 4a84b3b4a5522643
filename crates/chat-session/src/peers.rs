//! Session-local peer cache

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use relay_protocol::{PeerInfo, SessionId};

/// Read-only view of the directory, refreshed from snapshots
///
/// Never authoritative: between refreshes it may list peers that have left
/// or miss peers that have joined.
#[derive(Clone, Default)]
pub struct PeerCache {
    peers: Arc<RwLock<HashMap<SessionId, PeerInfo>>>,
}

impl PeerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with `snapshot`, leaving out `own_id`
    pub fn replace(&self, own_id: SessionId, snapshot: Vec<PeerInfo>) -> usize {
        let fresh: HashMap<_, _> = snapshot
            .into_iter()
            .filter(|peer| peer.session_id != own_id)
            .map(|peer| (peer.session_id, peer))
            .collect();
        let count = fresh.len();
        *self.peers.write() = fresh;
        count
    }

    pub fn get(&self, session_id: &SessionId) -> Option<PeerInfo> {
        self.peers.read().get(session_id).cloned()
    }

    /// First cached peer with the given label
    pub fn find_by_label(&self, label: &str) -> Option<PeerInfo> {
        self.sorted()
            .into_iter()
            .find(|peer| peer.display_label == label)
    }

    /// All cached peers ordered by label, then id
    pub fn sorted(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<_> = self.peers.read().values().cloned().collect();
        peers.sort_by(|a, b| {
            a.display_label
                .cmp(&b.display_label)
                .then(a.session_id.cmp(&b.session_id))
        });
        peers
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
