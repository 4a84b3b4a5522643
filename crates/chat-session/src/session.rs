//! Chat session - the send/receive path
//!
//! Outgoing: look up peer -> derive shared key -> encrypt -> route.
//! Incoming: inbox -> check sender key -> derive shared key -> decrypt.

use std::borrow::Cow;

use crypto_session::{CryptoError, KeyPair, decrypt, encrypt};
use directory::{Directory, RouteOutcome};
use relay_protocol::{Envelope, PeerInfo, PublicKeyBytes, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{ChatConfig, PeerCache, SessionError, SessionResult};

/// Associated data binding a ciphertext to its sender and recipient
fn routing_aad(from: SessionId, to: SessionId) -> [u8; 32] {
    let mut aad = [0u8; 32];
    aad[..16].copy_from_slice(from.as_bytes());
    aad[16..].copy_from_slice(to.as_bytes());
    aad
}

/// A decrypted incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub from: SessionId,
    /// Sender's label if it is still known to us or the directory
    pub sender_label: Option<String>,
    pub plaintext: Vec<u8>,
}

impl ReceivedMessage {
    /// Plaintext as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.plaintext)
    }
}

/// Background peer-cache refresh; stops when dropped
pub struct PeerRefreshTask {
    handle: JoinHandle<()>,
}

impl PeerRefreshTask {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for PeerRefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One chat endpoint
pub struct ChatSession {
    id: SessionId,
    config: ChatConfig,
    keys: KeyPair,
    directory: Directory,
    peers: PeerCache,
    inbox: mpsc::Receiver<Envelope>,
    registered: bool,
}

impl ChatSession {
    /// Generate an identity and register it with `directory`
    pub fn join(directory: &Directory, config: ChatConfig) -> SessionResult<Self> {
        config.validate()?;

        let keys = KeyPair::generate();
        let (inbox_tx, inbox) = mpsc::channel(config.inbox_capacity);
        let id = directory.register(config.display_label.clone(), keys.public_key_bytes(), inbox_tx);

        info!(
            "Session {} joined as {} (key {})",
            id,
            config.display_label,
            keys.fingerprint()
        );

        let session = Self {
            id,
            config,
            keys,
            directory: directory.clone(),
            peers: PeerCache::new(),
            inbox,
            registered: true,
        };
        session.refresh_peers();

        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn display_label(&self) -> &str {
        &self.config.display_label
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        self.keys.public_key_bytes()
    }

    pub fn fingerprint(&self) -> String {
        self.keys.fingerprint()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Replace the peer cache with a fresh directory snapshot
    pub fn refresh_peers(&self) -> usize {
        let count = self.peers.replace(self.id, self.directory.list());
        debug!("Session {} sees {} peers", self.id, count);
        count
    }

    /// Cached peers, sorted by label
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.peers.sorted()
    }

    pub fn peer_by_label(&self, label: &str) -> Option<PeerInfo> {
        self.peers.find_by_label(label)
    }

    /// Keep the peer cache fresh at the configured poll interval
    pub fn spawn_peer_refresh(&self) -> PeerRefreshTask {
        let own_id = self.id;
        let directory = self.directory.clone();
        let peers = self.peers.clone();
        let period = self.config.peer_poll_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                peers.replace(own_id, directory.list());
            }
        });

        PeerRefreshTask { handle }
    }

    /// Encrypt `plaintext` for `to` and hand it to the directory
    ///
    /// `to` must be in the peer cache. A recipient that left since the last
    /// refresh shows up as [`RouteOutcome::NotFound`], not as an error.
    pub fn send(&self, to: SessionId, plaintext: &[u8]) -> SessionResult<RouteOutcome> {
        if !self.registered {
            return Err(SessionError::NotRegistered);
        }

        let peer = self.peers.get(&to).ok_or(SessionError::UnknownPeer(to))?;
        let key = self.keys.derive(&peer.public_key)?;
        let aad = routing_aad(self.id, to);
        let (nonce, ciphertext) = encrypt(&key, plaintext, Some(aad.as_slice()))?;

        let outcome = self
            .directory
            .route(self.id, to, self.keys.public_key_bytes(), nonce, ciphertext);

        if !outcome.is_delivered() {
            warn!("Message to {} not delivered: {:?}", peer.display_label, outcome);
        }

        Ok(outcome)
    }

    pub fn send_text(&self, to: SessionId, text: &str) -> SessionResult<RouteOutcome> {
        self.send(to, text.as_bytes())
    }

    /// Wait for the next envelope
    pub async fn recv(&mut self) -> SessionResult<Envelope> {
        self.inbox.recv().await.ok_or(SessionError::InboxClosed)
    }

    /// Next envelope if one is already queued
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.inbox.try_recv().ok()
    }

    /// Wait for the next envelope and decrypt it
    pub async fn recv_message(&mut self) -> SessionResult<ReceivedMessage> {
        let envelope = self.recv().await?;
        self.open(envelope)
    }

    /// Decrypt an envelope addressed to us
    ///
    /// Failures are scoped to this one envelope; the session keeps working.
    pub fn open(&self, envelope: Envelope) -> SessionResult<ReceivedMessage> {
        let from = envelope.sender_id();

        let known = self
            .peers
            .get(&from)
            .or_else(|| self.directory.lookup(from));
        if let Some(peer) = &known {
            if &peer.public_key != envelope.sender_public_key() {
                warn!("Discarding message claiming to be from {}: key mismatch", from);
                return Err(SessionError::SenderKeyMismatch(from));
            }
        }

        let key = self.keys.derive(envelope.sender_public_key())?;
        let aad = routing_aad(from, self.id);
        let plaintext = decrypt(&key, envelope.nonce(), envelope.ciphertext(), Some(aad.as_slice()))
            .inspect_err(|e| {
                if matches!(e, CryptoError::AuthenticationFailed) {
                    warn!("Discarding message from {}: authentication failed", from);
                }
            })?;

        Ok(ReceivedMessage {
            from,
            sender_label: known.map(|peer| peer.display_label),
            plaintext,
        })
    }

    /// Unregister from the directory; idempotent
    pub fn leave(&mut self) {
        if self.registered {
            self.directory.unregister(self.id);
            self.registered = false;
            info!("Session {} left", self.id);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.leave();
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("label", &self.config.display_label)
            .field("keys", &self.keys)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crypto_session::SharedKey;
    use directory::handler_fn;
    use parking_lot::Mutex;

    use super::*;

    fn join(directory: &Directory, label: &str) -> ChatSession {
        ChatSession::join(directory, ChatConfig::with_label(label)).unwrap()
    }

    #[test]
    fn test_end_to_end_with_raw_primitives() {
        let directory = Directory::new();
        let alice_keys = KeyPair::generate();
        let bob_keys = KeyPair::generate();

        let alice_inbox = Arc::new(Mutex::new(Vec::new()));
        let bob_inbox = Arc::new(Mutex::new(Vec::new()));
        let a_sink = Arc::clone(&alice_inbox);
        let b_sink = Arc::clone(&bob_inbox);

        let alice_id = directory.register(
            "alice",
            alice_keys.public_key_bytes(),
            handler_fn(move |env| a_sink.lock().push(env)),
        );
        let bob_id = directory.register(
            "bob",
            bob_keys.public_key_bytes(),
            handler_fn(move |env| b_sink.lock().push(env)),
        );

        let k = alice_keys.derive(&bob_keys.public_key_bytes()).unwrap();
        let (n, c) = encrypt(&k, b"hello", None).unwrap();
        let outcome = directory.route(alice_id, bob_id, alice_keys.public_key_bytes(), n, c.clone());
        assert_eq!(outcome, RouteOutcome::Delivered);

        let received = bob_inbox.lock().pop().unwrap();
        assert_eq!(received.sender_id(), alice_id);
        assert_eq!(received.sender_public_key(), &alice_keys.public_key_bytes());
        assert_eq!(received.nonce(), &n);
        assert_eq!(received.ciphertext(), c.as_slice());

        let k2: SharedKey = bob_keys.derive(received.sender_public_key()).unwrap();
        let plaintext = decrypt(&k2, received.nonce(), received.ciphertext(), None).unwrap();
        assert_eq!(plaintext, b"hello");
        assert_eq!(k.as_bytes(), k2.as_bytes());
        assert!(alice_inbox.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_exchange_messages() {
        let directory = Directory::new();
        let mut alice = join(&directory, "alice");
        let mut bob = join(&directory, "bob");
        alice.refresh_peers();

        let bob_view = alice.peer_by_label("bob").unwrap();
        assert_eq!(bob_view.session_id, bob.id());

        let outcome = alice.send_text(bob.id(), "hello").unwrap();
        assert_eq!(outcome, RouteOutcome::Delivered);

        let message = bob.recv_message().await.unwrap();
        assert_eq!(message.from, alice.id());
        assert_eq!(message.sender_label.as_deref(), Some("alice"));
        assert_eq!(message.text(), "hello");

        bob.send_text(alice.id(), "hi alice").unwrap();
        let reply = alice.recv_message().await.unwrap();
        assert_eq!(reply.text(), "hi alice");
        assert_eq!(reply.sender_label.as_deref(), Some("bob"));
    }

    #[test]
    fn test_send_to_uncached_peer_fails() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let bob = join(&directory, "bob");

        // alice joined first and has not refreshed since bob arrived
        assert!(matches!(
            alice.send_text(bob.id(), "hello"),
            Err(SessionError::UnknownPeer(id)) if id == bob.id()
        ));
    }

    #[test]
    fn test_send_to_departed_peer_reports_not_found() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let mut bob = join(&directory, "bob");
        alice.refresh_peers();
        let bob_id = bob.id();

        bob.leave();
        // Cache is stale until the next refresh
        let outcome = alice.send_text(bob_id, "anyone there?").unwrap();
        assert_eq!(outcome, RouteOutcome::NotFound);

        alice.refresh_peers();
        assert!(alice.peers().is_empty());
    }

    #[test]
    fn test_tampered_message_does_not_poison_session() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let mut bob = join(&directory, "bob");
        alice.refresh_peers();

        alice.send_text(bob.id(), "first").unwrap();
        alice.send_text(bob.id(), "second").unwrap();

        let first = bob.try_recv().unwrap();
        let mut ciphertext = first.ciphertext().to_vec();
        ciphertext[0] ^= 0x01;
        let tampered = Envelope::new(
            first.sender_id(),
            *first.sender_public_key(),
            *first.nonce(),
            ciphertext,
        );

        let err = bob.open(tampered).unwrap_err();
        assert!(matches!(err, SessionError::Crypto(CryptoError::AuthenticationFailed)));
        assert!(err.is_message_scoped());

        let second = bob.try_recv().unwrap();
        assert_eq!(bob.open(second).unwrap().text(), "second");
    }

    #[test]
    fn test_relabelled_sender_rejected() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let mut bob = join(&directory, "bob");
        let carol = join(&directory, "carol");
        alice.refresh_peers();

        alice.send_text(bob.id(), "from alice").unwrap();
        let original = bob.try_recv().unwrap();

        // Claims to come from carol but carries alice's key
        let spoofed = Envelope::new(
            carol.id(),
            *original.sender_public_key(),
            *original.nonce(),
            original.ciphertext().to_vec(),
        );
        assert!(matches!(
            bob.open(spoofed),
            Err(SessionError::SenderKeyMismatch(id)) if id == carol.id()
        ));

        // Claims an unknown id: the key check passes, the AAD does not
        let unknown = Envelope::new(
            SessionId::new(),
            *original.sender_public_key(),
            *original.nonce(),
            original.ciphertext().to_vec(),
        );
        assert!(matches!(
            bob.open(unknown),
            Err(SessionError::Crypto(CryptoError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_envelope_for_someone_else_cannot_be_opened() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let mut bob = join(&directory, "bob");
        let carol = join(&directory, "carol");
        alice.refresh_peers();

        alice.send_text(bob.id(), "for bob only").unwrap();
        let envelope = bob.try_recv().unwrap();

        assert!(carol.open(envelope).is_err());
    }

    #[test]
    fn test_full_inbox_drops_and_reports() {
        let directory = Directory::new();
        let alice = join(&directory, "alice");
        let mut config = ChatConfig::with_label("bob");
        config.inbox_capacity = 1;
        let mut bob = ChatSession::join(&directory, config).unwrap();
        alice.refresh_peers();

        assert_eq!(alice.send_text(bob.id(), "one").unwrap(), RouteOutcome::Delivered);
        assert_eq!(alice.send_text(bob.id(), "two").unwrap(), RouteOutcome::QueueFull);

        let kept = bob.try_recv().unwrap();
        assert_eq!(bob.open(kept).unwrap().text(), "one");
        assert!(bob.try_recv().is_none());
    }

    #[test]
    fn test_leave_and_drop_unregister() {
        let directory = Directory::new();
        let mut alice = join(&directory, "alice");
        let bob = join(&directory, "bob");
        assert_eq!(directory.len(), 2);

        alice.leave();
        alice.leave();
        assert!(!alice.is_registered());
        assert!(directory.lookup(alice.id()).is_none());
        assert!(matches!(alice.send_text(bob.id(), "x"), Err(SessionError::NotRegistered)));

        drop(bob);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let directory = Directory::new();
        let mut config = ChatConfig::with_label("alice");
        config.inbox_capacity = 0;

        assert!(matches!(
            ChatSession::join(&directory, config),
            Err(SessionError::InvalidConfig(_))
        ));
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn test_background_refresh_discovers_peers() {
        let directory = Directory::new();
        let mut config = ChatConfig::with_label("alice");
        config.peer_poll_interval_ms = 10;
        let alice = ChatSession::join(&directory, config).unwrap();
        let refresh = alice.spawn_peer_refresh();

        assert!(alice.peers().is_empty());
        let bob = join(&directory, "bob");

        let mut found = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if alice.peers().iter().any(|p| p.session_id == bob.id()) {
                found = true;
                break;
            }
        }
        assert!(found, "refresh task never picked up bob");

        refresh.stop();
    }
}
