//! Relaychat Demo
//!
//! Runs two sessions through an in-process directory and prints what the
//! relay can observe. Usage: `chat-demo [config.json] [message]`

use std::time::Duration;

use anyhow::Context;
use chat_session::{ChatConfig, ChatSession};
use crypto_session::{KeyPair, decrypt, encrypt};
use directory::Directory;
use relay_protocol::DirectoryEvent;
use tracing::info;

const DEFAULT_MESSAGE: &str = "Hello, this is an end-to-end encryption demo!";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_demo=info".parse()?)
                .add_directive("chat_session=info".parse()?)
                .add_directive("directory=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(&path)?,
        None => ChatConfig::default(),
    };
    let message = args.next().unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

    info!("Starting Relaychat demo");

    agreement_demo(&message)?;
    relay_demo(&config, &message).await?;

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<ChatConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let config = ChatConfig::from_json(&raw).with_context(|| format!("parsing {}", path))?;
    config.validate()?;
    info!("Loaded config from {}", path);
    Ok(config)
}

/// Two throwaway key pairs agree on a key without any directory involved
fn agreement_demo(message: &str) -> anyhow::Result<()> {
    let a = KeyPair::generate();
    let b = KeyPair::generate();

    let k_ab = a.derive(&b.public_key_bytes())?;
    let k_ba = b.derive(&a.public_key_bytes())?;

    let (nonce, ciphertext) = encrypt(&k_ab, message.as_bytes(), None)?;
    let plaintext = decrypt(&k_ba, &nonce, &ciphertext, None)?;

    println!("== Key agreement");
    println!("Public key A (hex): {}", hex::encode(a.public_key_bytes()));
    println!("Public key B (hex): {}", hex::encode(b.public_key_bytes()));
    println!("Both sides derived the same key: {}", k_ab.as_bytes() == k_ba.as_bytes());
    println!("Nonce (hex): {}", hex::encode(nonce));
    println!("Ciphertext (hex): {}", hex::encode(&ciphertext));
    println!("Decrypted: {}", String::from_utf8_lossy(&plaintext));
    println!();

    Ok(())
}

/// alice and bob exchange a message through the directory
async fn relay_demo(base: &ChatConfig, message: &str) -> anyhow::Result<()> {
    let directory = Directory::new();
    let mut events = directory.subscribe();

    let alice = ChatSession::join(
        &directory,
        ChatConfig {
            display_label: "alice".into(),
            ..base.clone()
        },
    )?;
    let mut bob = ChatSession::join(
        &directory,
        ChatConfig {
            display_label: "bob".into(),
            ..base.clone()
        },
    )?;

    let _alice_refresh = alice.spawn_peer_refresh();
    let _bob_refresh = bob.spawn_peer_refresh();
    alice.refresh_peers();

    println!("== Relay");
    for peer in alice.peers() {
        println!(
            "alice sees {} [{}] key {}",
            peer.display_label,
            peer.session_id,
            crypto_session::fingerprint(&peer.public_key)
        );
    }

    let outcome = alice.send_text(bob.id(), message)?;
    println!("alice -> bob: {:?}", outcome);

    let envelope = tokio::time::timeout(Duration::from_secs(5), bob.recv())
        .await
        .context("timed out waiting for delivery")??;
    println!("Relay saw sender: {}", envelope.sender_id());
    println!("Relay saw nonce (hex): {}", hex::encode(envelope.nonce()));
    println!("Relay saw ciphertext (hex): {}", hex::encode(envelope.ciphertext()));

    let received = bob.open(envelope)?;
    println!(
        "bob decrypted from {}: {}",
        received.sender_label.as_deref().unwrap_or("?"),
        received.text()
    );

    let bob_id = bob.id();
    bob.leave();
    let outcome = alice.send_text(bob_id, "are you still there?")?;
    println!("alice -> departed bob: {:?}", outcome);

    while let Ok(event) = events.try_recv() {
        match event {
            DirectoryEvent::Registered(peer) => println!("event: {} registered", peer.display_label),
            DirectoryEvent::Unregistered(id) => println!("event: {} unregistered", id),
        }
    }

    Ok(())
}
