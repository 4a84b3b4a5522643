//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{SessionError, SessionResult};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Label other sessions see in their peer list
    pub display_label: String,
    /// How often the background task refreshes the peer cache
    pub peer_poll_interval_ms: u64,
    /// Envelopes the inbox holds before new deliveries are dropped
    pub inbox_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            display_label: "anonymous".to_string(),
            peer_poll_interval_ms: 1200,
            inbox_capacity: 64,
        }
    }
}

impl ChatConfig {
    /// Default configuration with the given label
    pub fn with_label(display_label: impl Into<String>) -> Self {
        Self {
            display_label: display_label.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields fall back to defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn peer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.peer_poll_interval_ms)
    }

    pub fn validate(&self) -> SessionResult<()> {
        if self.display_label.trim().is_empty() {
            return Err(SessionError::InvalidConfig("display_label is empty".into()));
        }
        if self.peer_poll_interval_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "peer_poll_interval_ms must be positive".into(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(SessionError::InvalidConfig(
                "inbox_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.peer_poll_interval(), Duration::from_millis(1200));
        assert_eq!(config.inbox_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ChatConfig::from_json(r#"{"display_label": "alice"}"#).unwrap();
        assert_eq!(config.display_label, "alice");
        assert_eq!(config.peer_poll_interval_ms, 1200);
        assert_eq!(config.inbox_capacity, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ChatConfig::with_label("bob");
        config.inbox_capacity = 0;
        assert!(matches!(config.validate(), Err(SessionError::InvalidConfig(_))));

        let mut config = ChatConfig::with_label("bob");
        config.peer_poll_interval_ms = 0;
        assert!(config.validate().is_err());

        assert!(ChatConfig::with_label("  ").validate().is_err());
    }
}
