//! # Relay Configuration
//!
//! ## Purpose
//! One sectioned configuration struct per relay instance, loadable from a
//! TOML file or built programmatically from defaults. Every policy the
//! relay applies at runtime — buffer capacity and overflow behavior,
//! receive default timeout, shutdown grace, payload encoding, transport
//! connection parameters — is named here rather than buried in code.
//!
//! ## Configuration Structure
//! ```toml
//! [relay]
//! name = "verification-relay"
//!
//! [buffer]
//! capacity = 1024          # omit for unbounded
//! overflow = "block"       # block | drop
//! push_timeout_ms = 250    # bound on backpressure wait in block mode
//!
//! [receive]
//! default_timeout_ms = 1000
//!
//! [shutdown]
//! grace_ms = 1000
//!
//! [encoding]
//! allow_json = false
//!
//! [transport]
//! mode = "memory"
//! channel_capacity = 1024
//! max_body_size = 16777216
//!
//! [transport.reconnect]
//! max_attempts = 5
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! ```

use crate::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use transport::TransportSettings;

/// Main relay configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub relay: RelaySettings,
    pub buffer: BufferConfig,
    pub receive: ReceiveConfig,
    pub shutdown: ShutdownConfig,
    pub encoding: EncodingConfig,
    pub transport: TransportSettings,
}

/// Identity of the relay instance
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Human-readable name, used in logs
    pub name: String,
    /// Optional description
    pub description: Option<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            name: "relay".to_string(),
            description: None,
        }
    }
}

/// Buffer capacity and overflow behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Per-destination capacity; omit for unbounded
    pub capacity: Option<usize>,

    /// What a full queue does with an incoming message
    pub overflow: OverflowPolicy,

    /// Bound on how long a push may wait for space in `block` mode
    /// (milliseconds)
    pub push_timeout_ms: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: Some(1024),
            overflow: OverflowPolicy::Block,
            push_timeout_ms: 250,
        }
    }
}

impl BufferConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}

/// Overflow policy for a bounded buffer. Either way the outcome is logged,
/// never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Backpressure: wait up to `push_timeout_ms` for space, then drop
    Block,
    /// Drop the incoming message immediately
    Drop,
}

/// Blocking-receive behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Timeout applied when the caller does not pass one (milliseconds).
    /// Kept short so verification stays fast.
    pub default_timeout_ms: u64,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 1_000,
        }
    }
}

impl ReceiveConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

/// Shutdown behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long `stop()` waits for listener tasks before aborting them
    /// (milliseconds)
    pub grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_ms: 1_000 }
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Outbound payload encoding policy
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Accept `Payload::Json` on `send`. Off by default: text and raw
    /// bytes are the only encodings the relay owns; anything structured is
    /// the caller's job unless this is switched on.
    pub allow_json: bool,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RelayResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> RelayResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| RelayError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> RelayResult<()> {
        if self.relay.name.is_empty() {
            return Err(RelayError::Config("relay.name must not be empty".into()));
        }
        if self.buffer.capacity == Some(0) {
            return Err(RelayError::Config(
                "buffer.capacity must be > 0 (omit for unbounded)".into(),
            ));
        }
        if self.buffer.push_timeout_ms == 0 {
            return Err(RelayError::Config(
                "buffer.push_timeout_ms must be > 0".into(),
            ));
        }
        if self.receive.default_timeout_ms == 0 {
            return Err(RelayError::Config(
                "receive.default_timeout_ms must be > 0".into(),
            ));
        }
        if self.shutdown.grace_ms == 0 {
            return Err(RelayError::Config("shutdown.grace_ms must be > 0".into()));
        }
        self.transport
            .validate()
            .map_err(|e| RelayError::Config(e.to_string()))
    }
}
