//! Transport settings.
//!
//! Connection parameters (address, port, credentials) are opaque values
//! handed through from the environment; the relay never interprets them.
//! The reconnect policy bounds how hard a listener leans on a transport that
//! dropped its subscription before giving up.

use crate::TransportError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and delivery settings for a transport binding
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Binding mode ("memory" is the in-process binding shipped here)
    pub mode: String,

    /// Broker address for networked bindings
    pub address: Option<String>,

    /// Broker port for networked bindings
    pub port: Option<u16>,

    /// Per-subscription delivery channel capacity
    pub channel_capacity: usize,

    /// Maximum envelope body size in bytes
    pub max_body_size: usize,

    /// Resubscribe backoff policy applied when a subscription drops
    pub reconnect: ReconnectPolicy,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            mode: "memory".to_string(),
            address: None,
            port: None,
            channel_capacity: 1024,
            max_body_size: crate::DEFAULT_MAX_BODY_SIZE,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl TransportSettings {
    /// Validate settings before handing them to a binding
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.mode.is_empty() {
            return Err(TransportError::invalid_config("mode must not be empty"));
        }
        if self.channel_capacity == 0 {
            return Err(TransportError::invalid_config(
                "channel_capacity must be > 0",
            ));
        }
        if self.max_body_size == 0 {
            return Err(TransportError::invalid_config("max_body_size must be > 0"));
        }
        self.reconnect.validate()
    }
}

/// Bounded exponential backoff for resubscribe attempts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts before the transport is declared unavailable
    pub max_attempts: u32,

    /// Delay before the first attempt (milliseconds)
    pub initial_backoff_ms: u64,

    /// Ceiling on the per-attempt delay (milliseconds)
    pub max_backoff_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 50,
            max_backoff_ms: 1_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-based), doubling up to the ceiling
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Validate policy parameters
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_attempts == 0 {
            return Err(TransportError::invalid_config("max_attempts must be > 0"));
        }
        if self.initial_backoff_ms == 0 {
            return Err(TransportError::invalid_config(
                "initial_backoff_ms must be > 0",
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(TransportError::invalid_config(
                "max_backoff_ms must be >= initial_backoff_ms",
            ));
        }
        Ok(())
    }
}
