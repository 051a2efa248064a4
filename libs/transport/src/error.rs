//! Transport error taxonomy.
//!
//! Errors are split between connection-level failures (the binding itself is
//! unusable) and per-operation failures (one publish or subscribe went
//! wrong). Callers use the classifiers to decide whether a retry can help.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection to the underlying broker/medium could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport has been shut down; no further traffic is possible
    #[error("transport closed")]
    Closed,

    /// A publish to a specific destination failed
    #[error("publish to '{destination}' failed: {reason}")]
    PublishFailed { destination: String, reason: String },

    /// A subscription on a specific destination could not be created
    #[error("subscribe on '{destination}' failed: {reason}")]
    SubscribeFailed { destination: String, reason: String },

    /// Envelope body exceeds the binding's size limit
    #[error("message too large: {size}B exceeds limit of {limit}B")]
    MessageTooLarge { size: usize, limit: usize },

    /// Settings were rejected by the binding
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Whether retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TransportError::PublishFailed { .. } | TransportError::SubscribeFailed { .. }
        )
    }

    /// Whether the transport itself is unusable (restart required)
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed(_) | TransportError::Closed
        )
    }

    /// Create a connection failed error
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        TransportError::ConnectionFailed(msg.into())
    }

    /// Create a publish failed error
    pub fn publish_failed(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::PublishFailed {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Create a subscribe failed error
    pub fn subscribe_failed(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::SubscribeFailed {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Create a message too large error
    pub fn message_too_large(size: usize, limit: usize) -> Self {
        TransportError::MessageTooLarge { size, limit }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        TransportError::InvalidConfig(msg.into())
    }
}
