//! # Message Relay
//!
//! In-process relay for verifying asynchronous messaging deterministically:
//! listeners consume a transport's asynchronous deliveries into a FIFO
//! buffer, and a blocking receiver hands them to the caller under a
//! deadline. The outbound sender publishes application messages, and the
//! trigger dispatcher fires named canned events so a test scenario can
//! cause a message without a real upstream producer.
//!
//! The relay exposes three operational entry points — `send`, `receive`,
//! `trigger` — valid only while the instance is running; lifecycle is an
//! explicit `start`/`stop` state machine.

pub mod buffer;
pub mod config;
mod listener;
pub mod message;
pub mod receiver;
pub mod relay;
pub mod sender;
pub mod trigger;

// Re-export commonly used types
pub use buffer::{MessageBuffer, PushOutcome};
pub use config::{
    BufferConfig, EncodingConfig, OverflowPolicy, ReceiveConfig, RelayConfig, RelaySettings,
    ShutdownConfig,
};
pub use message::{content_type, Message, MessageHeaders, Payload};
pub use receiver::BlockingReceiver;
pub use relay::{Relay, RelayBuilder, RelayState};
pub use sender::OutboundSender;
pub use trigger::TriggerDispatcher;

use transport::TransportError;

/// Relay operation errors.
///
/// A receive that merely times out is not in here: it is reported as
/// `Ok(None)` because it is an outcome the caller branches on, not a
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Operation called outside the `Running` state
    #[error("relay is not running (state: {0})")]
    NotRunning(relay::RelayState),

    /// Lifecycle call made from the wrong state
    #[error("{operation} is not valid while the relay is {state}")]
    InvalidState {
        operation: &'static str,
        state: relay::RelayState,
    },

    /// No trigger registered under the name
    #[error("no trigger registered under name '{0}'")]
    UnknownTrigger(String),

    /// The sender has no encoding for this payload type
    #[error("cannot encode {kind} payload for transport delivery")]
    UnsupportedPayload { kind: &'static str },

    /// The transport connection is gone; this relay instance needs an
    /// explicit restart
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Per-operation transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for relay operations
pub type RelayResult<T> = std::result::Result<T, RelayError>;
