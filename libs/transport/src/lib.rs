//! # Transport Seam
//!
//! The seam between the relay and whatever actually carries messages. The
//! relay speaks two verbs to a transport: publish an envelope to a named
//! destination, and subscribe to a destination to have envelopes delivered.
//! Everything broker-specific (framing, acknowledgements, credentials) stays
//! behind this trait.
//!
//! The in-process [`MemoryTransport`] binding ships with the crate and is
//! what verification runs and tests use; real broker bindings implement the
//! same trait.

pub mod config;
pub mod envelope;
pub mod error;
pub mod memory;

pub use config::{ReconnectPolicy, TransportSettings};
pub use envelope::{WireMessage, DEFAULT_MAX_BODY_SIZE};
pub use error::TransportError;
pub use memory::MemoryTransport;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// A message transport the relay publishes to and subscribes on
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Publish an envelope to a named destination.
    ///
    /// A destination with no live subscribers accepts the publish and drops
    /// the envelope; routing is the broker's concern, not the publisher's.
    async fn publish(&self, destination: &str, message: WireMessage) -> Result<()>;

    /// Subscribe to a destination, returning a handle envelopes are
    /// delivered on in publish order.
    async fn subscribe(&self, destination: &str) -> Result<Subscription>;

    /// Whether the transport can currently carry traffic
    fn is_healthy(&self) -> bool;
}

/// A live subscription to one destination
#[derive(Debug)]
pub struct Subscription {
    destination: String,
    inbox: mpsc::Receiver<WireMessage>,
}

impl Subscription {
    /// Wrap a delivery channel as a subscription handle
    pub fn new(destination: impl Into<String>, inbox: mpsc::Receiver<WireMessage>) -> Self {
        Self {
            destination: destination.into(),
            inbox,
        }
    }

    /// The destination this subscription is bound to
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Next delivered envelope, or `None` once the transport side has
    /// closed the subscription
    pub async fn next(&mut self) -> Option<WireMessage> {
        self.inbox.recv().await
    }
}
