//! In-process transport binding.
//!
//! A broker in miniature: named destinations, each fanning out to the
//! subscribers registered on it. Delivery order per destination follows
//! publish order. `close()` severs every subscription and fails subsequent
//! operations, which is how tests exercise transport loss without a real
//! broker falling over.

use crate::{Result, Subscription, Transport, TransportError, TransportSettings, WireMessage};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// In-process transport with per-destination fan-out
#[derive(Debug)]
pub struct MemoryTransport {
    /// Subscriber delivery channels, keyed by destination
    destinations: DashMap<String, Vec<mpsc::Sender<WireMessage>>>,

    /// Capacity of each subscriber's delivery channel
    channel_capacity: usize,

    /// Maximum accepted envelope body size
    max_body_size: usize,

    /// Set once by `close()`; never cleared
    closed: AtomicBool,
}

impl MemoryTransport {
    /// Create a transport with default settings
    pub fn new() -> Self {
        Self::with_settings(&TransportSettings::default())
            .expect("default transport settings are valid")
    }

    /// Create a transport from validated settings
    pub fn with_settings(settings: &TransportSettings) -> Result<Self> {
        settings.validate()?;
        if settings.mode != "memory" {
            return Err(TransportError::invalid_config(format!(
                "memory transport cannot bind mode '{}'",
                settings.mode
            )));
        }

        Ok(Self {
            destinations: DashMap::new(),
            channel_capacity: settings.channel_capacity,
            max_body_size: settings.max_body_size,
            closed: AtomicBool::new(false),
        })
    }

    /// Sever all subscriptions and fail subsequent operations.
    ///
    /// Simulates the broker becoming unreachable; the transport stays closed
    /// until a new instance replaces it.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.destinations.clear();
        debug!("memory transport closed");
    }

    /// Number of live subscribers on a destination
    pub fn subscriber_count(&self, destination: &str) -> usize {
        self.destinations
            .get(destination)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, destination: &str, message: WireMessage) -> Result<()> {
        self.ensure_open()?;

        if message.size() > self.max_body_size {
            return Err(TransportError::message_too_large(
                message.size(),
                self.max_body_size,
            ));
        }

        // Snapshot the subscriber list so no map shard is held across await
        let subscribers: Vec<mpsc::Sender<WireMessage>> = match self.destinations.get(destination)
        {
            Some(entry) => entry.value().clone(),
            None => {
                debug!(destination, "publish to destination without subscribers, dropped");
                return Ok(());
            }
        };

        let mut delivered = 0usize;
        let mut dead = 0usize;
        for tx in &subscribers {
            match tx.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => dead += 1,
            }
        }

        if dead > 0 {
            // Prune delivery channels whose subscriber went away
            if let Some(mut entry) = self.destinations.get_mut(destination) {
                entry.retain(|tx| !tx.is_closed());
            }
            warn!(destination, dead, "pruned dead subscribers during publish");
        }

        debug!(destination, delivered, "published envelope");
        Ok(())
    }

    async fn subscribe(&self, destination: &str) -> Result<Subscription> {
        self.ensure_open()
            .map_err(|_| TransportError::subscribe_failed(destination, "transport closed"))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.destinations
            .entry(destination.to_string())
            .or_default()
            .push(tx);

        debug!(destination, "subscription registered");
        Ok(Subscription::new(destination, rx))
    }

    fn is_healthy(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}
