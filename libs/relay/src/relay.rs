//! # Relay Handle and Lifecycle
//!
//! ## Purpose
//! Assembles transport, buffer, sender, receiver, and trigger dispatcher
//! into one handle behind an explicit lifecycle, replacing any
//! container-managed wiring with construction in dependency order and
//! state transitions a caller drives directly.
//!
//! ## State Machine
//! ```text
//! Stopped → Starting → Running → Stopping → Stopped
//!              ↓           ↓
//!          listeners    send / receive / trigger valid
//!          subscribe    only here
//! ```
//!
//! `start()` subscribes one listener per configured destination during
//! `Starting` and only then reports `Running`. `stop()` unblocks pending
//! receives, gives listener tasks the configured grace period to wind
//! down, discards whatever is still buffered, and lands back in
//! `Stopped`. The three operational entry points fail with `NotRunning`
//! in every state but `Running`.

use crate::buffer::MessageBuffer;
use crate::config::RelayConfig;
use crate::listener::{self, ListenerHandle};
use crate::message::{Message, MessageHeaders, Payload};
use crate::receiver::BlockingReceiver;
use crate::sender::OutboundSender;
use crate::trigger::TriggerDispatcher;
use crate::{RelayError, RelayResult};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::timeout_at;
use tracing::{debug, info, instrument, warn};
use transport::{MemoryTransport, Transport};

/// Lifecycle state of a relay instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl RelayState {
    /// Whether listeners should keep consuming in this state
    pub fn is_active(&self) -> bool {
        matches!(self, RelayState::Starting | RelayState::Running)
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Stopped => "stopped",
            RelayState::Starting => "starting",
            RelayState::Running => "running",
            RelayState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// A canned trigger registration collected by the builder
struct CannedTrigger {
    name: String,
    destination: String,
    payload: Payload,
    headers: MessageHeaders,
}

/// Builder assembling a relay in dependency order
pub struct RelayBuilder {
    config: RelayConfig,
    transport: Option<Arc<dyn Transport>>,
    destinations: Vec<String>,
    canned: Vec<CannedTrigger>,
}

impl RelayBuilder {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            transport: None,
            destinations: Vec::new(),
            canned: Vec::new(),
        }
    }

    /// Use a specific transport binding instead of resolving one from
    /// `[transport]` settings
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Subscribe a listener on this destination when the relay starts
    pub fn listen_on(mut self, destination: impl Into<String>) -> Self {
        self.destinations.push(destination.into());
        self
    }

    /// Register a trigger that publishes a fixed message to a fixed
    /// destination — the shape verification scenarios use to simulate an
    /// upstream event
    pub fn trigger_message(
        mut self,
        name: impl Into<String>,
        destination: impl Into<String>,
        payload: impl Into<Payload>,
        headers: MessageHeaders,
    ) -> Self {
        self.canned.push(CannedTrigger {
            name: name.into(),
            destination: destination.into(),
            payload: payload.into(),
            headers,
        });
        self
    }

    /// Construct the relay. The instance starts in `Stopped`; nothing
    /// touches the transport until `start()`.
    pub fn build(self) -> RelayResult<Relay> {
        self.config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => match self.config.transport.mode.as_str() {
                "memory" => Arc::new(MemoryTransport::with_settings(&self.config.transport)?),
                other => {
                    return Err(RelayError::Config(format!(
                        "no transport binding available for mode '{other}'"
                    )))
                }
            },
        };

        let mut destinations = Vec::new();
        for destination in self.destinations {
            if destinations.contains(&destination) {
                debug!(%destination, "duplicate listen_on ignored");
            } else {
                destinations.push(destination);
            }
        }

        let (state_tx, state_rx) = watch::channel(RelayState::Stopped);
        let buffer = Arc::new(MessageBuffer::new(&self.config.buffer));
        let sender = OutboundSender::new(transport.clone(), &self.config.encoding);
        let receiver = BlockingReceiver::new(
            buffer.clone(),
            self.config.receive.default_timeout(),
            state_rx,
        );
        let dispatcher = TriggerDispatcher::new();

        let relay = Relay {
            inner: Arc::new(RelayInner {
                config: self.config,
                transport,
                buffer,
                sender,
                receiver,
                dispatcher,
                state_tx,
                listeners: Mutex::new(Vec::new()),
                destinations,
            }),
        };

        for canned in self.canned {
            relay.register_canned_trigger(
                canned.name,
                canned.destination,
                canned.payload,
                canned.headers,
            );
        }

        Ok(relay)
    }
}

/// The assembled relay. Cheap to clone; all clones share one instance.
#[derive(Debug, Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

#[derive(Debug)]
struct RelayInner {
    config: RelayConfig,
    transport: Arc<dyn Transport>,
    buffer: Arc<MessageBuffer>,
    sender: OutboundSender,
    receiver: BlockingReceiver,
    dispatcher: TriggerDispatcher,
    state_tx: watch::Sender<RelayState>,
    listeners: Mutex<Vec<ListenerHandle>>,
    destinations: Vec<String>,
}

impl Relay {
    /// Start building a relay from configuration
    pub fn builder(config: RelayConfig) -> RelayBuilder {
        RelayBuilder::new(config)
    }

    /// Current lifecycle state
    pub fn state(&self) -> RelayState {
        *self.inner.state_tx.borrow()
    }

    /// Whether operations are currently valid
    pub fn is_running(&self) -> bool {
        self.state() == RelayState::Running
    }

    /// Messages currently buffered for a destination
    pub fn buffer_depth(&self, destination: &str) -> usize {
        self.inner.buffer.depth(destination)
    }

    /// Subscribe listeners and move to `Running`.
    ///
    /// Valid only from `Stopped`. A subscription failure rolls the relay
    /// back to `Stopped` and surfaces `TransportUnavailable`.
    #[instrument(skip(self), fields(relay = %self.inner.config.relay.name))]
    pub async fn start(&self) -> RelayResult<()> {
        self.transition(RelayState::Stopped, RelayState::Starting)
            .map_err(|state| RelayError::InvalidState {
                operation: "start",
                state,
            })?;
        info!("starting relay");

        let mut handles = Vec::new();
        for destination in &self.inner.destinations {
            match self.inner.transport.subscribe(destination).await {
                Ok(subscription) => {
                    handles.push(listener::spawn(
                        subscription,
                        self.inner.transport.clone(),
                        self.inner.buffer.clone(),
                        self.inner.config.transport.reconnect.clone(),
                        self.inner.state_tx.subscribe(),
                    ));
                }
                Err(e) => {
                    warn!(%destination, error = %e, "listener subscription failed, rolling back start");
                    for handle in handles {
                        handle.task.abort();
                    }
                    self.inner.state_tx.send_replace(RelayState::Stopped);
                    return Err(RelayError::TransportUnavailable(e.to_string()));
                }
            }
        }

        let listener_count = handles.len();
        *self.inner.listeners.lock().await = handles;

        self.transition(RelayState::Starting, RelayState::Running)
            .map_err(|state| RelayError::InvalidState {
                operation: "start",
                state,
            })?;
        info!(listeners = listener_count, "relay running");
        Ok(())
    }

    /// Stop the relay: unblock pending receives, wind down listeners
    /// within the shutdown grace period, discard what is still buffered.
    ///
    /// Valid only from `Running`.
    #[instrument(skip(self), fields(relay = %self.inner.config.relay.name))]
    pub async fn stop(&self) -> RelayResult<()> {
        self.transition(RelayState::Running, RelayState::Stopping)
            .map_err(|state| RelayError::InvalidState {
                operation: "stop",
                state,
            })?;
        info!("stopping relay");

        let deadline = tokio::time::Instant::now() + self.inner.config.shutdown.grace();
        let mut listeners = self.inner.listeners.lock().await;
        for handle in listeners.drain(..) {
            let destination = handle.destination;
            let mut task = handle.task;
            if timeout_at(deadline, &mut task).await.is_err() {
                warn!(%destination, "listener exceeded shutdown grace, aborting");
                task.abort();
            }
        }
        drop(listeners);

        let discarded = self.inner.buffer.drain();
        self.transition(RelayState::Stopping, RelayState::Stopped)
            .map_err(|state| RelayError::InvalidState {
                operation: "stop",
                state,
            })?;
        info!(discarded, "relay stopped");
        Ok(())
    }

    /// Encode and publish a message. Valid only while `Running`.
    pub async fn send(
        &self,
        payload: impl Into<Payload>,
        headers: MessageHeaders,
        destination: &str,
    ) -> RelayResult<()> {
        self.ensure_running()?;
        self.inner.sender.send(payload.into(), headers, destination).await
    }

    /// Receive with the configured default timeout. `Ok(None)` is the
    /// timeout outcome.
    pub async fn receive(&self, destination: &str) -> RelayResult<Option<Message>> {
        self.inner.receiver.receive(destination).await
    }

    /// Receive with an explicit timeout. `Ok(None)` is the timeout
    /// outcome.
    pub async fn receive_timeout(
        &self,
        destination: &str,
        timeout: Duration,
    ) -> RelayResult<Option<Message>> {
        self.inner.receiver.receive_timeout(destination, timeout).await
    }

    /// Run the trigger registered under `name`. Valid only while
    /// `Running`.
    pub async fn trigger(&self, name: &str) -> RelayResult<()> {
        self.ensure_running()?;
        self.inner.dispatcher.dispatch(name).await
    }

    /// Register an arbitrary trigger action
    pub fn register_trigger<F, Fut>(&self, name: impl Into<String>, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RelayResult<()>> + Send + 'static,
    {
        self.inner.dispatcher.register(name, action);
    }

    /// Register a trigger that publishes a fixed message to a fixed
    /// destination
    pub fn register_canned_trigger(
        &self,
        name: impl Into<String>,
        destination: impl Into<String>,
        payload: impl Into<Payload>,
        headers: MessageHeaders,
    ) {
        let sender = self.inner.sender.clone();
        let destination = destination.into();
        let payload = payload.into();
        self.inner.dispatcher.register(name, move || {
            let sender = sender.clone();
            let destination = destination.clone();
            let payload = payload.clone();
            let headers = headers.clone();
            async move { sender.send(payload, headers, &destination).await }
        });
    }

    /// Names of all registered triggers
    pub fn trigger_names(&self) -> Vec<String> {
        self.inner.dispatcher.names()
    }

    fn ensure_running(&self) -> RelayResult<()> {
        let state = self.state();
        if state != RelayState::Running {
            return Err(RelayError::NotRunning(state));
        }
        Ok(())
    }

    /// Compare-and-set state transition; `Err` carries the state that was
    /// actually observed
    fn transition(&self, from: RelayState, to: RelayState) -> Result<(), RelayState> {
        let mut observed = from;
        let changed = self.inner.state_tx.send_if_modified(|state| {
            observed = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            Ok(())
        } else {
            Err(observed)
        }
    }
}
