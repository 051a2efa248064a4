//! # Inbound Listener
//!
//! One task per subscribed destination. The task drains the transport
//! subscription into the buffer and nothing else; conversion plus buffer
//! insertion is the whole cost charged to the delivery path. If the
//! subscription stream ends while the relay is running, the listener
//! re-subscribes under the transport's bounded backoff policy and declares
//! the transport unavailable once attempts run out.

use crate::buffer::MessageBuffer;
use crate::message::Message;
use crate::relay::RelayState;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use transport::{ReconnectPolicy, Subscription, Transport};
use tracing::{debug, error, info, warn};

/// Handle to a spawned listener task
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    pub destination: String,
    pub task: JoinHandle<()>,
}

/// Spawn the listener task for one destination
pub(crate) fn spawn(
    subscription: Subscription,
    transport: Arc<dyn Transport>,
    buffer: Arc<MessageBuffer>,
    reconnect: ReconnectPolicy,
    state: watch::Receiver<RelayState>,
) -> ListenerHandle {
    let destination = subscription.destination().to_string();
    let task = tokio::spawn(run(
        subscription,
        transport,
        buffer,
        reconnect,
        state,
    ));
    ListenerHandle { destination, task }
}

async fn run(
    mut subscription: Subscription,
    transport: Arc<dyn Transport>,
    buffer: Arc<MessageBuffer>,
    reconnect: ReconnectPolicy,
    mut state: watch::Receiver<RelayState>,
) {
    let destination = subscription.destination().to_string();
    debug!(%destination, "listener started");

    loop {
        tokio::select! {
            delivered = subscription.next() => match delivered {
                Some(wire) => {
                    buffer.push(&destination, Message::from_wire(wire)).await;
                }
                None => {
                    // Subscription severed under us; only fight back while
                    // the relay still wants to run
                    if !state.borrow().is_active() {
                        break;
                    }
                    match resubscribe(&destination, transport.as_ref(), &reconnect).await {
                        Some(renewed) => {
                            info!(%destination, "listener re-subscribed after stream loss");
                            subscription = renewed;
                        }
                        None => {
                            error!(
                                %destination,
                                attempts = reconnect.max_attempts,
                                "transport unavailable, listener giving up; relay restart required"
                            );
                            break;
                        }
                    }
                }
            },
            changed = state.changed() => {
                if changed.is_err() || !state.borrow().is_active() {
                    break;
                }
            }
        }
    }

    debug!(%destination, "listener stopped");
}

/// Bounded backoff resubscribe; `None` once the policy is exhausted
async fn resubscribe(
    destination: &str,
    transport: &dyn Transport,
    policy: &ReconnectPolicy,
) -> Option<Subscription> {
    for attempt in 1..=policy.max_attempts {
        let delay = policy.delay(attempt);
        warn!(
            destination,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "subscription lost, retrying"
        );
        tokio::time::sleep(delay).await;

        match transport.subscribe(destination).await {
            Ok(subscription) => return Some(subscription),
            Err(e) => {
                warn!(destination, attempt, error = %e, "resubscribe attempt failed");
            }
        }
    }
    None
}
