//! # Blocking Receiver
//!
//! The caller-facing half of the buffer: pop the oldest message for a
//! destination, suspending the caller up to a deadline. `Ok(None)` is the
//! timeout outcome — a branch the verifying caller handles, not a failure.
//! A relay leaving the `Running` state unblocks every in-flight call with
//! [`RelayError::NotRunning`] instead of letting it sleep through teardown.

use crate::buffer::MessageBuffer;
use crate::message::Message;
use crate::relay::RelayState;
use crate::{RelayError, RelayResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Deadline-bounded receive over the shared buffer
#[derive(Debug, Clone)]
pub struct BlockingReceiver {
    buffer: Arc<MessageBuffer>,
    default_timeout: Duration,
    state: watch::Receiver<RelayState>,
}

impl BlockingReceiver {
    pub(crate) fn new(
        buffer: Arc<MessageBuffer>,
        default_timeout: Duration,
        state: watch::Receiver<RelayState>,
    ) -> Self {
        Self {
            buffer,
            default_timeout,
            state,
        }
    }

    /// Receive with the configured default timeout (about one second
    /// unless overridden in `[receive]`)
    pub async fn receive(&self, destination: &str) -> RelayResult<Option<Message>> {
        self.receive_timeout(destination, self.default_timeout).await
    }

    /// Receive with an explicit timeout. Returns `Ok(None)` once the
    /// deadline elapses with nothing delivered.
    pub async fn receive_timeout(
        &self,
        destination: &str,
        timeout: Duration,
    ) -> RelayResult<Option<Message>> {
        let current = *self.state.borrow();
        if current != RelayState::Running {
            return Err(RelayError::NotRunning(current));
        }

        let mut state = self.state.clone();
        tokio::select! {
            popped = self.buffer.pop(destination, timeout) => Ok(popped),
            stopped = state.wait_for(|s| *s != RelayState::Running) => {
                let state = stopped.map(|s| *s).unwrap_or(RelayState::Stopped);
                Err(RelayError::NotRunning(state))
            }
        }
    }
}
