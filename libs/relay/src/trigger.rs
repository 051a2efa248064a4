//! # Trigger Dispatcher
//!
//! Named actions standing in for upstream events: a verification scenario
//! says `trigger("positive")` instead of arranging for a real producer to
//! emit something. The registry maps a name to an action registered at
//! startup; dispatching runs the action exactly once per call and returns
//! when the action returns — publish-and-return, with no waiting on
//! downstream delivery. An unregistered name is an error, never a no-op.

use crate::{RelayError, RelayResult};
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::future::Future;
use tracing::{debug, info};

/// A registered action; boxed so arbitrary async closures fit one shape
type TriggerAction = Box<dyn Fn() -> BoxFuture<'static, RelayResult<()>> + Send + Sync>;

/// Registry of named on-demand actions
#[derive(Default)]
pub struct TriggerDispatcher {
    actions: DashMap<String, TriggerAction>,
}

impl std::fmt::Debug for TriggerDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerDispatcher")
            .field("registered", &self.actions.len())
            .finish()
    }
}

impl TriggerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under a name, replacing any previous action with
    /// the same name
    pub fn register<F, Fut>(&self, name: impl Into<String>, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RelayResult<()>> + Send + 'static,
    {
        let name = name.into();
        let replaced = self
            .actions
            .insert(name.clone(), Box::new(move || Box::pin(action())))
            .is_some();
        if replaced {
            info!(trigger = %name, "replaced existing trigger registration");
        } else {
            debug!(trigger = %name, "registered trigger");
        }
    }

    /// Whether a name has a registered action
    pub fn is_registered(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Names of all registered triggers
    pub fn names(&self) -> Vec<String> {
        self.actions.iter().map(|e| e.key().clone()).collect()
    }

    /// Run the action registered under `name` once.
    ///
    /// Fails with [`RelayError::UnknownTrigger`] when nothing is
    /// registered under the name.
    pub async fn dispatch(&self, name: &str) -> RelayResult<()> {
        let action = {
            // Build the future inside the scope so no registry shard is
            // held across the await
            let entry = self
                .actions
                .get(name)
                .ok_or_else(|| RelayError::UnknownTrigger(name.to_string()))?;
            (entry.value())()
        };

        debug!(trigger = %name, "dispatching trigger");
        action.await
    }
}
