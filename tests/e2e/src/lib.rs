//! Shared fixtures for relay end-to-end scenarios.

use relay::{MessageHeaders, Relay, RelayConfig, RelayResult};
use serde::Deserialize;
use std::sync::Once;

/// Destination the verification scenarios listen on
pub const VERIFICATIONS: &str = "verifications";

static TRACING: Once = Once::new();

/// Install the fmt subscriber once per test binary; `RUST_LOG` controls
/// verbosity
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Decoded verification payload produced by the canned triggers
#[derive(Debug, Deserialize)]
pub struct Verification {
    pub eligible: bool,
}

/// A relay wired the way the verification scenarios expect: one listener
/// on [`VERIFICATIONS`] plus `positive`/`negative` canned triggers
/// publishing eligibility verdicts there.
pub fn verification_relay() -> RelayResult<Relay> {
    init_tracing();
    Relay::builder(RelayConfig::default())
        .listen_on(VERIFICATIONS)
        .trigger_message(
            "positive",
            VERIFICATIONS,
            r#"{"eligible":true}"#,
            MessageHeaders::new().with("source", "stub"),
        )
        .trigger_message(
            "negative",
            VERIFICATIONS,
            r#"{"eligible":false}"#,
            MessageHeaders::new().with("source", "stub"),
        )
        .build()
}
