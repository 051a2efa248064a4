//! Trigger-driven verification scenarios: a named trigger stands in for
//! the upstream event, and the blocking receiver asserts on what came out
//! the other side.

use relay::RelayError;
use relay_e2e_tests::{verification_relay, Verification, VERIFICATIONS};
use std::time::Duration;

#[tokio::test]
async fn positive_trigger_produces_eligible_verification() -> anyhow::Result<()> {
    let relay = verification_relay()?;
    relay.start().await?;

    relay.trigger("positive").await?;

    let message = relay
        .receive_timeout(VERIFICATIONS, Duration::from_secs(1))
        .await?
        .expect("triggered verification should arrive within a second");

    let verification: Verification = message.json()?;
    assert!(verification.eligible);
    assert_eq!(message.headers().get("source"), Some("stub"));

    relay.stop().await?;
    Ok(())
}

#[tokio::test]
async fn negative_trigger_produces_ineligible_verification() -> anyhow::Result<()> {
    let relay = verification_relay()?;
    relay.start().await?;

    relay.trigger("negative").await?;

    let message = relay
        .receive_timeout(VERIFICATIONS, Duration::from_secs(1))
        .await?
        .expect("triggered verification should arrive within a second");

    let verification: Verification = message.json()?;
    assert!(!verification.eligible);

    relay.stop().await?;
    Ok(())
}

#[tokio::test]
async fn unregistered_trigger_name_is_an_error() -> anyhow::Result<()> {
    let relay = verification_relay()?;
    relay.start().await?;

    let result = relay.trigger("no-such-trigger").await;
    match result.unwrap_err() {
        RelayError::UnknownTrigger(name) => assert_eq!(name, "no-such-trigger"),
        other => panic!("expected UnknownTrigger, got {other:?}"),
    }

    // Nothing was published as a side effect
    let outcome = relay
        .receive_timeout(VERIFICATIONS, Duration::from_millis(100))
        .await?;
    assert!(outcome.is_none());

    relay.stop().await?;
    Ok(())
}

#[tokio::test]
async fn triggering_twice_publishes_twice() -> anyhow::Result<()> {
    let relay = verification_relay()?;
    relay.start().await?;

    relay.trigger("positive").await?;
    relay.trigger("positive").await?;

    // Two invocations, two messages — trigger calls are never deduplicated
    for _ in 0..2 {
        let message = relay
            .receive_timeout(VERIFICATIONS, Duration::from_secs(1))
            .await?
            .expect("each trigger call should publish one message");
        let verification: Verification = message.json()?;
        assert!(verification.eligible);
    }

    let extra = relay
        .receive_timeout(VERIFICATIONS, Duration::from_millis(100))
        .await?;
    assert!(extra.is_none(), "exactly two messages expected");

    relay.stop().await?;
    Ok(())
}

#[tokio::test]
async fn trigger_requires_running_relay() -> anyhow::Result<()> {
    let relay = verification_relay()?;

    let result = relay.trigger("positive").await;
    assert!(matches!(result.unwrap_err(), RelayError::NotRunning(_)));
    Ok(())
}

#[tokio::test]
async fn interleaved_triggers_keep_fifo_order() -> anyhow::Result<()> {
    let relay = verification_relay()?;
    relay.start().await?;

    relay.trigger("positive").await?;
    relay.trigger("negative").await?;
    relay.trigger("positive").await?;

    let expected = [true, false, true];
    for eligible in expected {
        let message = relay
            .receive_timeout(VERIFICATIONS, Duration::from_secs(1))
            .await?
            .expect("all triggered messages should arrive");
        let verification: Verification = message.json()?;
        assert_eq!(verification.eligible, eligible);
    }

    relay.stop().await?;
    Ok(())
}
