//! # Outbound Sender
//!
//! Translates an application message into the transport envelope: headers
//! are copied verbatim into delivery properties, the payload is encoded
//! according to its declared type. Encoding is deliberately narrow — text
//! and raw bytes always, JSON only when configuration says so — and a
//! payload the sender cannot encode fails loudly rather than being
//! serialized on a guess.

use crate::config::EncodingConfig;
use crate::message::{content_type, MessageHeaders, Payload};
use crate::{RelayError, RelayResult};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;
use transport::{Transport, TransportError, WireMessage};

/// Encodes and publishes application messages
#[derive(Debug, Clone)]
pub struct OutboundSender {
    transport: Arc<dyn Transport>,
    allow_json: bool,
}

impl OutboundSender {
    pub(crate) fn new(transport: Arc<dyn Transport>, encoding: &EncodingConfig) -> Self {
        Self {
            transport,
            allow_json: encoding.allow_json,
        }
    }

    /// Encode `payload`, attach `headers`, and publish to `destination`
    pub async fn send(
        &self,
        payload: Payload,
        headers: MessageHeaders,
        destination: &str,
    ) -> RelayResult<()> {
        let (body, content_type) = self.encode(payload)?;
        let size = body.len();
        let wire = WireMessage::with_properties(body, content_type, headers.into_map());

        self.transport
            .publish(destination, wire)
            .await
            .map_err(map_transport_error)?;

        debug!(destination, size, content_type, "sent message");
        Ok(())
    }

    fn encode(&self, payload: Payload) -> RelayResult<(Bytes, &'static str)> {
        match payload {
            Payload::Text(text) => Ok((Bytes::from(text.into_bytes()), content_type::TEXT)),
            Payload::Binary(bytes) => Ok((bytes, content_type::BINARY)),
            Payload::Json(value) if self.allow_json => {
                let encoded = serde_json::to_vec(&value).map_err(|e| {
                    RelayError::Config(format!("json payload failed to serialize: {e}"))
                })?;
                Ok((Bytes::from(encoded), content_type::JSON))
            }
            other @ Payload::Json(_) => Err(RelayError::UnsupportedPayload {
                kind: other.kind(),
            }),
        }
    }
}

/// Connection-level transport failures are fatal to the relay instance;
/// everything else passes through as-is
fn map_transport_error(error: TransportError) -> RelayError {
    if error.is_connection_error() {
        RelayError::TransportUnavailable(error.to_string())
    } else {
        RelayError::Transport(error)
    }
}
