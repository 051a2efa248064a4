//! # Message Model
//!
//! ## Purpose
//! Defines the two message shapes the relay deals in: [`Payload`], what a
//! caller hands to `send` before encoding, and [`Message`], what a
//! `receive` call hands back after delivery. A delivered message is
//! immutable: payload bytes, content-type hint, and headers are fixed at
//! construction and only read afterwards.
//!
//! ## Encoding Boundary
//! The relay encodes payloads into bytes on the way out and never decodes
//! on the way in. [`Message::as_text`] and [`Message::json`] are
//! conveniences for the verifying caller; they do not change what was
//! delivered.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use transport::WireMessage;

/// Content-type hints attached to encoded payloads
pub mod content_type {
    pub const TEXT: &str = "text/plain; charset=utf-8";
    pub const BINARY: &str = "application/octet-stream";
    pub const JSON: &str = "application/json";
}

/// String-keyed message headers, keys unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders(HashMap<String, String>);

impl MessageHeaders {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a header, returning the previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a header value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume into the underlying map (used when building wire envelopes)
    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }
}

impl From<HashMap<String, String>> for MessageHeaders {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MessageHeaders {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// A delivered message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    content_type: String,
    headers: MessageHeaders,
}

impl Message {
    /// Construct a message from already-encoded parts
    pub fn new(
        payload: impl Into<Bytes>,
        content_type: impl Into<String>,
        headers: MessageHeaders,
    ) -> Self {
        Self {
            payload: payload.into(),
            content_type: content_type.into(),
            headers,
        }
    }

    /// Convert a delivered wire envelope, preserving body and properties
    /// byte-for-byte
    pub(crate) fn from_wire(wire: WireMessage) -> Self {
        Self {
            payload: wire.body,
            content_type: wire.content_type,
            headers: MessageHeaders(wire.properties),
        }
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Content-type hint the payload was encoded under
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Delivery headers
    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Caller-side decode: payload as UTF-8 text, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Caller-side decode: payload as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }
}

/// What a caller hands to `send` before encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// UTF-8 text, encoded as its bytes
    Text(String),
    /// Raw bytes, passed through untouched
    Binary(Bytes),
    /// Structured JSON; encodable only when enabled in `[encoding]`
    Json(serde_json::Value),
}

impl Payload {
    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Binary(_) => "binary",
            Payload::Json(_) => "json",
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(bytes))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_builder() {
        let headers = MessageHeaders::new()
            .with("correlation-id", "abc-123")
            .with("source", "stub");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("correlation-id"), Some("abc-123"));
        assert!(headers.contains("source"));
        assert!(!headers.contains("missing"));
    }

    #[test]
    fn test_headers_keys_unique() {
        let mut headers = MessageHeaders::new();
        assert_eq!(headers.insert("key", "first"), None);
        assert_eq!(headers.insert("key", "second"), Some("first".to_string()));
        assert_eq!(headers.get("key"), Some("second"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_message_from_wire_preserves_everything() {
        let mut props = HashMap::new();
        props.insert("trace".to_string(), "t-1".to_string());
        let wire = WireMessage::with_properties(
            &b"{\"eligible\":true}"[..],
            content_type::JSON,
            props,
        );

        let message = Message::from_wire(wire);
        assert_eq!(message.payload(), b"{\"eligible\":true}");
        assert_eq!(message.content_type(), content_type::JSON);
        assert_eq!(message.headers().get("trace"), Some("t-1"));
        assert_eq!(message.size(), 17);
    }

    #[test]
    fn test_caller_side_decoding() {
        let message = Message::new(&b"{\"eligible\":false}"[..], content_type::JSON, MessageHeaders::new());

        assert_eq!(message.as_text(), Some("{\"eligible\":false}"));
        let value: serde_json::Value = message.json().unwrap();
        assert_eq!(value["eligible"], serde_json::Value::Bool(false));

        let binary = Message::new(vec![0xff, 0xfe], content_type::BINARY, MessageHeaders::new());
        assert_eq!(binary.as_text(), None);
    }

    #[test]
    fn test_payload_kinds() {
        assert_eq!(Payload::from("hi").kind(), "text");
        assert_eq!(Payload::from(vec![1u8, 2]).kind(), "binary");
        assert_eq!(Payload::from(serde_json::json!({"a": 1})).kind(), "json");
    }
}
