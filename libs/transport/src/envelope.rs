//! Transport-native message envelope.
//!
//! The envelope is what actually travels over a transport binding: an opaque
//! byte body, a content-type hint describing how the body was encoded, and
//! string-keyed properties copied verbatim from application headers. The
//! transport never inspects the body.

use bytes::Bytes;
use std::collections::HashMap;

/// Maximum envelope body size accepted by default (16MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// A message in the transport's wire shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Raw body bytes, opaque to the transport
    pub body: Bytes,

    /// Content-type hint for the body (e.g. "text/plain; charset=utf-8")
    pub content_type: String,

    /// String-keyed delivery properties, keys unique
    pub properties: HashMap<String, String>,
}

impl WireMessage {
    /// Create an envelope with no properties
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Create an envelope carrying delivery properties
    pub fn with_properties(
        body: impl Into<Bytes>,
        content_type: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            properties,
        }
    }

    /// Look up a single delivery property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Body size in bytes
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_construction() {
        let wire = WireMessage::new(&b"hello"[..], "text/plain; charset=utf-8");
        assert_eq!(wire.size(), 5);
        assert_eq!(wire.content_type, "text/plain; charset=utf-8");
        assert!(wire.properties.is_empty());
    }

    #[test]
    fn test_properties_preserved() {
        let mut props = HashMap::new();
        props.insert("correlation-id".to_string(), "abc-123".to_string());
        props.insert("source".to_string(), "stub".to_string());

        let wire = WireMessage::with_properties(&b"{}"[..], "application/json", props);
        assert_eq!(wire.property("correlation-id"), Some("abc-123"));
        assert_eq!(wire.property("source"), Some("stub"));
        assert_eq!(wire.property("missing"), None);
    }
}
