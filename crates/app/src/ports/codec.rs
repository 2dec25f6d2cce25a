//! Content codec port: value encoding for transports.

use std::sync::Arc;

use serde_json::Value;
use servient_domain::content::Content;
use servient_domain::error::CodecError;

/// Converts raw values into transport-ready [`Content`] and back.
pub trait ContentCodec: Send + Sync {
    /// Encode a value. Called once per emitted event and per response body.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the value cannot be represented.
    fn encode(&self, value: &Value) -> Result<Content, CodecError>;

    /// Decode content received from a transport.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] for unsupported media types or malformed bodies.
    fn decode(&self, content: &Content) -> Result<Value, CodecError>;
}

impl<T: ContentCodec + ?Sized> ContentCodec for Arc<T> {
    fn encode(&self, value: &Value) -> Result<Content, CodecError> {
        (**self).encode(value)
    }

    fn decode(&self, content: &Content) -> Result<Value, CodecError> {
        (**self).decode(content)
    }
}
