//! Content: an encoded value ready to travel over a transport.

use serde::{Deserialize, Serialize};

/// `application/json`
pub const JSON: &str = "application/json";
/// `application/td+json`, the media type of a serialized Thing Description.
pub const TD_JSON: &str = "application/td+json";
/// `text/plain`
pub const TEXT: &str = "text/plain";

/// A media type paired with the bytes it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub media_type: String,
    pub body: Vec<u8>,
}

impl Content {
    #[must_use]
    pub fn new(media_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            media_type: media_type.into(),
            body: body.into(),
        }
    }

    /// Media type without parameters, lower-cased (`Text/Plain; charset=utf-8` → `text/plain`).
    #[must_use]
    pub fn essence(&self) -> String {
        self.media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
