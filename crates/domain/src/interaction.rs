//! Interaction kinds and canonical interaction paths.
//!
//! Every interaction of a Thing titled `lamp` is reachable at exactly one path:
//!
//! | Kind | Path |
//! |------|------|
//! | Thing description | `/lamp` |
//! | Property `on` | `/lamp/properties/on` |
//! | Action `toggle` | `/lamp/actions/toggle` |
//! | Event `overheated` | `/lamp/events/overheated` |
//!
//! Paths are kept unescaped inside the runtime. [`encode_path`] produces the
//! URI form advertised in forms and [`decode_path`] maps a request path back.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The three kinds of interaction affordance a Thing can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Property,
    Action,
    Event,
}

impl InteractionKind {
    /// All kinds, in description order.
    pub const ALL: [Self; 3] = [Self::Property, Self::Action, Self::Event];

    /// Path segment grouping interactions of this kind.
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Property => "properties",
            Self::Action => "actions",
            Self::Event => "events",
        }
    }

    /// Canonical path of the interaction `name` below `thing_path`.
    #[must_use]
    pub fn path(self, thing_path: &str, name: &str) -> String {
        format!("{thing_path}/{}/{name}", self.segment())
    }

    /// Check that `name` can be used as a path segment.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] for an empty name and
    /// [`ValidationError::InvalidName`] when the name contains a `/`.
    pub fn validate_name(self, name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyName(self));
        }
        if name.contains('/') {
            return Err(ValidationError::InvalidName {
                kind: self,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Property => "property",
            Self::Action => "action",
            Self::Event => "event",
        })
    }
}

/// Path at which a Thing's own description is served.
#[must_use]
pub fn thing_path(title: &str) -> String {
    format!("/{title}")
}

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode every segment of an unescaped path.
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a request path into its unescaped form.
///
/// Returns `None` when the escapes do not decode to UTF-8.
#[must_use]
pub fn decode_path(path: &str) -> Option<String> {
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_canonical_paths() {
        let base = thing_path("lamp");
        assert_eq!(base, "/lamp");
        assert_eq!(
            InteractionKind::Property.path(&base, "on"),
            "/lamp/properties/on"
        );
        assert_eq!(
            InteractionKind::Action.path(&base, "toggle"),
            "/lamp/actions/toggle"
        );
        assert_eq!(
            InteractionKind::Event.path(&base, "overheated"),
            "/lamp/events/overheated"
        );
    }

    #[test]
    fn should_reject_empty_name() {
        let result = InteractionKind::Action.validate_name("");
        assert_eq!(
            result,
            Err(ValidationError::EmptyName(InteractionKind::Action))
        );
    }

    #[test]
    fn should_reject_name_with_slash() {
        let result = InteractionKind::Property.validate_name("a/b");
        assert!(matches!(result, Err(ValidationError::InvalidName { .. })));
    }

    #[test]
    fn should_escape_segments_but_keep_separators() {
        assert_eq!(
            encode_path("/my lamp/properties/50%?"),
            "/my%20lamp/properties/50%25%3F"
        );
        assert_eq!(encode_path("/lamp/actions/toggle"), "/lamp/actions/toggle");
    }

    #[test]
    fn should_decode_what_was_encoded() {
        let path = InteractionKind::Event.path(&thing_path("my lamp"), "über hitze");
        assert_eq!(decode_path(&encode_path(&path)).as_deref(), Some(path.as_str()));
        assert_eq!(decode_path("/bad%FF"), None);
    }

    #[test]
    fn should_display_singular_kind() {
        assert_eq!(InteractionKind::Property.to_string(), "property");
        assert_eq!(InteractionKind::Event.to_string(), "event");
    }
}
