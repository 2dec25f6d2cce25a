//! Common error types used across the workspace.
//!
//! [`ThingError`] is the single error type returned by every interaction and
//! registry operation. Each variant wraps a typed source so adapters can map
//! failures to protocol status codes without parsing messages.

use crate::interaction::InteractionKind;

/// Top-level error for operations on an exposed Thing.
#[derive(Debug, thiserror::Error)]
pub enum ThingError {
    /// A name, title or setting broke a domain invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The addressed interaction is not declared.
    #[error("interaction not found")]
    NotFound(#[from] NotFoundError),

    /// An action was invoked before any handler was attached.
    #[error("no handler attached")]
    NoHandler(#[from] NoHandlerError),

    /// A handler was attached to an interaction that is not declared.
    #[error("invalid handler configuration")]
    Configuration(#[from] ConfigurationError),

    /// The application handler failed; its error is carried verbatim.
    #[error(transparent)]
    Handler(anyhow::Error),

    /// A value could not be encoded or decoded.
    #[error("content codec error")]
    Codec(#[from] CodecError),

    /// The Thing was destroyed while a listener still referenced it.
    #[error("thing `{0}` is no longer exposed")]
    Gone(String),
}

impl ThingError {
    /// Shorthand for a [`NotFoundError`].
    #[must_use]
    pub fn not_found(kind: InteractionKind, name: impl Into<String>) -> Self {
        NotFoundError {
            kind,
            name: name.into(),
        }
        .into()
    }
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("thing title must not be empty")]
    EmptyTitle,

    #[error("thing title `{0}` must not contain `/`")]
    InvalidTitle(String),

    #[error("{0} name must not be empty")]
    EmptyName(InteractionKind),

    #[error("{kind} name `{name}` must not contain `/`")]
    InvalidName { kind: InteractionKind, name: String },

    #[error("{0} capacity must be non-zero")]
    ZeroCapacity(&'static str),

    #[error("a thing titled `{0}` is already exposed on this servient")]
    TitleInUse(String),
}

/// No interaction of the given kind and name is declared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {kind} named `{name}`")]
pub struct NotFoundError {
    pub kind: InteractionKind,
    pub name: String,
}

/// The action is declared but has no handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action `{action}` has no handler")]
pub struct NoHandlerError {
    pub action: String,
}

/// Which handler slot a configuration call targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSlot {
    Read,
    Write,
    Action,
}

impl std::fmt::Display for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Action => "action",
        })
    }
}

/// A handler was set for an undeclared interaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot set {slot} handler for unknown {kind} `{name}`")]
pub struct ConfigurationError {
    pub slot: HandlerSlot,
    pub kind: InteractionKind,
    pub name: String,
}

/// Encoding or decoding of a value failed.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported media type `{0}`")]
    UnsupportedMediaType(String),

    #[error("malformed JSON content")]
    Json(#[from] serde_json::Error),

    #[error("content body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
