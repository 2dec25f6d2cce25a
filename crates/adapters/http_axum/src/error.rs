//! HTTP error response mapping.

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use serde::Serialize;

use servient_domain::error::{CodecError, ThingError};

/// JSON error body returned by every failing request.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps dispatch failures to an HTTP response with an appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    /// The runtime rejected the operation.
    Thing(ThingError),
    /// Nothing is registered at the request path.
    NoRoute(String),
    /// A listener is registered at the path but does not serve this method.
    MethodNotAllowed { method: Method, path: String },
    /// The request body could not be read.
    Body(axum::Error),
    /// The request body exceeds the accepted size.
    PayloadTooLarge { limit: usize },
}

impl ApiError {
    /// Classify a body read failure, separating the length limit from I/O errors.
    pub(crate) fn from_body(err: axum::Error, limit: usize) -> Self {
        let inner = err.into_inner();
        let inner = match inner.downcast::<axum::Error>() {
            Ok(nested) => (*nested).into_inner(),
            Err(inner) => inner,
        };
        if inner.is::<LengthLimitError>() {
            Self::PayloadTooLarge { limit }
        } else {
            Self::Body(axum::Error::new(inner))
        }
    }
}

impl From<ThingError> for ApiError {
    fn from(err: ThingError) -> Self {
        Self::Thing(err)
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        Self::Thing(ThingError::Codec(err))
    }
}

fn thing_status(err: &ThingError) -> StatusCode {
    match err {
        ThingError::Validation(_) => StatusCode::BAD_REQUEST,
        ThingError::NotFound(_) => StatusCode::NOT_FOUND,
        ThingError::NoHandler(_) => StatusCode::NOT_IMPLEMENTED,
        ThingError::Codec(CodecError::UnsupportedMediaType(_)) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        ThingError::Codec(_) => StatusCode::BAD_REQUEST,
        ThingError::Gone(_) => StatusCode::GONE,
        ThingError::Handler(_) | ThingError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Thing(err) => {
                let status = thing_status(err);
                let message = match err {
                    ThingError::Codec(codec) => codec.to_string(),
                    ThingError::Validation(validation) => validation.to_string(),
                    ThingError::NotFound(not_found) => not_found.to_string(),
                    ThingError::NoHandler(no_handler) => no_handler.to_string(),
                    ThingError::Configuration(configuration) => configuration.to_string(),
                    ThingError::Handler(_) | ThingError::Gone(_) => err.to_string(),
                };
                if status.is_server_error() {
                    tracing::error!(error = %message, "interaction failed");
                }
                (status, message)
            }
            Self::NoRoute(path) => (StatusCode::NOT_FOUND, format!("nothing exposed at `{path}`")),
            Self::MethodNotAllowed { method, path } => (
                StatusCode::METHOD_NOT_ALLOWED,
                format!("`{method}` is not supported on `{path}`"),
            ),
            Self::Body(err) => (
                StatusCode::BAD_REQUEST,
                format!("failed to read request body: {err}"),
            ),
            Self::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body exceeds {limit} bytes"),
            ),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
