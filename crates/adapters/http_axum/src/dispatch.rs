//! Request dispatch through the listener table.
//!
//! | listener | method | behaviour                                         |
//! |----------|--------|---------------------------------------------------|
//! | thing    | `GET`  | description as `application/td+json`              |
//! | property | `GET`  | encoded value                                     |
//! | property | `PUT`  | decode body, write, `204 No Content`              |
//! | action   | `POST` | decode body (empty = no input), invoke, `200 OK`  |
//! | event    | `GET`  | SSE stream, one `data:` frame per emitted value   |
//!
//! Any other method on a registered path is `405 Method Not Allowed`.
//! Request paths are percent-decoded before the lookup.

use std::convert::Infallible;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::StreamExt;

use servient_app::listener::{EventListener, ResourceListener};
use servient_domain::content::{Content, JSON};
use servient_domain::interaction::decode_path;

use crate::error::ApiError;
use crate::servient::HttpServient;

/// Largest request body accepted for writes and invocations.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Resolve the request path to a listener and serve the request with it.
///
/// # Errors
///
/// Returns [`ApiError::NoRoute`] for an unknown path,
/// [`ApiError::MethodNotAllowed`] for a method the listener does not serve and
/// [`ApiError::Thing`] when the interaction itself fails.
pub async fn dispatch(
    State(servient): State<HttpServient>,
    request: Request,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let raw = request.uri().path();
    let Some(path) = decode_path(raw) else {
        tracing::debug!(path = raw, "undecodable request path");
        return Err(ApiError::NoRoute(raw.to_string()));
    };
    let Some(listener) = servient.table().get(&path) else {
        tracing::debug!(%path, "no listener at path");
        return Err(ApiError::NoRoute(path));
    };

    match (listener, method) {
        (ResourceListener::Thing(thing), Method::GET) => Ok(content_response(
            StatusCode::OK,
            thing.content()?,
        )),
        (ResourceListener::Property(property), Method::GET) => {
            let value = property.get().await?;
            Ok(content_response(
                StatusCode::OK,
                servient.codec().encode(&value)?,
            ))
        }
        (ResourceListener::Property(property), Method::PUT) => {
            let content = read_content(request).await?;
            let value = servient.codec().decode(&content)?;
            property.set(value).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        (ResourceListener::Action(action), Method::POST) => {
            let content = read_content(request).await?;
            let parameter = if content.is_empty() {
                None
            } else {
                Some(servient.codec().decode(&content)?)
            };
            let output = action.invoke(parameter).await?;
            Ok(content_response(
                StatusCode::OK,
                servient.codec().encode(&output)?,
            ))
        }
        (ResourceListener::Event(event), Method::GET) => event_stream(&event),
        (_, method) => Err(ApiError::MethodNotAllowed { method, path }),
    }
}

fn content_response(status: StatusCode, content: Content) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, content.media_type)],
        content.body,
    )
        .into_response()
}

/// Read the body together with its media type, defaulting to JSON.
async fn read_content(request: Request) -> Result<Content, ApiError> {
    let media_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(JSON)
        .to_string();
    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|err| ApiError::from_body(err, MAX_BODY_BYTES))?;
    Ok(Content::new(media_type, body.to_vec()))
}

/// Subscribe and forward every emitted value as an SSE `data:` frame.
///
/// The subscription lives as long as the response body: a client
/// disconnecting drops the stream and with it the subscription.
fn event_stream(listener: &EventListener) -> Result<Response, ApiError> {
    let subscription = listener.subscribe()?;
    tracing::debug!(event = subscription.event(), "SSE subscriber attached");
    let frames = subscription.into_stream().map(|content| {
        Ok::<_, Infallible>(Event::default().data(String::from_utf8_lossy(&content.body)))
    });
    Ok(Sse::new(frames)
        .keep_alive(KeepAlive::default())
        .into_response())
}
