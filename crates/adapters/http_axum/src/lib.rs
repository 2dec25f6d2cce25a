//! # servient-adapter-http-axum
//!
//! HTTP binding built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Implement the `Servient` port: keep the path → listener table that
//!   exposed Things register into
//! - Dispatch every request path through that table (driving adapter):
//!   - `GET /<thing>`: Thing Description (`application/td+json`)
//!   - `GET|PUT /<thing>/properties/<name>`: read / write a property
//!   - `POST /<thing>/actions/<name>`: invoke an action
//!   - `GET /<thing>/events/<name>`: Server-Sent Events stream
//! - Decode request bodies and encode responses with the configured
//!   `ContentCodec`
//! - Map `ThingError` into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `servient-app` (for port traits and listeners) and
//! `servient-domain` (for content and errors). Never leaks axum types into
//! the domain.

pub mod dispatch;
pub mod error;
pub mod router;
pub mod servient;

pub use servient::HttpServient;
