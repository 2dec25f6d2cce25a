//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::servient::HttpServient;

/// Build the top-level axum [`Router`].
///
/// Serves `/health` directly and hands every other path to
/// [`dispatch`](crate::dispatch::dispatch), which resolves it through the
/// servient's listener table. Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build(servient: HttpServient) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(crate::dispatch::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(servient)
}

async fn health_check() -> &'static str {
    "OK"
}
