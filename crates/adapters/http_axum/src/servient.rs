//! The HTTP hosting layer.

use std::sync::Arc;

use axum::Router;

use servient_app::codec::JsonCodec;
use servient_app::listener::ResourceListener;
use servient_app::listener_table::ListenerTable;
use servient_app::ports::{ContentCodec, Servient};

/// Serves the listeners of every Thing registered with it over HTTP.
///
/// `Clone` is cheap: clones share the same listener table, so one clone can be
/// handed to each exposed Thing while another becomes the router state.
#[derive(Clone)]
pub struct HttpServient {
    table: ListenerTable,
    codec: Arc<dyn ContentCodec>,
}

impl Default for HttpServient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServient {
    /// A servient speaking `application/json`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }

    #[must_use]
    pub fn with_codec(codec: impl ContentCodec + 'static) -> Self {
        Self {
            table: ListenerTable::new(),
            codec: Arc::new(codec),
        }
    }

    #[must_use]
    pub fn table(&self) -> &ListenerTable {
        &self.table
    }

    #[must_use]
    pub fn codec(&self) -> &dyn ContentCodec {
        self.codec.as_ref()
    }

    /// Build the axum [`Router`] serving this servient.
    #[must_use]
    pub fn router(&self) -> Router {
        crate::router::build(self.clone())
    }
}

impl Servient for HttpServient {
    fn add_listener(&self, path: &str, listener: ResourceListener) {
        self.table.add_listener(path, listener);
    }

    fn bind_vacant(&self, path: &str, listener: ResourceListener) -> bool {
        self.table.bind_vacant(path, listener)
    }

    fn remove_listener(&self, path: &str) -> Option<ResourceListener> {
        self.table.remove_listener(path)
    }
}

impl std::fmt::Debug for HttpServient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServient")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
