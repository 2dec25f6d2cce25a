//! Servient port: the hosting layer that routes transport requests to listeners.

use std::sync::Arc;

use crate::listener::ResourceListener;

/// Keeps the path → listener bindings a transport binding dispatches on.
///
/// An [`ExposedThing`](crate::exposed_thing::ExposedThing) calls
/// [`add_listener`](Self::add_listener) once for its own description path at
/// construction (through [`bind_vacant`](Self::bind_vacant)) and once per
/// declared interaction, and
/// [`remove_listener`](Self::remove_listener) whenever an interaction is removed.
pub trait Servient: Send + Sync {
    /// Bind `listener` at `path`, replacing any listener already bound there.
    fn add_listener(&self, path: &str, listener: ResourceListener);

    /// Bind `listener` at `path` only if nothing is bound there yet.
    ///
    /// Returns `false`, leaving the existing binding untouched, when the path
    /// is taken.
    fn bind_vacant(&self, path: &str, listener: ResourceListener) -> bool;

    /// Unbind the listener at `path`, returning it if one was bound.
    fn remove_listener(&self, path: &str) -> Option<ResourceListener>;
}

impl<T: Servient + ?Sized> Servient for Arc<T> {
    fn add_listener(&self, path: &str, listener: ResourceListener) {
        (**self).add_listener(path, listener);
    }

    fn bind_vacant(&self, path: &str, listener: ResourceListener) -> bool {
        (**self).bind_vacant(path, listener)
    }

    fn remove_listener(&self, path: &str) -> Option<ResourceListener> {
        (**self).remove_listener(path)
    }
}
