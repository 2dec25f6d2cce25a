//! Per-interaction state records.
//!
//! Each record keeps its fields behind a short-lived mutex that is never held
//! across an `.await`: handlers run unlocked, and their result is stored once
//! they complete. Operations on the same record are therefore **not**
//! serialized: two concurrent writes both run their handlers, and whichever
//! stores last wins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use servient_domain::error::ThingError;

use crate::handler::{ActionHandler, ReadHandler, WriteHandler};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct PropertySlot {
    value: Value,
    read_handler: Option<ReadHandler>,
    write_handler: Option<WriteHandler>,
}

/// Cached value and optional handlers of one declared property.
#[derive(Debug)]
pub struct PropertyState {
    slot: Mutex<PropertySlot>,
}

impl Default for PropertyState {
    fn default() -> Self {
        Self::with_value(Value::Null)
    }
}

impl PropertyState {
    /// A record with a `null` value and no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with an initial value and no handlers.
    #[must_use]
    pub fn with_value(value: Value) -> Self {
        Self {
            slot: Mutex::new(PropertySlot {
                value,
                read_handler: None,
                write_handler: None,
            }),
        }
    }

    /// The cached value, without calling any handler.
    #[must_use]
    pub fn value(&self) -> Value {
        lock(&self.slot).value.clone()
    }

    #[must_use]
    pub fn has_read_handler(&self) -> bool {
        lock(&self.slot).read_handler.is_some()
    }

    #[must_use]
    pub fn has_write_handler(&self) -> bool {
        lock(&self.slot).write_handler.is_some()
    }

    pub fn set_read_handler(&self, handler: Option<ReadHandler>) {
        lock(&self.slot).read_handler = handler;
    }

    pub fn set_write_handler(&self, handler: Option<WriteHandler>) {
        lock(&self.slot).write_handler = handler;
    }

    /// Read the property.
    ///
    /// With a read handler, its result replaces the cached value and is
    /// returned. Without one, the cached value is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Handler`] if the read handler fails; the cached
    /// value is left untouched.
    pub async fn read(&self) -> Result<Value, ThingError> {
        let handler = lock(&self.slot).read_handler.clone();
        let Some(handler) = handler else {
            return Ok(self.value());
        };

        let value = handler
            .call(())
            .resolve()
            .await
            .map_err(ThingError::Handler)?;
        lock(&self.slot).value = value.clone();
        Ok(value)
    }

    /// Write the property.
    ///
    /// With a write handler, the handler's result becomes the cached value.
    /// Without one, `value` is stored as is.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Handler`] if the write handler fails; the cached
    /// value is left untouched.
    pub async fn write(&self, value: Value) -> Result<(), ThingError> {
        let handler = lock(&self.slot).write_handler.clone();
        let stored = match handler {
            Some(handler) => handler
                .call(value)
                .resolve()
                .await
                .map_err(ThingError::Handler)?,
            None => value,
        };
        lock(&self.slot).value = stored;
        Ok(())
    }
}

/// Optional handler of one declared action.
#[derive(Debug, Default)]
pub struct ActionState {
    handler: Mutex<Option<ActionHandler>>,
}

impl ActionState {
    /// A record without handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handler(&self) -> Option<ActionHandler> {
        lock(&self.handler).clone()
    }

    #[must_use]
    pub fn has_handler(&self) -> bool {
        lock(&self.handler).is_some()
    }

    pub fn set_handler(&self, handler: Option<ActionHandler>) {
        *lock(&self.handler) = handler;
    }
}
