//! Protocol-independent facades over one interaction.
//!
//! A view names an interaction and holds a weak reference to the registry of
//! its Thing. Every operation looks the record up at call time, so a view
//! created before an interaction was removed (or the Thing destroyed) fails
//! with [`ThingError::NotFound`] instead of touching stale state.

use std::sync::{Arc, Weak};

use serde_json::Value;
use servient_domain::error::{NoHandlerError, ThingError};
use servient_domain::interaction::InteractionKind;

use crate::event_channel::EventSubscription;
use crate::registry::ThingCore;

fn upgrade(
    core: &Weak<ThingCore>,
    kind: InteractionKind,
    name: &str,
) -> Result<Arc<ThingCore>, ThingError> {
    core.upgrade()
        .ok_or_else(|| ThingError::not_found(kind, name))
}

/// Facade over one property.
#[derive(Debug, Clone)]
pub struct PropertyView {
    core: Weak<ThingCore>,
    thing: String,
    name: String,
}

impl PropertyView {
    pub(crate) fn new(core: &Arc<ThingCore>, name: impl Into<String>) -> Self {
        Self {
            core: Arc::downgrade(core),
            thing: core.name.clone(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the property, calling its read handler if one is attached.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when the property is not declared and
    /// [`ThingError::Handler`] when the read handler fails.
    #[tracing::instrument(skip(self), fields(thing = %self.thing, property = %self.name))]
    pub async fn get(&self) -> Result<Value, ThingError> {
        let state = upgrade(&self.core, InteractionKind::Property, &self.name)?
            .property(&self.name)?;
        if state.has_read_handler() {
            tracing::debug!("calling read handler");
        }
        let value = state.read().await?;
        tracing::debug!(%value, "property read");
        Ok(value)
    }

    /// Write the property, calling its write handler if one is attached.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when the property is not declared and
    /// [`ThingError::Handler`] when the write handler fails.
    #[tracing::instrument(skip(self, value), fields(thing = %self.thing, property = %self.name))]
    pub async fn set(&self, value: Value) -> Result<(), ThingError> {
        let state = upgrade(&self.core, InteractionKind::Property, &self.name)?
            .property(&self.name)?;
        if state.has_write_handler() {
            tracing::debug!("calling write handler");
        } else {
            tracing::debug!(%value, "storing property value");
        }
        state.write(value).await
    }
}

/// Facade over one action.
#[derive(Debug, Clone)]
pub struct ActionView {
    core: Weak<ThingCore>,
    thing: String,
    name: String,
}

impl ActionView {
    pub(crate) fn new(core: &Arc<ThingCore>, name: impl Into<String>) -> Self {
        Self {
            core: Arc::downgrade(core),
            thing: core.name.clone(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the action handler with an optional input parameter.
    ///
    /// Nothing prevents concurrent runs of the same action; each call is
    /// independent.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] for an undeclared action,
    /// [`ThingError::NoHandler`] when no handler is attached and
    /// [`ThingError::Handler`] when the handler fails.
    #[tracing::instrument(skip(self, parameter), fields(thing = %self.thing, action = %self.name))]
    pub async fn run(&self, parameter: Option<Value>) -> Result<Value, ThingError> {
        let state = upgrade(&self.core, InteractionKind::Action, &self.name)?
            .action(&self.name)?;
        let handler = state.handler().ok_or_else(|| NoHandlerError {
            action: self.name.clone(),
        })?;
        tracing::debug!("invoking action handler");
        handler
            .call(parameter)
            .resolve()
            .await
            .map_err(ThingError::Handler)
    }
}

/// Facade over one event.
#[derive(Debug, Clone)]
pub struct EventView {
    core: Weak<ThingCore>,
    thing: String,
    name: String,
}

impl EventView {
    pub(crate) fn new(core: &Arc<ThingCore>, name: impl Into<String>) -> Self {
        Self {
            core: Arc::downgrade(core),
            thing: core.name.clone(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode `value` and publish it to every current subscriber.
    ///
    /// Resolves as soon as the value is published; it does not wait for
    /// subscribers to consume it.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] for an undeclared event and
    /// [`ThingError::Codec`] when the value cannot be encoded.
    #[tracing::instrument(skip(self, value), fields(thing = %self.thing, event = %self.name))]
    pub async fn emit(&self, value: Value) -> Result<(), ThingError> {
        let core = upgrade(&self.core, InteractionKind::Event, &self.name)?;
        let subscribers = core.publish(&self.name, &value)?;
        tracing::debug!(subscribers, "event emitted");
        Ok(())
    }

    /// Subscribe to values emitted from now on.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] for an undeclared event.
    pub fn subscribe(&self) -> Result<EventSubscription, ThingError> {
        upgrade(&self.core, InteractionKind::Event, &self.name)?.subscribe(&self.name)
    }
}
