//! Listener contract handed to the hosting layer.
//!
//! A transport binding resolves a request path to a [`ResourceListener`] and
//! calls the operation matching the request; each operation delegates to the
//! corresponding facade.

use std::sync::{Arc, Weak};

use serde_json::Value;
use servient_domain::content::Content;
use servient_domain::error::ThingError;
use servient_domain::thing::ThingDescription;

use crate::event_channel::EventSubscription;
use crate::registry::ThingCore;
use crate::view::{ActionView, EventView, PropertyView};

/// Everything that can be bound at a path.
#[derive(Debug, Clone)]
pub enum ResourceListener {
    Thing(ThingListener),
    Property(PropertyListener),
    Action(ActionListener),
    Event(EventListener),
}

impl ResourceListener {
    /// Short label of the listener kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thing(_) => "thing",
            Self::Property(_) => "property",
            Self::Action(_) => "action",
            Self::Event(_) => "event",
        }
    }
}

/// Serves the description of a Thing.
#[derive(Debug, Clone)]
pub struct ThingListener {
    core: Weak<ThingCore>,
    title: String,
}

impl ThingListener {
    pub(crate) fn new(core: &Arc<ThingCore>) -> Self {
        Self {
            core: Arc::downgrade(core),
            title: core.name.clone(),
        }
    }

    fn core(&self) -> Result<Arc<ThingCore>, ThingError> {
        self.core
            .upgrade()
            .ok_or_else(|| ThingError::Gone(self.title.clone()))
    }

    /// The current description, regenerated on every call.
    ///
    /// # Errors
    ///
    /// Fails when the Thing no longer exists.
    pub fn description(&self) -> Result<ThingDescription, ThingError> {
        Ok(self.core()?.describe())
    }

    /// The current description serialized as `application/td+json`.
    ///
    /// # Errors
    ///
    /// Fails when the Thing no longer exists or serialization fails.
    pub fn content(&self) -> Result<Content, ThingError> {
        Ok(self.core()?.description_content()?)
    }
}

/// Serves reads and writes of one property.
#[derive(Debug, Clone)]
pub struct PropertyListener {
    view: PropertyView,
}

impl PropertyListener {
    pub(crate) fn new(view: PropertyView) -> Self {
        Self { view }
    }

    /// # Errors
    ///
    /// See [`PropertyView::get`].
    pub async fn get(&self) -> Result<Value, ThingError> {
        self.view.get().await
    }

    /// # Errors
    ///
    /// See [`PropertyView::set`].
    pub async fn set(&self, value: Value) -> Result<(), ThingError> {
        self.view.set(value).await
    }
}

/// Serves invocations of one action.
#[derive(Debug, Clone)]
pub struct ActionListener {
    view: ActionView,
}

impl ActionListener {
    pub(crate) fn new(view: ActionView) -> Self {
        Self { view }
    }

    /// # Errors
    ///
    /// See [`ActionView::run`].
    pub async fn invoke(&self, parameter: Option<Value>) -> Result<Value, ThingError> {
        self.view.run(parameter).await
    }
}

/// Serves subscriptions to one event.
#[derive(Debug, Clone)]
pub struct EventListener {
    view: EventView,
}

impl EventListener {
    pub(crate) fn new(view: EventView) -> Self {
        Self { view }
    }

    /// # Errors
    ///
    /// See [`EventView::subscribe`].
    pub fn subscribe(&self) -> Result<EventSubscription, ThingError> {
        self.view.subscribe()
    }

    pub fn unsubscribe(&self, subscription: EventSubscription) {
        subscription.unsubscribe();
    }
}
