//! Shared registry core: the maps every facade and listener reads through.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use servient_domain::content::{Content, TD_JSON};
use servient_domain::error::{CodecError, ThingError};
use servient_domain::interaction::InteractionKind;
use servient_domain::thing::{
    ActionAffordance, EventAffordance, PropertyAffordance, ThingDescription,
};

use crate::event_channel::{EventChannel, EventSubscription};
use crate::listener::ResourceListener;
use crate::ports::{ContentCodec, DescriptionGenerator};
use crate::state::{ActionState, PropertyState};

/// Declaration of a property: its affordance plus an optional initial value.
#[derive(Debug, Clone, Default)]
pub struct PropertyInit {
    pub affordance: PropertyAffordance,
    pub value: Option<Value>,
}

impl PropertyInit {
    #[must_use]
    pub fn new(affordance: PropertyAffordance) -> Self {
        Self {
            affordance,
            value: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// The structural state of one Thing.
///
/// Invariant: the keys of `properties`, `actions` and `events` equal the keys
/// of the matching maps in `declared`, and `routes` holds exactly one entry per
/// declared interaction plus the Thing's own description path.
#[derive(Debug)]
pub(crate) struct Registry {
    pub(crate) declared: ThingDescription,
    pub(crate) properties: HashMap<String, Arc<PropertyState>>,
    pub(crate) actions: HashMap<String, Arc<ActionState>>,
    pub(crate) events: HashMap<String, EventChannel>,
    pub(crate) routes: BTreeMap<String, ResourceListener>,
}

impl Registry {
    /// Start from a description with its interaction maps emptied; interactions
    /// are declared one by one afterwards.
    pub(crate) fn new(mut declared: ThingDescription) -> Self {
        declared.properties.clear();
        declared.actions.clear();
        declared.events.clear();
        Self {
            declared,
            properties: HashMap::new(),
            actions: HashMap::new(),
            events: HashMap::new(),
            routes: BTreeMap::new(),
        }
    }

    /// Insert a fresh property record, replacing any previous one.
    pub(crate) fn declare_property(&mut self, name: &str, init: PropertyInit) {
        let state = match init.value {
            Some(value) => PropertyState::with_value(value),
            None => PropertyState::new(),
        };
        self.declared
            .properties
            .insert(name.to_string(), init.affordance);
        self.properties.insert(name.to_string(), Arc::new(state));
    }

    /// Insert a fresh action record, replacing any previous one.
    pub(crate) fn declare_action(&mut self, name: &str, affordance: ActionAffordance) {
        self.declared.actions.insert(name.to_string(), affordance);
        self.actions
            .insert(name.to_string(), Arc::new(ActionState::new()));
    }

    /// Insert a fresh event channel, closing any previous one.
    pub(crate) fn declare_event(&mut self, name: &str, affordance: EventAffordance, capacity: usize) {
        self.declared.events.insert(name.to_string(), affordance);
        if let Some(previous) = self
            .events
            .insert(name.to_string(), EventChannel::new(name, capacity))
        {
            previous.close();
        }
    }

    /// Drop the record and declaration of `name`; `false` if it was not declared.
    pub(crate) fn undeclare(&mut self, kind: InteractionKind, name: &str) -> bool {
        match kind {
            InteractionKind::Property => {
                self.declared.properties.remove(name);
                self.properties.remove(name).is_some()
            }
            InteractionKind::Action => {
                self.declared.actions.remove(name);
                self.actions.remove(name).is_some()
            }
            InteractionKind::Event => {
                self.declared.events.remove(name);
                match self.events.remove(name) {
                    Some(channel) => {
                        channel.close();
                        true
                    }
                    None => false,
                }
            }
        }
    }

    pub(crate) fn contains(&self, kind: InteractionKind, name: &str) -> bool {
        match kind {
            InteractionKind::Property => self.properties.contains_key(name),
            InteractionKind::Action => self.actions.contains_key(name),
            InteractionKind::Event => self.events.contains_key(name),
        }
    }
}

/// Everything a facade needs to reach the registry of one Thing.
pub(crate) struct ThingCore {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) codec: Arc<dyn ContentCodec>,
    pub(crate) generator: Arc<dyn DescriptionGenerator>,
    registry: RwLock<Registry>,
}

impl ThingCore {
    pub(crate) fn new(
        registry: Registry,
        path: String,
        codec: Arc<dyn ContentCodec>,
        generator: Arc<dyn DescriptionGenerator>,
    ) -> Self {
        Self {
            name: registry.declared.title.clone(),
            path,
            codec,
            generator,
            registry: RwLock::new(registry),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn property(&self, name: &str) -> Result<Arc<PropertyState>, ThingError> {
        self.read()
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| ThingError::not_found(InteractionKind::Property, name))
    }

    pub(crate) fn action(&self, name: &str) -> Result<Arc<ActionState>, ThingError> {
        self.read()
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| ThingError::not_found(InteractionKind::Action, name))
    }

    pub(crate) fn subscribe(&self, event: &str) -> Result<EventSubscription, ThingError> {
        self.read()
            .events
            .get(event)
            .map(EventChannel::subscribe)
            .ok_or_else(|| ThingError::not_found(InteractionKind::Event, event))
    }

    /// Encode `value` and publish it on the event's channel.
    pub(crate) fn publish(&self, event: &str, value: &Value) -> Result<usize, ThingError> {
        let registry = self.read();
        let channel = registry
            .events
            .get(event)
            .ok_or_else(|| ThingError::not_found(InteractionKind::Event, event))?;
        let content = self.codec.encode(value)?;
        Ok(channel.publish(content))
    }

    /// Regenerate the description from the registry as it is right now.
    pub(crate) fn describe(&self) -> ThingDescription {
        self.generator.generate(&self.read().declared, &self.path)
    }

    pub(crate) fn description_content(&self) -> Result<Content, CodecError> {
        let text = self.generator.serialize(&self.describe())?;
        Ok(Content::new(TD_JSON, text))
    }
}

impl std::fmt::Debug for ThingCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThingCore")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
