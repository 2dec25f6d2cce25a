//! The interaction registry of one exposed Thing.
//!
//! [`ExposedThing`] owns the per-interaction records, the event channels and
//! the routing table of a Thing. Every structural mutation (add/remove) keeps
//! those three in step with the declared description, registers or
//! unregisters the matching listener with the hosting [`Servient`] and pushes
//! the regenerated description onto the change stream, all under one lock so
//! that change notifications arrive in mutation order.

use std::sync::Arc;

use serde_json::Value;
use servient_domain::content::Content;
use servient_domain::error::{
    ConfigurationError, HandlerSlot, ThingError, ValidationError,
};
use servient_domain::interaction::{thing_path, InteractionKind};
use servient_domain::thing::{self, ActionAffordance, EventAffordance, ThingDescription};
use tokio::sync::broadcast;

use crate::codec::JsonCodec;
use crate::description::FormGenerator;
use crate::event_channel::EventSubscription;
use crate::handler::{ActionHandler, ReadHandler, WriteHandler};
use crate::listener::{
    ActionListener, EventListener, PropertyListener, ResourceListener, ThingListener,
};
use crate::ports::{ContentCodec, DescriptionGenerator, Servient};
use crate::registry::{Registry, ThingCore};
use crate::view::{ActionView, EventView, PropertyView};

pub use crate::registry::PropertyInit;

/// Tuning knobs of one exposed Thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThingOptions {
    /// Values buffered per event channel before slow subscribers lose the oldest.
    pub event_capacity: usize,
    /// Descriptions buffered on the change stream before slow subscribers lose the oldest.
    pub change_capacity: usize,
}

impl Default for ThingOptions {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            change_capacity: 16,
        }
    }
}

impl ThingOptions {
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroCapacity`] when a capacity is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_capacity == 0 {
            return Err(ValidationError::ZeroCapacity("event"));
        }
        if self.change_capacity == 0 {
            return Err(ValidationError::ZeroCapacity("change"));
        }
        Ok(())
    }
}

/// Assembles an [`ExposedThing`] from a description and its collaborators.
///
/// Defaults to [`JsonCodec`], a [`FormGenerator`] with relative forms and
/// [`ThingOptions::default`].
pub struct ExposedThingBuilder {
    description: ThingDescription,
    codec: Arc<dyn ContentCodec>,
    generator: Arc<dyn DescriptionGenerator>,
    options: ThingOptions,
}

impl ExposedThingBuilder {
    #[must_use]
    pub fn new(description: ThingDescription) -> Self {
        Self {
            description,
            codec: Arc::new(JsonCodec),
            generator: Arc::new(FormGenerator::new()),
            options: ThingOptions::default(),
        }
    }

    #[must_use]
    pub fn codec(mut self, codec: impl ContentCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    #[must_use]
    pub fn generator(mut self, generator: impl DescriptionGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    #[must_use]
    pub fn options(mut self, options: ThingOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare every interaction of the description and register the Thing
    /// with `servient`.
    ///
    /// Interactions taken from the description start with `null` values and
    /// no handlers. No change notification is emitted for them.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] when the title, an interaction name
    /// or a capacity is invalid, or when a Thing with the same title is
    /// already exposed on `servient`. Nothing is registered in that case.
    #[tracing::instrument(skip_all, fields(thing = %self.description.title))]
    pub fn build<S: Servient>(self, servient: S) -> Result<ExposedThing<S>, ThingError> {
        let Self {
            mut description,
            codec,
            generator,
            options,
        } = self;
        description.validate()?;
        options.validate()?;
        description.ensure_id();
        if description.created.is_none() {
            description.created = Some(thing::now());
        }

        let path = thing_path(&description.title);
        let core = Arc::new(ThingCore::new(
            Registry::new(description.clone()),
            path,
            codec,
            generator,
        ));
        let thing_listener = ResourceListener::Thing(ThingListener::new(&core));
        if !servient.bind_vacant(&core.path, thing_listener.clone()) {
            return Err(ValidationError::TitleInUse(description.title).into());
        }
        let (changes, _) = broadcast::channel(options.change_capacity);
        let exposed = ExposedThing {
            core,
            servient,
            changes,
            options,
        };

        {
            let mut registry = exposed.core.write();
            registry.routes.insert(exposed.core.path.clone(), thing_listener);
            for (name, affordance) in description.properties {
                exposed.declare_property(&mut registry, &name, PropertyInit::new(affordance));
            }
            for (name, affordance) in description.actions {
                exposed.declare_action(&mut registry, &name, affordance);
            }
            for (name, affordance) in description.events {
                exposed.declare_event(&mut registry, &name, affordance);
            }
            tracing::info!(routes = registry.routes.len(), "thing exposed");
        }
        Ok(exposed)
    }
}

impl std::fmt::Debug for ExposedThingBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposedThingBuilder")
            .field("title", &self.description.title)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A Thing exposed through a hosting [`Servient`].
///
/// Structural operations are synchronous: they hold the registry lock for a
/// short, await-free section and never wait on handlers or subscribers.
/// Interaction operations are `async` and may run handlers.
///
/// Dropping the value unregisters every remaining route and closes the event
/// channels; facades and listeners still alive then fail with
/// [`ThingError::NotFound`] (or [`ThingError::Gone`] for the description).
pub struct ExposedThing<S: Servient> {
    core: Arc<ThingCore>,
    servient: S,
    changes: broadcast::Sender<ThingDescription>,
    options: ThingOptions,
}

impl<S: Servient> ExposedThing<S> {
    /// Expose `description` with the default codec, generator and options.
    ///
    /// # Errors
    ///
    /// See [`ExposedThingBuilder::build`].
    pub fn new(description: ThingDescription, servient: S) -> Result<Self, ThingError> {
        ExposedThingBuilder::new(description).build(servient)
    }

    /// The Thing's title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Path of the Thing's description route (`/<title>`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.core.path
    }

    #[must_use]
    pub fn options(&self) -> ThingOptions {
        self.options
    }

    #[must_use]
    pub fn servient(&self) -> &S {
        &self.servient
    }

    // -- structure -------------------------------------------------------

    /// Declare a property, replacing any property of the same name together
    /// with its handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] for an invalid name.
    #[tracing::instrument(skip(self, init), fields(thing = %self.core.name))]
    pub fn add_property(&self, name: &str, init: PropertyInit) -> Result<(), ThingError> {
        InteractionKind::Property.validate_name(name)?;
        let mut registry = self.core.write();
        self.declare_property(&mut registry, name, init);
        self.notify(&mut registry);
        Ok(())
    }

    /// Declare an action, replacing any action of the same name together
    /// with its handler.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] for an invalid name.
    #[tracing::instrument(skip(self, affordance), fields(thing = %self.core.name))]
    pub fn add_action(&self, name: &str, affordance: ActionAffordance) -> Result<(), ThingError> {
        InteractionKind::Action.validate_name(name)?;
        let mut registry = self.core.write();
        self.declare_action(&mut registry, name, affordance);
        self.notify(&mut registry);
        Ok(())
    }

    /// Declare an event with a fresh channel. A channel previously declared
    /// under the same name is closed first.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] for an invalid name.
    #[tracing::instrument(skip(self, affordance), fields(thing = %self.core.name))]
    pub fn add_event(&self, name: &str, affordance: EventAffordance) -> Result<(), ThingError> {
        InteractionKind::Event.validate_name(name)?;
        let mut registry = self.core.write();
        self.declare_event(&mut registry, name, affordance);
        self.notify(&mut registry);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such property is declared.
    pub fn remove_property(&self, name: &str) -> Result<(), ThingError> {
        self.remove(InteractionKind::Property, name)
    }

    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such action is declared.
    pub fn remove_action(&self, name: &str) -> Result<(), ThingError> {
        self.remove(InteractionKind::Action, name)
    }

    /// Close the event's channel and remove it.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such event is declared.
    pub fn remove_event(&self, name: &str) -> Result<(), ThingError> {
        self.remove(InteractionKind::Event, name)
    }

    #[tracing::instrument(skip(self), fields(thing = %self.core.name))]
    fn remove(&self, kind: InteractionKind, name: &str) -> Result<(), ThingError> {
        let mut registry = self.core.write();
        if !registry.undeclare(kind, name) {
            tracing::debug!("nothing to remove");
            return Err(ThingError::not_found(kind, name));
        }
        let path = kind.path(&self.core.path, name);
        self.unroute(&mut registry, &path);
        self.notify(&mut registry);
        Ok(())
    }

    /// Unregister every route, close every channel and drop every record.
    ///
    /// Subscribers observe end-of-stream; change stream receivers observe the
    /// stream closing.
    #[tracing::instrument(skip(self), fields(thing = %self.core.name))]
    pub fn destroy(self) {
        let routes = self.teardown();
        tracing::info!(routes, "thing destroyed");
    }

    fn teardown(&self) -> usize {
        let mut registry = self.core.write();
        let paths: Vec<String> = registry.routes.keys().cloned().collect();
        for path in &paths {
            self.unroute(&mut registry, path);
        }
        for (_, channel) in registry.events.drain() {
            channel.close();
        }
        registry.properties.clear();
        registry.actions.clear();
        registry.declared.properties.clear();
        registry.declared.actions.clear();
        registry.declared.events.clear();
        paths.len()
    }

    // -- handlers --------------------------------------------------------

    /// Attach the handler called on every read of the property.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Configuration`] when no such property is declared.
    pub fn set_property_read_handler(
        &self,
        name: &str,
        handler: ReadHandler,
    ) -> Result<(), ThingError> {
        let state = self
            .core
            .property(name)
            .map_err(|_| configuration_error(HandlerSlot::Read, InteractionKind::Property, name))?;
        state.set_read_handler(Some(handler));
        tracing::debug!(thing = %self.core.name, property = name, "read handler attached");
        Ok(())
    }

    /// Attach the handler called on every write of the property.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Configuration`] when no such property is declared.
    pub fn set_property_write_handler(
        &self,
        name: &str,
        handler: WriteHandler,
    ) -> Result<(), ThingError> {
        let state = self
            .core
            .property(name)
            .map_err(|_| configuration_error(HandlerSlot::Write, InteractionKind::Property, name))?;
        state.set_write_handler(Some(handler));
        tracing::debug!(thing = %self.core.name, property = name, "write handler attached");
        Ok(())
    }

    /// Attach the handler run on every invocation of the action.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Configuration`] when no such action is declared.
    pub fn set_action_handler(&self, name: &str, handler: ActionHandler) -> Result<(), ThingError> {
        let state = self
            .core
            .action(name)
            .map_err(|_| configuration_error(HandlerSlot::Action, InteractionKind::Action, name))?;
        state.set_handler(Some(handler));
        tracing::debug!(thing = %self.core.name, action = name, "action handler attached");
        Ok(())
    }

    // -- description -----------------------------------------------------

    /// The current description, regenerated on every call.
    #[must_use]
    pub fn describe(&self) -> ThingDescription {
        self.core.describe()
    }

    /// The current description serialized as `application/td+json`.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Codec`] when serialization fails.
    pub fn description_content(&self) -> Result<Content, ThingError> {
        Ok(self.core.description_content()?)
    }

    /// Receive the regenerated description after every structural change.
    #[must_use]
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ThingDescription> {
        self.changes.subscribe()
    }

    /// Declared names of one interaction kind, sorted.
    #[must_use]
    pub fn interaction_names(&self, kind: InteractionKind) -> Vec<String> {
        self.core.read().declared.interaction_names(kind)
    }

    /// Every routed path, sorted, including the description route.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.core.read().routes.keys().cloned().collect()
    }

    // -- facades ---------------------------------------------------------

    /// Facade over a declared property.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such property is declared.
    pub fn property(&self, name: &str) -> Result<PropertyView, ThingError> {
        self.core.property(name)?;
        Ok(PropertyView::new(&self.core, name))
    }

    /// Facade over a declared action.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such action is declared.
    pub fn action(&self, name: &str) -> Result<ActionView, ThingError> {
        self.core.action(name)?;
        Ok(ActionView::new(&self.core, name))
    }

    /// Facade over a declared event.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such event is declared.
    pub fn event(&self, name: &str) -> Result<EventView, ThingError> {
        if !self.core.read().contains(InteractionKind::Event, name) {
            return Err(ThingError::not_found(InteractionKind::Event, name));
        }
        Ok(EventView::new(&self.core, name))
    }

    /// # Errors
    ///
    /// See [`PropertyView::get`].
    pub async fn read_property(&self, name: &str) -> Result<Value, ThingError> {
        PropertyView::new(&self.core, name).get().await
    }

    /// # Errors
    ///
    /// See [`PropertyView::set`].
    pub async fn write_property(&self, name: &str, value: Value) -> Result<(), ThingError> {
        PropertyView::new(&self.core, name).set(value).await
    }

    /// # Errors
    ///
    /// See [`ActionView::run`].
    pub async fn invoke_action(
        &self,
        name: &str,
        parameter: Option<Value>,
    ) -> Result<Value, ThingError> {
        ActionView::new(&self.core, name).run(parameter).await
    }

    /// # Errors
    ///
    /// See [`EventView::emit`].
    pub async fn emit_event(&self, name: &str, value: Value) -> Result<(), ThingError> {
        EventView::new(&self.core, name).emit(value).await
    }

    /// # Errors
    ///
    /// Returns [`ThingError::NotFound`] when no such event is declared.
    pub fn subscribe_event(&self, name: &str) -> Result<EventSubscription, ThingError> {
        self.core.subscribe(name)
    }

    // -- internals -------------------------------------------------------

    fn declare_property(&self, registry: &mut Registry, name: &str, init: PropertyInit) {
        registry.declare_property(name, init);
        let listener = PropertyListener::new(PropertyView::new(&self.core, name));
        let path = InteractionKind::Property.path(&self.core.path, name);
        self.route(registry, path, ResourceListener::Property(listener));
    }

    fn declare_action(&self, registry: &mut Registry, name: &str, affordance: ActionAffordance) {
        registry.declare_action(name, affordance);
        let listener = ActionListener::new(ActionView::new(&self.core, name));
        let path = InteractionKind::Action.path(&self.core.path, name);
        self.route(registry, path, ResourceListener::Action(listener));
    }

    fn declare_event(&self, registry: &mut Registry, name: &str, affordance: EventAffordance) {
        registry.declare_event(name, affordance, self.options.event_capacity);
        let listener = EventListener::new(EventView::new(&self.core, name));
        let path = InteractionKind::Event.path(&self.core.path, name);
        self.route(registry, path, ResourceListener::Event(listener));
    }

    fn route(&self, registry: &mut Registry, path: String, listener: ResourceListener) {
        self.servient.add_listener(&path, listener.clone());
        registry.routes.insert(path, listener);
    }

    fn unroute(&self, registry: &mut Registry, path: &str) {
        registry.routes.remove(path);
        self.servient.remove_listener(path);
    }

    /// Stamp the modification time and publish the regenerated description.
    ///
    /// Must be called with the write lock held.
    fn notify(&self, registry: &mut Registry) {
        registry.declared.modified = Some(thing::now());
        let description = self.core.generator.generate(&registry.declared, &self.core.path);
        let receivers = self.changes.send(description).unwrap_or(0);
        tracing::debug!(receivers, "description changed");
    }
}

fn configuration_error(slot: HandlerSlot, kind: InteractionKind, name: &str) -> ThingError {
    ConfigurationError {
        slot,
        kind,
        name: name.to_string(),
    }
    .into()
}

impl<S: Servient> Drop for ExposedThing<S> {
    fn drop(&mut self) {
        let routes = self.teardown();
        if routes > 0 {
            tracing::debug!(thing = %self.core.name, routes, "dropped thing unregistered");
        }
    }
}

impl<S: Servient> std::fmt::Debug for ExposedThing<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposedThing")
            .field("name", &self.core.name)
            .field("path", &self.core.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use servient_domain::content::JSON;
    use servient_domain::error::{NoHandlerError, NotFoundError};
    use servient_domain::thing::{DataType, Operation, PropertyAffordance};
    use tokio::sync::oneshot;

    use super::*;
    use crate::handler::{Handler, HandlerOutput};
    use crate::listener_table::ListenerTable;

    fn counter() -> ThingDescription {
        ThingDescription::new("counter")
            .with_property("count", PropertyAffordance::of_type(DataType::Integer))
            .with_action("increment", ActionAffordance::default())
            .with_event("changed", EventAffordance::default())
    }

    fn expose(description: ThingDescription) -> (ExposedThing<ListenerTable>, ListenerTable) {
        let table = ListenerTable::new();
        let thing = ExposedThing::new(description, table.clone()).unwrap();
        (thing, table)
    }

    fn integer(init: i64) -> PropertyInit {
        PropertyInit::new(PropertyAffordance::of_type(DataType::Integer)).with_value(json!(init))
    }

    // -- construction ----------------------------------------------------

    #[test]
    fn should_route_every_declared_interaction() {
        let (thing, table) = expose(counter());

        let expected = vec![
            "/counter".to_string(),
            "/counter/actions/increment".to_string(),
            "/counter/events/changed".to_string(),
            "/counter/properties/count".to_string(),
        ];
        assert_eq!(thing.routes(), expected);
        assert_eq!(table.paths(), expected);
        assert_eq!(thing.path(), "/counter");
        assert_eq!(thing.name(), "counter");
    }

    #[test]
    fn should_assign_id_and_creation_time() {
        let (thing, _) = expose(counter());
        let td = thing.describe();
        assert!(td.id.unwrap().starts_with("urn:uuid:"));
        assert!(td.created.is_some());
        assert!(td.modified.is_none());
    }

    #[test]
    fn should_reject_title_with_slash() {
        let table = ListenerTable::new();
        let result = ExposedThing::new(ThingDescription::new("a/b"), table.clone());
        assert!(matches!(
            result,
            Err(ThingError::Validation(ValidationError::InvalidTitle(_)))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn should_reject_zero_capacity() {
        let result = ExposedThingBuilder::new(counter())
            .options(ThingOptions {
                event_capacity: 0,
                ..ThingOptions::default()
            })
            .build(ListenerTable::new());
        assert!(matches!(
            result,
            Err(ThingError::Validation(ValidationError::ZeroCapacity("event")))
        ));
    }

    #[tokio::test]
    async fn should_reject_second_thing_with_same_title() {
        let (first, table) = expose(counter());
        first.write_property("count", json!(3)).await.unwrap();

        let second = ExposedThing::new(
            ThingDescription::new("counter").with_property("extra", PropertyAffordance::default()),
            table.clone(),
        );

        assert!(matches!(
            second,
            Err(ThingError::Validation(ValidationError::TitleInUse(ref title))) if title == "counter"
        ));
        assert_eq!(table.paths(), first.routes());
        let Some(ResourceListener::Property(count)) = table.get("/counter/properties/count") else {
            panic!("property listener expected");
        };
        assert_eq!(count.get().await.unwrap(), json!(3));
    }

    #[test]
    fn should_allow_title_again_once_released() {
        let (first, table) = expose(counter());
        drop(first);

        let second = ExposedThing::new(counter(), table.clone()).unwrap();

        assert_eq!(table.paths(), second.routes());
        assert_eq!(table.len(), 4);
    }

    #[tokio::test]
    async fn should_start_declared_properties_as_null_without_handlers() {
        let (thing, _) = expose(counter());
        assert_eq!(thing.read_property("count").await.unwrap(), Value::Null);
        let err = thing.invoke_action("increment", None).await.unwrap_err();
        assert!(matches!(err, ThingError::NoHandler(_)));
    }

    // -- scenarios -------------------------------------------------------

    #[tokio::test]
    async fn should_run_count_scenario() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("count", integer(0)).unwrap();

        thing.write_property("count", json!(5)).await.unwrap();
        assert_eq!(thing.read_property("count").await.unwrap(), json!(5));

        thing
            .set_property_read_handler("count", Handler::new(|()| Ok(json!(42))))
            .unwrap();
        assert_eq!(thing.read_property("count").await.unwrap(), json!(42));
        let cached = thing.core.property("count").unwrap().value();
        assert_eq!(cached, json!(42));

        thing.remove_property("count").unwrap();
        let err = thing.read_property("count").await.unwrap_err();
        assert!(matches!(
            err,
            ThingError::NotFound(NotFoundError { kind: InteractionKind::Property, .. })
        ));
    }

    #[tokio::test]
    async fn should_run_ping_scenario() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_action("ping", ActionAffordance::default()).unwrap();

        let err = thing.invoke_action("ping", None).await.unwrap_err();
        assert!(matches!(err, ThingError::NoHandler(NoHandlerError { ref action }) if action == "ping"));

        thing
            .set_action_handler("ping", Handler::new(|_| Ok(json!("pong"))))
            .unwrap();
        assert_eq!(thing.invoke_action("ping", None).await.unwrap(), json!("pong"));
    }

    #[tokio::test]
    async fn should_run_tick_scenario() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_event("tick", EventAffordance::default()).unwrap();

        let mut first = thing.subscribe_event("tick").unwrap();
        let mut second = thing.event("tick").unwrap().subscribe().unwrap();
        thing.emit_event("tick", json!(7)).await.unwrap();

        let expected = Content::new(JSON, "7");
        assert_eq!(first.next().await.unwrap(), expected);
        assert_eq!(second.next().await.unwrap(), expected);
    }

    // -- properties ------------------------------------------------------

    #[tokio::test]
    async fn should_cache_deferred_write_handler_result() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("level", integer(1)).unwrap();
        thing
            .set_property_write_handler(
                "level",
                Handler::new_async(|value: Value| async move {
                    tokio::task::yield_now().await;
                    Ok(json!(value.as_i64().unwrap_or(0) * 10))
                }),
            )
            .unwrap();

        thing.write_property("level", json!(3)).await.unwrap();
        assert_eq!(thing.core.property("level").unwrap().value(), json!(30));
        assert_eq!(thing.read_property("level").await.unwrap(), json!(30));
    }

    #[tokio::test]
    async fn should_wait_for_deferred_write_before_resolving() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("level", integer(0)).unwrap();
        let (tx, rx) = oneshot::channel::<Value>();
        let rx = std::sync::Mutex::new(Some(rx));
        thing
            .set_property_write_handler(
                "level",
                Handler::from_fn(move |_| {
                    let rx = rx.lock().unwrap().take();
                    HandlerOutput::Deferred(Box::pin(async move {
                        match rx {
                            Some(rx) => rx.await.map_err(anyhow::Error::from),
                            None => Ok(Value::Null),
                        }
                    }))
                }),
            )
            .unwrap();

        let view = thing.property("level").unwrap();
        let write = tokio::spawn(async move { view.set(json!(1)).await });
        tokio::task::yield_now().await;
        assert_eq!(thing.core.property("level").unwrap().value(), json!(0));

        tx.send(json!(99)).unwrap();
        write.await.unwrap().unwrap();
        assert_eq!(thing.read_property("level").await.unwrap(), json!(99));
    }

    #[tokio::test]
    async fn should_propagate_read_handler_failure_and_keep_value() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("temp", integer(21)).unwrap();
        thing
            .set_property_read_handler(
                "temp",
                Handler::new(|()| Err(anyhow::anyhow!("sensor offline"))),
            )
            .unwrap();

        let err = thing.read_property("temp").await.unwrap_err();
        assert!(matches!(err, ThingError::Handler(_)));
        assert_eq!(err.to_string(), "sensor offline");
        assert_eq!(thing.core.property("temp").unwrap().value(), json!(21));
    }

    #[test]
    fn should_reject_handler_for_undeclared_interaction() {
        let (thing, _) = expose(ThingDescription::new("t"));

        let read = thing.set_property_read_handler("nope", Handler::new(|()| Ok(Value::Null)));
        let write = thing.set_property_write_handler("nope", Handler::new(Ok));
        let action = thing.set_action_handler("nope", Handler::new(|_| Ok(Value::Null)));

        assert!(matches!(
            read,
            Err(ThingError::Configuration(ConfigurationError { slot: HandlerSlot::Read, .. }))
        ));
        assert!(matches!(
            write,
            Err(ThingError::Configuration(ConfigurationError { slot: HandlerSlot::Write, .. }))
        ));
        assert!(matches!(
            action,
            Err(ThingError::Configuration(ConfigurationError { slot: HandlerSlot::Action, .. }))
        ));
    }

    #[tokio::test]
    async fn should_replace_record_and_handlers_on_overwrite() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("mode", integer(1)).unwrap();
        thing
            .set_property_read_handler("mode", Handler::new(|()| Ok(json!("from handler"))))
            .unwrap();

        thing.add_property("mode", integer(2)).unwrap();

        assert_eq!(thing.read_property("mode").await.unwrap(), json!(2));
        assert_eq!(thing.interaction_names(InteractionKind::Property), vec!["mode"]);
    }

    #[tokio::test]
    async fn should_share_record_between_facade_and_listener() {
        let (thing, table) = expose(counter());
        thing.write_property("count", json!(3)).await.unwrap();

        let Some(ResourceListener::Property(listener)) = table.get("/counter/properties/count")
        else {
            panic!("property listener expected");
        };
        assert_eq!(listener.get().await.unwrap(), json!(3));
        listener.set(json!(4)).await.unwrap();
        assert_eq!(thing.property("count").unwrap().get().await.unwrap(), json!(4));
    }

    // -- actions ---------------------------------------------------------

    #[tokio::test]
    async fn should_pass_parameter_and_flatten_deferred_result() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_action("double", ActionAffordance::default()).unwrap();
        thing
            .set_action_handler(
                "double",
                Handler::new_async(|input: Option<Value>| async move {
                    let n = input.and_then(|v| v.as_i64()).unwrap_or(0);
                    Ok(json!(n * 2))
                }),
            )
            .unwrap();

        let result = thing.invoke_action("double", Some(json!(21))).await.unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn should_run_concurrent_invocations_independently() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_action("hit", ActionAffordance::default()).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        thing
            .set_action_handler(
                "hit",
                Handler::new(move |_| Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))),
            )
            .unwrap();

        let view = thing.action("hit").unwrap();
        let (a, b) = tokio::join!(view.run(None), view.run(None));
        let mut results = vec![a.unwrap(), b.unwrap()];
        results.sort_by_key(|v| v.as_u64());
        assert_eq!(results, vec![json!(1), json!(2)]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_fail_invocation_of_undeclared_action() {
        let (thing, _) = expose(ThingDescription::new("t"));
        let err = thing.invoke_action("missing", None).await.unwrap_err();
        assert!(matches!(err, ThingError::NotFound(_)));
        assert!(matches!(thing.action("missing"), Err(ThingError::NotFound(_))));
    }

    // -- events ----------------------------------------------------------

    #[tokio::test]
    async fn should_fail_emit_of_undeclared_event() {
        let (thing, _) = expose(ThingDescription::new("t"));
        let err = thing.emit_event("missing", json!(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ThingError::NotFound(NotFoundError { kind: InteractionKind::Event, .. })
        ));
    }

    #[tokio::test]
    async fn should_emit_without_subscribers() {
        let (thing, _) = expose(counter());
        thing.emit_event("changed", json!(1)).await.unwrap();
    }

    #[tokio::test]
    async fn should_deliver_values_in_emit_order() {
        let (thing, _) = expose(counter());
        let mut subscription = thing.subscribe_event("changed").unwrap();
        for n in 1..=3 {
            thing.emit_event("changed", json!(n)).await.unwrap();
        }
        for n in 1..=3 {
            let content = subscription.next().await.unwrap();
            assert_eq!(content.body, n.to_string().into_bytes());
        }
    }

    #[tokio::test]
    async fn should_end_subscriptions_when_event_removed() {
        let (thing, _) = expose(counter());
        let mut subscription = thing.subscribe_event("changed").unwrap();
        thing.emit_event("changed", json!("last")).await.unwrap();

        thing.remove_event("changed").unwrap();

        assert_eq!(subscription.next().await.unwrap().body, br#""last""#.to_vec());
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn should_close_previous_channel_when_event_redeclared() {
        let (thing, _) = expose(counter());
        let mut old = thing.subscribe_event("changed").unwrap();

        thing.add_event("changed", EventAffordance::default()).unwrap();

        assert!(old.next().await.is_none());
        let mut fresh = thing.subscribe_event("changed").unwrap();
        thing.emit_event("changed", json!(1)).await.unwrap();
        assert!(fresh.next().await.is_some());
    }

    // -- structure -------------------------------------------------------

    #[test]
    fn should_restore_state_after_add_then_remove() {
        let (thing, table) = expose(counter());
        let routes = thing.routes();
        let names = thing.interaction_names(InteractionKind::Property);

        thing.add_property("extra", integer(0)).unwrap();
        assert!(table.get("/counter/properties/extra").is_some());
        thing.remove_property("extra").unwrap();

        assert_eq!(thing.routes(), routes);
        assert_eq!(table.paths(), routes);
        assert_eq!(thing.interaction_names(InteractionKind::Property), names);
    }

    #[test]
    fn should_keep_single_route_when_adding_twice() {
        let (thing, table) = expose(ThingDescription::new("t"));
        thing.add_action("go", ActionAffordance::default()).unwrap();
        thing.add_action("go", ActionAffordance::default()).unwrap();

        assert_eq!(thing.routes(), vec!["/t", "/t/actions/go"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn should_fail_removal_of_undeclared_name_without_notification() {
        let (thing, _) = expose(ThingDescription::new("t"));
        let mut changes = thing.subscribe_changes();

        for result in [
            thing.remove_property("x"),
            thing.remove_action("x"),
            thing.remove_event("x"),
        ] {
            assert!(matches!(result, Err(ThingError::NotFound(_))));
        }
        assert!(changes.try_recv().is_err());
        assert_eq!(thing.routes(), vec!["/t"]);
    }

    #[test]
    fn should_reject_invalid_interaction_names() {
        let (thing, _) = expose(ThingDescription::new("t"));
        let result = thing.add_property("a/b", integer(0));
        assert!(matches!(
            result,
            Err(ThingError::Validation(ValidationError::InvalidName { .. }))
        ));
        let result = thing.add_event("", EventAffordance::default());
        assert!(matches!(
            result,
            Err(ThingError::Validation(ValidationError::EmptyName(InteractionKind::Event)))
        ));
        assert_eq!(thing.routes(), vec!["/t"]);
    }

    // -- description -----------------------------------------------------

    #[test]
    fn should_reflect_mutations_in_description() {
        let (thing, _) = expose(ThingDescription::new("t"));
        thing.add_property("on", integer(0)).unwrap();
        thing.add_action("toggle", ActionAffordance::default()).unwrap();

        let td = thing.describe();
        assert_eq!(td.properties["on"].info.forms[0].href, "/t/properties/on");
        assert_eq!(td.actions["toggle"].info.forms[0].op, vec![Operation::InvokeAction]);
        assert!(td.modified.is_some());

        thing.remove_action("toggle").unwrap();
        assert!(thing.describe().actions.is_empty());
    }

    #[test]
    fn should_notify_changes_in_mutation_order() {
        let (thing, _) = expose(ThingDescription::new("t"));
        let mut changes = thing.subscribe_changes();

        thing.add_property("a", integer(0)).unwrap();
        thing.add_event("b", EventAffordance::default()).unwrap();
        thing.remove_property("a").unwrap();

        let first = changes.try_recv().unwrap();
        assert_eq!(first.interaction_names(InteractionKind::Property), vec!["a"]);
        assert!(first.events.is_empty());

        let second = changes.try_recv().unwrap();
        assert_eq!(second.interaction_names(InteractionKind::Event), vec!["b"]);

        let third = changes.try_recv().unwrap();
        assert!(third.properties.is_empty());
        assert_eq!(third.interaction_names(InteractionKind::Event), vec!["b"]);

        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn should_not_notify_on_handler_change() {
        let (thing, _) = expose(counter());
        let mut changes = thing.subscribe_changes();
        thing
            .set_action_handler("increment", Handler::new(|_| Ok(Value::Null)))
            .unwrap();
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn should_serve_description_content_through_listener() {
        let (thing, table) = expose(counter());
        let Some(ResourceListener::Thing(listener)) = table.get("/counter") else {
            panic!("thing listener expected");
        };

        let content = listener.content().unwrap();
        assert_eq!(content.media_type, servient_domain::content::TD_JSON);
        let td: ThingDescription = serde_json::from_slice(&content.body).unwrap();
        assert_eq!(td, thing.describe());
        assert_eq!(thing.description_content().unwrap(), content);
    }

    #[test]
    fn should_use_configured_generator() {
        let thing = ExposedThingBuilder::new(counter())
            .generator(FormGenerator::with_base_uri("http://example.test"))
            .build(ListenerTable::new())
            .unwrap();
        assert_eq!(
            thing.describe().properties["count"].info.forms[0].href,
            "http://example.test/counter/properties/count"
        );
    }

    // -- lifecycle -------------------------------------------------------

    #[tokio::test]
    async fn should_unregister_everything_on_destroy() {
        let (thing, table) = expose(counter());
        let view = thing.property("count").unwrap();
        let mut subscription = thing.subscribe_event("changed").unwrap();
        let mut changes = thing.subscribe_changes();
        let Some(ResourceListener::Thing(listener)) = table.get("/counter") else {
            panic!("thing listener expected");
        };

        thing.destroy();

        assert!(table.is_empty());
        assert!(subscription.next().await.is_none());
        assert!(matches!(view.get().await, Err(ThingError::NotFound(_))));
        assert!(matches!(listener.description(), Err(ThingError::Gone(_))));
        assert!(matches!(
            changes.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn should_unregister_routes_when_dropped() {
        let (thing, table) = expose(counter());
        assert_eq!(table.len(), 4);
        drop(thing);
        assert!(table.is_empty());
    }
}
