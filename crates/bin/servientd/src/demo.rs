//! Built-in counter Thing.
//!
//! `count` is changed through the `increment`, `decrement` and `reset`
//! actions; every change is announced on the `changed` event. `uptime` is a
//! read-only property computed by a read handler.
//!
//! `count` is added after construction so that it starts at `0` instead of
//! `null`. The actions share one lock so concurrent invocations never lose an
//! update.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use servient_app::exposed_thing::{ExposedThing, ExposedThingBuilder, PropertyInit};
use servient_app::handler::{Handler, HandlerResult};
use servient_app::ports::Servient;
use servient_app::view::{EventView, PropertyView};
use servient_domain::error::ThingError;
use servient_domain::thing::{
    ActionAffordance, DataType, EventAffordance, PropertyAffordance, ThingDescription,
};
use tokio::sync::Mutex;

pub const TITLE: &str = "counter";

fn count() -> PropertyAffordance {
    let mut count = PropertyAffordance::of_type(DataType::Integer).titled("Count");
    count.observable = true;
    count
}

/// The counter as declared at construction, without `count`.
#[must_use]
pub fn description() -> ThingDescription {
    let mut increment = ActionAffordance::titled("Increment");
    increment.input = Some(json!({ "type": "integer", "minimum": 1 }));
    increment.output = Some(json!({ "type": "integer" }));

    let mut decrement = ActionAffordance::titled("Decrement");
    decrement.input = increment.input.clone();
    decrement.output = increment.output.clone();

    let mut reset = ActionAffordance::titled("Reset");
    reset.idempotent = true;

    let mut changed = EventAffordance::titled("Count changed");
    changed.data = Some(json!({ "type": "integer" }));

    let mut description = ThingDescription::new(TITLE)
        .with_property(
            "uptime",
            PropertyAffordance::of_type(DataType::Integer)
                .titled("Uptime in seconds")
                .read_only(),
        )
        .with_action("increment", increment)
        .with_action("decrement", decrement)
        .with_action("reset", reset)
        .with_event("changed", changed);
    description.description = Some("A counter exposed by servientd".to_string());
    description
}

/// Expose the counter and attach its handlers.
///
/// # Errors
///
/// Fails if the Thing cannot be built with the given options.
pub fn expose<S: Servient>(
    builder: ExposedThingBuilder,
    servient: S,
) -> Result<ExposedThing<S>, ThingError> {
    let thing = builder.build(servient)?;
    thing.add_property("count", PropertyInit::new(count()).with_value(json!(0)))?;

    let started = Instant::now();
    thing.set_property_read_handler(
        "uptime",
        Handler::new(move |()| Ok(json!(started.elapsed().as_secs()))),
    )?;

    let counter = Counter {
        count: thing.property("count")?,
        changed: thing.event("changed")?,
        lock: Arc::new(Mutex::new(())),
    };

    thing.set_action_handler("increment", {
        let counter = counter.clone();
        Handler::new_async(move |input: Option<Value>| {
            let step = step(input.as_ref());
            counter.clone().update(move |n| n.saturating_add(step))
        })
    })?;
    thing.set_action_handler("decrement", {
        let counter = counter.clone();
        Handler::new_async(move |input: Option<Value>| {
            let step = step(input.as_ref());
            counter.clone().update(move |n| n.saturating_sub(step))
        })
    })?;
    thing.set_action_handler(
        "reset",
        Handler::new_async(move |_| counter.clone().update(|_| 0)),
    )?;

    tracing::info!(thing = TITLE, "demo thing ready");
    Ok(thing)
}

fn step(input: Option<&Value>) -> i64 {
    input.and_then(Value::as_i64).unwrap_or(1)
}

#[derive(Clone)]
struct Counter {
    count: PropertyView,
    changed: EventView,
    lock: Arc<Mutex<()>>,
}

impl Counter {
    fn update(
        self,
        next: impl FnOnce(i64) -> i64 + Send + 'static,
    ) -> impl Future<Output = HandlerResult> + Send + 'static {
        async move {
            let _guard = self.lock.lock().await;
            let current = self.count.get().await?.as_i64().unwrap_or_default();
            let value = next(current);
            self.count.set(json!(value)).await?;
            self.changed.emit(json!(value)).await?;
            Ok(json!(value))
        }
    }
}
