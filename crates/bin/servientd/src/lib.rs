//! # servientd: servient daemon
//!
//! Composition root that wires the runtime, the HTTP binding and the
//! configured Things together.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Construct the HTTP servient (listener table + codec)
//! - Expose the configured Things: the built-in demo counter and/or a Thing
//!   Description loaded from disk
//! - Build the axum router over the servient
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no runtime logic belongs here.

pub mod config;
pub mod demo;

use axum::Router;
use servient_adapter_http_axum::HttpServient;
use servient_app::exposed_thing::{ExposedThing, ExposedThingBuilder};
use servient_domain::error::ThingError;

use crate::config::{Config, ConfigError};

/// Everything the daemon serves.
#[derive(Debug)]
pub struct Runtime {
    pub servient: HttpServient,
    pub things: Vec<ExposedThing<HttpServient>>,
}

impl Runtime {
    #[must_use]
    pub fn router(&self) -> Router {
        self.servient.router()
    }

    /// Destroy every Thing, unregistering all routes and closing event streams.
    pub fn shutdown(self) {
        for thing in self.things {
            thing.destroy();
        }
    }
}

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to expose thing")]
    Thing(#[from] ThingError),
}

/// Expose the Things named by `config` on a fresh HTTP servient.
///
/// # Errors
///
/// Returns an error if the configured description cannot be loaded or a
/// Thing cannot be exposed.
pub fn assemble(config: &Config) -> Result<Runtime, StartupError> {
    let servient = HttpServient::new();
    let mut things = Vec::new();

    if config.thing.demo {
        let builder = ExposedThingBuilder::new(demo::description())
            .generator(config.generator())
            .options(config.thing_options());
        things.push(demo::expose(builder, servient.clone())?);
    }

    if let Some(path) = &config.thing.description {
        let description = config::load_description(path)?;
        let thing = ExposedThingBuilder::new(description)
            .generator(config.generator())
            .options(config.thing_options())
            .build(servient.clone())?;
        tracing::info!(thing = thing.name(), path = %path.display(), "thing loaded from file");
        things.push(thing);
    }

    if things.is_empty() {
        tracing::warn!("no thing configured; only /health will answer");
    }
    Ok(Runtime { servient, things })
}
