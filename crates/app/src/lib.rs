//! # servient-app
//!
//! Application layer: the exposed-thing runtime and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** the runtime depends on (driven/outbound ports):
//!   - `Servient`: registers and unregisters listeners at canonical paths
//!   - `ContentCodec`: turns values into transport-ready content and back
//!   - `DescriptionGenerator`: regenerates and serializes the Thing Description
//! - Own the **interaction registry** (`ExposedThing`): per-interaction state,
//!   event channels, the routing table and the description-change stream
//! - Expose protocol-independent **facades** and **listeners** that transport
//!   bindings call into
//! - Provide **in-process infrastructure** that doesn't need IO
//!   (`ListenerTable`, `JsonCodec`, `FormGenerator`)
//!
//! ## Dependency rule
//! Depends on `servient-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod codec;
pub mod description;
pub mod event_channel;
pub mod exposed_thing;
pub mod handler;
pub mod listener;
pub mod listener_table;
pub mod ports;
pub mod state;
pub mod view;

mod registry;
