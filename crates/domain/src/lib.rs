//! # servient-domain
//!
//! Pure domain model for exposing Web of Things "Things".
//!
//! ## Responsibilities
//! - Define the **Thing Description** (`TD`): the declarative document that
//!   lists a Thing's properties, actions and events
//! - Define **Content**: a media type plus an encoded body, the unit every
//!   transport moves around
//! - Define **interaction kinds** and the canonical path of each interaction
//! - Define the **error taxonomy** shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or IO crates.
//! Behaviour that needs IO or async is expressed as ports in the `app` crate.

pub mod content;
pub mod error;
pub mod interaction;
pub mod thing;
