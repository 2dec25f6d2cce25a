//! Thing Description data structures.
//!
//! A Thing Description stores the metadata and the interaction affordances of
//! a physical or virtual entity. Only the subset of the W3C vocabulary the
//! runtime needs is modelled explicitly; data schemas are kept as raw JSON.
//!
//! Use [`serde_json`] to serialize or deserialize a [`ThingDescription`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ThingError, ValidationError};
use crate::interaction::InteractionKind;

pub const TD_CONTEXT_10: &str = "https://www.w3.org/2019/wot/td/v1";

/// Name of the security scheme used when a description declares none.
pub const NOSEC: &str = "nosec_sc";

/// UTC timestamp used for `created` and `modified`.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

fn default_context() -> Value {
    Value::String(TD_CONTEXT_10.to_string())
}

fn default_security() -> Vec<String> {
    vec![NOSEC.to_string()]
}

fn default_security_definitions() -> BTreeMap<String, Value> {
    BTreeMap::from([(NOSEC.to_string(), serde_json::json!({ "scheme": "nosec" }))])
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// The declarative description of a Thing and its interactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingDescription {
    /// A JSON-LD `@context`, kept opaque.
    #[serde(rename = "@context", default = "default_context")]
    pub context: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base URI used to resolve relative form targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,

    /// Time of the last structural change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyAffordance>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<String, ActionAffordance>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub events: BTreeMap<String, EventAffordance>,

    #[serde(default = "default_security")]
    pub security: Vec<String>,

    #[serde(default = "default_security_definitions")]
    pub security_definitions: BTreeMap<String, Value>,
}

impl ThingDescription {
    /// Create an empty description with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            context: default_context(),
            id: None,
            title: title.into(),
            description: None,
            base: None,
            created: None,
            modified: None,
            properties: BTreeMap::new(),
            actions: BTreeMap::new(),
            events: BTreeMap::new(),
            security: default_security(),
            security_definitions: default_security_definitions(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, property: PropertyAffordance) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, action: ActionAffordance) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    #[must_use]
    pub fn with_event(mut self, name: impl Into<String>, event: EventAffordance) -> Self {
        self.events.insert(name.into(), event);
        self
    }

    /// Assign a fresh `urn:uuid:` identifier when none is set.
    pub fn ensure_id(&mut self) {
        if self.id.is_none() {
            self.id = Some(uuid::Uuid::new_v4().urn().to_string());
        }
    }

    /// Names declared for the given interaction kind, sorted.
    #[must_use]
    pub fn interaction_names(&self, kind: InteractionKind) -> Vec<String> {
        match kind {
            InteractionKind::Property => self.properties.keys().cloned().collect(),
            InteractionKind::Action => self.actions.keys().cloned().collect(),
            InteractionKind::Event => self.events.keys().cloned().collect(),
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ThingError::Validation`] when:
    /// - `title` is empty ([`ValidationError::EmptyTitle`])
    /// - `title` contains a `/` ([`ValidationError::InvalidTitle`])
    /// - an interaction name is empty or contains a `/`
    pub fn validate(&self) -> Result<(), ThingError> {
        if self.title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if self.title.contains('/') {
            return Err(ValidationError::InvalidTitle(self.title.clone()).into());
        }
        for kind in InteractionKind::ALL {
            for name in self.interaction_names(kind) {
                kind.validate_name(&name)?;
            }
        }
        Ok(())
    }
}

/// Metadata shared by every interaction affordance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
}

/// JSON Schema primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Number,
    String,
    Object,
    Array,
    Null,
}

/// A readable and/or writable piece of Thing state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAffordance {
    #[serde(flatten)]
    pub info: InteractionInfo,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub observable: bool,
}

impl PropertyAffordance {
    #[must_use]
    pub fn of_type(data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.info.title = Some(title.into());
        self
    }
}

/// An invocable function of a Thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionAffordance {
    #[serde(flatten)]
    pub info: InteractionInfo,

    /// Data schema of the input parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Data schema of the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub safe: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub idempotent: bool,
}

impl ActionAffordance {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            info: InteractionInfo {
                title: Some(title.into()),
                ..InteractionInfo::default()
            },
            ..Self::default()
        }
    }
}

/// A stream of notifications pushed by a Thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventAffordance {
    #[serde(flatten)]
    pub info: InteractionInfo,

    /// Data schema of every emitted value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventAffordance {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            info: InteractionInfo {
                title: Some(title.into()),
                ..InteractionInfo::default()
            },
            ..Self::default()
        }
    }
}

/// A protocol binding: where and how an interaction can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub op: Vec<Operation>,
}

/// Operation types a form can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    ReadProperty,
    WriteProperty,
    InvokeAction,
    SubscribeEvent,
    UnsubscribeEvent,
}
