//! Thing Description generation with protocol forms.

use servient_domain::content::JSON;
use servient_domain::error::CodecError;
use servient_domain::interaction::{InteractionKind, encode_path};
use servient_domain::thing::{Form, Operation, PropertyAffordance, ThingDescription};

use crate::ports::DescriptionGenerator;

/// Fills in one form per interaction, pointing at its canonical path.
///
/// Forms declared by the application are replaced: the published description
/// always advertises where *this* runtime serves the interaction.
#[derive(Debug, Clone, Default)]
pub struct FormGenerator {
    base_uri: Option<String>,
}

impl FormGenerator {
    /// Generate relative `href`s (`/lamp/properties/on`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate absolute `href`s below `base_uri` (`http://host:8080/lamp/properties/on`).
    #[must_use]
    pub fn with_base_uri(base_uri: impl Into<String>) -> Self {
        let base_uri: String = base_uri.into();
        Self {
            base_uri: Some(base_uri.trim_end_matches('/').to_string()),
        }
    }

    fn form(&self, path: &str, op: Vec<Operation>) -> Form {
        let href = encode_path(path);
        Form {
            href: match &self.base_uri {
                Some(base) => format!("{base}{href}"),
                None => href,
            },
            content_type: Some(JSON.to_string()),
            op,
        }
    }
}

fn property_operations(property: &PropertyAffordance) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(2);
    if !property.write_only {
        ops.push(Operation::ReadProperty);
    }
    if !property.read_only {
        ops.push(Operation::WriteProperty);
    }
    ops
}

impl DescriptionGenerator for FormGenerator {
    fn generate(&self, declared: &ThingDescription, thing_path: &str) -> ThingDescription {
        let mut td = declared.clone();
        if td.base.is_none() {
            td.base.clone_from(&self.base_uri);
        }
        for (name, property) in &mut td.properties {
            let ops = property_operations(property);
            let path = InteractionKind::Property.path(thing_path, name);
            property.info.forms = vec![self.form(&path, ops)];
        }
        for (name, action) in &mut td.actions {
            let path = InteractionKind::Action.path(thing_path, name);
            action.info.forms = vec![self.form(&path, vec![Operation::InvokeAction])];
        }
        for (name, event) in &mut td.events {
            let path = InteractionKind::Event.path(thing_path, name);
            event.info.forms = vec![self.form(
                &path,
                vec![Operation::SubscribeEvent, Operation::UnsubscribeEvent],
            )];
        }
        td
    }

    fn serialize(&self, description: &ThingDescription) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(description)?)
    }
}
