//! Description port: regenerates the Thing Description from declared interactions.

use std::sync::Arc;

use servient_domain::error::CodecError;
use servient_domain::thing::ThingDescription;

/// Produces the canonical description of a Thing.
///
/// The registry calls [`generate`](Self::generate) on every `describe()` and
/// after every structural change; results are never cached.
pub trait DescriptionGenerator: Send + Sync {
    /// Build the published description from the declared one.
    ///
    /// `declared` carries the affordance metadata as declared by the
    /// application; `thing_path` is the Thing's canonical path (`/<title>`).
    fn generate(&self, declared: &ThingDescription, thing_path: &str) -> ThingDescription;

    /// Serialize a description to text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if serialization fails.
    fn serialize(&self, description: &ThingDescription) -> Result<String, CodecError>;
}

impl<T: DescriptionGenerator + ?Sized> DescriptionGenerator for Arc<T> {
    fn generate(&self, declared: &ThingDescription, thing_path: &str) -> ThingDescription {
        (**self).generate(declared, thing_path)
    }

    fn serialize(&self, description: &ThingDescription) -> Result<String, CodecError> {
        (**self).serialize(description)
    }
}
