//! Port definitions: traits that collaborators implement.
//!
//! Ports are the boundaries between the runtime core and the outside world.
//! They are defined here (in `app`) so that both the registry and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod codec;
pub mod description;
pub mod servient;

pub use codec::ContentCodec;
pub use description::DescriptionGenerator;
pub use servient::Servient;
