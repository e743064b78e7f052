/*!
# Configuration Metadata

Typed model of exported 1C configuration metadata and the loader that
turns per-configuration JSON exports into it.
*/

pub mod loader;
pub mod metadata;

pub use loader::{load_directory, load_file, load_sources, parse_configuration, LoadOutcome};
pub use metadata::{
    AttributeDescriptor, AttributeRole, ConfigurationMetadata, KindForm, KindLanguage,
    MetadataKind, MetadataObject, ObjectGroup, ObjectPresentations, TabularSection, KIND_FORMS,
};
