//! Cartograph - schema-driven payload translation SDK
//!
//! Translates a structured payload conforming to one versioned schema into
//! an equivalent payload conforming to another, driven by declarative
//! templates that embed `${name}` variables inside an example of the target
//! document. Provides:
//! - Versioned schema identities and raw payload carriers
//! - The variable pattern language (defaults, wildcard array indices)
//! - Template binding and value injection (JSON; formats are pluggable)
//! - Translation plans with classifier-driven schema resolution and
//!   parent/child decomposition of collection payloads
//! - Homogeneity-checked payload aggregation and de-aggregation

pub mod aggregation;
pub mod bindings;
pub mod cartography;
pub mod formats;
pub mod library;
pub mod plan;
pub mod schema;
pub mod variables;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use aggregation::{AggregationError, PayloadAggregation};
pub use bindings::{Bindings, VariablesFetcher};
pub use cartography::{
    Cartography, CartographyLogged, CartographerWorker, MorpherExecutor, NoopMorphers,
    TranslateError, EMPTY_DEFAULTS,
};
pub use formats::{Aggregator, FormatError, FormatHandler, Formats, JsonFormat, XmlFormat};
pub use library::{FilesystemLibrary, LibraryError, MemoryLibrary, TemplateLibrary};
pub use plan::{
    ChildRole, ClassifierResolver, Morpher, ParentRole, PlanError, Role, TranslationPlan,
    TranslationPlanLite, DEFAULT_INPUT_MORPHER, DEFAULT_OUTPUT_MORPHER,
};
pub use schema::{SchemaError, VersionedSchema, VersionedSchemaRaw};
pub use variables::{splice, Finding, VariableError, Variables};
