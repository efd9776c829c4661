//! Format handlers
//!
//! Maps a schema type string (json, xml, ...) to the handler implementing
//! the format-specific pieces of a translation: template binding, value
//! injection, and payload aggregation. Custom handlers can be registered
//! alongside the built-ins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bindings::Bindings;

pub mod json;
pub mod xml;

pub use json::JsonFormat;
pub use xml::XmlFormat;

/// Error raised by format lookup or a format-specific operation.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("no format handler registered for type: {0}")]
    UnknownFormat(String),
    #[error("{format} payload is malformed: {reason}")]
    Malformed { format: &'static str, reason: String },
    #[error("{operation} is not supported for {format} payloads")]
    Unsupported {
        format: &'static str,
        operation: &'static str,
    },
    #[error("template variables have no binding and no default: {}", .0.join(", "))]
    UnboundVariables(Vec<String>),
}

/// Accumulates same-typed raw payload fragments and emits one combined
/// payload; `de_aggregate` is the structural inverse.
///
/// `emit` is only meaningful after at least one `add`; the aggregation layer
/// guards against empty input before any accumulation begins.
pub trait Aggregator {
    fn add(&mut self, raw: &str);
    fn emit(&self) -> String;
    fn de_aggregate(&self, combined: &str) -> Result<Vec<String>, FormatError>;
}

/// Everything the engine needs from one payload format.
pub trait FormatHandler: Send + Sync {
    /// Lower-case type string this handler serves.
    fn format_type(&self) -> &'static str;

    fn create_aggregator(&self) -> Box<dyn Aggregator>;

    /// Extract bindings from `payload` using the variable patterns embedded
    /// in `template`.
    fn bind(&self, template: &str, payload: &str) -> Result<Bindings, FormatError>;

    /// Substitute `bindings` into `template` and serialize the result.
    fn inject(&self, template: &str, bindings: &Bindings) -> Result<String, FormatError>;
}

/// Registry of format handlers keyed by schema type.
#[derive(Clone)]
pub struct Formats {
    handlers: HashMap<String, Arc<dyn FormatHandler>>,
}

impl Default for Formats {
    fn default() -> Self {
        let mut formats = Self {
            handlers: HashMap::new(),
        };
        formats.register(Arc::new(JsonFormat));
        formats.register(Arc::new(XmlFormat));
        formats
    }
}

impl Formats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no built-in handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn FormatHandler>) {
        self.handlers
            .insert(handler.format_type().to_lowercase(), handler);
    }

    /// Look up the handler for a schema type, failing on unknown types.
    pub fn must_lookup(&self, schema_type: &str) -> Result<Arc<dyn FormatHandler>, FormatError> {
        self.handlers
            .get(&schema_type.to_lowercase())
            .cloned()
            .ok_or_else(|| FormatError::UnknownFormat(schema_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let formats = Formats::default();
        assert!(formats.must_lookup("json").is_ok());
        assert!(formats.must_lookup("JSON").is_ok());
        assert!(formats.must_lookup("xml").is_ok());
    }

    #[test]
    fn test_unknown_format_is_typed_error() {
        let formats = Formats::default();
        match formats.must_lookup("yaml") {
            Err(FormatError::UnknownFormat(t)) => assert_eq!(t, "yaml"),
            other => panic!("expected unknown format, got {:?}", other.map(|_| ())),
        }
    }
}
