//! Payload aggregation
//!
//! Merges N same-typed raw payloads into one collection payload and splits
//! them back apart. Homogeneity is checked on schema type only (name and
//! version may differ); the per-format packing is delegated to the handler
//! registered for that type.

use crate::formats::{FormatError, Formats};
use crate::schema::{VersionedSchema, VersionedSchemaRaw};

/// Error merging or splitting payload collections.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("payload aggregation failed because the incoming collection was empty")]
    Empty,
    #[error("payload aggregation failed homogeneous schema requirement, expected: {expected} found: {found}")]
    SchemaMismatch { expected: String, found: String },
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Aggregates and de-aggregates homogeneous payload collections.
#[derive(Clone, Default)]
pub struct PayloadAggregation {
    formats: Formats,
}

impl PayloadAggregation {
    pub fn new(formats: Formats) -> Self {
        Self { formats }
    }

    /// Merge the collection into one payload carrying the first element's
    /// schema identity. Validation runs to completion before any
    /// accumulation begins.
    pub fn aggregate(
        &self,
        incoming: &[VersionedSchemaRaw],
    ) -> Result<VersionedSchemaRaw, AggregationError> {
        let first = incoming.first().ok_or(AggregationError::Empty)?;
        self.must_be_same_schema(first, incoming)?;

        let mut aggregator = self
            .formats
            .must_lookup(first.schema().schema_type())
            .map_err(AggregationError::Format)?
            .create_aggregator();

        for vsr in incoming {
            aggregator.add(vsr.raw());
        }

        Ok(first.clone_with(aggregator.emit()))
    }

    /// Materialize each lazy payload then aggregate. Establishes no
    /// semantics beyond [`PayloadAggregation::aggregate`].
    pub fn aggregate_via_suppliers<I, F, E>(
        &self,
        suppliers: I,
    ) -> Result<VersionedSchemaRaw, AggregationError>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Result<VersionedSchemaRaw, E>,
        E: Into<AggregationError>,
    {
        let mut inner = Vec::new();
        for supplier in suppliers {
            inner.push(supplier().map_err(Into::into)?);
        }
        self.aggregate(&inner)
    }

    /// Split one combined payload back into its ordered fragments; the
    /// structural inverse of [`PayloadAggregation::aggregate`].
    pub fn de_aggregate(
        &self,
        schema: &VersionedSchema,
        payload: &str,
    ) -> Result<Vec<String>, AggregationError> {
        let aggregator = self
            .formats
            .must_lookup(schema.schema_type())
            .map_err(AggregationError::Format)?
            .create_aggregator();
        Ok(aggregator.de_aggregate(payload)?)
    }

    fn must_be_same_schema(
        &self,
        first: &VersionedSchemaRaw,
        incoming: &[VersionedSchemaRaw],
    ) -> Result<(), AggregationError> {
        for vsr in incoming {
            if !vsr.matches(first) {
                return Err(AggregationError::SchemaMismatch {
                    expected: first.schema().schema_type().to_string(),
                    found: vsr.schema().schema_type().to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, schema_type: &str, raw: &str) -> VersionedSchemaRaw {
        VersionedSchemaRaw::new(
            VersionedSchema::new(name, "1.0", schema_type).unwrap(),
            raw,
        )
    }

    #[test]
    fn test_empty_collection_fails() {
        let agg = PayloadAggregation::default();
        assert!(matches!(agg.aggregate(&[]), Err(AggregationError::Empty)));
    }

    #[test]
    fn test_heterogeneous_types_fail_citing_both() {
        let agg = PayloadAggregation::default();
        let input = vec![raw("a", "json", "{}"), raw("b", "xml", "<b/>")];
        match agg.aggregate(&input) {
            Err(AggregationError::SchemaMismatch { expected, found }) => {
                assert_eq!(expected, "json");
                assert_eq!(found, "xml");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_names_and_versions_may_differ() {
        let agg = PayloadAggregation::default();
        let input = vec![raw("a", "json", r#"{"n":1}"#), raw("b", "JSON", r#"{"n":2}"#)];
        let combined = agg.aggregate(&input).unwrap();
        // Wrapped with the first element's schema identity.
        assert_eq!(combined.schema().name(), "a");
        assert_eq!(combined.raw(), r#"[{"n":1},{"n":2}]"#);
    }

    #[test]
    fn test_round_trip_preserves_order_and_text() {
        let agg = PayloadAggregation::default();
        let input = vec![
            raw("a", "json", r#"{"n": 1}"#),
            raw("a", "json", r#"{"n": 2}"#),
            raw("a", "json", r#"{"n": 3}"#),
        ];
        let combined = agg.aggregate(&input).unwrap();
        let back = agg
            .de_aggregate(input[0].schema(), combined.raw())
            .unwrap();
        let originals: Vec<&str> = input.iter().map(VersionedSchemaRaw::raw).collect();
        assert_eq!(back, originals);
    }

    #[test]
    fn test_round_trip_keeps_fragment_padding() {
        let agg = PayloadAggregation::default();
        // Payloads read from files usually end in a newline; it must come
        // back with the fragment.
        let input = vec![
            raw("a", "json", "{\"n\": 1}\n"),
            raw("a", "json", "  {\"n\": 2}"),
        ];
        let combined = agg.aggregate(&input).unwrap();
        let back = agg
            .de_aggregate(input[0].schema(), combined.raw())
            .unwrap();
        let originals: Vec<&str> = input.iter().map(VersionedSchemaRaw::raw).collect();
        assert_eq!(back, originals);
    }

    #[test]
    fn test_aggregate_via_suppliers_defers_to_aggregate() {
        fn supplier(
            text: &'static str,
        ) -> impl FnOnce() -> Result<VersionedSchemaRaw, AggregationError> {
            move || Ok(raw("a", "json", text))
        }

        let agg = PayloadAggregation::default();
        let combined = agg
            .aggregate_via_suppliers(vec![supplier("1"), supplier("2")])
            .unwrap();
        assert_eq!(combined.raw(), "[1,2]");
    }

    #[test]
    fn test_unknown_type_surfaces_format_error() {
        let agg = PayloadAggregation::default();
        let input = vec![raw("a", "yaml", "x: 1")];
        assert!(matches!(
            agg.aggregate(&input),
            Err(AggregationError::Format(FormatError::UnknownFormat(_)))
        ));
    }
}
