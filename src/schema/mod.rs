//! Versioned schema identities
//!
//! A payload shape is identified by a (name, version, type) triple, where
//! type is the on-the-wire format (json, xml, ...). Translation plans pair
//! two of these identities; payloads travel alongside one as raw text.

use std::fmt;

/// Error constructing a schema identity.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema name must not be blank")]
    BlankName,
    #[error("schema version must not be blank")]
    BlankVersion,
    #[error("schema type must not be blank")]
    BlankType,
}

/// Immutable identity of a payload shape.
///
/// The type is case-normalized to lower case at construction so lookups in
/// the formats registry are case-insensitive. Equality and hashing are
/// structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct VersionedSchema {
    name: String,
    version: String,
    #[serde(rename = "type")]
    schema_type: String,
}

impl VersionedSchema {
    /// Build a schema identity, rejecting blank fields.
    pub fn new(
        name: impl AsRef<str>,
        version: impl AsRef<str>,
        schema_type: impl AsRef<str>,
    ) -> Result<Self, SchemaError> {
        let name = name.as_ref().trim();
        let version = version.as_ref().trim();
        let schema_type = schema_type.as_ref().trim();

        if name.is_empty() {
            return Err(SchemaError::BlankName);
        }
        if version.is_empty() {
            return Err(SchemaError::BlankVersion);
        }
        if schema_type.is_empty() {
            return Err(SchemaError::BlankType);
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            schema_type: schema_type.to_lowercase(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    /// A new identity with a replaced name and the same version/type.
    pub fn rename(&self, new_name: impl AsRef<str>) -> Result<Self, SchemaError> {
        Self::new(new_name, &self.version, &self.schema_type)
    }
}

impl fmt::Display for VersionedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}/{}]", self.name, self.version, self.schema_type)
    }
}

/// A schema identity paired with the raw payload text it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedSchemaRaw {
    schema: VersionedSchema,
    raw: String,
}

impl VersionedSchemaRaw {
    pub fn new(schema: VersionedSchema, raw: impl Into<String>) -> Self {
        Self {
            schema,
            raw: raw.into(),
        }
    }

    /// True when the two payloads share a format type. Name and version are
    /// deliberately ignored: aggregation homogeneity is a format concern.
    pub fn matches(&self, other: &VersionedSchemaRaw) -> bool {
        self.schema.schema_type() == other.schema.schema_type()
    }

    /// A sibling carrying the same schema identity and new raw text.
    pub fn clone_with(&self, raw: impl Into<String>) -> Self {
        Self::new(self.schema.clone(), raw)
    }

    pub fn schema(&self) -> &VersionedSchema {
        &self.schema
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}
