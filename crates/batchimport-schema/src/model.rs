//! # Identity Schema Model
//!
//! Typed representation of a tenant identity schema as served by the
//! identity service. Only the `traits` object is modelled in detail; it is
//! the part that describes the fields an imported identity may carry.
//!
//! ```json
//! {
//!   "$id": "https://schemas.ory.sh/presets/kratos/identity.email.schema.json",
//!   "$schema": "http://json-schema.org/draft-07/schema#",
//!   "title": "Person",
//!   "type": "object",
//!   "properties": {
//!     "traits": {
//!       "type": "object",
//!       "properties": {
//!         "email": { "type": "string", "format": "email", "maxLength": 320 }
//!       },
//!       "required": ["email"],
//!       "additionalProperties": false
//!     }
//!   }
//! }
//! ```
//!
//! A [`Schema`] is immutable once parsed. Keys a trait definition carries
//! beyond the modelled ones are kept in [`TraitField::extra`] and written
//! back out unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Root of an identity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema identifier (`$id`).
    #[serde(rename = "$id", default)]
    pub id: String,
    /// Schema dialect URI (`$schema`).
    #[serde(rename = "$schema", default)]
    pub dialect: String,
    #[serde(default)]
    pub title: String,
    /// Declared root type; identity schemas use `"object"`.
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: String,
    pub properties: Properties,
}

/// Top-level `properties` of an identity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub traits: TraitProperties,
}

/// The `traits` object: declared traits and which of them are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitProperties {
    #[serde(rename = "type", default = "object_type")]
    pub traits_type: String,
    /// Trait name to definition.
    pub properties: BTreeMap<String, TraitField>,
    /// Required trait names, in declaration order.
    #[serde(default)]
    pub required: Vec<String>,
    /// Whether traits outside `properties` are permitted. Not enforced by
    /// the header check.
    #[serde(rename = "additionalProperties", default = "permit_additional")]
    pub additional_properties: bool,
}

/// JSON Schema primitive types a trait may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl TraitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single trait, or of a property nested inside an object
/// trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitField {
    /// Declared type. Absent means any JSON value is accepted.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<TraitType>,
    /// String format such as `"email"`; checked by the evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Nested property definitions for object traits.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, TraitField>,
    /// Identity-service credential annotation (`ory.sh/kratos`). Carried
    /// through, never interpreted.
    #[serde(rename = "ory.sh/kratos", default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    /// Any other keywords on the definition.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn object_type() -> String {
    "object".to_string()
}

fn permit_additional() -> bool {
    true
}

impl Schema {
    /// Parse a raw schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MalformedSchema`] if the bytes are not JSON,
    /// if `properties.traits` or its `properties` map is missing, or if a
    /// required trait is not declared.
    pub fn parse(raw: &[u8]) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_slice(raw)
            .map_err(|e| SchemaError::malformed(format!("invalid schema document: {e}")))?;
        schema.check()?;
        Ok(schema)
    }

    /// Build a schema from an already-decoded document.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Schema::parse`].
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_value(value)
            .map_err(|e| SchemaError::malformed(format!("invalid schema document: {e}")))?;
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.schema_type != "object" {
            tracing::warn!(
                schema_id = %self.id,
                schema_type = %self.schema_type,
                "identity schema root is not an object"
            );
        }

        let traits = &self.properties.traits;
        if let Some(name) = traits
            .required
            .iter()
            .find(|name| !traits.properties.contains_key(name.as_str()))
        {
            return Err(SchemaError::malformed(format!(
                "required trait '{name}' is not declared in traits properties"
            )));
        }
        Ok(())
    }

    /// All declared traits, keyed by name.
    pub fn traits(&self) -> &BTreeMap<String, TraitField> {
        &self.properties.traits.properties
    }

    /// Look up one trait definition.
    pub fn trait_field(&self, name: &str) -> Option<&TraitField> {
        self.properties.traits.properties.get(name)
    }

    /// Required trait names in declaration order.
    pub fn required(&self) -> &[String] {
        &self.properties.traits.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.properties.traits.required.iter().any(|r| r == name)
    }

    /// Declared trait names, sorted.
    pub fn trait_names(&self) -> impl Iterator<Item = &str> {
        self.properties.traits.properties.keys().map(String::as_str)
    }
}
