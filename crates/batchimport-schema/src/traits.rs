//! # Trait Value Validation
//!
//! Validates one field value against the definition of the trait it is
//! imported into. For each trait a standalone JSON Schema is synthesized
//! from the identity schema:
//!
//! ```json
//! {
//!   "$schema": "<root dialect>",
//!   "type": "<trait type>",
//!   "format": "<trait format>",
//!   "title": "<trait title>",
//!   "maxLength": 320,
//!   "properties": { "<nested>": { } }
//! }
//! ```
//!
//! and compiled with the `jsonschema` crate. Type checks, format checks
//! (e.g. `email`) and length counting are left entirely to the evaluator.
//!
//! ## Compiled-Schema Cache
//!
//! Validation runs once per field per record, so compiled validators are
//! cached by trait name inside [`TraitValidator`]. Lookups take a shared
//! read lock; a miss takes the write lock, checks again, and only then
//! compiles. At most one compilation per trait name happens, even when
//! many threads hit the same trait for the first time concurrently.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jsonschema::{Draft, Validator};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::{SchemaError, ValidationViolations, Violation};
use crate::model::Schema;

/// Evaluator draft used when the root dialect is absent or unrecognized.
const DEFAULT_DRAFT: Draft = Draft::Draft7;

/// Map a `$schema` dialect URI to an evaluator draft.
pub fn draft_for_dialect(dialect: &str) -> Option<Draft> {
    if dialect.contains("draft-04") {
        Some(Draft::Draft4)
    } else if dialect.contains("draft-06") {
        Some(Draft::Draft6)
    } else if dialect.contains("draft-07") {
        Some(Draft::Draft7)
    } else if dialect.contains("2019-09") {
        Some(Draft::Draft201909)
    } else if dialect.contains("2020-12") {
        Some(Draft::Draft202012)
    } else {
        None
    }
}

/// Per-trait value validator over one identity schema.
///
/// `Send + Sync`; share it behind an `Arc` to validate records from
/// several threads.
pub struct TraitValidator {
    schema: Arc<Schema>,
    /// `None` when the root dialect is not a draft the evaluator knows; the
    /// synthesized schemas then omit `$schema`.
    dialect_draft: Option<Draft>,
    cache: RwLock<HashMap<String, Arc<Validator>>>,
    compilations: AtomicUsize,
}

impl fmt::Debug for TraitValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitValidator")
            .field("schema_id", &self.schema.id)
            .field("draft", &self.draft())
            .field("cached_traits", &self.cached_traits())
            .field("compilations", &self.compilations())
            .finish()
    }
}

impl TraitValidator {
    pub fn new(schema: Arc<Schema>) -> Self {
        let dialect_draft = draft_for_dialect(&schema.dialect);
        if dialect_draft.is_none() && !schema.dialect.is_empty() {
            tracing::warn!(
                dialect = %schema.dialect,
                "unrecognized schema dialect, validating traits as draft-07"
            );
        }
        Self {
            schema,
            dialect_draft,
            cache: RwLock::new(HashMap::new()),
            compilations: AtomicUsize::new(0),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Draft the trait schemas are compiled under.
    pub fn draft(&self) -> Draft {
        self.dialect_draft.unwrap_or(DEFAULT_DRAFT)
    }

    /// Number of trait schemas compiled so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of trait names with a cached compiled schema.
    pub fn cached_traits(&self) -> usize {
        self.cache.read().len()
    }

    /// Synthesize the standalone schema for one trait.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownTrait`] if the trait is not declared.
    pub fn trait_schema(&self, name: &str) -> Result<Value, SchemaError> {
        let field = self
            .schema
            .trait_field(name)
            .ok_or_else(|| SchemaError::UnknownTrait {
                trait_name: name.to_string(),
            })?;

        let mut doc = Map::new();
        if self.dialect_draft.is_some() {
            doc.insert("$schema".into(), Value::String(self.schema.dialect.clone()));
        }
        if let Some(field_type) = field.field_type {
            doc.insert("type".into(), Value::String(field_type.as_str().into()));
        }
        if let Some(format) = &field.format {
            doc.insert("format".into(), Value::String(format.clone()));
        }
        if let Some(title) = &field.title {
            doc.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(max_length) = field.max_length.filter(|n| *n > 0) {
            doc.insert("maxLength".into(), Value::from(max_length));
        }
        if !field.properties.is_empty() {
            let nested = serde_json::to_value(&field.properties).map_err(|e| {
                SchemaError::TraitCompile {
                    trait_name: name.to_string(),
                    reason: format!("nested properties do not serialize: {e}"),
                }
            })?;
            doc.insert("properties".into(), nested);
        }

        Ok(Value::Object(doc))
    }

    /// Compiled validator for a trait, compiling on first use.
    fn compiled(&self, name: &str) -> Result<Arc<Validator>, SchemaError> {
        if self.schema.trait_field(name).is_none() {
            return Err(SchemaError::UnknownTrait {
                trait_name: name.to_string(),
            });
        }
        if let Some(validator) = self.cache.read().get(name) {
            return Ok(Arc::clone(validator));
        }

        let mut cache = self.cache.write();
        if let Some(validator) = cache.get(name) {
            return Ok(Arc::clone(validator));
        }

        let doc = self.trait_schema(name)?;
        let validator = jsonschema::options()
            .with_draft(self.draft())
            .should_validate_formats(true)
            .build(&doc)
            .map_err(|e| SchemaError::TraitCompile {
                trait_name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(trait_name = %name, "compiled trait schema");

        let validator = Arc::new(validator);
        cache.insert(name.to_string(), Arc::clone(&validator));
        Ok(validator)
    }

    /// Validate one value against its trait.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownTrait`] if the trait is not declared,
    /// [`SchemaError::TraitCompile`] if its synthesized schema is rejected
    /// by the evaluator, and [`SchemaError::ValidationFailed`] carrying
    /// every evaluator diagnostic if the value does not conform.
    pub fn validate_trait(&self, name: &str, value: &Value) -> Result<(), SchemaError> {
        let validator = self.compiled(name)?;

        let violations: Vec<Violation> = validator
            .iter_errors(value)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed {
                trait_name: name.to_string(),
                violations: ValidationViolations::new(violations),
            })
        }
    }

    /// Validate every field of one record, returning all failures.
    pub fn validate_fields<'a, I>(&self, fields: I) -> Vec<SchemaError>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        fields
            .into_iter()
            .filter_map(|(name, value)| self.validate_trait(name, value).err())
            .collect()
    }

    /// Validate one record's field map, returning every field failure.
    pub fn validate_record(&self, fields: &Map<String, Value>) -> Vec<SchemaError> {
        self.validate_fields(fields)
    }
}
