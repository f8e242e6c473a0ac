//! # Error Types
//!
//! Every failure surfaced by the validation engine carries an
//! [`ErrorKind`], the offending field or trait name where one applies, and
//! a human-readable message suitable for direct display.
//!
//! [`ErrorKind`] is shared with `batchimport-reader` so that callers can
//! branch on a single classification regardless of which crate produced
//! the error.

use std::fmt;

use thiserror::Error;

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The schema document cannot be parsed into the model, or its
    /// required/trait-name relationship is inconsistent. Aborts the import.
    MalformedSchema,
    /// Unrecognized file extension or declared input format.
    UnsupportedFormat,
    /// The record source has no header row or first object.
    EmptyInput,
    /// The record source's top-level value is neither an array nor an object.
    InvalidStructure,
    /// A source field is not declared as a trait in the schema.
    UnknownField,
    /// A required trait is absent from the source's fields.
    MissingRequiredField,
    /// Value validation was requested for a name the schema does not declare.
    UnknownTrait,
    /// A value does not conform to its trait definition.
    ValidationFailed,
    /// Reading the record source failed.
    Io,
}

impl ErrorKind {
    /// Stable identifier used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedSchema => "malformed_schema",
            Self::UnsupportedFormat => "unsupported_format",
            Self::EmptyInput => "empty_input",
            Self::InvalidStructure => "invalid_structure",
            Self::UnknownField => "unknown_field",
            Self::MissingRequiredField => "missing_required_field",
            Self::UnknownTrait => "unknown_trait",
            Self::ValidationFailed => "validation_failed",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while building the schema model or validating against it.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema document could not be turned into a [`crate::Schema`].
    #[error("malformed schema: {reason}")]
    MalformedSchema {
        /// What made the document unusable.
        reason: String,
    },

    /// The per-trait schema synthesized from the identity schema was
    /// rejected by the evaluator.
    #[error("malformed schema: trait '{trait_name}' does not compile: {reason}")]
    TraitCompile {
        /// Trait whose synthesized schema failed to compile.
        trait_name: String,
        /// Evaluator diagnostic.
        reason: String,
    },

    /// A source field is not a declared trait.
    #[error("header '{field}' not found in schema")]
    UnknownField {
        /// The undeclared field name.
        field: String,
    },

    /// A required trait is missing from the source's fields.
    #[error("required field '{field}' not found in headers")]
    MissingRequiredField {
        /// The missing required trait name.
        field: String,
    },

    /// Value validation requested for an undeclared trait.
    #[error("trait '{trait_name}' not found in schema")]
    UnknownTrait {
        /// The requested trait name.
        trait_name: String,
    },

    /// The value does not conform to the trait definition.
    #[error("validation failed for trait '{trait_name}':\n{violations}")]
    ValidationFailed {
        /// Trait the value was validated against.
        trait_name: String,
        /// Every diagnostic the evaluator produced.
        violations: ValidationViolations,
    },
}

impl SchemaError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedSchema { .. } | Self::TraitCompile { .. } => ErrorKind::MalformedSchema,
            Self::UnknownField { .. } => ErrorKind::UnknownField,
            Self::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Self::UnknownTrait { .. } => ErrorKind::UnknownTrait,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
        }
    }

    /// The field or trait name this error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MalformedSchema { .. } => None,
            Self::TraitCompile { trait_name, .. }
            | Self::UnknownTrait { trait_name }
            | Self::ValidationFailed { trait_name, .. } => Some(trait_name),
            Self::UnknownField { field } | Self::MissingRequiredField { field } => Some(field),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSchema {
            reason: reason.into(),
        }
    }
}

/// A single evaluator diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending location inside the value.
    pub instance_path: String,
    /// JSON Pointer to the keyword in the synthesized trait schema.
    pub schema_path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (value): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of evaluator diagnostics for one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    pub(crate) fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_field_for_structural_errors() {
        let err = SchemaError::UnknownField {
            field: "nickname".into(),
        };
        assert_eq!(err.kind(), ErrorKind::UnknownField);
        assert_eq!(err.field(), Some("nickname"));
        assert_eq!(err.to_string(), "header 'nickname' not found in schema");

        let err = SchemaError::MissingRequiredField {
            field: "email".into(),
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
        assert_eq!(err.to_string(), "required field 'email' not found in headers");
    }

    #[test]
    fn compile_failure_is_a_malformed_schema() {
        let err = SchemaError::TraitCompile {
            trait_name: "age".into(),
            reason: "bad".into(),
        };
        assert_eq!(err.kind(), ErrorKind::MalformedSchema);
        assert_eq!(err.field(), Some("age"));
        assert_eq!(SchemaError::malformed("x").field(), None);
    }

    #[test]
    fn violation_display_format() {
        let v = Violation {
            instance_path: "/street".to_string(),
            schema_path: "/properties/street/type".to_string(),
            message: r#"42 is not of type "string""#.to_string(),
        };
        let display = v.to_string();
        assert!(display.contains("/street"));
        assert!(display.contains("is not of type"));
    }

    #[test]
    fn violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/maxLength".to_string(),
            message: r#""abcdef" is longer than 5 characters"#.to_string(),
        };
        assert!(v.to_string().contains("(value)"));
    }

    #[test]
    fn violations_display_one_per_line() {
        let violations = ValidationViolations::new(vec![
            Violation {
                instance_path: String::new(),
                schema_path: "/type".into(),
                message: "first".into(),
            },
            Violation {
                instance_path: "/a".into(),
                schema_path: "/properties/a/type".into(),
                message: "second".into(),
            },
        ]);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations.to_string().lines().count(), 2);
    }

    #[test]
    fn error_kind_identifiers_are_stable() {
        assert_eq!(ErrorKind::MissingRequiredField.to_string(), "missing_required_field");
        assert_eq!(ErrorKind::Io.as_str(), "io");
    }
}
