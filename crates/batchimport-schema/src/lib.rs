//! # batchimport-schema: Schema-Driven Identity Validation
//!
//! The validation engine behind batch identity imports. Given a tenant's
//! identity schema it answers two questions about an input file:
//!
//! 1. **Structure** ([`headers`]): are the file's field names all declared
//!    traits, and are all required traits present?
//! 2. **Values** ([`traits`]): does each field value conform to its trait's
//!    type, format and length constraints?
//!
//! The schema itself is modelled in [`model`]. Fetching it, reading input
//! files and submitting identities are left to other crates.
//!
//! ## Crate Policy
//!
//! - No I/O. Everything here works on in-memory values.
//! - The [`Schema`] is never mutated after it is parsed.
//! - Every failure is a typed [`SchemaError`] with an [`ErrorKind`].

pub mod error;
pub mod headers;
pub mod model;
pub mod traits;

pub use error::{ErrorKind, SchemaError, ValidationViolations, Violation};
pub use headers::{check_headers, validate_headers, HeaderReport};
pub use model::{Properties, Schema, TraitField, TraitProperties, TraitType};
pub use traits::{draft_for_dialect, TraitValidator};

pub use jsonschema::Draft;
