//! # batchimport-cli: Batch Identity Import Validator
//!
//! Provides the `batchimport` command-line interface.
//!
//! ## Subcommands
//!
//! - `batchimport validate`: check a CSV or JSON import file against the
//!   identity schema of an Ory Network project (or a local schema file).
//!
//! ```bash
//! ORY_API_KEY=ory_pat_... batchimport validate -f users.csv -p <project-id>
//! batchimport validate -f users.json --schema identity.schema.json
//! ```
//!
//! Exit status is 0 when the file is valid and 1 otherwise.

pub mod validate;
