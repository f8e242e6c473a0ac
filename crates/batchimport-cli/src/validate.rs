//! # Validate Subcommand
//!
//! Checks an import file before it is submitted: the file's field names
//! against the identity schema's traits, then every record's values against
//! the trait definitions.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use batchimport_client::config::parse_api_url;
use batchimport_client::{fetch_identity_schema, FileSchemaFetcher, OryApiConfig, OryProjectFetcher};
use batchimport_reader::{detect_format, InputFormat, Reader};
use batchimport_schema::{Schema, SchemaError, TraitValidator};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the CSV or JSON import file.
    #[arg(short = 'f', long)]
    pub file: PathBuf,

    /// Input format (csv or json). Detected from the file extension when omitted.
    #[arg(short = 't', long)]
    pub format: Option<InputFormat>,

    /// Ory Network project whose identity schema is used.
    #[arg(short = 'p', long, required_unless_present = "schema", conflicts_with = "schema")]
    pub project_id: Option<String>,

    /// Local identity schema file, instead of fetching it from a project.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Ory API base URL. Overrides ORY_API_URL.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Stop at the first invalid record.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Counts gathered while validating one file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub header_errors: usize,
    pub records: usize,
    pub invalid_records: usize,
}

impl Summary {
    pub fn is_ok(&self) -> bool {
        self.header_errors == 0 && self.invalid_records == 0
    }
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let format = match args.format {
        Some(format) => format,
        None => detect_format(&args.file)
            .context("cannot determine the input format; pass --format")?,
    };
    let schema = Arc::new(load_schema(args)?);

    let reader = Reader::new(&args.file, format, Arc::clone(&schema));
    let validator = TraitValidator::new(schema);

    let stdout = io::stdout();
    let summary = validate_file(&reader, &validator, args.fail_fast, &mut stdout.lock())?;

    tracing::debug!(
        records = summary.records,
        compilations = validator.compilations(),
        "validation finished"
    );
    Ok(if summary.is_ok() { 0 } else { 1 })
}

/// Obtain the identity schema from `--schema` or `--project-id`.
fn load_schema(args: &ValidateArgs) -> Result<Schema> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match (&args.schema, &args.project_id) {
        (Some(path), _) => {
            let fetcher = FileSchemaFetcher::new(path);
            runtime
                .block_on(fetch_identity_schema(&fetcher, "local"))
                .with_context(|| format!("failed to load identity schema from {}", path.display()))
        }
        (None, Some(project_id)) => {
            let mut config =
                OryApiConfig::from_env().context("failed to load Ory API configuration")?;
            if let Some(url) = &args.api_url {
                config.api_url = parse_api_url(url).context("invalid --api-url")?;
            }
            let fetcher = OryProjectFetcher::new(&config)?;
            runtime
                .block_on(fetch_identity_schema(&fetcher, project_id))
                .with_context(|| {
                    format!("failed to fetch identity schema for project '{project_id}'")
                })
        }
        (None, None) => bail!("either --project-id or --schema is required"),
    }
}

/// Validate one file, writing a report to `out`.
///
/// Structural problems with the field names are all reported and stop the
/// run before any value is checked.
pub fn validate_file<W: Write>(
    reader: &Reader,
    validator: &TraitValidator,
    fail_fast: bool,
    out: &mut W,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let path = reader.path().display();

    let header_errors = reader
        .check_headers()
        .with_context(|| format!("failed to read field names from {path}"))?
        .errors();
    if !header_errors.is_empty() {
        summary.header_errors = header_errors.len();
        writeln!(out, "{path}: field names do not match the identity schema")?;
        for err in &header_errors {
            writeln!(out, "  {err}")?;
        }
        write_summary(out, &summary)?;
        return Ok(summary);
    }

    for record in reader
        .records()
        .with_context(|| format!("failed to read records from {path}"))?
    {
        let record = record.with_context(|| format!("failed to read records from {path}"))?;
        summary.records += 1;

        let mut failures = Vec::new();
        for name in validator.schema().required() {
            if !record.fields.contains_key(name) {
                failures.push(format!("required field '{name}' is empty or missing"));
            }
        }
        for err in validator.validate_record(&record.fields) {
            match err {
                SchemaError::ValidationFailed {
                    trait_name,
                    violations,
                } => failures.extend(
                    violations
                        .violations()
                        .iter()
                        .map(|v| format!("{trait_name}{}: {}", v.instance_path, v.message)),
                ),
                other => failures.push(other.to_string()),
            }
        }

        if failures.is_empty() {
            continue;
        }
        summary.invalid_records += 1;
        writeln!(out, "record {}:", record.position)?;
        for failure in &failures {
            writeln!(out, "  {failure}")?;
        }
        if fail_fast {
            tracing::info!(record = record.position, "stopping at first invalid record");
            break;
        }
    }

    write_summary(out, &summary)?;
    Ok(summary)
}

fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    if summary.header_errors > 0 {
        writeln!(out, "FAILED: {} header error(s)", summary.header_errors)
    } else if summary.invalid_records > 0 {
        writeln!(
            out,
            "FAILED: {} of {} record(s) invalid",
            summary.invalid_records, summary.records
        )
    } else {
        writeln!(out, "OK: {} record(s) valid", summary.records)
    }
}
