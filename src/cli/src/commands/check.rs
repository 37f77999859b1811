//! `vetter check` - validate a record against an exported schema.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use vetter_core::prelude::*;

use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Exported schema declaration file (JSON)
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Record to validate (JSON object)
    #[arg(short, long)]
    pub record: PathBuf,

    /// Persisted snapshot of the record (JSON object); implies --exists
    #[arg(long)]
    pub original: Option<PathBuf>,

    /// Treat the record itself as already persisted
    #[arg(long)]
    pub exists: bool,

    /// Seed rows for uniqueness checks: JSON map of table name to row list
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Dotted key prefix for reported errors
    #[arg(long)]
    pub prefix: Option<String>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {what} in {}", path.display()))
}

pub fn execute(args: CheckArgs, format: OutputFormat) -> Result<()> {
    let export: EntitySchemaExport = read_json(&args.schema, "schema")?;
    let schema = EntitySchema::from_export(export).context("schema failed its audit")?;

    let record: Map<String, Value> = read_json(&args.record, "record")?;

    let mut entity = match &args.original {
        Some(path) => {
            let original: Map<String, Value> = read_json(path, "original record")?;
            Entity::from_persisted(schema, original).context("original record rejected")?
        }
        None if args.exists => {
            Entity::from_persisted(schema.clone(), record.clone())
                .context("record rejected")?
        }
        None => Entity::new(schema),
    };
    entity.fill(record).context("record rejected")?;

    let store = MemoryStore::new();
    if let Some(path) = &args.store {
        let tables: HashMap<String, Vec<Map<String, Value>>> = read_json(path, "store seed")?;
        for (table, rows) in tables {
            for row in rows {
                store.insert(&table, row);
            }
        }
    }

    let pipeline = ValidationPipeline::new(store);
    let mut options = ValidateOptions::new();
    if let Some(prefix) = &args.prefix {
        options = options.prefix(prefix.split('.'));
    }

    match pipeline.validate_with(&entity, options) {
        Ok(()) => {
            output::print_success(&format!(
                "record passes validation for entity '{}'",
                entity.schema().name()
            ));
            Ok(())
        }
        Err(VetterError::Validation(bag)) => {
            match format {
                OutputFormat::Json => output::print_item(&bag),
                OutputFormat::Text => {
                    output::print_info(&format!(
                        "{} error(s) across {} field(s)",
                        bag.error_count(),
                        bag.field_count()
                    ));
                    for (key, errors) in bag.iter() {
                        for error in errors {
                            output::print_detail(key, &error.message);
                        }
                    }
                }
            }
            bail!("validation failed");
        }
        Err(other) => Err(other.into()),
    }
}
