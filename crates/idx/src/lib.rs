//! idx: a thin demonstration CLI for the schema-driven indexing engine.
//!
//! Loads a JSON document, indexes it through `idx-index`, and prints the
//! terms and values the indexing driver produced.

#![warn(missing_docs)]

use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::Table;
use idx_config::Config;
use idx_index::{IdentityScript, IndexingDriver, SchemaEngine};
use idx_value::Value;
use thiserror::Error;

/// Top-level CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "idx", about = "Schema-driven document indexing engine")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index a JSON document and print the terms it produced.
    Index(IndexArgs),
    /// Print the resolved configuration.
    Config(ConfigArgs),
}

/// Arguments for `idx index`.
#[derive(Debug, clap::Args)]
pub struct IndexArgs {
    /// Path to the JSON document to index.
    pub document: PathBuf,
    /// Id to assign the document (idx never auto-generates ids).
    #[arg(long)]
    pub id: String,
    /// Path to a `.idx.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Path to a persisted schema snapshot; updated in place if given.
    #[arg(long)]
    pub schema: Option<PathBuf>,
    /// Path to a block-storage volume; if given, the document's stored
    /// data is persisted there instead of kept inline.
    #[arg(long)]
    pub volume: Option<PathBuf>,
}

/// Arguments for `idx config`.
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Path to a `.idx.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to read the input document.
    #[error("failed to read document {path}: {source}")]
    ReadDocument {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The input document was not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
    /// Configuration failed to load.
    #[error(transparent)]
    Config(#[from] idx_config::ConfigError),
    /// Indexing the document failed.
    #[error(transparent)]
    Indexing(#[from] idx_index::IndexingError),
    /// Reading or writing the schema snapshot failed.
    #[error("schema I/O error at {path}: {source}")]
    SchemaIo {
        /// Path to the schema snapshot file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Persisting the document's stored data to a volume failed.
    #[error(transparent)]
    Storage(#[from] idx_storage::StorageError),
}

fn load_schema(path: &Option<PathBuf>) -> Result<SchemaEngine, CliError> {
    match path {
        Some(path) if path.exists() => {
            let bytes = fs::read(path).map_err(|source| CliError::SchemaIo { path: path.clone(), source })?;
            SchemaEngine::from_json(&bytes).map_err(|e| CliError::Indexing(e.into()))
        }
        _ => Ok(SchemaEngine::new()),
    }
}

/// Runs the `index` subcommand, returning the rendered report table.
pub fn run_index(args: &IndexArgs) -> Result<String, CliError> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let schema = load_schema(&args.schema)?;

    let text = fs::read_to_string(&args.document)
        .map_err(|source| CliError::ReadDocument { path: args.document.clone(), source })?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| CliError::InvalidJson { path: args.document.clone(), source })?;
    let document = Value::from_json(json);

    let storage_settings = config.storage.clone();
    let mut driver = IndexingDriver::with_schema(schema, config);
    let indexed = driver.index(&args.id, &document, &IdentityScript)?;

    if let Some(path) = &args.schema {
        fs::write(path, driver.schema().to_json()).map_err(|source| CliError::SchemaIo { path: path.clone(), source })?;
    }

    let mut table = Table::new();
    table.set_header(vec!["kind", "value"]);
    table.add_row(vec!["id", &indexed.id_term]);
    for term in &indexed.terms {
        table.add_row(vec!["term", term]);
    }
    for text in &indexed.text_values {
        table.add_row(vec!["text", text]);
    }
    table.add_row(vec!["sortable_values", &indexed.sortable_values.len().to_string()]);

    if let Some(path) = &args.volume {
        let sync_mode = storage_settings.sync_mode;
        let mut volume = idx_storage::Volume::open(path, storage_settings)?;
        let offset = indexed.persist(&mut volume)?;
        volume.commit(sync_mode)?;
        table.add_row(vec!["volume_offset", &offset.to_string()]);
    }

    Ok(table.to_string())
}

/// Runs the `config` subcommand, returning the rendered report table.
pub fn run_config(args: &ConfigArgs) -> Result<String, CliError> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut table = Table::new();
    table.set_header(vec!["setting", "value"]);
    table.add_row(vec!["strict", &config.strict.to_string()]);
    table.add_row(vec!["geo_partials", &config.geo_partials.to_string()]);
    table.add_row(vec!["geo_error", &config.geo_error.to_string()]);
    table.add_row(vec!["storage.block_size", &config.storage.block_size.to_string()]);
    table.add_row(vec!["accuracy.numeric", &format!("{:?}", config.accuracy.numeric)]);
    table.add_row(vec!["accuracy.date", &format!("{:?}", config.accuracy.date)]);
    table.add_row(vec!["accuracy.geo", &format!("{:?}", config.accuracy.geo)]);

    Ok(table.to_string())
}
