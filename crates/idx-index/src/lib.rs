//! Scalar serialization, accuracy bucketing, schema resolution, and the
//! external text index for idx.
//!
//! This crate provides:
//! - Sortable byte serialization and free-text type guessing via [`serialise`]
//! - Accuracy-bucketed term widening via [`bucket`]
//! - The persisted schema engine via [`schema`]
//! - The indexing driver that ties the above together via [`indexer`]
//! - The Tantivy-backed external index sink via [`writer`]
//!
//! # Indexing a document
//!
//! ```ignore
//! use idx_index::{IdentityScript, IndexingDriver};
//! use idx_config::Config;
//! use idx_value::Value;
//!
//! let mut driver = IndexingDriver::new(Config::default());
//! let doc = Value::from_json(serde_json::json!({"title": "hello world"}));
//! let indexed = driver.index("doc-1", &doc, &IdentityScript)?;
//! # Ok::<(), idx_index::IndexingError>(())
//! ```

#![warn(missing_docs)]

mod analyzer;
mod bucket;
mod error;
mod indexer;
mod schema;
mod serialise;
mod writer;

pub use analyzer::{TEXT_TOKENIZER, build_analyzer, build_analyzer_from_name, parse_language};
pub use bucket::{date_buckets, geo_buckets, numeric_buckets, time_buckets, truncate_date, truncate_time};
pub use error::{IndexError, IndexingError, SchemaError, SerialiseError};
pub use indexer::{IdentityScript, IndexedDocument, IndexingDriver, ProgressReporter, Script, SilentReporter};
pub use schema::{ConcreteType, EffectiveSpec, FieldDirectives, SchemaEngine, concrete_for_cast_tag, concrete_for_guess, guess_concrete};
pub use serialise::{
    GuessFlags, GuessedKind, deserialise_boolean, deserialise_float, deserialise_integer, deserialise_positive,
    format_uuid, guess_kind, hex_encode, parse_date_seconds, parse_datetime_seconds, parse_time_seconds,
    parse_timedelta_seconds, parse_uuid, parse_uuid_list, serialise_boolean, serialise_float, serialise_integer,
    serialise_keyword, serialise_positive, serialise_text,
};
pub use writer::{IndexSchema, IndexWriter};
