//! Indexing driver (C7): walks a document tree, resolves an effective
//! specification per leaf through the schema engine, and feeds C1/C2/C3's
//! output to the external index.

use idx_geo::parse_ewkt;
use idx_value::{Value, cast::resolve_cast};

use crate::bucket::{date_buckets, geo_buckets, numeric_buckets, time_buckets};
use crate::error::IndexingError;
use crate::schema::{ConcreteType, EffectiveSpec, FieldDirectives, SchemaEngine, concrete_for_cast_tag, guess_concrete};
use crate::serialise::{hex_encode, serialise_boolean, serialise_float, serialise_integer, serialise_keyword, serialise_positive, serialise_text, parse_date_seconds, parse_datetime_seconds, parse_time_seconds, parse_timedelta_seconds, parse_uuid};
use idx_config::Config;

/// A document, fully resolved and ready to hand to [`crate::writer::IndexWriter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedDocument {
    /// The document's id term, always prefixed with `Q` (§4.7).
    pub id_term: String,
    /// Exact-match terms: keyword values, accuracy buckets, geo fingerprints.
    pub terms: Vec<String>,
    /// Analyzed text values, one per `text`-typed leaf.
    pub text_values: Vec<String>,
    /// Sortable byte encodings, one per indexed scalar leaf.
    pub sortable_values: Vec<Vec<u8>>,
    /// JSON-encoded stored leaf values (`path` -> value).
    pub stored_data: Vec<u8>,
}

impl IndexedDocument {
    /// Persists `stored_data` as an opaque payload in a block-storage
    /// volume and returns the offset of the written record (§4.7: "opaque
    /// payloads... optionally go to C5 which returns a volume offset
    /// embedded in the document's stored data"). Callers that keep
    /// `stored_data` inline (e.g. a small demo document) never need this.
    pub fn persist(&self, volume: &mut idx_storage::Volume) -> Result<u64, IndexingError> {
        Ok(volume.append(&self.stored_data)?)
    }
}

/// External collaborator invoked before indexing, with the document id and
/// object; may replace the field set. Stubbed to the identity function by
/// [`IdentityScript`] since no behavior in this engine depends on scripts
/// being non-trivial (§4.7, §9).
pub trait Script {
    /// Transforms the input object before it is walked.
    fn transform(&self, id: &str, object: &Value) -> Value;
}

/// The default, no-op [`Script`].
pub struct IdentityScript;

impl Script for IdentityScript {
    fn transform(&self, _id: &str, object: &Value) -> Value {
        object.clone()
    }
}

/// Reports progress through a multi-document indexing run, mirroring the
/// teacher's file-oriented reporter but at document granularity.
pub trait ProgressReporter {
    /// Called before a document is walked.
    fn on_document_start(&mut self, id: &str);
    /// Called after a document was successfully indexed.
    fn on_document_done(&mut self, id: &str, terms: usize);
    /// Called when a document failed to index.
    fn on_document_error(&mut self, id: &str, error: &str);
}

/// A no-op [`ProgressReporter`].
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_document_start(&mut self, _id: &str) {}
    fn on_document_done(&mut self, _id: &str, _terms: usize) {}
    fn on_document_error(&mut self, _id: &str, _error: &str) {}
}

/// Reserved term prefix for a document id (§4.7).
const ID_TERM_PREFIX: char = 'Q';

struct WalkState {
    terms: Vec<String>,
    text_values: Vec<String>,
    sortable_values: Vec<Vec<u8>>,
    stored: Vec<(String, Value)>,
}

/// Orchestrates schema resolution and term generation for a stream of
/// documents against one evolving schema snapshot.
pub struct IndexingDriver {
    schema: SchemaEngine,
    config: Config,
}

impl IndexingDriver {
    /// Creates a driver over an empty schema.
    pub fn new(config: Config) -> Self {
        Self { schema: SchemaEngine::new(), config }
    }

    /// Creates a driver restoring a previously persisted schema snapshot.
    pub fn with_schema(schema: SchemaEngine, config: Config) -> Self {
        Self { schema, config }
    }

    /// The current schema snapshot, for persistence between runs.
    pub fn schema(&self) -> &SchemaEngine {
        &self.schema
    }

    /// Indexes one document, discarding progress notifications. The id is
    /// supplied by the caller: this implementation does not auto-generate
    /// ids (§9 Open Question — auto-assignment needs a source of entropy
    /// this crate does not otherwise depend on).
    pub fn index(&mut self, id: &str, object: &Value, script: &dyn Script) -> Result<IndexedDocument, IndexingError> {
        self.index_with_reporter(id, object, script, &mut SilentReporter)
    }

    /// Indexes one document, notifying `reporter` at the documented points.
    pub fn index_with_reporter<R: ProgressReporter>(
        &mut self,
        id: &str,
        object: &Value,
        script: &dyn Script,
        reporter: &mut R,
    ) -> Result<IndexedDocument, IndexingError> {
        reporter.on_document_start(id);

        let transformed = script.transform(id, object);

        let mut state = WalkState { terms: Vec::new(), text_values: Vec::new(), sortable_values: Vec::new(), stored: Vec::new() };

        let mut path = Vec::new();
        if let Err(e) = self.walk(&mut path, &transformed, &mut state) {
            reporter.on_document_error(id, &e.to_string());
            return Err(e);
        }

        let id_term = format!("{ID_TERM_PREFIX}{id}");
        state.terms.push(id_term.clone());

        let stored_data = serde_json::to_vec(&state.stored.into_iter().map(|(p, v)| (p, v.to_string())).collect::<Vec<_>>())
            .expect("stored value serialization cannot fail");

        let indexed =
            IndexedDocument { id_term, terms: state.terms, text_values: state.text_values, sortable_values: state.sortable_values, stored_data };
        reporter.on_document_done(id, indexed.terms.len());
        Ok(indexed)
    }

    fn walk(&mut self, path: &mut Vec<String>, value: &Value, state: &mut WalkState) -> Result<(), IndexingError> {
        if let Value::Object(pairs) = value {
            if pairs.iter().any(|(k, v)| k == "_namespace" && matches!(v, Value::Bool(true))) {
                self.schema.mark_namespace(path);
                for (key, child) in pairs.iter().filter(|(k, _)| k != "_namespace") {
                    path.push(key.clone());
                    self.walk(path, child, state)?;
                    path.pop();
                }
                return Ok(());
            }
        }

        if let Some((tag, inner)) = resolve_cast(value)? {
            let concrete = concrete_for_cast_tag(tag);
            let directives = FieldDirectives { concrete: Some(concrete), ..Default::default() };
            return self.index_leaf(path, inner, directives, state);
        }

        match value {
            Value::Object(pairs) => {
                for (key, child) in pairs {
                    path.push(key.clone());
                    self.walk(path, child, state)?;
                    path.pop();
                }
                Ok(())
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(path, item, state)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            scalar => self.index_leaf(path, scalar, FieldDirectives::default(), state),
        }
    }

    fn index_leaf(
        &mut self,
        path: &[String],
        value: &Value,
        mut directives: FieldDirectives,
        state: &mut WalkState,
    ) -> Result<(), IndexingError> {
        if path.is_empty() {
            return Err(idx_value::ValueError::CannotNest { path: "$".to_string(), found: value.kind_name() }.into());
        }

        let guessed = directives.concrete.unwrap_or_else(|| match value {
            Value::Bool(_) => ConcreteType::Boolean,
            Value::Integer(n) if *n >= 0 => ConcreteType::Positive,
            Value::Integer(_) => ConcreteType::Integer,
            Value::Float(_) => ConcreteType::Float,
            Value::Text(s) => guess_concrete(s, &self.config),
            other => {
                directives.concrete = Some(ConcreteType::Text);
                let _ = other;
                ConcreteType::Text
            }
        });

        let effective = self.schema.resolve_leaf(path, guessed, directives, &self.config)?;

        self.emit(&effective, value, state)?;

        if effective.store {
            state.stored.push((path.join("."), value.clone()));
        }
        Ok(())
    }

    fn emit(&self, effective: &EffectiveSpec, value: &Value, state: &mut WalkState) -> Result<(), IndexingError> {
        match effective.concrete {
            ConcreteType::Boolean => {
                let b = idx_value::cast::coerce_boolean(value)?;
                let bytes = serialise_boolean(b);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);
            }
            ConcreteType::Keyword | ConcreteType::String => {
                let text = scalar_text(value)?;
                let bytes = serialise_keyword(&text, effective.bool_term);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);
            }
            ConcreteType::Text => {
                let text = scalar_text(value)?;
                state.text_values.push(text.clone());
                state.sortable_values.push(serialise_text(&text));
            }
            ConcreteType::Uuid => {
                let text = scalar_text(value)?;
                let bytes = parse_uuid(&text).map_err(crate::error::IndexingError::Serialise)?;
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes.to_vec());
            }
            ConcreteType::Integer | ConcreteType::Positive => {
                let n = scalar_integer(value)?;
                let bytes = if effective.concrete == ConcreteType::Positive {
                    serialise_positive(n as u64)
                } else {
                    serialise_integer(n)
                };
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);

                let widths: Vec<u64> = effective.accuracy.iter().filter_map(|a| a.parse().ok()).collect();
                for (label, floor) in effective.accuracy.iter().zip(numeric_buckets(n, &widths)) {
                    let term_bytes = serialise_integer(floor);
                    push_bucket_term(state, effective, label, &term_bytes);
                }
            }
            ConcreteType::Float => {
                let f = scalar_float(value)?;
                let bytes = serialise_float(f);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);
            }
            ConcreteType::Date | ConcreteType::Datetime => {
                let text = scalar_text(value)?;
                let seconds = if effective.concrete == ConcreteType::Date {
                    parse_date_seconds(&text)
                } else {
                    parse_datetime_seconds(&text)
                }
                .ok_or_else(|| crate::error::SerialiseError::Serialisation {
                    kind: "date",
                    detail: format!("cannot parse {text:?} as a date/datetime"),
                })?;
                let bytes = serialise_float(seconds);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);

                for (label, truncated) in effective.accuracy.iter().zip(date_buckets(seconds, &effective.accuracy)) {
                    let term_bytes = serialise_float(truncated);
                    push_bucket_term(state, effective, label, &term_bytes);
                }
            }
            ConcreteType::Time | ConcreteType::Timedelta => {
                let text = scalar_text(value)?;
                let seconds = if effective.concrete == ConcreteType::Time {
                    parse_time_seconds(&text)
                } else {
                    parse_timedelta_seconds(&text)
                }
                .ok_or_else(|| crate::error::SerialiseError::Serialisation {
                    kind: "time",
                    detail: format!("cannot parse {text:?} as a time/timedelta"),
                })?;
                let bytes = serialise_float(seconds);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);

                for (label, truncated) in effective.accuracy.iter().zip(time_buckets(seconds, &effective.accuracy)) {
                    let term_bytes = serialise_float(truncated);
                    push_bucket_term(state, effective, label, &term_bytes);
                }
            }
            ConcreteType::Geo => {
                let text = scalar_text(value)?;
                let shape = parse_ewkt(&text)?;
                let levels: Vec<u8> = effective.accuracy.iter().filter_map(|a| a.parse().ok()).collect();
                let buckets = geo_buckets(&shape.geometry, &levels, self.config.geo_partials, self.config.geo_error)?;
                for (label, index) in effective.accuracy.iter().zip(buckets) {
                    let fingerprint = idx_geo::fingerprint(&index.ranges);
                    let bytes = serialise_positive(fingerprint);
                    push_bucket_term(state, effective, label, &bytes);
                    state.sortable_values.push(bytes);
                }
            }
            ConcreteType::Foreign | ConcreteType::Script => {
                let text = scalar_text(value)?;
                let bytes = serialise_keyword(&text, effective.bool_term);
                push_exact_terms(state, effective, &bytes);
                state.sortable_values.push(bytes);
            }
            ConcreteType::Empty | ConcreteType::Object | ConcreteType::Array => {
                // Structural types carry no value of their own to emit.
            }
        }
        Ok(())
    }
}

/// The prefixes a term is fanned out across: the resolved structural or
/// literal-UUID prefix, its literal-UUID counterpart under
/// [`idx_config::UuidStrategy::Both`], and any namespace ancestors (§4.6).
fn term_prefixes(effective: &EffectiveSpec) -> Vec<&str> {
    let mut prefixes = vec![effective.prefix.as_str()];
    if let Some(uuid_prefix) = &effective.uuid_prefix {
        prefixes.push(uuid_prefix.as_str());
    }
    prefixes.extend(effective.partial_prefixes.iter().map(String::as_str));
    prefixes
}

fn push_exact_terms(state: &mut WalkState, effective: &EffectiveSpec, bytes: &[u8]) {
    for prefix in term_prefixes(effective) {
        state.terms.push(format!("{prefix}:{}", hex_encode(bytes)));
    }
}

fn push_bucket_term(state: &mut WalkState, effective: &EffectiveSpec, label: &str, bytes: &[u8]) {
    for prefix in term_prefixes(effective) {
        state.terms.push(format!("{prefix}#{label}:{}", hex_encode(bytes)));
    }
}

fn scalar_text(value: &Value) -> Result<String, IndexingError> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        Value::Integer(n) => Ok(n.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(idx_value::ValueError::CannotNest { path: String::new(), found: other.kind_name() }.into()),
    }
}

fn scalar_integer(value: &Value) -> Result<i64, IndexingError> {
    match value {
        Value::Integer(n) => Ok(*n),
        Value::Text(s) => s.parse::<i64>().map_err(|_| {
            crate::error::SerialiseError::Serialisation { kind: "integer", detail: format!("cannot parse {s:?}") }.into()
        }),
        other => Err(idx_value::ValueError::CannotNest { path: String::new(), found: other.kind_name() }.into()),
    }
}

fn scalar_float(value: &Value) -> Result<f64, IndexingError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(n) => Ok(*n as f64),
        Value::Text(s) => s.parse::<f64>().map_err(|_| {
            crate::error::SerialiseError::Serialisation { kind: "float", detail: format!("cannot parse {s:?}") }.into()
        }),
        other => Err(idx_value::ValueError::CannotNest { path: String::new(), found: other.kind_name() }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn indexes_a_simple_flat_document() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("title", Value::Text("Hello World".into())), ("age", Value::Integer(30))]);

        let indexed = driver.index("doc-1", &doc, &IdentityScript).unwrap();

        assert_eq!(indexed.id_term, "Qdoc-1");
        assert!(indexed.terms.contains(&"Qdoc-1".to_string()));
        assert!(indexed.text_values.contains(&"Hello World".to_string()));
        assert!(indexed.terms.iter().any(|t| t.starts_with(".age:")));
    }

    #[test]
    fn numeric_field_emits_accuracy_bucket_terms() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("count", Value::Integer(123_456))]);
        let indexed = driver.index("doc-2", &doc, &IdentityScript).unwrap();
        let bucket_terms: Vec<_> = indexed.terms.iter().filter(|t| t.contains('#')).collect();
        assert_eq!(bucket_terms.len(), 6);
    }

    #[test]
    fn cast_envelope_forces_the_concrete_type() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("code", obj(vec![("_keyword", Value::Text("US-01".into()))]))]);
        let indexed = driver.index("doc-3", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.starts_with(".code:")));
        assert!(indexed.text_values.is_empty());
    }

    #[test]
    fn geo_field_emits_one_term_per_accuracy_level() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("location", obj(vec![("_ewkt", Value::Text("POINT(13.4 52.5)".into()))]))]);
        let indexed = driver.index("doc-4", &doc, &IdentityScript).unwrap();
        let geo_terms: Vec<_> = indexed.terms.iter().filter(|t| t.starts_with(".location#")).collect();
        assert_eq!(geo_terms.len(), driver.config.accuracy.geo.len());
    }

    #[test]
    fn repeated_type_conflict_on_same_path_fails() {
        let mut driver = IndexingDriver::new(Config::default());
        driver.index("doc-5", &obj(vec![("age", Value::Integer(1))]), &IdentityScript).unwrap();
        let err = driver.index("doc-6", &obj(vec![("age", Value::Text("old".into()))]), &IdentityScript).unwrap_err();
        assert!(matches!(err, IndexingError::Schema(_)));
    }

    #[test]
    fn nested_objects_build_dotted_paths() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("author", obj(vec![("name", Value::Text("Ada".into()))]))]);
        let indexed = driver.index("doc-7", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.starts_with(".author.name:")));
    }

    #[test]
    fn stored_data_persists_to_a_volume_and_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut volume = idx_storage::Volume::open(&dir.path().join("docs.0"), idx_config::StorageSettings::default()).unwrap();

        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("title", Value::Text("Hello".into()))]);
        let indexed = driver.index("doc-8", &doc, &IdentityScript).unwrap();

        let offset = indexed.persist(&mut volume).unwrap();
        let read_back = volume.read(offset).unwrap();
        assert_eq!(read_back, indexed.stored_data);
    }

    #[test]
    fn namespace_marker_fans_leaf_terms_out_to_the_ancestor_prefix() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![(
            "tags",
            obj(vec![("_namespace", Value::Bool(true)), ("color", Value::Text("red".into()))]),
        )]);
        let indexed = driver.index("doc-9", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.starts_with(".tags.color:")));
        assert!(indexed.terms.iter().any(|t| t.starts_with(".tags:")));
    }

    #[test]
    fn uuid_strategy_uuid_field_indexes_only_the_structural_prefix() {
        let mut config = Config::default();
        config.uuid_strategy = idx_config::UuidStrategy::UuidField;
        let mut driver = IndexingDriver::new(config);
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        let doc = obj(vec![("entities", obj(vec![(uuid, Value::Text("Ada".into()))]))]);
        let indexed = driver.index("doc-10", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.contains("._uuid:")));
        assert!(!indexed.terms.iter().any(|t| t.contains(uuid)));
    }

    #[test]
    fn uuid_strategy_both_indexes_structural_and_literal_prefixes() {
        let mut config = Config::default();
        config.uuid_strategy = idx_config::UuidStrategy::Both;
        let mut driver = IndexingDriver::new(config);
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        let doc = obj(vec![("entities", obj(vec![(uuid, Value::Text("Ada".into()))]))]);
        let indexed = driver.index("doc-11", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.contains("._uuid:")));
        assert!(indexed.terms.iter().any(|t| t.contains(&format!(".entities.{uuid}:"))));
    }

    #[test]
    fn foreign_field_is_rejected_once_it_already_has_children() {
        let mut driver = IndexingDriver::new(Config::default());
        driver.index("doc-12", &obj(vec![("owner", obj(vec![("_foreign", Value::Text("doc://users/1".into()))]))]), &IdentityScript).unwrap();
        let err = driver
            .index("doc-13", &obj(vec![("owner", obj(vec![("name", Value::Text("Ada".into()))]))]), &IdentityScript)
            .unwrap_err();
        assert!(matches!(err, IndexingError::Schema(_)));
    }

    #[test]
    fn script_field_emits_its_identifier_as_a_keyword_term() {
        let mut driver = IndexingDriver::new(Config::default());
        let doc = obj(vec![("summary", obj(vec![("_script", Value::Text("summarize_v1".into()))]))]);
        let indexed = driver.index("doc-14", &doc, &IdentityScript).unwrap();
        assert!(indexed.terms.iter().any(|t| t.starts_with(".summary:")));
    }

    #[test]
    fn progress_reporter_is_notified_on_success_and_failure() {
        #[derive(Default)]
        struct RecordingReporter {
            started: Vec<String>,
            done: Vec<String>,
            errored: Vec<String>,
        }
        impl ProgressReporter for RecordingReporter {
            fn on_document_start(&mut self, id: &str) {
                self.started.push(id.to_string());
            }
            fn on_document_done(&mut self, id: &str, _terms: usize) {
                self.done.push(id.to_string());
            }
            fn on_document_error(&mut self, id: &str, _error: &str) {
                self.errored.push(id.to_string());
            }
        }

        let mut driver = IndexingDriver::new(Config::default());
        let mut reporter = RecordingReporter::default();
        driver
            .index_with_reporter("doc-15", &obj(vec![("age", Value::Integer(1))]), &IdentityScript, &mut reporter)
            .unwrap();
        assert_eq!(reporter.started, vec!["doc-15"]);
        assert_eq!(reporter.done, vec!["doc-15"]);
        assert!(reporter.errored.is_empty());

        driver
            .index_with_reporter("doc-16", &obj(vec![("age", Value::Text("old".into()))]), &IdentityScript, &mut reporter)
            .unwrap_err();
        assert_eq!(reporter.errored, vec!["doc-16"]);
    }
}
