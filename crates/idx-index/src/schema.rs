//! Schema engine (C6): computes a fully-resolved effective specification for
//! every document path, backed by a persisted, dynamically-growing property
//! tree.
//!
//! The schema is a shared immutable snapshot (`Arc<PersistedField>`).
//! A single indexing call clones it on first write (`mut_schema`) and the
//! mutated copy becomes the next snapshot only if the caller commits it;
//! on error the mutation is simply dropped.

use std::collections::BTreeMap;
use std::hash::Hasher;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::error::SchemaError;
use crate::serialise::{guess_kind, parse_uuid, GuessFlags, GuessedKind};
use idx_config::{AccuracyDefaults, Config, UuidStrategy, LIMIT_PARTIAL_PATHS_DEPTH};

/// The closed set of concrete field types (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcreteType {
    /// No value has ever reached this path.
    Empty,
    /// A nested map.
    Object,
    /// A nested list.
    Array,
    /// A reference to an external document; carries no value of its own.
    Foreign,
    /// A field whose value is produced by a script rather than stored input.
    Script,
    /// A signed integer.
    Integer,
    /// A non-negative integer.
    Positive,
    /// A floating point number.
    Float,
    /// A boolean.
    Boolean,
    /// A lowercased, exact-match token.
    Keyword,
    /// Free text, analyzed by the external index.
    Text,
    /// A raw, un-analyzed string (stored only).
    String,
    /// A calendar date.
    Date,
    /// A calendar date and time.
    Datetime,
    /// A time of day.
    Time,
    /// A signed duration.
    Timedelta,
    /// A UUID.
    Uuid,
    /// A geospatial shape.
    Geo,
}

impl ConcreteType {
    fn is_geo_or_numeric_like(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Positive | Self::Float | Self::Date | Self::Datetime | Self::Time | Self::Timedelta | Self::Geo
        )
    }
}

/// Reserved slots, mirroring the teacher's reserved Tantivy field handles
/// but generalized to the dynamic slot space (§3).
pub const SLOT_ROOT: u32 = 0;
/// Reserved slot for the document id.
pub const SLOT_ID: u32 = 1;
/// Reserved slot for the schema version marker.
pub const SLOT_VERSION: u32 = 2;

/// One node of the persisted property tree. Corresponds to the on-disk
/// JSON schema document described in §6.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedField {
    concrete: Option<ConcreteType>,
    slot: Option<u32>,
    bool_term: Option<bool>,
    /// Accuracy bucket labels, stored as strings so that numeric widths,
    /// calendar units, and HTM levels share one persisted representation.
    accuracy: Option<Vec<String>>,
    dynamic: Option<bool>,
    strict: Option<bool>,
    store: Option<bool>,
    is_namespace: Option<bool>,
    endpoint: Option<String>,
    #[serde(default)]
    children: BTreeMap<String, PersistedField>,
}

/// The fully-resolved specification for one document path, ready for C1/C3
/// to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSpec {
    /// Dotted path from the document root.
    pub path: String,
    /// The resolved concrete type.
    pub concrete: ConcreteType,
    /// Term-space byte prefix for this field.
    pub prefix: String,
    /// The resolved value slot.
    pub slot: u32,
    /// Whether this value should be stored verbatim alongside its terms.
    pub store: bool,
    /// Whether keyword terms preserve original case.
    pub bool_term: bool,
    /// Accuracy bucket labels to use for C3, if any apply to this type.
    pub accuracy: Vec<String>,
    /// True when a dynamic UUID path segment was folded into this path.
    pub uuid_field: bool,
    /// The literal-UUID form of the prefix, present alongside `prefix`
    /// when a dynamic UUID segment was encountered and
    /// [`UuidStrategy::Both`] is configured.
    pub uuid_prefix: Option<String>,
    /// Ancestor namespace prefixes this leaf is additionally indexed
    /// under, nearest-to-root first, capped at
    /// [`idx_config::LIMIT_PARTIAL_PATHS_DEPTH`] entries.
    pub partial_prefixes: Vec<String>,
}

/// Per-field directives a caller may request explicitly (e.g. through a
/// `{"_tag": value}` cast envelope), overlaid onto persisted defaults.
#[derive(Debug, Clone, Default)]
pub struct FieldDirectives {
    /// An explicit concrete type, bypassing free-text guessing.
    pub concrete: Option<ConcreteType>,
    /// Request original-case keyword terms.
    pub bool_term: Option<bool>,
    /// Request this value not be stored.
    pub store: Option<bool>,
}

fn accuracy_labels_for(concrete: ConcreteType, defaults: &AccuracyDefaults) -> Vec<String> {
    match concrete {
        ConcreteType::Integer | ConcreteType::Positive | ConcreteType::Float => {
            defaults.numeric.iter().map(u64::to_string).collect()
        }
        ConcreteType::Date | ConcreteType::Datetime => defaults.date.clone(),
        ConcreteType::Time | ConcreteType::Timedelta => defaults.time.clone(),
        ConcreteType::Geo => defaults.geo.iter().map(u8::to_string).collect(),
        _ => Vec::new(),
    }
}

fn accuracy_sets_equal(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

fn stable_slot(prefix: &str, concrete: ConcreteType) -> u32 {
    let mut hasher = SipHasher13::new();
    hasher.write(prefix.as_bytes());
    hasher.write_u8(concrete as u8);
    // Reserve the low slots for the fixed fields above.
    (hasher.finish() as u32).wrapping_add(16)
}

/// Resolves effective specifications against a persisted property tree,
/// materializing new fields as they are discovered.
#[derive(Debug, Clone)]
pub struct SchemaEngine {
    root: Arc<PersistedField>,
}

impl Default for SchemaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaEngine {
    /// Creates an engine over an empty (all-dynamic) schema.
    pub fn new() -> Self {
        Self { root: Arc::new(PersistedField::default()) }
    }

    /// Restores an engine from a previously persisted JSON document (§6).
    pub fn from_json(bytes: &[u8]) -> Result<Self, SchemaError> {
        let root: PersistedField = serde_json::from_slice(bytes)
            .map_err(|e| SchemaError::Corruption { path: "$".to_string(), detail: e.to_string() })?;
        Ok(Self { root: Arc::new(root) })
    }

    /// Serializes the current snapshot to JSON for persistence.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(&*self.root).expect("PersistedField serialization cannot fail")
    }

    /// Begins a mutation: clones the shared snapshot copy-on-write.
    fn make_mut(&mut self) -> &mut PersistedField {
        Arc::make_mut(&mut self.root)
    }

    /// Commits a mutation by keeping the current `root` as the new
    /// snapshot (a no-op given `Arc::make_mut` already mutated in place;
    /// named to mirror the lifecycle described in §3).
    pub fn commit(&self) {}

    /// Marks the field at `path` as a namespace (§3, §4.6): once set, every
    /// leaf beneath it is additionally indexed at this field's own prefix
    /// (and every other namespace ancestor's prefix), up to
    /// `LIMIT_PARTIAL_PATHS_DEPTH` entries per leaf. Declared per-document
    /// via a `{"_namespace": true}` marker key on an object; idempotent,
    /// and — per the invariant that a namespace field stays one — never
    /// unset once true.
    pub fn mark_namespace(&mut self, path: &[String]) {
        if path.is_empty() {
            return;
        }
        let mut node = self.make_mut();
        for segment in path {
            let key = if parse_uuid(segment).is_ok() { "_uuid".to_string() } else { segment.clone() };
            node = node.children.entry(key).or_default();
        }
        node.is_namespace = Some(true);
    }

    /// Resolves the effective specification for a leaf value at `path`,
    /// materializing any missing ancestors or the leaf itself.
    pub fn resolve_leaf(
        &mut self,
        path: &[String],
        guessed: ConcreteType,
        directives: FieldDirectives,
        config: &Config,
    ) -> Result<EffectiveSpec, SchemaError> {
        assert!(!path.is_empty(), "resolve_leaf requires a non-empty path");

        let mut node = self.make_mut();
        let mut store = true;
        let mut prefix = String::new();
        let mut literal_prefix = String::new();
        let mut uuid_field = false;
        let mut partial_prefixes: Vec<String> = Vec::new();

        for (i, segment) in path.iter().enumerate() {
            let is_leaf = i + 1 == path.len();
            let key = if parse_uuid(segment).is_ok() {
                uuid_field = true;
                "_uuid".to_string()
            } else {
                segment.clone()
            };
            prefix.push('.');
            prefix.push_str(&key);
            literal_prefix.push('.');
            literal_prefix.push_str(segment);

            let child = node.children.entry(key).or_default();
            if let Some(declared_store) = child.store {
                store = store && declared_store;
            } else if let Some(want_store) = directives.store {
                child.store = Some(want_store);
                store = store && want_store;
            }

            if child.is_namespace == Some(true) {
                partial_prefixes.push(prefix.clone());
                if partial_prefixes.len() > LIMIT_PARTIAL_PATHS_DEPTH as usize {
                    partial_prefixes.remove(0);
                }
            }

            if !is_leaf && matches!(child.concrete, Some(ConcreteType::Foreign) | Some(ConcreteType::Script)) {
                return Err(SchemaError::InvalidNesting {
                    path: prefix.trim_start_matches('.').to_string(),
                    reason: "foreign/script fields carry no children".to_string(),
                });
            }

            if is_leaf {
                let mut path_str = path.join(".");
                if path_str.is_empty() {
                    path_str = prefix.trim_start_matches('.').to_string();
                }
                return Self::resolve_child(
                    child,
                    &path_str,
                    &prefix,
                    &literal_prefix,
                    guessed,
                    directives,
                    config,
                    uuid_field,
                    store,
                    partial_prefixes,
                );
            }
            node = child;
        }
        unreachable!("loop always returns on the leaf iteration");
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_child(
        child: &mut PersistedField,
        path_str: &str,
        prefix: &str,
        literal_prefix: &str,
        guessed: ConcreteType,
        directives: FieldDirectives,
        config: &Config,
        uuid_field: bool,
        store: bool,
        partial_prefixes: Vec<String>,
    ) -> Result<EffectiveSpec, SchemaError> {
        let requested = directives.concrete.unwrap_or(guessed);

        let concrete = match child.concrete {
            Some(existing) if existing != requested => {
                return Err(SchemaError::Consistency {
                    path: path_str.to_string(),
                    property: "type",
                    old: format!("{existing:?}"),
                    new: format!("{requested:?}"),
                });
            }
            Some(existing) => existing,
            None => {
                if config.strict && directives.concrete.is_none() {
                    return Err(SchemaError::MissingType { path: path_str.to_string() });
                }
                child.concrete = Some(requested);
                requested
            }
        };

        if matches!(concrete, ConcreteType::Foreign | ConcreteType::Script) && !child.children.is_empty() {
            return Err(SchemaError::InvalidNesting {
                path: path_str.to_string(),
                reason: "foreign/script fields carry no children".to_string(),
            });
        }

        if let Some(requested_bool_term) = directives.bool_term {
            match child.bool_term {
                Some(existing) if existing != requested_bool_term => {
                    return Err(SchemaError::Consistency {
                        path: path_str.to_string(),
                        property: "bool_term",
                        old: existing.to_string(),
                        new: requested_bool_term.to_string(),
                    });
                }
                Some(_) => {}
                None => child.bool_term = Some(requested_bool_term),
            }
        }
        let bool_term = child.bool_term.unwrap_or(false);

        let slot = *child.slot.get_or_insert_with(|| stable_slot(prefix, concrete));

        let accuracy = if concrete.is_geo_or_numeric_like() {
            let defaults = accuracy_labels_for(concrete, &config.accuracy);
            match &child.accuracy {
                Some(existing) if !accuracy_sets_equal(existing, &defaults) => {
                    return Err(SchemaError::Consistency {
                        path: path_str.to_string(),
                        property: "accuracy",
                        old: existing.join(","),
                        new: defaults.join(","),
                    });
                }
                Some(existing) => existing.clone(),
                None => {
                    child.accuracy = Some(defaults.clone());
                    defaults
                }
            }
        } else {
            Vec::new()
        };

        let (prefix_out, uuid_prefix) = if uuid_field {
            match config.uuid_strategy {
                UuidStrategy::Uuid => (literal_prefix.to_string(), None),
                UuidStrategy::UuidField => (prefix.to_string(), None),
                UuidStrategy::Both => (prefix.to_string(), Some(literal_prefix.to_string())),
            }
        } else {
            (prefix.to_string(), None)
        };

        Ok(EffectiveSpec {
            path: path_str.to_string(),
            concrete,
            prefix: prefix_out,
            slot,
            store,
            bool_term,
            accuracy,
            uuid_field,
            uuid_prefix,
            partial_prefixes,
        })
    }
}

/// Maps a resolved cast tag (C4) onto a concrete field type. Every
/// geo-shaped tag (`_point`, `_polygon`, ...) maps to [`ConcreteType::Geo`];
/// the caller is expected to supply the wrapped value as an EWKT string
/// regardless of which specific shape tag was used (a scoped
/// simplification from per-tag bare-argument construction, see DESIGN.md).
pub fn concrete_for_cast_tag(tag: idx_value::CastTag) -> ConcreteType {
    use idx_value::CastTag;
    if tag.is_geo() {
        return ConcreteType::Geo;
    }
    match tag {
        CastTag::Integer => ConcreteType::Integer,
        CastTag::Positive => ConcreteType::Positive,
        CastTag::Float => ConcreteType::Float,
        CastTag::Boolean => ConcreteType::Boolean,
        CastTag::Keyword => ConcreteType::Keyword,
        CastTag::Text => ConcreteType::Text,
        CastTag::String => ConcreteType::String,
        CastTag::Uuid => ConcreteType::Uuid,
        CastTag::Date => ConcreteType::Date,
        CastTag::Datetime => ConcreteType::Datetime,
        CastTag::Time => ConcreteType::Time,
        CastTag::Timedelta => ConcreteType::Timedelta,
        // `_chai` has no documented scalar encoding; fall back to text.
        CastTag::Chai => ConcreteType::Text,
        CastTag::Foreign => ConcreteType::Foreign,
        CastTag::Script => ConcreteType::Script,
        _ => unreachable!("geo tags are handled above"),
    }
}

/// Maps a free-text value's guessed kind onto a concrete field type.
pub fn concrete_for_guess(kind: GuessedKind) -> ConcreteType {
    match kind {
        GuessedKind::Uuid => ConcreteType::Uuid,
        GuessedKind::Datetime => ConcreteType::Datetime,
        GuessedKind::Date => ConcreteType::Date,
        GuessedKind::Time => ConcreteType::Time,
        GuessedKind::Timedelta => ConcreteType::Timedelta,
        GuessedKind::Geo => ConcreteType::Geo,
        GuessedKind::Integer => ConcreteType::Integer,
        GuessedKind::Positive => ConcreteType::Positive,
        GuessedKind::Float => ConcreteType::Float,
        GuessedKind::Text => ConcreteType::Text,
        GuessedKind::Keyword => ConcreteType::Keyword,
    }
}

/// Guesses the concrete type of a free-text scalar using the engine's
/// configured detection flags.
pub fn guess_concrete(value: &str, config: &Config) -> ConcreteType {
    let flags = GuessFlags {
        date: config.detection.date_detection,
        datetime: config.detection.datetime_detection,
        time: config.detection.time_detection,
        timedelta: config.detection.timedelta_detection,
        numeric: config.detection.numeric_detection,
        geo: config.detection.geo_detection,
        text: config.detection.text_detection,
        uuid: config.detection.uuid_detection,
    };
    concrete_for_guess(guess_kind(value, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn discovers_a_new_field_and_persists_its_type() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let spec = engine
            .resolve_leaf(&path(&["title"]), ConcreteType::Text, FieldDirectives::default(), &config)
            .unwrap();
        assert_eq!(spec.concrete, ConcreteType::Text);
        assert_eq!(spec.path, "title");
    }

    #[test]
    fn rejects_a_type_change_on_the_same_path() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        engine.resolve_leaf(&path(&["age"]), ConcreteType::Positive, FieldDirectives::default(), &config).unwrap();
        let err = engine
            .resolve_leaf(&path(&["age"]), ConcreteType::Text, FieldDirectives::default(), &config)
            .unwrap_err();
        assert!(matches!(err, SchemaError::Consistency { property: "type", .. }));
    }

    #[test]
    fn slot_is_stable_across_calls() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let first = engine.resolve_leaf(&path(&["age"]), ConcreteType::Positive, FieldDirectives::default(), &config).unwrap();
        let second = engine.resolve_leaf(&path(&["age"]), ConcreteType::Positive, FieldDirectives::default(), &config).unwrap();
        assert_eq!(first.slot, second.slot);
    }

    #[test]
    fn bool_term_is_immutable_after_first_write() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let directives = FieldDirectives { bool_term: Some(true), ..Default::default() };
        engine.resolve_leaf(&path(&["tag"]), ConcreteType::Keyword, directives, &config).unwrap();
        let conflicting = FieldDirectives { bool_term: Some(false), ..Default::default() };
        let err = engine.resolve_leaf(&path(&["tag"]), ConcreteType::Keyword, conflicting, &config).unwrap_err();
        assert!(matches!(err, SchemaError::Consistency { property: "bool_term", .. }));
    }

    #[test]
    fn accuracy_defaults_to_config_and_is_immutable() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let spec = engine.resolve_leaf(&path(&["age"]), ConcreteType::Positive, FieldDirectives::default(), &config).unwrap();
        assert_eq!(spec.accuracy.len(), config.accuracy.numeric.len());
    }

    #[test]
    fn store_propagates_false_downward() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let directives = FieldDirectives { store: Some(false), ..Default::default() };
        engine.resolve_leaf(&path(&["secret"]), ConcreteType::Keyword, directives, &config).unwrap();
        let child = engine
            .resolve_leaf(&path(&["secret", "nested"]), ConcreteType::Keyword, FieldDirectives::default(), &config)
            .unwrap();
        assert!(!child.store);
    }

    #[test]
    fn dynamic_uuid_segment_is_folded_under_a_shared_key() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        let uuid = "550e8400-e29b-41d4-a716-446655440000";
        let spec = engine
            .resolve_leaf(&path(&["entities", uuid, "name"]), ConcreteType::Text, FieldDirectives::default(), &config)
            .unwrap();
        assert!(spec.uuid_field);
        assert!(spec.prefix.contains("_uuid"));
    }

    #[test]
    fn strict_mode_rejects_untyped_new_fields() {
        let mut engine = SchemaEngine::new();
        let mut config = Config::default();
        config.strict = true;
        let err = engine
            .resolve_leaf(&path(&["mystery"]), ConcreteType::Text, FieldDirectives::default(), &config)
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingType { .. }));
    }

    #[test]
    fn schema_round_trips_through_json() {
        let mut engine = SchemaEngine::new();
        let config = Config::default();
        engine.resolve_leaf(&path(&["age"]), ConcreteType::Positive, FieldDirectives::default(), &config).unwrap();
        let bytes = engine.to_json();
        let restored = SchemaEngine::from_json(&bytes).unwrap();
        assert_eq!(engine.root.children.len(), restored.root.children.len());
    }
}
