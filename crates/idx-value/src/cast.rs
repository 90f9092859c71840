//! Resolves `{"_tag": value}` cast envelopes (C4 of the indexing engine).
//!
//! An object with a single key starting with `_` that matches one of the
//! recognized tags below is not an ordinary field map: it is an explicit
//! type annotation on the wrapped value.

use crate::{Value, error::CastError};

/// A recognized cast tag: either a concrete scalar type or a geo shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTag {
    /// `_integer`
    Integer,
    /// `_positive`
    Positive,
    /// `_float`
    Float,
    /// `_boolean`
    Boolean,
    /// `_keyword`
    Keyword,
    /// `_text`
    Text,
    /// `_string`
    String,
    /// `_uuid`
    Uuid,
    /// `_date`
    Date,
    /// `_datetime`
    Datetime,
    /// `_time`
    Time,
    /// `_timedelta`
    Timedelta,
    /// `_ewkt`
    Ewkt,
    /// `_point`
    Point,
    /// `_circle`
    Circle,
    /// `_convex`
    Convex,
    /// `_polygon`
    Polygon,
    /// `_chull`
    Chull,
    /// `_multipoint`
    Multipoint,
    /// `_multicircle`
    Multicircle,
    /// `_multiconvex`
    Multiconvex,
    /// `_multipolygon`
    Multipolygon,
    /// `_multichull`
    Multichull,
    /// `_geometrycollection`
    Geometrycollection,
    /// `_geometryintersection`
    Geometryintersection,
    /// `_chai`
    Chai,
    /// `_foreign`: the wrapped value is an endpoint URI naming an external
    /// document this field redirects to.
    Foreign,
    /// `_script`: the wrapped value is an identifier naming a script
    /// collaborator rather than stored input.
    Script,
}

impl CastTag {
    /// Parses a reserved key (including its leading underscore) into a tag.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "_integer" => Self::Integer,
            "_positive" => Self::Positive,
            "_float" => Self::Float,
            "_boolean" => Self::Boolean,
            // `_term` is accepted as a legacy synonym for `_keyword` (see
            // DESIGN.md Open Question 1): both canonicalize to Keyword.
            "_keyword" | "_term" => Self::Keyword,
            "_text" => Self::Text,
            "_string" => Self::String,
            "_uuid" => Self::Uuid,
            "_date" => Self::Date,
            "_datetime" => Self::Datetime,
            "_time" => Self::Time,
            "_timedelta" => Self::Timedelta,
            "_ewkt" => Self::Ewkt,
            "_point" => Self::Point,
            "_circle" => Self::Circle,
            "_convex" => Self::Convex,
            "_polygon" => Self::Polygon,
            "_chull" => Self::Chull,
            "_multipoint" => Self::Multipoint,
            "_multicircle" => Self::Multicircle,
            "_multiconvex" => Self::Multiconvex,
            "_multipolygon" => Self::Multipolygon,
            "_multichull" => Self::Multichull,
            "_geometrycollection" => Self::Geometrycollection,
            "_geometryintersection" => Self::Geometryintersection,
            "_chai" => Self::Chai,
            "_foreign" => Self::Foreign,
            "_script" => Self::Script,
            _ => return None,
        })
    }

    /// The canonical, static name of this tag (without the underscore),
    /// used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Positive => "positive",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::String => "string",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Timedelta => "timedelta",
            Self::Ewkt => "ewkt",
            Self::Point => "point",
            Self::Circle => "circle",
            Self::Convex => "convex",
            Self::Polygon => "polygon",
            Self::Chull => "chull",
            Self::Multipoint => "multipoint",
            Self::Multicircle => "multicircle",
            Self::Multiconvex => "multiconvex",
            Self::Multipolygon => "multipolygon",
            Self::Multichull => "multichull",
            Self::Geometrycollection => "geometrycollection",
            Self::Geometryintersection => "geometryintersection",
            Self::Chai => "chai",
            Self::Foreign => "foreign",
            Self::Script => "script",
        }
    }

    /// True if this tag names a geospatial shape rather than a scalar.
    pub fn is_geo(self) -> bool {
        matches!(
            self,
            Self::Ewkt
                | Self::Point
                | Self::Circle
                | Self::Convex
                | Self::Polygon
                | Self::Chull
                | Self::Multipoint
                | Self::Multicircle
                | Self::Multiconvex
                | Self::Multipolygon
                | Self::Multichull
                | Self::Geometrycollection
                | Self::Geometryintersection
        )
    }
}

/// If `value` is a single-key object whose key is a recognized cast tag,
/// returns the tag and the wrapped value. Returns `Ok(None)` for ordinary
/// multi-field objects. Raises a [`CastError`] for a single `_`-prefixed
/// key that isn't recognized, or for more than one `_`-prefixed key.
pub fn resolve_cast(value: &Value) -> Result<Option<(CastTag, &Value)>, CastError> {
    let Some(pairs) = value.as_object() else {
        return Ok(None);
    };

    let underscored: Vec<&(String, Value)> =
        pairs.iter().filter(|(k, _)| k.starts_with('_')).collect();

    match underscored.len() {
        0 => Ok(None),
        1 => {
            let (key, inner) = underscored[0];
            match CastTag::from_key(key) {
                Some(tag) => Ok(Some((tag, inner))),
                None => Err(CastError::UnknownTag(key.clone())),
            }
        }
        n => {
            if n == pairs.len() {
                Err(CastError::MultipleTags(n))
            } else {
                // A mix of reserved and ordinary keys is not a cast
                // envelope; treat the whole object as ordinary fields.
                Ok(None)
            }
        }
    }
}

/// Coerces a boolean-ish scalar: `true`/`false` booleans pass through;
/// strings `"true"`, `"false"`, `"1"`, `"0"` (case-insensitive) coerce.
pub fn coerce_boolean(value: &Value) -> Result<bool, CastError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Integer(1) => Ok(true),
        Value::Integer(0) => Ok(false),
        Value::Text(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(CastError::Coercion {
                tag: "boolean",
                reason: format!("cannot interpret {other:?} as a boolean"),
            }),
        },
        other => Err(CastError::Coercion {
            tag: "boolean",
            reason: format!("cannot cast {} to boolean", other.kind_name()),
        }),
    }
}

/// Units accepted for geo distance/altitude fields, converted to meters
/// per §4.4.
pub fn distance_unit_to_meters(unit: &str) -> Option<f64> {
    Some(match unit {
        "m" => 1.0,
        "km" => 1_000.0,
        "mi" => 1_609.344,
        "nmi" => 1_852.0,
        "yd" => 0.9144,
        "ft" => 0.3048,
        "in" => 0.0254,
        "mm" => 0.001,
        "cm" => 0.01,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn resolves_recognized_tag() {
        let v = obj(vec![("_integer", Value::Integer(5))]);
        let (tag, inner) = resolve_cast(&v).unwrap().unwrap();
        assert_eq!(tag, CastTag::Integer);
        assert_eq!(inner, &Value::Integer(5));
    }

    #[test]
    fn term_is_a_keyword_synonym() {
        let v = obj(vec![("_term", Value::Text("x".into()))]);
        let (tag, _) = resolve_cast(&v).unwrap().unwrap();
        assert_eq!(tag, CastTag::Keyword);
    }

    #[test]
    fn ordinary_object_is_not_a_cast() {
        let v = obj(vec![("name", Value::Text("x".into())), ("age", Value::Integer(1))]);
        assert_eq!(resolve_cast(&v).unwrap(), None);
    }

    #[test]
    fn unknown_underscored_key_errors() {
        let v = obj(vec![("_bogus", Value::Integer(1))]);
        assert_eq!(resolve_cast(&v).unwrap_err(), CastError::UnknownTag("_bogus".into()));
    }

    #[test]
    fn multiple_tags_errors() {
        let v = obj(vec![("_integer", Value::Integer(1)), ("_float", Value::Float(1.0))]);
        assert_eq!(resolve_cast(&v).unwrap_err(), CastError::MultipleTags(2));
    }

    #[test]
    fn boolean_coercion_accepts_strings() {
        assert!(coerce_boolean(&Value::Text("TRUE".into())).unwrap());
        assert!(!coerce_boolean(&Value::Text("0".into())).unwrap());
    }

    #[test]
    fn distance_units_convert_to_meters() {
        assert_eq!(distance_unit_to_meters("km"), Some(1_000.0));
        assert_eq!(distance_unit_to_meters("bogus"), None);
    }
}
