//! The semi-structured value tree walked by the indexing driver.

use std::fmt;

/// A semi-structured input value: the shape documents arrive in before
/// the schema engine resolves each leaf to a concrete field type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit absence of a value; descended into for structural
    /// properties but never emits a term.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// An integer scalar (may later be cast to `integer` or `positive`).
    Integer(i64),
    /// A floating point scalar.
    Float(f64),
    /// A text scalar; type guessing (§4.1) decides its concrete field type.
    Text(String),
    /// An ordered list of values, indexed positionally.
    Array(Vec<Self>),
    /// A map of field name to value, in insertion order. Insertion order
    /// matters because a single `_`-prefixed key denotes a cast envelope.
    Object(Vec<(String, Self)>),
}

impl Value {
    /// Returns a short, human-readable name for the value's shape, used
    /// in [`crate::ValueError::CannotNest`] messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Returns the value as an object's key/value pairs, if it is one.
    pub fn as_object(&self) -> Option<&[(String, Self)]> {
        match self {
            Self::Object(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Returns the value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// True if this value is a scalar (not an object or array).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Object(_) | Self::Array(_))
    }

    /// Looks up a single field in an object value. Returns `None` for
    /// non-objects or missing keys.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Converts from a `serde_json::Value`, the wire format documents are
    /// ingested in (see `DESIGN.md` for why JSON and not MsgPack).
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_converts_nested_object() {
        let json = serde_json::json!({"a": 1, "b": {"c": [1, 2, "x"]}});
        let value = Value::from_json(json);
        let Value::Object(pairs) = &value else {
            panic!("expected object");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(value.get("a"), Some(&Value::Integer(1)));
        let b = value.get("b").unwrap();
        let c = b.get("c").unwrap();
        assert_eq!(c.as_array().unwrap().len(), 3);
    }

    #[test]
    fn scalar_detection() {
        assert!(Value::Integer(1).is_scalar());
        assert!(Value::Text("x".into()).is_scalar());
        assert!(!Value::Array(vec![]).is_scalar());
        assert!(!Value::Object(vec![]).is_scalar());
    }

    #[test]
    fn object_get_preserves_order_and_lookup() {
        let value = Value::Object(vec![
            ("first".into(), Value::Integer(1)),
            ("second".into(), Value::Integer(2)),
        ]);
        assert_eq!(value.get("second"), Some(&Value::Integer(2)));
        assert_eq!(value.get("missing"), None);
    }
}
