//! Dynamic attribute values and their type tags.
//!
//! Node attributes hold loosely typed data read from templates and scene
//! files. [`Value`] is the tagged variant that carries that data, and
//! [`AttrType`] is the declared (or inferred) type an attribute expects.
//!
//! # Example
//!
//! ```rust
//! use scenegraph_core::{AttrType, Value};
//!
//! let frame = Value::from(1001);
//! assert_eq!(AttrType::infer(&frame), Some(AttrType::Int));
//! assert!(AttrType::Float.accepts(&frame));
//! assert!(!AttrType::Bool.accepts(&frame));
//!
//! let pos = Value::vector(&[0.0, 1.5, 2.0]);
//! assert_eq!(AttrType::infer(&pos), Some(AttrType::Float3));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed attribute value.
///
/// Serializes as plain JSON (`null`, `true`, `12`, `1.5`, `"text"`, `[..]`),
/// so snapshots stay human-readable. Vectors and colors are lists of numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values (vectors, colors, multi-values).
    List(Vec<Value>),
}

impl Value {
    /// Builds a list of floats, e.g. a position or a vector attribute.
    pub fn vector(components: &[f64]) -> Self {
        Value::List(components.iter().copied().map(Value::Float).collect())
    }

    /// Returns the lowercase name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `Int` and `Float`.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Returns false when the value is, or contains, a NaN or infinite
    /// float. JSON has no encoding for those.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::List(items) => items.iter().all(Value::is_finite),
            _ => true,
        }
    }

    /// Returns the value as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list items, if the value is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the components of a purely numeric list.
    pub fn as_vector(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(Value::as_f64).collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

// ============================================================================
// AttrType
// ============================================================================

/// Declared type of an attribute.
///
/// Mirrors the type tags used in attribute templates (`FLOAT`, `COLOR`,
/// `FILE`, ...). Unknown tags are kept as `Custom` so templates from newer
/// tools still load.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttrType {
    /// Floating point scalar.
    Float,
    /// Text.
    String,
    /// Boolean flag.
    Bool,
    /// Integer scalar.
    Int,
    /// Two-component float vector.
    Float2,
    /// Three-component float vector.
    Float3,
    /// Two-component integer vector.
    Int2,
    /// Three-component integer vector.
    Int3,
    /// RGB or RGBA color.
    Color,
    /// File path.
    File,
    /// List of values.
    Multi,
    /// Merged upstream data.
    Merge,
    /// Reference to another node.
    Node,
    /// Directory path.
    Dir,
    /// Tag not known to this version.
    Custom(String),
}

impl AttrType {
    /// Returns the lowercase tag name.
    pub fn name(&self) -> &str {
        match self {
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Int2 => "int2",
            Self::Int3 => "int3",
            Self::Color => "color",
            Self::File => "file",
            Self::Multi => "multi",
            Self::Merge => "merge",
            Self::Node => "node",
            Self::Dir => "dir",
            Self::Custom(name) => name,
        }
    }

    /// Infers a type from a value. `Null` has no type.
    pub fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Bool),
            Value::Int(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::String(_) => Some(Self::String),
            Value::List(items) => {
                let all_int = items.iter().all(|v| matches!(v, Value::Int(_)));
                let all_num = items.iter().all(Value::is_number);
                match (items.len(), all_int, all_num) {
                    (2, true, _) => Some(Self::Int2),
                    (3, true, _) => Some(Self::Int3),
                    (2, false, true) => Some(Self::Float2),
                    (3, false, true) => Some(Self::Float3),
                    (4, _, true) => Some(Self::Color),
                    _ => Some(Self::Multi),
                }
            }
        }
    }

    /// Returns whether a value can be stored in an attribute of this type.
    ///
    /// `Null` is always accepted (it clears the attribute). NaN and
    /// infinite floats never are.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        if !value.is_finite() {
            return false;
        }
        let numbers = |len: usize| {
            value
                .as_list()
                .is_some_and(|items| items.len() == len && items.iter().all(Value::is_number))
        };
        let ints = |len: usize| {
            value.as_list().is_some_and(|items| {
                items.len() == len && items.iter().all(|v| matches!(v, Value::Int(_)))
            })
        };
        match self {
            Self::Float => value.is_number(),
            Self::Int => matches!(value, Value::Int(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::String | Self::File | Self::Dir => matches!(value, Value::String(_)),
            Self::Float2 => numbers(2),
            Self::Float3 => numbers(3),
            Self::Int2 => ints(2),
            Self::Int3 => ints(3),
            Self::Color => numbers(3) || numbers(4),
            Self::Multi => matches!(value, Value::List(_)),
            Self::Merge | Self::Node | Self::Custom(_) => true,
        }
    }

    /// Normalizes an accepted value to this type's canonical form.
    ///
    /// Integers stored in float attributes become floats, and integer
    /// components of float vectors are widened.
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Float, Value::Int(i)) => Value::Float(i as f64),
            (Self::Float2 | Self::Float3, Value::List(items)) => Value::List(
                items
                    .into_iter()
                    .map(|v| match v {
                        Value::Int(i) => Value::Float(i as f64),
                        other => other,
                    })
                    .collect(),
            ),
            (_, value) => value,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for AttrType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "float" => Self::Float,
            "string" | "str" => Self::String,
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float2" => Self::Float2,
            "float3" => Self::Float3,
            "int2" => Self::Int2,
            "int3" => Self::Int3,
            "color" => Self::Color,
            "file" => Self::File,
            "multi" => Self::Multi,
            "merge" => Self::Merge,
            "node" => Self::Node,
            "dir" | "directory" => Self::Dir,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for AttrType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<AttrType> for String {
    fn from(t: AttrType) -> Self {
        t.name().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Value tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_value_default_is_null() {
        assert!(Value::default().is_null());
    }

    #[test]
    fn test_value_json_shapes() {
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::Int(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&Value::from("cam")).unwrap(),
            "\"cam\""
        );
        assert_eq!(
            serde_json::to_string(&Value::vector(&[1.0, 2.0])).unwrap(),
            "[1.0,2.0]"
        );
    }

    #[test]
    fn test_value_deserialize_keeps_int_float_distinction() {
        let int: Value = serde_json::from_str("7").unwrap();
        let float: Value = serde_json::from_str("7.0").unwrap();
        assert_eq!(int, Value::Int(7));
        assert_eq!(float, Value::Float(7.0));
    }

    #[test]
    fn test_value_nested_list() {
        let parsed: Value = serde_json::from_str(r#"[1, "a", [true, null]]"#).unwrap();
        assert_eq!(
            parsed,
            Value::List(vec![
                Value::Int(1),
                Value::from("a"),
                Value::List(vec![Value::Bool(true), Value::Null]),
            ])
        );
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Float(2.5).as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::Float(0.5)]).as_vector(),
            Some(vec![1.0, 0.5])
        );
        assert_eq!(Value::List(vec![Value::from("a")]).as_vector(), None);
    }

    #[test]
    fn test_value_display() {
        let v = Value::List(vec![Value::Int(1), Value::from("a"), Value::Float(2.0)]);
        assert_eq!(v.to_string(), "[1, \"a\", 2.0]");
    }

    // ------------------------------------------------------------------------
    // AttrType tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_attr_type_infer() {
        assert_eq!(AttrType::infer(&Value::Null), None);
        assert_eq!(AttrType::infer(&Value::Bool(false)), Some(AttrType::Bool));
        assert_eq!(AttrType::infer(&Value::from("x")), Some(AttrType::String));
        assert_eq!(
            AttrType::infer(&Value::List(vec![Value::Int(1), Value::Int(2)])),
            Some(AttrType::Int2)
        );
        assert_eq!(
            AttrType::infer(&Value::vector(&[0.0, 0.0])),
            Some(AttrType::Float2)
        );
        assert_eq!(
            AttrType::infer(&Value::List(vec![Value::Int(172); 4])),
            Some(AttrType::Color)
        );
        assert_eq!(
            AttrType::infer(&Value::List(vec![Value::from("a")])),
            Some(AttrType::Multi)
        );
    }

    #[test]
    fn test_attr_type_accepts() {
        assert!(AttrType::Float.accepts(&Value::Int(1)));
        assert!(!AttrType::Int.accepts(&Value::Float(1.0)));
        assert!(AttrType::File.accepts(&Value::from("/show/plate.exr")));
        assert!(!AttrType::File.accepts(&Value::Int(0)));
        assert!(AttrType::Color.accepts(&Value::vector(&[1.0, 0.5, 0.0])));
        assert!(!AttrType::Float3.accepts(&Value::vector(&[1.0, 0.5])));
        assert!(AttrType::Node.accepts(&Value::from("anything")));
        assert!(AttrType::Bool.accepts(&Value::Null));
    }

    #[test]
    fn test_attr_type_rejects_non_finite_floats() {
        assert!(!Value::Float(f64::NAN).is_finite());
        assert!(!Value::List(vec![Value::Float(0.0), Value::Float(f64::INFINITY)]).is_finite());
        assert!(Value::vector(&[1.0, -2.5]).is_finite());

        assert!(!AttrType::Float.accepts(&Value::Float(f64::INFINITY)));
        assert!(!AttrType::Float.accepts(&Value::Float(f64::NAN)));
        assert!(!AttrType::Float3.accepts(&Value::vector(&[0.0, f64::NEG_INFINITY, 1.0])));
        assert!(!AttrType::Node.accepts(&Value::Float(f64::NAN)));
        assert!(AttrType::Float.accepts(&Value::Float(f64::MAX)));
    }

    #[test]
    fn test_attr_type_coerce() {
        assert_eq!(AttrType::Float.coerce(Value::Int(3)), Value::Float(3.0));
        assert_eq!(
            AttrType::Float2.coerce(Value::List(vec![Value::Int(1), Value::Float(2.0)])),
            Value::vector(&[1.0, 2.0])
        );
        assert_eq!(AttrType::Int.coerce(Value::Int(3)), Value::Int(3));
    }

    #[test]
    fn test_attr_type_from_tag() {
        assert_eq!(AttrType::from("FLOAT"), AttrType::Float);
        assert_eq!(AttrType::from("Directory"), AttrType::Dir);
        assert_eq!(
            AttrType::from("VOXELS"),
            AttrType::Custom("voxels".to_string())
        );
    }

    #[test]
    fn test_attr_type_serialization() {
        let json = serde_json::to_string(&AttrType::Float3).unwrap();
        assert_eq!(json, "\"float3\"");
        let parsed: AttrType = serde_json::from_str("\"COLOR\"").unwrap();
        assert_eq!(parsed, AttrType::Color);
    }
}
