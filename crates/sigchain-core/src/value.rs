//! Dynamically typed values carried by ports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Data type of a port, fixed when the port is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Double,
    Int,
    Bool,
    String,
}

impl ValueType {
    /// The value an unconnected input of this type reads as
    pub fn default_value(self) -> Value {
        match self {
            Self::Double => Value::Double(0.0),
            Self::Int => Value::Int(0),
            Self::Bool => Value::Bool(false),
            Self::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "Double",
            Self::Int => "Int",
            Self::Bool => "Bool",
            Self::String => "String",
        };
        f.write_str(name)
    }
}

/// A value stored on a port or in a property map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Double(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

impl Value {
    /// Default (null) value of the given type
    pub fn default_for(ty: ValueType) -> Self {
        ty.default_value()
    }

    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Double(_) => ValueType::Double,
            Self::Int(_) => ValueType::Int,
            Self::Bool(_) => ValueType::Bool,
            Self::String(_) => ValueType::String,
        }
    }

    /// Lossy conversion to a double.
    ///
    /// Strings that do not parse read as `0.0`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Double(v) => *v,
            Self::Int(v) => *v as f64,
            Self::Bool(v) => f64::from(u8::from(*v)),
            Self::String(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Lossy conversion to an integer (doubles are truncated toward zero)
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Double(v) => *v as i64,
            Self::Int(v) => *v,
            Self::Bool(v) => i64::from(*v),
            Self::String(s) => s.trim().parse().unwrap_or(0),
        }
    }

    /// Lossy conversion to a boolean: non-zero numbers and "true" are true
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Double(v) => *v != 0.0,
            Self::Int(v) => *v != 0,
            Self::Bool(v) => *v,
            Self::String(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }

    /// Borrow the string payload, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Double(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Generic key-value structure used by unit persistence hooks
pub type PropertyMap = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_type() {
        assert_eq!(Value::default_for(ValueType::Double), Value::Double(0.0));
        assert_eq!(Value::default_for(ValueType::Int), Value::Int(0));
        assert_eq!(Value::default_for(ValueType::Bool), Value::Bool(false));
        assert_eq!(
            Value::default_for(ValueType::String),
            Value::String(String::new())
        );
    }

    #[test]
    fn test_value_type_matches_payload() {
        assert_eq!(Value::from(1.5).value_type(), ValueType::Double);
        assert_eq!(Value::from(3_i64).value_type(), ValueType::Int);
        assert_eq!(Value::from(true).value_type(), ValueType::Bool);
        assert_eq!(Value::from("x").value_type(), ValueType::String);
    }

    #[test]
    fn test_lossy_conversions() {
        assert_eq!(Value::Int(4).as_f64(), 4.0);
        assert_eq!(Value::Bool(true).as_f64(), 1.0);
        assert_eq!(Value::from(" 2.5 ").as_f64(), 2.5);
        assert_eq!(Value::from("nope").as_f64(), 0.0);
        assert_eq!(Value::Double(-3.9).as_i64(), -3);
        assert!(Value::Double(0.1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(Value::from("TRUE").as_bool());
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::Double(1.0).as_str(), None);
    }

    #[test]
    fn test_property_map_serialization() {
        let mut props = PropertyMap::new();
        props.insert("value".to_string(), Value::Double(2.0));
        props.insert("label".to_string(), Value::from("osc"));

        let ron_string = ron::to_string(&props).expect("Serialization should succeed");
        let restored: PropertyMap =
            ron::from_str(&ron_string).expect("Deserialization should succeed");

        assert_eq!(restored, props);
    }
}
