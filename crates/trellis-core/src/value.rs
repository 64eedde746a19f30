#![forbid(unsafe_code)]

//! Application values.
//!
//! A [`Value`] is whatever the application hands to a layout: a scalar, a
//! string, raw bytes, a nested list/map, or a host object implementing
//! [`CustomValue`]. Values carry no rendering behavior of their own; the
//! [`crate::PaneRegistry`] decides which pane kind renders them.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::view::Child;

/// Host object plugged into the value model.
pub trait CustomValue: fmt::Debug {
    /// Dynamic type name used by `applies` predicates.
    fn type_name(&self) -> &'static str;

    /// Attributes visible to pane kinds. Two custom values with the same type
    /// name and attributes compare equal.
    fn attributes(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// HTML representation, if the object can describe itself as markup.
    fn html(&self) -> Option<String> {
        None
    }

    /// Self-describing conversion hook.
    ///
    /// When this returns `Some`, the resolver works on the returned child
    /// instead of the object itself.
    fn convert(&self) -> Option<Child> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// An arbitrary application value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Custom(Rc<dyn CustomValue>),
}

impl Value {
    /// Wrap raw bytes.
    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Wrap a host object.
    #[must_use]
    pub fn custom(obj: impl CustomValue + 'static) -> Self {
        Self::Custom(Rc::new(obj))
    }

    /// Dynamic type name, used in diagnostics and resolution errors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Custom(obj) => obj.type_name(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_custom(&self) -> Option<&Rc<dyn CustomValue>> {
        match self {
            Self::Custom(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short human-readable rendering, used by the text fallback pane.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Str(s) => s.clone(),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Map(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::Custom(obj) => format!("<{}>", obj.type_name()),
        }
    }

    /// Convert into a JSON property value for a model property bag.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
            Self::Str(s) => Json::String(s.clone()),
            Self::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Custom(obj) => {
                let mut out = serde_json::Map::new();
                out.insert("type".to_string(), Json::String(obj.type_name().to_string()));
                for (k, v) in obj.attributes() {
                    out.insert(k, v.to_json());
                }
                Json::Object(out)
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.type_name() == b.type_name() && a.attributes() == b.attributes())
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Custom(obj) => f.debug_tuple("Custom").field(obj).finish(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool as bool,
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Str as String,
    &str => Str as String,
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Extra keyword hints forwarded to `applies` predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints(BTreeMap<String, Value>);

impl Hints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hint.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl CustomValue for Point {
        fn type_name(&self) -> &'static str {
            "Point"
        }

        fn attributes(&self) -> BTreeMap<String, Value> {
            BTreeMap::from([
                ("x".to_string(), Value::Int(self.x)),
                ("y".to_string(), Value::Int(self.y)),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn custom_values_compare_by_type_and_attributes() {
        let a = Value::custom(Point { x: 1, y: 2 });
        let b = Value::custom(Point { x: 1, y: 2 });
        let c = Value::custom(Point { x: 3, y: 2 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.type_name(), "Point");
    }

    #[test]
    fn json_round_trip_preserves_shape() {
        let json = serde_json::json!({"a": [1, 2.5, "x"], "b": null});
        let value = Value::from(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn repr_is_compact() {
        let value = Value::List(vec![Value::Int(1), Value::from("a"), Value::Null]);
        assert_eq!(value.repr(), "[1, a, None]");
        assert_eq!(Value::bytes(vec![0u8; 4]).repr(), "<4 bytes>");
    }

    #[test]
    fn custom_to_json_includes_type() {
        let value = Value::custom(Point { x: 5, y: 6 });
        assert_eq!(
            value.to_json(),
            serde_json::json!({"type": "Point", "x": 5, "y": 6})
        );
    }
}
