use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A dynamically typed value bound into a SQL statement.
///
/// Payloads are converted into `(column, FieldValue)` pairs before they reach
/// the storage backend, which decides how each variant is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Convert a JSON value into the closest scalar variant.
    ///
    /// Arrays and objects are kept as `Json`. Integers that do not fit in an
    /// `i64` fall back to `Float`.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Text(n.to_string())
                }
            }
            serde_json::Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Json(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Json(_) => "json",
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::Text(value.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_prefer_integers() {
        assert_eq!(FieldValue::from_json(json!(42)), FieldValue::Int(42));
        assert_eq!(FieldValue::from_json(json!(1.5)), FieldValue::Float(1.5));
        assert_eq!(
            FieldValue::from_json(json!(u64::MAX)),
            FieldValue::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn json_containers_stay_json() {
        let value = FieldValue::from_json(json!({"tags": ["a", "b"]}));
        assert_eq!(value.kind(), "json");
    }

    #[test]
    fn option_maps_none_to_null() {
        assert!(FieldValue::from(None::<i64>).is_null());
        assert_eq!(FieldValue::from(Some("x")), FieldValue::Text("x".into()));
    }
}
