use crate::error::DataError;
use crate::value::FieldValue;
use serde::Serialize;

/// An ordered field→value mapping describing a create or update payload.
///
/// A field present in the record is *set*, even when its value is
/// [`FieldValue::Null`]. A field absent from the record is *unset*: updates
/// leave it untouched and inserts let the store apply its default.
///
/// ```ignore
/// let patch = Record::new()
///     .set("title", "Renamed")
///     .set_opt("body", request.body);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value for it.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field only when `value` is `Some`.
    pub fn set_opt<V: Into<FieldValue>>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(name, _)| name == field)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Names of the set fields, in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from any serializable struct or string-keyed map.
    ///
    /// Every serialized key becomes a set field, so partial-update structs
    /// should hide absent fields with
    /// `#[serde(skip_serializing_if = "Option::is_none")]`. `Uuid` and
    /// `DateTime<Utc>` fields keep their types; nested containers become
    /// [`FieldValue::Json`].
    pub fn from_serialize<P: Serialize + ?Sized>(payload: &P) -> Result<Self, DataError> {
        crate::ser::to_record(payload)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A create or update payload convertible into a [`Record`].
///
/// Implemented by [`Record`] itself; serde types get an implementation through
/// [`serde_payload!`](crate::serde_payload).
pub trait Payload: Send + Sync {
    fn to_record(&self) -> Result<Record, DataError>;
}

impl Payload for Record {
    fn to_record(&self) -> Result<Record, DataError> {
        Ok(self.clone())
    }
}

/// Implement [`Payload`] for types that implement `serde::Serialize`.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize)]
/// pub struct UpdateArticle {
///     #[serde(skip_serializing_if = "Option::is_none")]
///     pub title: Option<String>,
/// }
///
/// reposit_data::serde_payload!(CreateArticle, UpdateArticle);
/// ```
#[macro_export]
macro_rules! serde_payload {
    ( $( $ty:ty ),+ $(,)? ) => {
        $(
            impl $crate::Payload for $ty {
                fn to_record(&self) -> Result<$crate::Record, $crate::DataError> {
                    $crate::Record::from_serialize(self)
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct UpdateItem {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        quantity: Option<i64>,
        // Always serialized, so `None` is an explicit null.
        description: Option<String>,
    }

    crate::serde_payload!(UpdateItem);

    #[test]
    fn set_replaces_existing_field() {
        let record = Record::new().set("name", "a").set("qty", 1).set("name", "b");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&FieldValue::Text("b".into())));
        assert_eq!(record.fields().collect::<Vec<_>>(), vec!["name", "qty"]);
    }

    #[test]
    fn set_opt_skips_none() {
        let record = Record::new()
            .set_opt("name", Some("x"))
            .set_opt("email", None::<String>);
        assert!(record.contains("name"));
        assert!(!record.contains("email"));
    }

    #[test]
    fn serde_payload_distinguishes_unset_from_null() {
        let patch = UpdateItem {
            name: Some("Renamed".into()),
            quantity: None,
            description: None,
        };
        let record = patch.to_record().unwrap();
        assert_eq!(record.get("name"), Some(&FieldValue::Text("Renamed".into())));
        assert!(!record.contains("quantity"));
        assert_eq!(record.get("description"), Some(&FieldValue::Null));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = Record::from_serialize(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, DataError::InvalidPayload(msg) if msg.contains("an array")));
    }

    #[test]
    fn remove_returns_previous_value() {
        let mut record: Record = [("id", FieldValue::Int(1)), ("name", "a".into())]
            .into_iter()
            .collect();
        assert_eq!(record.remove("id"), Some(FieldValue::Int(1)));
        assert_eq!(record.remove("id"), None);
        assert_eq!(record.len(), 1);
    }
}
