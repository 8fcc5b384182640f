//! A serde `Serializer` turning a payload struct straight into a [`Record`].
//!
//! Field values are serialized in non-human-readable mode, so a `Uuid` arrives
//! as its 16 raw bytes and becomes [`FieldValue::Uuid`]. Timestamps reach
//! `collect_str` as RFC 3339 text and become [`FieldValue::Timestamp`]. Nested
//! sequences, maps and structs are rendered through `serde_json` and bound as
//! [`FieldValue::Json`].

use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::ser::{self, Impossible, Serialize};
use uuid::Uuid;

use crate::error::DataError;
use crate::record::Record;
use crate::value::FieldValue;

/// Serialize `payload` into a [`Record`], keeping every serialized field.
pub(crate) fn to_record<P: Serialize + ?Sized>(payload: &P) -> Result<Record, DataError> {
    payload
        .serialize(RecordSerializer)
        .map_err(|err| DataError::InvalidPayload(err.0))
}

#[derive(Debug)]
pub(crate) struct PayloadError(String);

impl Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PayloadError {}

impl ser::Error for PayloadError {
    fn custom<T: Display>(msg: T) -> Self {
        PayloadError(msg.to_string())
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError(err.to_string())
    }
}

fn not_an_object(kind: &str) -> PayloadError {
    PayloadError(format!("payload must serialize to an object, got {kind}"))
}

// Top level: only structs and maps are payloads.

struct RecordSerializer;

macro_rules! reject_scalars {
    ($($method:ident($ty:ty) => $kind:literal),+ $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Record, PayloadError> {
                Err(not_an_object($kind))
            }
        )+
    };
}

impl ser::Serializer for RecordSerializer {
    type Ok = Record;
    type Error = PayloadError;
    type SerializeSeq = Impossible<Record, PayloadError>;
    type SerializeTuple = Impossible<Record, PayloadError>;
    type SerializeTupleStruct = Impossible<Record, PayloadError>;
    type SerializeTupleVariant = Impossible<Record, PayloadError>;
    type SerializeMap = RecordBuilder;
    type SerializeStruct = RecordBuilder;
    type SerializeStructVariant = Impossible<Record, PayloadError>;

    reject_scalars! {
        serialize_bool(bool) => "a boolean",
        serialize_i8(i8) => "a number",
        serialize_i16(i16) => "a number",
        serialize_i32(i32) => "a number",
        serialize_i64(i64) => "a number",
        serialize_u8(u8) => "a number",
        serialize_u16(u16) => "a number",
        serialize_u32(u32) => "a number",
        serialize_u64(u64) => "a number",
        serialize_f32(f32) => "a number",
        serialize_f64(f64) => "a number",
        serialize_char(char) => "a string",
        serialize_str(&str) => "a string",
        serialize_bytes(&[u8]) => "bytes",
        serialize_unit_struct(&'static str) => "null",
    }

    fn serialize_none(self) -> Result<Record, PayloadError> {
        Err(not_an_object("null"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Record, PayloadError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Record, PayloadError> {
        Err(not_an_object("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Record, PayloadError> {
        Err(not_an_object("a string"))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Record, PayloadError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Record, PayloadError> {
        Err(not_an_object("an enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, PayloadError> {
        Err(not_an_object("an array"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, PayloadError> {
        Err(not_an_object("an array"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, PayloadError> {
        Err(not_an_object("an array"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, PayloadError> {
        Err(not_an_object("an enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<RecordBuilder, PayloadError> {
        Ok(RecordBuilder::default())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<RecordBuilder, PayloadError> {
        Ok(RecordBuilder::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, PayloadError> {
        Err(not_an_object("an enum variant"))
    }
}

#[derive(Default)]
struct RecordBuilder {
    record: Record,
    pending_key: Option<String>,
}

impl ser::SerializeStruct for RecordBuilder {
    type Ok = Record;
    type Error = PayloadError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PayloadError> {
        let value = value.serialize(FieldSerializer)?;
        self.record.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Record, PayloadError> {
        Ok(self.record)
    }
}

impl ser::SerializeMap for RecordBuilder {
    type Ok = Record;
    type Error = PayloadError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), PayloadError> {
        let key = match key.serialize(FieldSerializer)? {
            FieldValue::Text(key) => key,
            FieldValue::Int(key) => key.to_string(),
            other => {
                return Err(PayloadError(format!(
                    "payload keys must be strings, got {}",
                    other.kind()
                )))
            }
        };
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| PayloadError("map value serialized before its key".into()))?;
        let value = value.serialize(FieldSerializer)?;
        self.record.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Record, PayloadError> {
        Ok(self.record)
    }
}

// Field level.

struct FieldSerializer;

type JsonSerializer = serde_json::value::Serializer;

impl ser::Serializer for FieldSerializer {
    type Ok = FieldValue;
    type Error = PayloadError;
    type SerializeSeq = JsonCompound<<JsonSerializer as ser::Serializer>::SerializeSeq>;
    type SerializeTuple = JsonCompound<<JsonSerializer as ser::Serializer>::SerializeTuple>;
    type SerializeTupleStruct =
        JsonCompound<<JsonSerializer as ser::Serializer>::SerializeTupleStruct>;
    type SerializeTupleVariant =
        JsonCompound<<JsonSerializer as ser::Serializer>::SerializeTupleVariant>;
    type SerializeMap = JsonCompound<<JsonSerializer as ser::Serializer>::SerializeMap>;
    type SerializeStruct = JsonCompound<<JsonSerializer as ser::Serializer>::SerializeStruct>;
    type SerializeStructVariant =
        JsonCompound<<JsonSerializer as ser::Serializer>::SerializeStructVariant>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Int(v.into()))
    }

    /// Values above `i64::MAX` fall back to `Float`.
    fn serialize_u64(self, v: u64) -> Result<FieldValue, PayloadError> {
        Ok(match i64::try_from(v) {
            Ok(v) => FieldValue::Int(v),
            Err(_) => FieldValue::Float(v as f64),
        })
    }

    fn serialize_f32(self, v: f32) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<FieldValue, PayloadError> {
        Uuid::from_slice(v).map(FieldValue::Uuid).map_err(|_| {
            PayloadError(format!(
                "byte fields are only supported as 16-byte UUIDs, got {} bytes",
                v.len()
            ))
        })
    }

    fn serialize_none(self) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<FieldValue, PayloadError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<FieldValue, PayloadError> {
        Ok(FieldValue::Text(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<FieldValue, PayloadError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<FieldValue, PayloadError> {
        let json = ser::Serializer::serialize_newtype_variant(
            JsonSerializer {},
            name,
            index,
            variant,
            value,
        )?;
        Ok(FieldValue::Json(json))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_seq(JsonSerializer {}, len)?))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_tuple(JsonSerializer {}, len)?))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_tuple_struct(
            JsonSerializer {},
            name,
            len,
        )?))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_tuple_variant(
            JsonSerializer {},
            name,
            index,
            variant,
            len,
        )?))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_map(JsonSerializer {}, len)?))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_struct(
            JsonSerializer {},
            name,
            len,
        )?))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, PayloadError> {
        Ok(JsonCompound(ser::Serializer::serialize_struct_variant(
            JsonSerializer {},
            name,
            index,
            variant,
            len,
        )?))
    }

    /// `chrono` timestamps serialize through here as RFC 3339 text.
    fn collect_str<T: Display + ?Sized>(self, value: &T) -> Result<FieldValue, PayloadError> {
        let text = value.to_string();
        Ok(match DateTime::parse_from_rfc3339(&text) {
            Ok(timestamp) => FieldValue::Timestamp(timestamp.with_timezone(&Utc)),
            Err(_) => FieldValue::Text(text),
        })
    }
}

/// Nested containers, serialized by `serde_json` and bound as JSON.
struct JsonCompound<S>(S);

type JsonResult = Result<serde_json::Value, serde_json::Error>;

fn into_json(result: JsonResult) -> Result<FieldValue, PayloadError> {
    Ok(FieldValue::Json(result?))
}

impl<S> ser::SerializeSeq for JsonCompound<S>
where
    S: ser::SerializeSeq<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_element(value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeTuple for JsonCompound<S>
where
    S: ser::SerializeTuple<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_element(value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeTupleStruct for JsonCompound<S>
where
    S: ser::SerializeTupleStruct<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_field(value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeTupleVariant for JsonCompound<S>
where
    S: ser::SerializeTupleVariant<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_field(value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeMap for JsonCompound<S>
where
    S: ser::SerializeMap<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_key(key)?)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PayloadError> {
        Ok(self.0.serialize_value(value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeStruct for JsonCompound<S>
where
    S: ser::SerializeStruct<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PayloadError> {
        Ok(self.0.serialize_field(key, value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

impl<S> ser::SerializeStructVariant for JsonCompound<S>
where
    S: ser::SerializeStructVariant<Ok = serde_json::Value, Error = serde_json::Error>,
{
    type Ok = FieldValue;
    type Error = PayloadError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PayloadError> {
        Ok(self.0.serialize_field(key, value)?)
    }

    fn end(self) -> Result<FieldValue, PayloadError> {
        into_json(self.0.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct CreateTag {
        id: Uuid,
        name: String,
        created_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_id: Option<Uuid>,
        labels: Vec<String>,
    }

    #[derive(Serialize)]
    enum Status {
        Active,
    }

    #[derive(Serialize)]
    struct Flagged {
        status: Status,
        count: u64,
    }

    #[test]
    fn uuid_and_timestamp_keep_their_types() {
        let id = Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let record = to_record(&CreateTag {
            id,
            name: "rust".into(),
            created_at,
            parent_id: None,
            labels: vec!["a".into(), "b".into()],
        })
        .unwrap();

        assert_eq!(record.get("id"), Some(&FieldValue::Uuid(id)));
        assert_eq!(record.get("name"), Some(&FieldValue::Text("rust".into())));
        assert_eq!(record.get("created_at"), Some(&FieldValue::Timestamp(created_at)));
        assert!(!record.contains("parent_id"));
        assert_eq!(
            record.get("labels"),
            Some(&FieldValue::Json(serde_json::json!(["a", "b"])))
        );
    }

    #[test]
    fn optional_uuid_is_typed_when_present() {
        #[derive(Serialize)]
        struct Link {
            parent_id: Option<Uuid>,
        }
        let parent = Uuid::new_v4();
        let record = to_record(&Link { parent_id: Some(parent) }).unwrap();
        assert_eq!(record.get("parent_id"), Some(&FieldValue::Uuid(parent)));
        let record = to_record(&Link { parent_id: None }).unwrap();
        assert_eq!(record.get("parent_id"), Some(&FieldValue::Null));
    }

    #[test]
    fn rfc3339_looking_strings_stay_text() {
        #[derive(Serialize)]
        struct Note {
            body: String,
        }
        let record = to_record(&Note { body: "2024-05-01T12:30:00Z".into() }).unwrap();
        assert_eq!(
            record.get("body"),
            Some(&FieldValue::Text("2024-05-01T12:30:00Z".into()))
        );
    }

    #[test]
    fn unit_variants_and_large_integers() {
        let record = to_record(&Flagged {
            status: Status::Active,
            count: u64::MAX,
        })
        .unwrap();
        assert_eq!(record.get("status"), Some(&FieldValue::Text("Active".into())));
        assert_eq!(record.get("count"), Some(&FieldValue::Float(u64::MAX as f64)));
    }

    #[test]
    fn maps_with_string_keys_are_payloads() {
        let mut map = BTreeMap::new();
        map.insert("name", "x");
        let record = to_record(&map).unwrap();
        assert_eq!(record.get("name"), Some(&FieldValue::Text("x".into())));
    }

    #[test]
    fn scalars_are_not_payloads() {
        let err = to_record(&42).unwrap_err();
        assert!(matches!(err, DataError::InvalidPayload(msg) if msg.contains("a number")));
    }
}
