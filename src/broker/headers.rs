//! # Message headers (user properties).
//!
//! Callers describe headers with [`HeaderValue`]; brokers carry them as typed
//! [`Field`]s. The mapping is:
//!
//! | `HeaderValue`   | encoded as            | decoded back as          |
//! |-----------------|-----------------------|--------------------------|
//! | `String(s)`     | `FieldType::String`   | `String(s)`              |
//! | `Bool(b)`       | `FieldType::Bool`     | `Bool(b)`                |
//! | `Int(i)`        | `FieldType::Int64`    | `Int(i)`                 |
//! | `Float(f)`      | `FieldType::Double`   | `Float(f)`               |
//! | `Typed(field)`  | `field` as given      | `Typed(field)`           |
//!
//! Untyped integers always travel at the default width (`Int64`). A typed field
//! whose type is one of the defaults above (`Int64`, `Double`, `String`, `Bool`)
//! therefore comes back as the corresponding plain variant.
//!
//! `None` header values are dropped during encoding.

use std::collections::BTreeMap;

/// Wire type of a user property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    String,
}

/// Value carried by a [`Field`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
}

/// A typed user property as it travels on a broker message.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    ty: FieldType,
    value: FieldValue,
}

impl Field {
    fn typed(ty: FieldType, value: FieldValue) -> Self {
        Self { ty, value }
    }

    pub fn bool(v: bool) -> Self {
        Self::typed(FieldType::Bool, FieldValue::Bool(v))
    }

    pub fn int8(v: i8) -> Self {
        Self::typed(FieldType::Int8, FieldValue::Int(v.into()))
    }

    pub fn int16(v: i16) -> Self {
        Self::typed(FieldType::Int16, FieldValue::Int(v.into()))
    }

    pub fn int32(v: i32) -> Self {
        Self::typed(FieldType::Int32, FieldValue::Int(v.into()))
    }

    pub fn int64(v: i64) -> Self {
        Self::typed(FieldType::Int64, FieldValue::Int(v))
    }

    pub fn uint8(v: u8) -> Self {
        Self::typed(FieldType::Uint8, FieldValue::Uint(v.into()))
    }

    pub fn uint16(v: u16) -> Self {
        Self::typed(FieldType::Uint16, FieldValue::Uint(v.into()))
    }

    pub fn uint32(v: u32) -> Self {
        Self::typed(FieldType::Uint32, FieldValue::Uint(v.into()))
    }

    pub fn uint64(v: u64) -> Self {
        Self::typed(FieldType::Uint64, FieldValue::Uint(v))
    }

    pub fn float(v: f32) -> Self {
        Self::typed(FieldType::Float, FieldValue::Float(v.into()))
    }

    pub fn double(v: f64) -> Self {
        Self::typed(FieldType::Double, FieldValue::Float(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::typed(FieldType::String, FieldValue::String(v.into()))
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// User properties as carried by broker messages.
pub type UserProperties = BTreeMap<String, Field>;

/// Caller-facing header value.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    String(String),
    Bool(bool),
    /// Untyped integer, encoded at the default width.
    Int(i64),
    Float(f64),
    /// Explicitly typed field, encoded as given.
    Typed(Field),
}

/// Decoded header map handed to observers.
pub type Headers = BTreeMap<String, HeaderValue>;

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::String(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::String(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<i32> for HeaderValue {
    fn from(v: i32) -> Self {
        HeaderValue::Int(v.into())
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<Field> for HeaderValue {
    fn from(v: Field) -> Self {
        HeaderValue::Typed(v)
    }
}

impl HeaderValue {
    fn into_field(self) -> Field {
        match self {
            HeaderValue::String(s) => Field::string(s),
            HeaderValue::Bool(b) => Field::bool(b),
            HeaderValue::Int(i) => Field::int64(i),
            HeaderValue::Float(f) => Field::double(f),
            HeaderValue::Typed(field) => field,
        }
    }

    fn from_field(field: &Field) -> Self {
        match (field.ty, &field.value) {
            (FieldType::String, FieldValue::String(s)) => HeaderValue::String(s.clone()),
            (FieldType::Bool, FieldValue::Bool(b)) => HeaderValue::Bool(*b),
            (FieldType::Int64, FieldValue::Int(i)) => HeaderValue::Int(*i),
            (FieldType::Double, FieldValue::Float(f)) => HeaderValue::Float(*f),
            _ => HeaderValue::Typed(field.clone()),
        }
    }
}

/// Encodes caller headers into user properties, dropping `None` values.
pub fn encode_headers<I, K>(headers: I) -> UserProperties
where
    I: IntoIterator<Item = (K, Option<HeaderValue>)>,
    K: Into<String>,
{
    headers
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.into(), v.into_field())))
        .collect()
}

/// Decodes user properties into the observer-facing header map.
pub fn decode_headers(props: &UserProperties) -> Headers {
    props
        .iter()
        .map(|(k, field)| (k.clone(), HeaderValue::from_field(field)))
        .collect()
}
