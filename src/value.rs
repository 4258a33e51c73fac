//! The dynamic value type exchanged as WAMP message payloads.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use serde;

use crate::error::{Breadcrumb, ConversionError};

pub type Dict = HashMap<String, Value>;
pub type List = Vec<Value>;

/// A dotted WAMP URI, e.g. `com.example.add`.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct URI {
    pub uri: String,
}

impl URI {
    pub fn new(uri: &str) -> URI {
        URI {
            uri: uri.to_string(),
        }
    }

    /// Splits the URI into its '.'-separated tokens, the key form used by
    /// [`crate::trie::TokenTrie`].
    pub fn tokens(&self) -> Vec<&str> {
        self.uri.split('.').collect()
    }
}

impl fmt::Display for URI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// A dynamically typed value: the payload unit for every WAMP message field.
///
/// Exactly one alternative is active at a time. `Value::default()` is `Null`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Real(f64),
    String(String),
    Blob(Vec<u8>),
    List(List),
    Dict(Dict),
}

impl Default for Value {
    fn default() -> Value {
        Value::Null
    }
}

struct URIVisitor;
struct ValueVisitor;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = *self {
            Some(b)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(i) = *self {
            Some(i)
        } else {
            None
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        if let Value::UInt(u) = *self {
            Some(u)
        } else {
            None
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        if let Value::Real(r) = *self {
            Some(r)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(ref s) = *self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(ref b) = *self {
            Some(b)
        } else {
            None
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        if let Value::List(ref l) = *self {
            Some(l)
        } else {
            None
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        if let Value::Dict(ref d) = *self {
            Some(d)
        } else {
            None
        }
    }

    /// Element count: 0 for `Null`, 1 for scalars, length for `List`/`Dict`.
    pub fn len(&self) -> usize {
        match *self {
            Value::Null => 0,
            Value::List(ref l) => l.len(),
            Value::Dict(ref d) => d.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best-effort, truncated debug rendering used in error messages.
    pub fn summarize(&self) -> String {
        match *self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Real(f) => f.to_string(),
            Value::String(ref s) => {
                if s.len() > 50 {
                    s[..50].to_string()
                } else {
                    s.clone()
                }
            }
            Value::Blob(ref b) => format!("<{} bytes>", b.len()),
            Value::List(ref l) => {
                let mut result = String::new();
                result.push('[');
                result.push_str(&l.iter().take(50).map(|v| v.summarize()).join(","));
                result.push(']');
                result
            }
            Value::Dict(ref d) => {
                let mut result = String::new();
                result.push('{');
                result.push_str(
                    &d.iter()
                        .take(50)
                        .map(|(k, v)| format!("{}:{}", k, v.summarize()))
                        .join(","),
                );
                result.push('}');
                result
            }
        }
    }

    /// Entries of a `Dict`, ordered lexicographically by key.
    pub fn sorted_entries(d: &Dict) -> Vec<(&String, &Value)> {
        d.iter().sorted_by(|a, b| a.0.cmp(b.0)).collect()
    }

    fn numeric_group(&self) -> Option<NumericValue> {
        match *self {
            Value::Int(i) => Some(NumericValue::Signed(i)),
            Value::UInt(u) => Some(NumericValue::Unsigned(u)),
            Value::Real(f) => Some(NumericValue::Float(f)),
            _ => None,
        }
    }
}

enum NumericValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl NumericValue {
    fn as_f64(&self) -> f64 {
        match *self {
            NumericValue::Signed(i) => i as f64,
            NumericValue::Unsigned(u) => u as f64,
            NumericValue::Float(f) => f,
        }
    }
}

/// Equality is strict between `Bool` and numbers, but cross-type between
/// `Int`/`UInt`/`Real`, compared as mathematical numbers.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (&Value::Null, &Value::Null) => true,
            (&Value::Bool(a), &Value::Bool(b)) => a == b,
            (&Value::String(ref a), &Value::String(ref b)) => a == b,
            (&Value::Blob(ref a), &Value::Blob(ref b)) => a == b,
            (&Value::List(ref a), &Value::List(ref b)) => a == b,
            (&Value::Dict(ref a), &Value::Dict(ref b)) => a == b,
            _ => match (self.numeric_group(), other.numeric_group()) {
                (Some(NumericValue::Signed(a)), Some(NumericValue::Signed(b))) => a == b,
                (Some(NumericValue::Unsigned(a)), Some(NumericValue::Unsigned(b))) => a == b,
                (Some(NumericValue::Signed(a)), Some(NumericValue::Unsigned(b)))
                | (Some(NumericValue::Unsigned(b)), Some(NumericValue::Signed(a))) => {
                    a >= 0 && (a as u64) == b
                }
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self.numeric_group(), other.numeric_group()) {
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ if self == other => Some(Ordering::Equal),
            _ => discriminant(self).partial_cmp(&discriminant(other)),
        }
    }
}

fn discriminant(v: &Value) -> u8 {
    match *v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::UInt(_) => 2,
        Value::Real(_) => 2,
        Value::String(_) => 3,
        Value::Blob(_) => 4,
        Value::List(_) => 5,
        Value::Dict(_) => 6,
    }
}

impl std::ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::List(ref l) => &l[index],
            _ => panic!("indexing a non-List Value with a usize"),
        }
    }
}

impl std::ops::Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        match *self {
            Value::Dict(ref d) => d.get(key).unwrap_or(&Value::Null),
            _ => panic!("indexing a non-Dict Value with a key"),
        }
    }
}

impl std::ops::IndexMut<usize> for Value {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        match *self {
            Value::List(ref mut l) => &mut l[index],
            _ => panic!("indexing a non-List Value with a usize"),
        }
    }
}

impl std::ops::IndexMut<&str> for Value {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        match *self {
            Value::Dict(ref mut d) => d.entry(key.to_string()).or_insert(Value::Null),
            _ => panic!("indexing a non-Dict Value with a key"),
        }
    }
}

mod index {
    use super::Value;

    pub trait Sealed {}
    impl Sealed for usize {}
    impl Sealed for &str {}

    /// Either a `List` position or a `Dict` key, as accepted by
    /// [`Value::get`]/[`Value::get_mut`]. Mirrors `serde_json::value::Index`.
    pub trait ValueIndex: Sealed {
        fn value_get<'v>(&self, value: &'v Value) -> Option<&'v Value>;
        fn value_get_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value>;
    }

    impl ValueIndex for usize {
        fn value_get<'v>(&self, value: &'v Value) -> Option<&'v Value> {
            match *value {
                Value::List(ref l) => l.get(*self),
                _ => None,
            }
        }
        fn value_get_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
            match *value {
                Value::List(ref mut l) => l.get_mut(*self),
                _ => None,
            }
        }
    }

    impl ValueIndex for &str {
        fn value_get<'v>(&self, value: &'v Value) -> Option<&'v Value> {
            match *value {
                Value::Dict(ref d) => d.get(*self),
                _ => None,
            }
        }
        fn value_get_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
            match *value {
                Value::Dict(ref mut d) => d.get_mut(*self),
                _ => None,
            }
        }
    }
}

use index::ValueIndex;

impl Value {
    /// Looks up a `List` position or `Dict` key without ever auto-inserting;
    /// `None` for an out-of-range index, a missing key, or a kind mismatch.
    /// Compare [`std::ops::IndexMut<&str>`], which auto-inserts `Null`.
    pub fn get<I: ValueIndex>(&self, index: I) -> Option<&Value> {
        index.value_get(self)
    }

    pub fn get_mut<I: ValueIndex>(&mut self, index: I) -> Option<&mut Value> {
        index.value_get_mut(self)
    }
}

/// Converts a Rust value to and from [`Value`]. Implement once per type,
/// the same way a conversion to/from a WAMP argument is expressed in cppwamp.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

macro_rules! impl_signed_conversion {
    ($t:ty) => {
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match *value {
                    Value::Int(i) => Ok(i as $t),
                    Value::UInt(u) => Ok(u as $t),
                    _ => Err(ConversionError::new(
                        "expected an integer",
                        Breadcrumb::default(),
                    )),
                }
            }
        }
    };
}

macro_rules! impl_unsigned_conversion {
    ($t:ty) => {
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::UInt(*self as u64)
            }
        }
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match *value {
                    Value::UInt(u) => Ok(u as $t),
                    Value::Int(i) if i >= 0 => Ok(i as $t),
                    _ => Err(ConversionError::new(
                        "expected an unsigned integer",
                        Breadcrumb::default(),
                    )),
                }
            }
        }
    };
}

impl_signed_conversion!(i8);
impl_signed_conversion!(i16);
impl_signed_conversion!(i32);
impl_signed_conversion!(i64);
impl_unsigned_conversion!(u8);
impl_unsigned_conversion!(u16);
impl_unsigned_conversion!(u32);
impl_unsigned_conversion!(u64);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}
impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Bool(b) => Ok(b),
            _ => Err(ConversionError::new(
                "expected a bool",
                Breadcrumb::default(),
            )),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }
}
impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Real(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            _ => Err(ConversionError::new(
                "expected a number",
                Breadcrumb::default(),
            )),
        }
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}
impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::String(ref s) => Ok(s.clone()),
            _ => Err(ConversionError::new(
                "expected a string",
                Breadcrumb::default(),
            )),
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }
}
impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match *value {
            Value::Blob(ref b) => Ok(b.clone()),
            _ => Err(ConversionError::new(
                "expected a blob",
                Breadcrumb::default(),
            )),
        }
    }
}

/// Positional argument helpers, mirroring cppwamp's `Args::to<Ts...>`.
pub trait ArgList {
    fn get_as<T: FromValue>(&self, index: usize) -> Result<Option<T>, ConversionError>;
    fn verify_len(&self, expected_len: usize) -> Result<(), ConversionError>;
}

/// Keyword argument helpers.
pub trait ArgDict {
    fn get_as<T: FromValue>(&self, key: &str) -> Result<Option<T>, ConversionError>;
}

impl ArgList for List {
    fn get_as<T: FromValue>(&self, index: usize) -> Result<Option<T>, ConversionError> {
        match self.get(index) {
            Some(value) => {
                T::from_value(value).map(Some).map_err(|e| e.push(format!("array index {}", index)))
            }
            None => Ok(None),
        }
    }

    fn verify_len(&self, expected_len: usize) -> Result<(), ConversionError> {
        if self.len() >= expected_len {
            Ok(())
        } else {
            Err(ConversionError::new(
                &format!("expected {} arguments, got {}", expected_len, self.len()),
                Breadcrumb::default(),
            ))
        }
    }
}

impl ArgDict for Dict {
    fn get_as<T: FromValue>(&self, key: &str) -> Result<Option<T>, ConversionError> {
        match self.get(key) {
            Some(value) => T::from_value(value)
                .map(Some)
                .map_err(|e| e.push(format!("object member \"{}\"", key))),
            None => Ok(None),
        }
    }
}

impl<'de> serde::de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a WAMP value")
    }

    #[inline]
    fn visit_unit<E>(self) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::Null)
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        // A string whose first character is NUL is the JSON codec's escape
        // for a Blob; MsgPack/CBOR never reach this arm for their own
        // Blobs since those have a native binary wire type (`visit_bytes`).
        match value.strip_prefix('\u{0}') {
            Some(rest) => crate::codec::json::decode_blob_escape(rest)
                .map(Value::Blob)
                .map_err(|e| serde::de::Error::custom(e.to_string())),
            None => Ok(Value::String(value.to_string())),
        }
    }

    #[inline]
    fn visit_i64<E>(self, value: i64) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::Int(value))
    }

    #[inline]
    fn visit_u64<E>(self, value: u64) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::UInt(value))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::Real(value))
    }

    #[inline]
    fn visit_bool<E>(self, value: bool) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::Bool(value))
    }

    #[inline]
    fn visit_bytes<E>(self, value: &[u8]) -> Result<Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Value::Blob(value.to_vec()))
    }

    #[inline]
    fn visit_map<A>(self, mut visitor: A) -> Result<Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut values = HashMap::new();
        if let Some(size) = visitor.size_hint() {
            values.reserve(size);
        }
        while let Some((key, value)) = visitor.next_entry()? {
            values.insert(key, value);
        }
        Ok(Value::Dict(values))
    }

    #[inline]
    fn visit_seq<A>(self, mut visitor: A) -> Result<Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut values = Vec::new();
        if let Some(size) = visitor.size_hint() {
            values.reserve(size);
        }
        while let Some(value) = visitor.next_element()? {
            values.push(value);
        }
        Ok(Value::List(values))
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match *self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(b),
            Value::Int(i) => serializer.serialize_i64(i),
            Value::UInt(u) => serializer.serialize_u64(u),
            Value::Real(f) => serializer.serialize_f64(f),
            Value::String(ref s) => serializer.serialize_str(s),
            Value::Blob(ref b) => serializer.serialize_bytes(b),
            Value::List(ref list) => list.serialize(serializer),
            Value::Dict(ref dict) => dict.serialize(serializer),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl serde::Serialize for URI {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.uri)
    }
}

impl<'de> serde::Deserialize<'de> for URI {
    fn deserialize<D>(deserializer: D) -> Result<URI, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(URIVisitor)
    }
}

impl<'de> serde::de::Visitor<'de> for URIVisitor {
    type Value = URI;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a WAMP URI")
    }

    #[inline]
    fn visit_str<E>(self, value: &str) -> Result<URI, E>
    where
        E: serde::de::Error,
    {
        Ok(URI {
            uri: value.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_equality_crosses_int_uint_real() {
        assert_eq!(Value::Int(3), Value::UInt(3));
        assert_eq!(Value::Int(3), Value::Real(3.0));
        assert_ne!(Value::Int(-1), Value::UInt(18446744073709551615));
    }

    #[test]
    fn bool_never_equals_number() {
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Bool(false), Value::Int(0));
    }

    #[test]
    fn null_is_default() {
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn summarize_truncates_long_strings() {
        let s = Value::String("x".repeat(100));
        assert_eq!(s.summarize().len(), 50);
    }

    #[test]
    fn list_get_as_reports_conversion_error() {
        let list: List = vec![Value::String("nope".into())];
        let result: Result<Option<i64>, _> = list.get_as(0);
        assert!(result.is_err());
    }

    #[test]
    fn list_verify_len() {
        let list: List = vec![Value::Int(1), Value::Int(2)];
        assert!(list.verify_len(2).is_ok());
        assert!(list.verify_len(3).is_err());
    }
}
