//! Decoded object values.
//!
//! [`Value`] is the closed set of shapes a type tree can decode to. It is generic over the
//! node type holding nested values, which gives the two output shapes of the decoder:
//! [`ObjectValue`] keeps each node's declared type and byte order, [`PlainValue`] keeps
//! only the data.

use std::ops::Deref;

use binrw::Endian;
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::{cursor::ByteView, type_tree::TypeTreeNode};

/// A decoded value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum Value<N> {
    /// No value, e.g. streaming data that could not be resolved
    Null,
    /// `bool`
    Bool(bool),
    /// Any signed integer type
    Int64(i64),
    /// Any unsigned integer type
    UInt64(u64),
    /// `float`
    Float32(f32),
    /// `double`
    Float64(f64),
    /// Raw bytes of an unrecognized leaf type, or resolved streaming data
    Bytes(ByteView),
    /// `string`
    String(String),
    /// Array contents
    Array(ArrayValue<N>),
    /// Named fields in declaration order
    Struct(IndexMap<String, N>),
    /// `map` contents as ordered key/value pairs
    Map(Vec<(N, N)>),
}

/// Array contents, either a typed primitive buffer or individually decoded elements
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum ArrayValue<N> {
    /// Bytes (`UInt8`, `SInt8`, `char`, `bool` elements and `ColorRGBA`)
    UInt8(ByteView),
    /// `SInt16` elements
    Int16(Vec<i16>),
    /// `UInt16` elements
    UInt16(Vec<u16>),
    /// `SInt32` elements
    Int32(Vec<i32>),
    /// `UInt32` elements
    UInt32(Vec<u32>),
    /// `float` elements
    Float32(Vec<f32>),
    /// Elements decoded one by one
    Elements(Vec<N>),
}

impl<N> ArrayValue<N> {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::UInt8(v) => v.len(),
            ArrayValue::Int16(v) => v.len(),
            ArrayValue::UInt16(v) => v.len(),
            ArrayValue::Int32(v) => v.len(),
            ArrayValue::UInt32(v) => v.len(),
            ArrayValue::Float32(v) => v.len(),
            ArrayValue::Elements(v) => v.len(),
        }
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<N: ValueNode> Value<N> {
    /// Boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value as i64, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Integer value as u64, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int64(v) => u64::try_from(*v).ok(),
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// String value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte contents of raw bytes or a byte array.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::Array(ArrayValue::UInt8(b)) => Some(b),
            _ => None,
        }
    }

    /// Shared view of raw bytes or a byte array.
    pub fn as_byte_view(&self) -> Option<&ByteView> {
        match self {
            Value::Bytes(b) | Value::Array(ArrayValue::UInt8(b)) => Some(b),
            _ => None,
        }
    }

    /// Named field of a struct.
    pub fn get(&self, name: &str) -> Option<&N> {
        match self {
            Value::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// A node of a decoded value tree
///
/// Implemented by the two output shapes so one decoder produces either.
pub trait ValueNode: Sized {
    /// Wrap a decoded value with the schema node that produced it.
    fn wrap(node: &TypeTreeNode, endian: Endian, value: Value<Self>) -> Self;

    /// The wrapped value.
    fn value(&self) -> &Value<Self>;

    /// Unwrap the value.
    fn into_value(self) -> Value<Self>;
}

/// A decoded value annotated with its schema
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ObjectValue {
    /// Field name
    pub name: String,
    /// Declared type name
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub type_name: String,
    /// Byte order the value was decoded with
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_endian"))]
    pub endian: Endian,
    /// The value
    pub value: Value<ObjectValue>,
}

impl ValueNode for ObjectValue {
    fn wrap(node: &TypeTreeNode, endian: Endian, value: Value<Self>) -> Self {
        Self {
            name: node.name.clone(),
            type_name: node.type_name.clone(),
            endian,
            value,
        }
    }

    fn value(&self) -> &Value<Self> {
        &self.value
    }

    fn into_value(self) -> Value<Self> {
        self.value
    }
}

impl Deref for ObjectValue {
    type Target = Value<ObjectValue>;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(feature = "serde")]
fn serialize_endian<S: Serializer>(endian: &Endian, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(match endian {
        Endian::Big => "big",
        Endian::Little => "little",
    })
}

/// A decoded value without schema annotations
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct PlainValue(pub Value<PlainValue>);

impl ValueNode for PlainValue {
    fn wrap(_node: &TypeTreeNode, _endian: Endian, value: Value<Self>) -> Self {
        Self(value)
    }

    fn value(&self) -> &Value<Self> {
        &self.0
    }

    fn into_value(self) -> Value<Self> {
        self.0
    }
}

impl Deref for PlainValue {
    type Target = Value<PlainValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl Serialize for ByteView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self)
    }
}
