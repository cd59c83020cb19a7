//! Type-tree driven object decoding.
//!
//! The decoder walks a [`TypeTree`] and a [`ByteCursor`] in lockstep. Cursor position is
//! the only link between schema and bytes, so children are decoded strictly in declaration
//! order and arrays read their `size` before their `data`.

use binrw::Endian;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    cursor::{ByteCursor, ByteView},
    error::{checked_usize, Error, Result},
    serialized::BlobMap,
    type_tree::{TypeTree, TypeTreeNode},
    value::{ArrayValue, Value, ValueNode},
};

/// Decodes one object's bytes against its type tree
pub struct ObjectDecoder<'a> {
    data: &'a ByteView,
    cursor: ByteCursor<'a>,
    file_name: &'a str,
    blobs: &'a BlobMap,
}

impl<'a> ObjectDecoder<'a> {
    /// Create a decoder over `data`.
    ///
    /// `file_name` and `blobs` are used to resolve `StreamingInfo` values pointing into the
    /// container's streaming blobs.
    pub fn new(data: &'a ByteView, endian: Endian, file_name: &'a str, blobs: &'a BlobMap) -> Self {
        Self {
            data,
            cursor: ByteCursor::new(data.as_slice(), endian),
            file_name,
            blobs,
        }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Decode the value described by `tree` starting at the current position.
    pub fn decode<N: ValueNode>(&mut self, tree: &TypeTree) -> Result<N> {
        let node = &tree.node;
        let value = if node.is_array {
            self.decode_array(tree)?
        } else if node.size == -1 {
            self.decode_variable(tree)?
        } else if !tree.children.is_empty() {
            Value::Struct(self.decode_fields(tree)?)
        } else {
            self.decode_leaf(node)?
        };

        let value = match node.type_name.as_str() {
            "StreamingInfo" => self.resolve_streaming(value)?,
            "map" => into_map(value)?,
            _ => value,
        };

        if node.is_aligned() {
            self.cursor.align(4);
        }
        Ok(N::wrap(node, self.cursor.endian(), value))
    }

    fn decode_fields<N: ValueNode>(&mut self, tree: &TypeTree) -> Result<IndexMap<String, N>> {
        let mut fields = IndexMap::with_capacity(tree.children.len());
        for child in &tree.children {
            let value = self.decode(child)?;
            fields.insert(child.node.name.clone(), value);
        }
        Ok(fields)
    }

    fn decode_variable<N: ValueNode>(&mut self, tree: &TypeTree) -> Result<Value<N>> {
        match tree.children.as_slice() {
            [inner] if inner.node.name == "Array" && inner.node.is_array => {
                let value = self.decode::<N>(inner)?.into_value();
                if tree.node.type_name == "string" {
                    if let Some(bytes) = value.as_bytes() {
                        return Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()));
                    }
                }
                Ok(value)
            }
            _ => Ok(Value::Struct(self.decode_fields(tree)?)),
        }
    }

    fn decode_array<N: ValueNode>(&mut self, tree: &TypeTree) -> Result<Value<N>> {
        let size_tree = tree
            .child("size")
            .ok_or_else(|| Error::MissingField(format!("{}.size", tree.node.name)))?;
        let data_tree = tree
            .child("data")
            .ok_or_else(|| Error::MissingField(format!("{}.data", tree.node.name)))?;

        let size = self.decode::<N>(size_tree)?;
        let count = match size.value() {
            Value::Int64(v) => checked_usize(*v as u64)?,
            Value::UInt64(v) => checked_usize(*v)?,
            _ => {
                return Err(Error::UnimplementedSchemaCase(format!(
                    "array size of type {}",
                    size_tree.node.type_name
                )))
            }
        };

        if let Some(array) = self.decode_primitive_array(data_tree, count)? {
            return Ok(Value::Array(array));
        }

        if tree.node.type_name == "TypelessData" {
            return Err(Error::UnimplementedSchemaCase(format!(
                "TypelessData with {} elements",
                data_tree.node.type_name
            )));
        }

        let mut elements = Vec::with_capacity(count.min(self.cursor.remaining()));
        for _ in 0..count {
            elements.push(self.decode(data_tree)?);
        }
        Ok(Value::Array(ArrayValue::Elements(elements)))
    }

    /// Read arrays of fixed-width primitives as one typed buffer.
    fn decode_primitive_array<N>(
        &mut self,
        data_tree: &TypeTree,
        count: usize,
    ) -> Result<Option<ArrayValue<N>>> {
        let data = &data_tree.node;
        if !data_tree.children.is_empty() || data.is_array || data.is_aligned() {
            return Ok(None);
        }
        let width = match data.type_name.as_str() {
            "UInt8" | "SInt8" | "char" => 1,
            "SInt16" | "short" | "UInt16" | "unsigned short" => 2,
            "SInt32" | "int" | "UInt32" | "unsigned int" | "float" => 4,
            _ => return Ok(None),
        };
        if data.size != width {
            return Ok(None);
        }

        let start = self.cursor.position();
        let needed = count
            .checked_mul(width as usize)
            .ok_or(Error::IntegerOverflow(count as u64))?;
        if self.cursor.remaining() < needed {
            return Err(Error::OutOfBounds {
                position: start,
                needed,
                len: self.cursor.len(),
            });
        }

        let cursor = &mut self.cursor;
        let array = match data.type_name.as_str() {
            "UInt8" | "SInt8" | "char" => {
                cursor.skip(count);
                ArrayValue::UInt8(self.data.slice(start..start + count)?)
            }
            "SInt16" | "short" => {
                ArrayValue::Int16((0..count).map(|_| cursor.read_i16()).collect::<Result<_>>()?)
            }
            "UInt16" | "unsigned short" => {
                ArrayValue::UInt16((0..count).map(|_| cursor.read_u16()).collect::<Result<_>>()?)
            }
            "SInt32" | "int" => {
                ArrayValue::Int32((0..count).map(|_| cursor.read_i32()).collect::<Result<_>>()?)
            }
            "UInt32" | "unsigned int" => {
                ArrayValue::UInt32((0..count).map(|_| cursor.read_u32()).collect::<Result<_>>()?)
            }
            _ => ArrayValue::Float32((0..count).map(|_| cursor.read_f32()).collect::<Result<_>>()?),
        };
        Ok(Some(array))
    }

    fn decode_leaf<N: ValueNode>(&mut self, node: &TypeTreeNode) -> Result<Value<N>> {
        let start = self.cursor.position();
        let size = usize::try_from(node.size).map_err(|_| {
            Error::UnimplementedSchemaCase(format!("leaf {} with size {}", node.name, node.size))
        })?;

        let cursor = &mut self.cursor;
        let value = match node.type_name.as_str() {
            "bool" => Value::Bool(cursor.read_u8()? != 0),
            "SInt8" => Value::Int64(cursor.read_i8()? as i64),
            "UInt8" | "char" => Value::UInt64(cursor.read_u8()? as u64),
            "SInt16" | "short" => Value::Int64(cursor.read_i16()? as i64),
            "UInt16" | "unsigned short" => Value::UInt64(cursor.read_u16()? as u64),
            "SInt32" | "int" => Value::Int64(cursor.read_i32()? as i64),
            "UInt32" | "unsigned int" => Value::UInt64(cursor.read_u32()? as u64),
            "SInt64" | "long long" => Value::Int64(cursor.read_i64()?),
            "UInt64" | "unsigned long long" => Value::UInt64(cursor.read_u64()?),
            "float" => Value::Float32(cursor.read_f32()?),
            "double" => Value::Float64(cursor.read_f64()?),
            "ColorRGBA" => {
                cursor.read_bytes(4)?;
                Value::Array(ArrayValue::UInt8(self.data.slice(start..start + 4)?))
            }
            _ => {
                cursor.read_bytes(size)?;
                Value::Bytes(self.data.slice(start..start + size)?)
            }
        };

        // the declared size wins over whatever the branch above consumed
        self.cursor.seek(start + size);
        Ok(value)
    }

    fn resolve_streaming<N: ValueNode>(&self, value: Value<N>) -> Result<Value<N>> {
        let Value::Struct(fields) = &value else {
            return Ok(value);
        };
        let Some(path) = fields.get("path").and_then(|p| p.value().as_str()) else {
            return Ok(Value::Null);
        };
        let field = |name: &str| {
            fields
                .get(name)
                .and_then(|f| f.value().as_u64())
                .ok_or_else(|| Error::MissingField(format!("StreamingInfo.{name}")))
        };
        let offset = field("offset")?;
        let size = field("size")?;

        Ok(
            match resolve_streaming_data(self.file_name, self.blobs, path, offset, size)? {
                Some(view) => Value::Bytes(view),
                None => Value::Null,
            },
        )
    }
}

/// Resolve a `StreamingInfo` reference to the bytes it points at.
///
/// Paths of the form `archive:/<file_name>/<blob>` are looked up by `<blob>`; an empty
/// path or a blob that is not part of `blobs` resolves to nothing.
pub fn resolve_streaming_data(
    file_name: &str,
    blobs: &BlobMap,
    path: &str,
    offset: u64,
    size: u64,
) -> Result<Option<ByteView>> {
    let prefix = format!("archive:/{file_name}/");
    let name = path.strip_prefix(prefix.as_str()).unwrap_or(path);
    if name.is_empty() {
        return Ok(None);
    }
    let Some(blob) = blobs.get(name) else {
        debug!(path, "streaming blob not found");
        return Ok(None);
    };

    let offset = checked_usize(offset)?;
    let size = checked_usize(size)?;
    let end = offset
        .checked_add(size)
        .ok_or(Error::IntegerOverflow(size as u64))?;
    blob.slice(offset..end).map(Some)
}

fn into_map<N: ValueNode>(value: Value<N>) -> Result<Value<N>> {
    let Value::Array(ArrayValue::Elements(pairs)) = value else {
        return Ok(match value {
            Value::Array(array) if array.is_empty() => Value::Map(Vec::new()),
            other => other,
        });
    };

    pairs
        .into_iter()
        .map(|pair| {
            let Value::Struct(mut fields) = pair.into_value() else {
                return Err(Error::MissingField("map pair".into()));
            };
            let first = fields
                .swap_remove("first")
                .ok_or_else(|| Error::MissingField("map pair.first".into()))?;
            let second = fields
                .swap_remove("second")
                .ok_or_else(|| Error::MissingField("map pair.second".into()))?;
            Ok((first, second))
        })
        .collect::<Result<_>>()
        .map(Value::Map)
}
