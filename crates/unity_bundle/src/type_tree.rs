//! Type trees: the schemas describing the byte layout of each object class.
//!
//! A serialized file stores every schema as a flat, depth-tagged node list. [`read_nodes`]
//! parses that list in either of its two encodings and [`TypeTree::from_nodes`] rebuilds
//! the hierarchy the object decoder walks.

#[cfg(feature = "serde")]
use serde::Serialize;
use tracing::warn;

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    tables::{common_string, COMMON_STRING_FLAG},
};

/// Flag bit requesting a 4-byte alignment of the cursor after the node's value.
pub const ALIGN_FLAG: u32 = 0x4000;

/// One entry of a flat type tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeTreeNode {
    /// Version tag of the described type
    pub version: i32,
    /// Nesting depth, 0 for the root
    pub depth: u8,
    /// Whether this node is an array (children "size" and "data")
    pub is_array: bool,
    /// Resolved type name
    pub type_name: String,
    /// Resolved field name
    pub name: String,
    /// Fixed byte size, or -1 when variable-length
    pub size: i32,
    /// Position of the node in the original list
    pub index: i32,
    /// Flag bitmask, see [`ALIGN_FLAG`]
    pub flags: u32,
    /// Type hash carried by each node from format version 19
    pub ref_type_hash: Option<u64>,
}

impl TypeTreeNode {
    /// Whether the cursor is aligned to 4 bytes after this node's value.
    pub fn is_aligned(&self) -> bool {
        self.flags & ALIGN_FLAG != 0
    }
}

/// Read the flat node list of one class in the encoding used by `version`.
pub fn read_nodes(cursor: &mut ByteCursor, version: u32) -> Result<Vec<TypeTreeNode>> {
    if version >= 12 || version == 10 {
        read_blob(cursor, version)
    } else {
        let mut nodes = Vec::new();
        read_legacy(cursor, 0, &mut nodes)?;
        Ok(nodes)
    }
}

fn read_blob(cursor: &mut ByteCursor, version: u32) -> Result<Vec<TypeTreeNode>> {
    let node_count = cursor.read_u32()? as usize;
    let string_size = cursor.read_u32()? as usize;

    let mut raw = Vec::with_capacity(node_count.min(cursor.remaining() / 24));
    for index in 0..node_count {
        let version_tag = cursor.read_u16()?;
        let depth = cursor.read_u8()?;
        let is_array = cursor.read_u8()? != 0;
        let type_offset = cursor.read_u32()?;
        let name_offset = cursor.read_u32()?;
        let size = cursor.read_i32()?;
        let node_index = cursor.read_i32()?;
        let flags = cursor.read_u32()?;
        let ref_type_hash = if version >= 19 {
            Some(cursor.read_u64()?)
        } else {
            None
        };
        raw.push((
            TypeTreeNode {
                version: version_tag as i32,
                depth,
                is_array,
                type_name: String::new(),
                name: String::new(),
                size,
                index: if version >= 12 { node_index } else { index as i32 },
                flags,
                ref_type_hash,
            },
            type_offset,
            name_offset,
        ));
    }

    let strings = cursor.read_bytes(string_size)?;
    raw.into_iter()
        .map(|(mut node, type_offset, name_offset)| {
            node.type_name = resolve_string(strings, type_offset)?;
            node.name = resolve_string(strings, name_offset)?;
            Ok(node)
        })
        .collect()
}

fn resolve_string(local: &[u8], offset: u32) -> Result<String> {
    if offset & COMMON_STRING_FLAG != 0 {
        let key = offset & !COMMON_STRING_FLAG;
        return Ok(match common_string(key) {
            Some(name) => name.to_owned(),
            None => {
                warn!(offset = key, "unknown common string offset");
                key.to_string()
            }
        });
    }

    let mut strings = ByteCursor::new(local, binrw::Endian::Little);
    strings.seek(offset as usize);
    strings.read_cstring()
}

fn read_legacy(cursor: &mut ByteCursor, depth: usize, nodes: &mut Vec<TypeTreeNode>) -> Result<()> {
    let depth_tag = u8::try_from(depth).map_err(|_| {
        Error::UnimplementedSchemaCase(format!("type tree nested {depth} levels deep"))
    })?;

    let type_name = cursor.read_cstring()?;
    let name = cursor.read_cstring()?;
    let size = cursor.read_i32()?;
    let index = cursor.read_i32()?;
    let is_array = cursor.read_i32()? != 0;
    let version = cursor.read_i32()?;
    let flags = cursor.read_u32()?;
    nodes.push(TypeTreeNode {
        version,
        depth: depth_tag,
        is_array,
        type_name,
        name,
        size,
        index,
        flags,
        ref_type_hash: None,
    });

    let children = cursor.read_u32()?;
    for _ in 0..children {
        read_legacy(cursor, depth + 1, nodes)?;
    }
    Ok(())
}

/// Hierarchical type tree node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeTree {
    /// The node itself
    pub node: TypeTreeNode,
    /// Child nodes in declaration order
    pub children: Vec<TypeTree>,
}

impl TypeTree {
    fn leaf(node: TypeTreeNode) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Rebuild the hierarchy from a flat list.
    ///
    /// A node at depth `d` becomes the last child of the most recent node at depth `d - 1`.
    pub fn from_nodes(nodes: &[TypeTreeNode]) -> Result<TypeTree> {
        let mut stack: Vec<TypeTree> = Vec::new();
        let mut root = None;

        for node in nodes {
            let depth = node.depth as usize;
            if depth > stack.len() {
                return Err(Error::UnimplementedSchemaCase(format!(
                    "node {} at depth {depth} has no parent at depth {}",
                    node.name,
                    depth - 1
                )));
            }
            close_levels(&mut stack, &mut root, depth)?;
            stack.push(TypeTree::leaf(node.clone()));
        }
        close_levels(&mut stack, &mut root, 0)?;

        root.ok_or_else(|| Error::UnimplementedSchemaCase("empty type tree".into()))
    }

    /// Field name of the node.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Type name of the node.
    pub fn type_name(&self) -> &str {
        &self.node.type_name
    }

    /// The schema node itself.
    pub fn root(&self) -> &TypeTreeNode {
        &self.node
    }

    /// Direct children in declaration order.
    pub fn children(&self) -> &[TypeTree] {
        &self.children
    }

    /// First direct child with the given field name.
    pub fn child(&self, name: &str) -> Option<&TypeTree> {
        self.children.iter().find(|c| c.node.name == name)
    }

    /// Walk the tree depth-first in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeTree> + '_ {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let next = pending.pop()?;
            pending.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

fn close_levels(stack: &mut Vec<TypeTree>, root: &mut Option<TypeTree>, depth: usize) -> Result<()> {
    while stack.len() > depth {
        let Some(done) = stack.pop() else { break };
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None if root.is_none() => *root = Some(done),
            None => {
                return Err(Error::UnimplementedSchemaCase(
                    "type tree with more than one root".into(),
                ))
            }
        }
    }
    Ok(())
}
