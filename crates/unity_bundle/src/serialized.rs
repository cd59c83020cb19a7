//! Serialized files: object directories plus the type trees describing their layout.

use std::{ops::RangeInclusive, sync::Arc};

use binrw::{BinRead, Endian};
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

use crate::{
    cursor::{ByteCursor, ByteView},
    decode::ObjectDecoder,
    error::{checked_usize, checked_usize_signed, Error, Result},
    tables::class_name,
    type_tree::{read_nodes, TypeTree, TypeTreeNode},
    types::{ExtendedHeader, SerializedPrefix},
    value::{ObjectValue, PlainValue, ValueNode},
};

/// Streaming blobs of a container by entry name
pub type BlobMap = IndexMap<String, ByteView>;

/// Format versions this parser understands
pub const SUPPORTED_VERSIONS: RangeInclusive<u32> = 5..=22;

/// Class id of `MonoBehaviour`, whose type entries carry a script hash
const MONO_BEHAVIOUR: i32 = 114;

/// Sizes and byte order from a serialized file header
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SerializedHeader {
    /// Size of the metadata section
    pub metadata_size: u64,
    /// Size of the whole serialized file
    pub file_size: u64,
    /// Format revision
    pub version: u32,
    /// Offset of the object data section
    pub data_offset: u64,
    /// Byte order of everything after the header
    pub endian: Endian,
}

/// Identity of the managed class behind a reference type
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptClass {
    pub class_name: String,
    pub namespace: String,
    pub assembly: String,
}

/// One entry of the type table
#[derive(Debug, Clone, PartialEq)]
pub struct TypeClass {
    /// Engine class id, negative for script types in old files
    pub class_id: i32,
    /// Whether the type was stripped at build time (from version 16)
    pub stripped: Option<bool>,
    /// Index into the script type table (from version 17)
    pub script_type_index: Option<i16>,
    /// Hash of the script behind the type, present for script types (from version 13)
    pub script_hash: Option<[u8; 16]>,
    /// Hash of the type layout (from version 13)
    pub type_hash: Option<[u8; 16]>,
    /// Flat node list as stored
    pub nodes: Vec<TypeTreeNode>,
    /// Rebuilt hierarchy, absent when the file carries no type trees. A flat list that
    /// does not form a tree keeps the reason, reported when an object of the class is decoded.
    pub type_tree: Option<std::result::Result<TypeTree, String>>,
    /// Indices of types this one depends on (from version 21)
    pub dependencies: Vec<i32>,
    /// Managed class behind a reference type (from version 21)
    pub script_class: Option<ScriptClass>,
}

impl TypeClass {
    /// Name of the root type, falling back to the engine class name.
    pub fn type_name(&self) -> Option<&str> {
        match &self.type_tree {
            Some(Ok(tree)) => Some(tree.type_name()),
            _ => self
                .nodes
                .first()
                .map(|root| root.type_name.as_str())
                .or_else(|| class_name(self.class_id)),
        }
    }

    /// The rebuilt type tree of the class.
    pub fn tree(&self) -> Result<&TypeTree> {
        match &self.type_tree {
            Some(Ok(tree)) => Ok(tree),
            Some(Err(reason)) => Err(Error::UnimplementedSchemaCase(reason.clone())),
            None => Err(Error::MissingTypeTree {
                class_id: self.class_id,
            }),
        }
    }
}

/// How an object record refers to its type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClassRef {
    /// Index into the type table (from version 16)
    Index(i32),
    /// Type id and class id, matched against class ids of the type table (below 16)
    Legacy { type_id: i32, class_id: u16 },
}

/// One object record
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Identifier of the object, unique within the file
    pub path_id: i64,
    /// Offset of the object's bytes from the data section
    pub byte_start: u64,
    /// Length of the object's bytes
    pub byte_size: u32,
    /// Type of the object
    pub class: ClassRef,
    /// Passed through as stored (below version 11)
    pub destroyed: Option<u16>,
    /// Index into the script type table (versions 11 to 16)
    pub script_type_index: Option<i16>,
    /// Passed through as stored (versions 15 and 16)
    pub stripped: Option<u8>,
    /// The object's bytes
    pub data: ByteView,
}

/// Reference to an object in another file, by file index and local path id
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ScriptType {
    pub file_index: i32,
    pub path_id: i64,
}

/// Another serialized file objects may point into
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct External {
    /// Asset path (from version 6)
    pub path: String,
    pub guid: [u8; 16],
    pub kind: i32,
    /// Path of the referenced file
    pub path_name: String,
}

/// A parsed serialized file
///
/// Object bytes are views into the buffer the file was parsed from, so objects stay
/// decodable for as long as the file is alive.
#[derive(Debug, Clone)]
pub struct SerializedFile {
    /// Entry name inside the container
    pub name: String,
    pub header: SerializedHeader,
    /// Engine version that wrote the file (from version 7)
    pub unity_version: String,
    /// Build target platform, -1 before version 8
    pub target_platform: i32,
    pub has_type_trees: bool,
    pub classes: Vec<TypeClass>,
    /// Objects by path id, in directory order
    pub objects: IndexMap<i64, ObjectInfo>,
    pub script_types: Vec<ScriptType>,
    pub externals: Vec<External>,
    /// Reference type table (from version 20)
    pub ref_types: Vec<TypeClass>,
    pub user_information: String,
    blobs: Arc<BlobMap>,
}

impl SerializedFile {
    /// Parse a serialized file named `name`.
    ///
    /// `blobs` are the streaming blobs of the enclosing container, used when decoded
    /// objects refer to data stored outside the file. Pass an empty map for a file read on
    /// its own.
    #[instrument(skip(data, blobs), fields(len = data.len()))]
    pub fn parse(name: &str, data: ByteView, blobs: Arc<BlobMap>) -> Result<Self> {
        let mut cursor = ByteCursor::new(data.as_slice(), Endian::Big);
        let header = read_header(&mut cursor)?;
        let version = header.version;
        cursor.set_endian(header.endian);

        let unity_version = if version >= 7 {
            cursor.read_cstring()?
        } else {
            String::new()
        };
        let target_platform = if version >= 8 { cursor.read_i32()? } else { -1 };
        let has_type_trees = if version >= 13 { cursor.read_bool()? } else { true };

        let class_count = read_count(&mut cursor)?;
        let mut classes = Vec::with_capacity(class_count.min(cursor.remaining()));
        for _ in 0..class_count {
            classes.push(read_type_class(&mut cursor, version, has_type_trees, false)?);
        }
        debug!(classes = classes.len(), "read type table");

        let big_ids = match version {
            14.. => true,
            7..=13 => cursor.read_i32()? != 0,
            _ => false,
        };

        let data_offset = checked_usize(header.data_offset)?;
        let object_count = read_count(&mut cursor)?;
        let mut objects = IndexMap::with_capacity(object_count.min(cursor.remaining()));
        for _ in 0..object_count {
            let object = read_object(&mut cursor, version, big_ids, &data, data_offset)?;
            if let Some(previous) = objects.insert(object.path_id, object) {
                warn!(path_id = previous.path_id, "duplicate path id, keeping the later record");
            }
        }
        debug!(objects = objects.len(), "read object directory");

        let mut script_types = Vec::new();
        if version >= 11 {
            let count = read_count(&mut cursor)?;
            script_types.reserve(count.min(cursor.remaining()));
            for _ in 0..count {
                let file_index = cursor.read_i32()?;
                let path_id = if version >= 14 {
                    cursor.align(4);
                    cursor.read_i64()?
                } else {
                    cursor.read_i32()? as i64
                };
                script_types.push(ScriptType {
                    file_index,
                    path_id,
                });
            }
        }

        let count = read_count(&mut cursor)?;
        let mut externals = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            let path = if version >= 6 {
                cursor.read_cstring()?
            } else {
                String::new()
            };
            externals.push(External {
                path,
                guid: cursor.read_guid()?,
                kind: cursor.read_i32()?,
                path_name: cursor.read_cstring()?,
            });
        }

        let mut ref_types = Vec::new();
        if version >= 20 {
            let count = read_count(&mut cursor)?;
            ref_types.reserve(count.min(cursor.remaining()));
            for _ in 0..count {
                ref_types.push(read_type_class(&mut cursor, version, has_type_trees, true)?);
            }
        }

        let user_information = cursor.read_cstring()?;
        debug!(
            externals = externals.len(),
            script_types = script_types.len(),
            ref_types = ref_types.len(),
            "read serialized file"
        );

        Ok(Self {
            name: name.to_owned(),
            header,
            unity_version,
            target_platform,
            has_type_trees,
            classes,
            objects,
            script_types,
            externals,
            ref_types,
            user_information,
            blobs,
        })
    }

    /// Format revision of the file.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Byte order of the file's metadata and objects.
    pub fn endian(&self) -> Endian {
        self.header.endian
    }

    /// Streaming blobs available to this file.
    pub fn blobs(&self) -> &BlobMap {
        &self.blobs
    }

    /// Object by path id.
    pub fn object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.get(&path_id)
    }

    /// Type table entry of an object.
    ///
    /// Legacy records are matched by class id first, then by type id.
    pub fn class_of(&self, object: &ObjectInfo) -> Option<&TypeClass> {
        match object.class {
            ClassRef::Index(index) => usize::try_from(index)
                .ok()
                .and_then(|index| self.classes.get(index)),
            ClassRef::Legacy { type_id, class_id } => self
                .classes
                .iter()
                .find(|c| c.class_id == class_id as i32)
                .or_else(|| self.classes.iter().find(|c| c.class_id == type_id)),
        }
    }

    /// Engine class id of an object, if it can be determined.
    pub fn class_id(&self, object: &ObjectInfo) -> Option<i32> {
        match (self.class_of(object), object.class) {
            (Some(class), _) => Some(class.class_id),
            (None, ClassRef::Legacy { class_id, .. }) => Some(class_id as i32),
            (None, ClassRef::Index(_)) => None,
        }
    }

    /// Type name of an object: the root of its type tree, else the engine class name.
    ///
    /// `None` means the type is unknown.
    pub fn object_type(&self, object: &ObjectInfo) -> Option<&str> {
        self.class_of(object).and_then(TypeClass::type_name)
    }

    /// Decode an object, keeping type names and byte order on every node.
    pub fn decode(&self, object: &ObjectInfo) -> Result<ObjectValue> {
        self.decode_as(object)
    }

    /// Decode an object into plain data.
    pub fn decode_plain(&self, object: &ObjectInfo) -> Result<PlainValue> {
        self.decode_as(object)
    }

    /// Decode the object with the given path id.
    pub fn decode_by_path_id(&self, path_id: i64) -> Result<ObjectValue> {
        let object = self.object(path_id).ok_or(Error::ObjectNotFound(path_id))?;
        self.decode(object)
    }

    /// Decode the object with the given path id into plain data.
    pub fn decode_plain_by_path_id(&self, path_id: i64) -> Result<PlainValue> {
        let object = self.object(path_id).ok_or(Error::ObjectNotFound(path_id))?;
        self.decode_plain(object)
    }

    /// Decode an object into any value shape.
    #[instrument(skip_all, fields(file = %self.name, path_id = object.path_id))]
    pub fn decode_as<N: ValueNode>(&self, object: &ObjectInfo) -> Result<N> {
        let class = self.class_of(object).ok_or(Error::MissingTypeTree {
            class_id: self.class_id(object).unwrap_or(-1),
        })?;
        let tree = class.tree()?;

        let mut decoder = ObjectDecoder::new(&object.data, self.header.endian, &self.name, &self.blobs);
        let value = decoder.decode(tree)?;
        if decoder.position() != object.data.len() {
            warn!(
                consumed = decoder.position(),
                size = object.data.len(),
                "object decode did not end at the object boundary"
            );
        }
        Ok(value)
    }
}

fn read_header(cursor: &mut ByteCursor) -> Result<SerializedHeader> {
    cursor.ensure(SerializedPrefix::SIZE)?;
    let prefix = SerializedPrefix::read(cursor)?;
    let version = prefix.version;
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(Error::UnsupportedFormatVersion(version));
    }

    let mut header = SerializedHeader {
        metadata_size: prefix.metadata_size as u64,
        file_size: prefix.file_size as u64,
        version,
        data_offset: prefix.data_offset as u64,
        endian: Endian::Big,
    };

    let endian = if version >= 9 {
        let endian = cursor.read_u8()?;
        cursor.skip(3);
        endian
    } else {
        // old files keep their metadata at the end
        let start = header
            .file_size
            .checked_sub(header.metadata_size)
            .ok_or(Error::HeaderInconsistency {
                field: "metadata_size",
                header: header.metadata_size,
                extended: header.file_size,
            })?;
        cursor.seek(checked_usize(start)?);
        cursor.read_u8()?
    };
    header.endian = if endian == 0 {
        Endian::Little
    } else {
        Endian::Big
    };

    if version >= 22 {
        cursor.ensure(ExtendedHeader::SIZE)?;
        let extended = ExtendedHeader::read(cursor)?;
        header.metadata_size = reconcile(
            "metadata_size",
            header.metadata_size,
            extended.metadata_size as u64,
        )?;
        header.file_size = reconcile(
            "file_size",
            header.file_size,
            checked_usize_signed(extended.file_size)? as u64,
        )?;
        header.data_offset = reconcile(
            "data_offset",
            header.data_offset,
            checked_usize_signed(extended.data_offset)? as u64,
        )?;
    }

    debug!(?header, "read serialized file header");
    Ok(header)
}

/// Pick the authoritative value of a header field stored twice.
///
/// A zero in the 32-bit header defers to the extended copy; any other disagreement is an
/// error.
fn reconcile(field: &'static str, header: u64, extended: u64) -> Result<u64> {
    match header {
        0 => Ok(extended),
        value if value == extended => Ok(value),
        _ => Err(Error::HeaderInconsistency {
            field,
            header,
            extended,
        }),
    }
}

fn read_count(cursor: &mut ByteCursor) -> Result<usize> {
    checked_usize_signed(cursor.read_i32()? as i64)
}

fn read_type_class(
    cursor: &mut ByteCursor,
    version: u32,
    has_type_trees: bool,
    is_ref_type: bool,
) -> Result<TypeClass> {
    let class_id = cursor.read_i32()?;
    let stripped = if version >= 16 {
        Some(cursor.read_bool()?)
    } else {
        None
    };
    let script_type_index = if version >= 17 {
        Some(cursor.read_i16()?)
    } else {
        None
    };

    let (script_hash, type_hash) = if version >= 13 {
        let has_script_hash = (is_ref_type && script_type_index.is_some_and(|i| i >= 0))
            || (version < 16 && class_id < 0)
            || (version >= 16 && class_id == MONO_BEHAVIOUR);
        let script_hash = if has_script_hash {
            Some(cursor.read_guid()?)
        } else {
            None
        };
        (script_hash, Some(cursor.read_guid()?))
    } else {
        (None, None)
    };

    let nodes = if has_type_trees {
        read_nodes(cursor, version)?
    } else {
        Vec::new()
    };

    let mut dependencies = Vec::new();
    let mut script_class = None;
    if has_type_trees && version >= 21 {
        if is_ref_type {
            script_class = Some(ScriptClass {
                class_name: cursor.read_cstring()?,
                namespace: cursor.read_cstring()?,
                assembly: cursor.read_cstring()?,
            });
        } else {
            let count = read_count(cursor)?;
            dependencies.reserve(count.min(cursor.remaining() / 4));
            for _ in 0..count {
                dependencies.push(cursor.read_i32()?);
            }
        }
    }

    let type_tree = if nodes.is_empty() {
        None
    } else {
        Some(TypeTree::from_nodes(&nodes).map_err(|err| {
            warn!(class_id, %err, "type tree does not form a hierarchy");
            match err {
                Error::UnimplementedSchemaCase(reason) => reason,
                other => other.to_string(),
            }
        }))
    };

    Ok(TypeClass {
        class_id,
        stripped,
        script_type_index,
        script_hash,
        type_hash,
        nodes,
        type_tree,
        dependencies,
        script_class,
    })
}

fn read_object(
    cursor: &mut ByteCursor,
    version: u32,
    big_ids: bool,
    data: &ByteView,
    data_offset: usize,
) -> Result<ObjectInfo> {
    if version >= 14 {
        cursor.align(4);
    }
    let path_id = if big_ids {
        cursor.read_i64()?
    } else {
        cursor.read_i32()? as i64
    };
    let byte_start = if version >= 22 {
        checked_usize_signed(cursor.read_i64()?)? as u64
    } else {
        cursor.read_u32()? as u64
    };
    let byte_size = cursor.read_u32()?;
    let type_id = cursor.read_i32()?;

    let class = if version >= 16 {
        ClassRef::Index(type_id)
    } else {
        ClassRef::Legacy {
            type_id,
            class_id: cursor.read_u16()?,
        }
    };
    let destroyed = if version < 11 {
        Some(cursor.read_u16()?)
    } else {
        None
    };
    let script_type_index = if (11..17).contains(&version) {
        Some(cursor.read_i16()?)
    } else {
        None
    };
    let stripped = if version == 15 || version == 16 {
        Some(cursor.read_u8()?)
    } else {
        None
    };

    let start = data_offset
        .checked_add(checked_usize(byte_start)?)
        .ok_or(Error::IntegerOverflow(byte_start))?;
    let end = start
        .checked_add(byte_size as usize)
        .ok_or(Error::IntegerOverflow(byte_start))?;

    Ok(ObjectInfo {
        path_id,
        byte_start,
        byte_size,
        class,
        destroyed,
        script_type_index,
        stripped,
        data: data.slice(start..end)?,
    })
}
