//! Container unpacking: signatures, block decompression and entry splitting.

use std::{
    io::{Cursor, Read},
    sync::Arc,
};

use binrw::{BinRead, Endian};
use tracing::{debug, instrument, warn};

use crate::{
    compression::{decompress, CompressionMethod},
    cursor::{ByteCursor, ByteView},
    error::{checked_usize, checked_usize_signed, Error, Result},
    serialized::{BlobMap, SerializedFile},
    types::{ArchiveHeader, BlocksInfo, ContainerHeader, RawHeader, StorageBlock},
};

/// Signature of modern block-compressed containers
pub const UNITY_FS: &str = "UnityFS";

/// Signature of legacy uncompressed containers
pub const UNITY_RAW: &str = "UnityRaw";

/// Directory node flag marking a serialized file
pub const SERIALIZED_FILE_FLAG: u32 = 0x4;

/// Flag bits of [`ArchiveHeader::flags`] beyond the compression method
pub struct ArchiveFlags;

impl ArchiveFlags {
    /// The info block is stored at the end of the file instead of after the header
    pub const INFO_AT_END: u32 = 0x80;

    /// Block data starts at the next 16-byte boundary after the info block
    pub const INFO_PADDED: u32 = 0x200;
}

/// What a container entry holds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A serialized file with objects and type trees
    SerializedFile,
    /// Raw bytes referenced from objects through `StreamingInfo`
    Blob,
}

/// One named entry of a container
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    /// Offset into the payload
    pub offset: usize,
    pub size: usize,
    /// Flags as stored, 0 for legacy containers
    pub flags: u32,
    pub kind: EntryKind,
}

/// An unpacked container
///
/// A serialized file entry that fails to parse does not fail the container; it is listed
/// in [`Bundle::failures`] and the other entries stay readable.
///
/// ```no_run
/// fn list_objects(path: &str) -> unity_bundle::error::Result<()> {
///     let bundle = unity_bundle::Bundle::from_reader(std::fs::File::open(path)?)?;
///
///     for file in bundle.files() {
///         for object in file.objects.values() {
///             println!("{} {:?}", object.path_id, file.object_type(object));
///         }
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Bundle {
    pub header: ContainerHeader,
    /// Storage blocks of a modern container, empty for legacy ones
    pub blocks: Vec<StorageBlock>,
    pub entries: Vec<Entry>,
    payload: ByteView,
    files: Vec<SerializedFile>,
    failures: Vec<(String, Error)>,
    blobs: Arc<BlobMap>,
}

impl Bundle {
    /// Unpack a container from a byte slice.
    pub fn new(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data.to_vec())
    }

    /// Unpack a container, taking ownership of its bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::parse(ByteView::new(data))
    }

    /// Read a whole container from `reader` and unpack it.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    #[instrument(skip_all, fields(len = data.len()))]
    fn parse(data: ByteView) -> Result<Self> {
        let mut cursor = ByteCursor::new(data.as_slice(), Endian::Big);
        let header = ContainerHeader::read(&mut cursor)?;
        debug!(
            signature = %header.signature,
            format = header.format,
            generator = %header.generator_version,
            "read container header"
        );

        let (blocks, payload, entries) = match header.signature.as_str() {
            UNITY_FS => read_unity_fs(&mut cursor, &header)?,
            UNITY_RAW => read_unity_raw(&mut cursor, &data)?,
            other => return Err(Error::UnknownContainerSignature(other.to_owned())),
        };

        let mut blobs = BlobMap::new();
        for entry in entries.iter().filter(|e| e.kind == EntryKind::Blob) {
            blobs.insert(entry.name.clone(), entry_view(&payload, entry)?);
        }
        let blobs = Arc::new(blobs);

        let mut files = Vec::new();
        let mut failures = Vec::new();
        for entry in entries.iter().filter(|e| e.kind == EntryKind::SerializedFile) {
            let parsed = entry_view(&payload, entry)
                .and_then(|view| SerializedFile::parse(&entry.name, view, blobs.clone()));
            match parsed {
                Ok(file) => files.push(file),
                Err(err) => {
                    warn!(entry = %entry.name, %err, "skipping unreadable serialized file");
                    failures.push((entry.name.clone(), err));
                }
            }
        }
        debug!(
            files = files.len(),
            failures = failures.len(),
            blobs = blobs.len(),
            "unpacked container"
        );

        Ok(Self {
            header,
            blocks,
            entries,
            payload,
            files,
            failures,
            blobs,
        })
    }

    /// Container signature.
    pub fn signature(&self) -> &str {
        &self.header.signature
    }

    /// Container format revision.
    pub fn format(&self) -> u32 {
        self.header.format
    }

    /// The decompressed payload all entries are views into.
    pub fn payload(&self) -> &ByteView {
        &self.payload
    }

    /// Serialized files in declaration order.
    pub fn files(&self) -> &[SerializedFile] {
        &self.files
    }

    /// Serialized file entries that could not be parsed, with the reason.
    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    /// Streaming blobs by name, in declaration order.
    pub fn blobs(&self) -> &BlobMap {
        &self.blobs
    }

    /// Serialized file by entry name.
    pub fn file(&self, name: &str) -> Option<&SerializedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Streaming blob by entry name.
    pub fn blob(&self, name: &str) -> Option<&ByteView> {
        self.blobs.get(name)
    }

    /// Entry by name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

fn entry_view(payload: &ByteView, entry: &Entry) -> Result<ByteView> {
    let end = entry
        .offset
        .checked_add(entry.size)
        .ok_or(Error::IntegerOverflow(entry.size as u64))?;
    payload.slice(entry.offset..end)
}

/// Read the info block, reassemble the storage blocks and validate the node table.
///
/// A payload whose length differs from the sum of the declared block sizes is only logged:
/// blocks passed through with an unknown compression flag cannot be sized. Every node must
/// still fit inside the payload that was actually produced.
fn read_unity_fs(
    cursor: &mut ByteCursor,
    header: &ContainerHeader,
) -> Result<(Vec<StorageBlock>, ByteView, Vec<Entry>)> {
    let archive = ArchiveHeader::read(cursor)?;
    if header.format >= 7 {
        cursor.align(16);
    }

    let compressed_size = archive.compressed_info_size as usize;
    let info = if archive.flags & ArchiveFlags::INFO_AT_END != 0 {
        let start = cursor
            .len()
            .checked_sub(compressed_size)
            .ok_or(Error::OutOfBounds {
                position: 0,
                needed: compressed_size,
                len: cursor.len(),
            })?;
        let mut tail = cursor.sub_cursor(start..cursor.len())?;
        tail.read_bytes(compressed_size)?
    } else {
        cursor.read_bytes(compressed_size)?
    };
    let info = decompress(
        info,
        archive.uncompressed_info_size as usize,
        CompressionMethod::from(archive.flags),
    )?;
    let info = BlocksInfo::read(&mut Cursor::new(&*info))?;
    if archive.flags & ArchiveFlags::INFO_PADDED != 0 {
        cursor.align(16);
    }
    debug!(
        blocks = info.blocks.len(),
        nodes = info.nodes.len(),
        "read blocks info"
    );

    let total = info
        .blocks
        .iter()
        .try_fold(0usize, |total, block| {
            total.checked_add(block.uncompressed_size as usize)
        })
        .ok_or(Error::IntegerOverflow(u64::MAX))?;

    let mut payload = Vec::with_capacity(total);
    for block in &info.blocks {
        let data = cursor.read_bytes(block.compressed_size as usize)?;
        let data = decompress(
            data,
            block.uncompressed_size as usize,
            CompressionMethod::from(block.flags),
        )?;
        payload.extend_from_slice(&data);
    }
    if payload.len() != total {
        warn!(
            expected = total,
            actual = payload.len(),
            "payload size differs from the sum of block sizes"
        );
    }
    let payload = ByteView::new(payload);

    let entries = info
        .nodes
        .into_iter()
        .map(|node| {
            let entry = Entry {
                offset: checked_usize_signed(node.offset)?,
                size: checked_usize_signed(node.size)?,
                kind: if node.flags & SERIALIZED_FILE_FLAG != 0 {
                    EntryKind::SerializedFile
                } else {
                    EntryKind::Blob
                },
                flags: node.flags,
                name: node.path,
            };
            entry_view(&payload, &entry)?;
            Ok(entry)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((info.blocks, payload, entries))
}

fn read_unity_raw(
    cursor: &mut ByteCursor,
    data: &ByteView,
) -> Result<(Vec<StorageBlock>, ByteView, Vec<Entry>)> {
    let raw = RawHeader::read(cursor)?;
    cursor.seek(checked_usize(raw.header_size as u64)?);

    let count = cursor.read_u32()? as usize;
    let mut entries = Vec::with_capacity(count.min(cursor.remaining()));
    for _ in 0..count {
        let start = cursor.position();
        let name = cursor.read_cstring()?;
        let header_size = cursor.read_u32()? as usize;
        let size = cursor.read_u32()? as usize;

        let offset = (start + header_size)
            .checked_sub(4)
            .ok_or(Error::OutOfBounds {
                position: start,
                needed: 4,
                len: cursor.len(),
            })?;
        cursor.seek(offset);
        cursor.read_bytes(size)?;

        entries.push(Entry {
            name,
            offset,
            size,
            flags: 0,
            kind: EntryKind::SerializedFile,
        });
    }
    debug!(entries = entries.len(), "read legacy entry table");

    Ok((Vec::new(), data.clone(), entries))
}
