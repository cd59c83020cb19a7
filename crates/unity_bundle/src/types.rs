//! Fixed-layout records of containers and serialized file headers.

use binrw::{BinRead, NullString};

/// Header common to every container signature
///
/// All container headers are big endian, regardless of the byte order of the serialized
/// files inside.
#[derive(BinRead, Debug, Clone, PartialEq)]
#[br(big)]
pub struct ContainerHeader {
    /// `UnityFS` or `UnityRaw`
    #[br(map = |s: NullString| s.to_string())]
    pub signature: String,

    /// Container format revision
    pub format: u32,

    /// Engine version string, e.g. `5.x.x`
    #[br(map = |s: NullString| s.to_string())]
    pub unity_version: String,

    /// Engine build that wrote the container, e.g. `2019.4.1f1`
    #[br(map = |s: NullString| s.to_string())]
    pub generator_version: String,
}

/// Modern (`UnityFS`) header fields following [`ContainerHeader`]
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct ArchiveHeader {
    /// Total size of the container file
    pub size: i64,

    /// Size of the info block as stored
    pub compressed_info_size: u32,

    /// Size of the info block after decompression
    pub uncompressed_info_size: u32,

    /// Bits 0-5 select the info block compression; see [`ArchiveFlags`](crate::bundle::ArchiveFlags)
    pub flags: u32,
}

/// Legacy (`UnityRaw`) header fields following [`ContainerHeader`]
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct RawHeader {
    /// Total size of the container file
    pub file_size: u32,

    /// Offset of the entry table from the start of the file
    pub header_size: u32,
}

/// One compressed segment of a modern container's payload
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct StorageBlock {
    /// Size of the block after decompression
    pub uncompressed_size: u32,

    /// Size of the block as stored
    pub compressed_size: u32,

    /// Bits 0-5 select the compression method
    pub flags: u16,
}

/// One named entry of a modern container's payload
#[derive(BinRead, Debug, Clone, PartialEq)]
#[br(big)]
pub struct DirectoryNode {
    /// Offset into the decompressed payload
    pub offset: i64,

    /// Length in the decompressed payload
    pub size: i64,

    /// Bit 0x4 marks a serialized file
    pub flags: u32,

    /// Entry name, e.g. `CAB-0123abcd` or `CAB-0123abcd.resS`
    #[br(map = |s: NullString| s.to_string())]
    pub path: String,
}

/// Decompressed info block of a modern container
#[derive(BinRead, Debug, Clone, PartialEq)]
#[br(big)]
pub struct BlocksInfo {
    /// Content hash of the payload, not verified
    pub hash: [u8; 16],

    /// Number of storage blocks
    pub block_count: u32,

    /// Storage blocks in payload order
    #[br(count = block_count)]
    pub blocks: Vec<StorageBlock>,

    /// Number of directory nodes
    pub node_count: u32,

    /// Directory nodes in declaration order
    #[br(count = node_count)]
    pub nodes: Vec<DirectoryNode>,
}

/// The four 32-bit fields every serialized file starts with, always big endian
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct SerializedPrefix {
    /// Size of the metadata section
    pub metadata_size: u32,

    /// Size of the whole serialized file
    pub file_size: u32,

    /// Format revision that drives every later branch
    pub version: u32,

    /// Offset of the object data section
    pub data_offset: u32,
}

impl SerializedPrefix {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;
}

/// Wide copies of the header sizes carried from format version 22
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(big)]
pub struct ExtendedHeader {
    /// Size of the metadata section
    pub metadata_size: u32,

    /// Size of the whole serialized file
    pub file_size: i64,

    /// Offset of the object data section
    pub data_offset: i64,

    /// Unused
    pub unknown: i64,
}

impl ExtendedHeader {
    /// Encoded size in bytes
    pub const SIZE: usize = 28;
}
