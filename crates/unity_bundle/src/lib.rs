//! This library unpacks **asset bundles** built by the *Unity* engine and decodes the objects inside
//! them without the engine runtime.
//!
//! # Asset Bundle Format Documentation
//!
//! An asset bundle is a container holding one or more **serialized files** plus raw
//! **streaming blobs** (`.resS`, `.resource`) that large objects such as textures refer to.
//! Serialized files carry a table of type trees, schemas describing the byte layout of every
//! object class, followed by a directory of objects.
//!
//! ## Container
//!
//! Every container starts with the same big-endian prefix:
//!
//! | Field                  | Description                                             |
//! |------------------------|---------------------------------------------------------|
//! | Signature              | zero-terminated: `UnityFS` or `UnityRaw`                |
//! | Format                 | 4 bytes: container revision                             |
//! | Unity Version          | zero-terminated, e.g. `5.x.x`                           |
//! | Generator Version      | zero-terminated, e.g. `2019.4.1f1`                      |
//!
//! ### UnityFS
//!
//! | Field                  | Description                                             |
//! |------------------------|---------------------------------------------------------|
//! | File Size              | 8 bytes                                                 |
//! | Compressed Info Size   | 4 bytes: size of the info block as stored               |
//! | Uncompressed Info Size | 4 bytes                                                 |
//! | Flags                  | 4 bytes: see below                                      |
//!
//! From format 7 the info block starts at the next 16-byte boundary. The flags word selects:
//!
//! - bits 0-5: info block compression, `0` none, `2` and `3` LZ4. Other methods are logged
//!   and passed through as they are.
//! - `0x80`: the info block is stored at the end of the file.
//! - `0x200`: block data starts at the next 16-byte boundary after the info block.
//!
//! The decompressed info block holds a 16-byte hash, the storage blocks
//! (`u32` uncompressed size, `u32` compressed size, `u16` flags) and the directory nodes
//! (`i64` offset, `i64` size, `u32` flags, zero-terminated name). The blocks decompress back to
//! back into one payload; each node names a range of it. Nodes with flag `0x4` are serialized
//! files, all others are streaming blobs.
//!
//! ### UnityRaw
//!
//! Uncompressed legacy containers store a file size and header size, then at the header size
//! an entry count followed by entries of name, header size and size.
//!
//! ## Serialized File
//!
//! | Offset (bytes) | Field          | Description                                            |
//! |----------------|----------------|--------------------------------------------------------|
//! | 0x0000         | Metadata Size  | 4 bytes, big endian                                    |
//! | 0x0004         | File Size      | 4 bytes, big endian                                    |
//! | 0x0008         | Version        | 4 bytes, big endian: drives every later field          |
//! | 0x000C         | Data Offset    | 4 bytes, big endian                                    |
//! | 0x0010         | Endianness     | 1 byte, `0` little endian (version 9 and later)        |
//!
//! Version 22 repeats the sizes in 64-bit form. Everything after the header uses the file's
//! byte order. Fields appear and disappear by version; [`serialized`] documents each one
//! where it is read. Versions 5 to 22 are supported.
//!
//! ## Type Trees
//!
//! A type tree is a flat list of nodes tagged with their depth. Nodes name a field, its type,
//! a fixed size (or `-1` when variable) and flags; flag `0x4000` aligns the reader to 4 bytes
//! after the field's value. Names are either stored locally or refer to a shared table of
//! common strings. [`decode`] walks a rebuilt tree and the object's bytes in lockstep.
//!

pub mod bundle;
pub mod compression;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod serialized;
pub mod tables;
pub mod type_tree;
pub mod types;
pub mod value;

pub use binrw::Endian;
pub use bundle::Bundle;
pub use compression::CompressionMethod;
pub use cursor::{ByteCursor, ByteView};
pub use serialized::{BlobMap, ObjectInfo, SerializedFile};
pub use type_tree::{TypeTree, TypeTreeNode};
pub use value::{ArrayValue, ObjectValue, PlainValue, Value, ValueNode};
