//! Builders for synthetic containers and serialized files.

#![allow(dead_code)]

/// Byte sink with a switchable byte order
pub struct Writer {
    pub buf: Vec<u8>,
    pub big: bool,
}

impl Writer {
    pub fn new(big: bool) -> Self {
        Self {
            buf: Vec::new(),
            big,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let bytes = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.u16(v as u16)
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let bytes = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        let bytes = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.u64(v as u64)
    }

    pub fn cstr(&mut self, v: &str) -> &mut Self {
        self.buf.extend_from_slice(v.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(v);
        self
    }

    pub fn align(&mut self, size: usize) -> &mut Self {
        while self.buf.len() % size != 0 {
            self.buf.push(0);
        }
        self
    }
}

/// One flat type tree node
#[derive(Clone, Copy)]
pub struct Node {
    pub depth: u8,
    pub is_array: bool,
    pub type_name: &'static str,
    pub name: &'static str,
    pub size: i32,
    pub flags: u32,
}

pub fn node(depth: u8, type_name: &'static str, name: &'static str, size: i32) -> Node {
    Node {
        depth,
        is_array: false,
        type_name,
        name,
        size,
        flags: 0,
    }
}

impl Node {
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    pub fn aligned(mut self) -> Self {
        self.flags |= 0x4000;
        self
    }
}

/// Nodes of a `string` field named `name` at `depth`
pub fn string_nodes(depth: u8, name: &'static str) -> Vec<Node> {
    vec![
        node(depth, "string", name, -1).aligned(),
        node(depth + 1, "Array", "Array", -1).array(),
        node(depth + 2, "int", "size", 4),
        node(depth + 2, "char", "data", 1),
    ]
}

/// A `TextAsset`-like schema: `m_Name` string plus a `m_Script` byte array
pub fn text_asset_nodes() -> Vec<Node> {
    let mut nodes = vec![node(0, "TextAsset", "Base", -1)];
    nodes.extend(string_nodes(1, "m_Name"));
    nodes.extend([
        node(1, "vector", "m_Script", -1).aligned(),
        node(2, "Array", "Array", -1).array(),
        node(3, "int", "size", 4),
        node(3, "UInt8", "data", 1),
        node(1, "int", "m_Count", 4),
    ]);
    nodes
}

/// Bytes of a [`text_asset_nodes`] object
pub fn text_asset_bytes(name: &str, script: &[u8], count: i32) -> Vec<u8> {
    let mut w = Writer::new(false);
    w.u32(name.len() as u32).bytes(name.as_bytes()).align(4);
    w.u32(script.len() as u32).bytes(script).align(4);
    w.i32(count);
    w.buf
}

/// A texture-like schema whose pixels live in a streaming blob
pub fn streamed_nodes() -> Vec<Node> {
    let mut nodes = vec![node(0, "Texture2D", "Base", -1)];
    nodes.extend(string_nodes(1, "m_Name"));
    nodes.extend([
        node(1, "StreamingInfo", "m_StreamData", -1),
        node(2, "unsigned int", "offset", 4),
        node(2, "unsigned int", "size", 4),
    ]);
    nodes.extend(string_nodes(2, "path"));
    nodes
}

/// Bytes of a [`streamed_nodes`] object
pub fn streamed_bytes(name: &str, offset: u32, size: u32, path: &str) -> Vec<u8> {
    let mut w = Writer::new(false);
    w.u32(name.len() as u32).bytes(name.as_bytes()).align(4);
    w.u32(offset).u32(size);
    w.u32(path.len() as u32).bytes(path.as_bytes()).align(4);
    w.buf
}

pub struct Class {
    pub class_id: i32,
    pub nodes: Vec<Node>,
}

pub struct Object {
    pub path_id: i64,
    pub class_index: usize,
    pub data: Vec<u8>,
}

/// Writes serialized files of any supported version with little-endian metadata
pub struct SerializedBuilder {
    pub version: u32,
    pub big_endian: bool,
    pub has_type_trees: bool,
    pub classes: Vec<Class>,
    pub objects: Vec<Object>,
    /// Overrides of the 32-bit header sizes (metadata, file, data offset)
    pub prefix: Option<(u32, u32, u32)>,
    /// Overrides of the extended header sizes of version 22
    pub extended: Option<(u32, i64, i64)>,
}

impl SerializedBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            big_endian: false,
            has_type_trees: true,
            classes: Vec::new(),
            objects: Vec::new(),
            prefix: None,
            extended: None,
        }
    }

    pub fn class(mut self, class_id: i32, nodes: Vec<Node>) -> Self {
        self.classes.push(Class { class_id, nodes });
        self
    }

    pub fn object(mut self, path_id: i64, class_index: usize, data: Vec<u8>) -> Self {
        self.objects.push(Object {
            path_id,
            class_index,
            data,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let v = self.version;
        let header_len = match v {
            22.. => 48,
            9.. => 20,
            _ => 16,
        };

        let metadata_end = header_len + self.metadata(header_len).len();
        let data_offset = (metadata_end + 15) / 16 * 16;

        let mut data = Writer::new(self.big_endian);
        let mut starts = Vec::new();
        for object in &self.objects {
            data.align(8);
            starts.push(data.len());
            data.bytes(&object.data);
        }
        // object offsets are only known after the data is laid out
        let metadata = self.metadata_with_offsets(header_len, &starts);
        let file_size = data_offset + data.len();
        // before version 9 the byte order sits at file_size - metadata_size
        let metadata_size = if v < 9 {
            file_size - header_len
        } else {
            metadata.len()
        };

        let mut w = Writer::new(true);
        if v >= 22 {
            let (m, f, d) = self.prefix.unwrap_or((0, 0, 0));
            w.u32(m).u32(f).u32(v).u32(d);
            w.u8(if self.big_endian { 1 } else { 0 }).bytes(&[0, 0, 0]);
            let (m, f, d) = self.extended.unwrap_or((
                metadata_size as u32,
                file_size as i64,
                data_offset as i64,
            ));
            w.u32(m).i64(f).i64(d).i64(0);
        } else {
            let (m, f, d) = self.prefix.unwrap_or((
                metadata_size as u32,
                file_size as u32,
                data_offset as u32,
            ));
            w.u32(m).u32(f).u32(v).u32(d);
            if v >= 9 {
                w.u8(if self.big_endian { 1 } else { 0 }).bytes(&[0, 0, 0]);
            }
        }
        w.bytes(&metadata);
        w.align(16);
        w.bytes(&data.buf);
        w.buf
    }

    fn metadata(&self, header_len: usize) -> Vec<u8> {
        let starts = vec![0; self.objects.len()];
        self.metadata_with_offsets(header_len, &starts)
    }

    fn metadata_with_offsets(&self, header_len: usize, starts: &[usize]) -> Vec<u8> {
        let v = self.version;
        // alignment inside the metadata is relative to the start of the file
        let mut w = Writer::new(self.big_endian);
        w.bytes(&vec![0; header_len]);
        if v < 9 {
            w.u8(if self.big_endian { 1 } else { 0 });
        }

        if v >= 7 {
            w.cstr("2019.4.0f1");
        }
        if v >= 8 {
            w.i32(5);
        }
        if v >= 13 {
            w.u8(self.has_type_trees as u8);
        }

        w.i32(self.classes.len() as i32);
        for class in &self.classes {
            w.i32(class.class_id);
            if v >= 16 {
                w.u8(0);
            }
            if v >= 17 {
                w.i16(-1);
            }
            if v >= 13 {
                if (v < 16 && class.class_id < 0) || (v >= 16 && class.class_id == 114) {
                    w.bytes(&[0xAB; 16]);
                }
                w.bytes(&[0xCD; 16]);
            }
            if self.has_type_trees {
                if v >= 12 || v == 10 {
                    write_blob(&mut w, &class.nodes, v);
                } else {
                    write_legacy(&mut w, &class.nodes);
                }
                if v >= 21 {
                    w.i32(1).i32(0);
                }
            }
        }

        if (7..14).contains(&v) {
            w.i32(0);
        }
        w.i32(self.objects.len() as i32);
        for (object, start) in self.objects.iter().zip(starts) {
            if v >= 14 {
                w.align(4);
            }
            if v >= 14 {
                w.i64(object.path_id);
            } else {
                w.i32(object.path_id as i32);
            }
            if v >= 22 {
                w.i64(*start as i64);
            } else {
                w.u32(*start as u32);
            }
            w.u32(object.data.len() as u32);
            let class_id = self.classes[object.class_index].class_id;
            if v >= 16 {
                w.i32(object.class_index as i32);
            } else {
                w.i32(class_id).u16(class_id as u16);
            }
            if v < 11 {
                w.u16(0);
            }
            if (11..17).contains(&v) {
                w.i16(-1);
            }
            if v == 15 || v == 16 {
                w.u8(0);
            }
        }

        if v >= 11 {
            w.i32(1).i32(0);
            if v >= 14 {
                w.align(4).i64(42);
            } else {
                w.i32(42);
            }
        }

        w.i32(1);
        if v >= 6 {
            w.cstr("");
        }
        w.bytes(&[0x11; 16]).i32(0).cstr("library/unity default resources");

        if v >= 20 {
            w.i32(0);
        }
        w.cstr("");

        w.buf.split_off(header_len)
    }
}

fn write_blob(w: &mut Writer, nodes: &[Node], version: u32) {
    let mut strings = Vec::new();
    let mut offset_of = |s: &str| -> u32 {
        let offset = strings.len() as u32;
        strings.extend_from_slice(s.as_bytes());
        strings.push(0);
        offset
    };
    let offsets = nodes
        .iter()
        .map(|n| (offset_of(n.type_name), offset_of(n.name)))
        .collect::<Vec<_>>();

    w.u32(nodes.len() as u32).u32(strings.len() as u32);
    for (index, (n, (type_offset, name_offset))) in nodes.iter().zip(offsets).enumerate() {
        w.u16(1).u8(n.depth).u8(n.is_array as u8);
        w.u32(type_offset).u32(name_offset);
        w.i32(n.size).i32(index as i32).u32(n.flags);
        if version >= 19 {
            w.u64(0);
        }
    }
    w.bytes(&strings);
}

fn write_legacy(w: &mut Writer, nodes: &[Node]) {
    for (index, n) in nodes.iter().enumerate() {
        let children = nodes[index + 1..]
            .iter()
            .take_while(|c| c.depth > n.depth)
            .filter(|c| c.depth == n.depth + 1)
            .count();
        w.cstr(n.type_name).cstr(n.name);
        w.i32(n.size).i32(index as i32).i32(n.is_array as i32).i32(1).u32(n.flags);
        w.u32(children as u32);
    }
}

/// One container entry
pub struct EntryData {
    pub name: &'static str,
    pub flags: u32,
    pub data: Vec<u8>,
}

pub fn entry(name: &'static str, flags: u32, data: Vec<u8>) -> EntryData {
    EntryData { name, flags, data }
}

/// Options of [`unity_fs`]
pub struct FsOptions {
    pub format: u32,
    /// Compression flag of the info block
    pub info_compression: u32,
    /// Compression flag of every storage block
    pub block_compression: u16,
    /// Maximum uncompressed size of one storage block
    pub block_size: usize,
    pub info_at_end: bool,
    pub padded: bool,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            format: 6,
            info_compression: 0,
            block_compression: 0,
            block_size: usize::MAX,
            info_at_end: false,
            padded: false,
        }
    }
}

fn compress(data: &[u8], flag: u32) -> Vec<u8> {
    match flag & 0x3f {
        2 | 3 => lz4_flex::block::compress(data),
        _ => data.to_vec(),
    }
}

/// Node table and stored blocks of a `UnityFS` container, before assembly
pub struct FsLayout {
    /// Offset, size, flags and path of every node
    pub nodes: Vec<(i64, i64, u32, &'static str)>,
    /// Uncompressed size, stored size and flags of every block
    pub blocks: Vec<(u32, u32, u16)>,
    pub block_data: Vec<u8>,
}

/// Lay out `entries` as consecutive nodes split into blocks
pub fn fs_layout(entries: &[EntryData], options: &FsOptions) -> FsLayout {
    let mut payload = Vec::new();
    let mut nodes = Vec::new();
    for e in entries {
        nodes.push((payload.len() as i64, e.data.len() as i64, e.flags, e.name));
        payload.extend_from_slice(&e.data);
    }

    let mut blocks = Vec::new();
    let mut block_data = Vec::new();
    for chunk in payload.chunks(options.block_size.max(1)) {
        let stored = compress(chunk, options.block_compression as u32);
        blocks.push((chunk.len() as u32, stored.len() as u32, options.block_compression));
        block_data.extend_from_slice(&stored);
    }

    FsLayout {
        nodes,
        blocks,
        block_data,
    }
}

/// Assemble a `UnityFS` container
pub fn unity_fs(entries: &[EntryData], options: &FsOptions) -> Vec<u8> {
    assemble_fs(&fs_layout(entries, options), options)
}

/// Assemble a `UnityFS` container from a layout as given
pub fn assemble_fs(layout: &FsLayout, options: &FsOptions) -> Vec<u8> {
    let FsLayout {
        nodes,
        blocks,
        block_data,
    } = layout;

    let mut info = Writer::new(true);
    info.bytes(&[0; 16]).u32(blocks.len() as u32);
    for (u, c, f) in blocks {
        info.u32(*u).u32(*c).u16(*f);
    }
    info.u32(nodes.len() as u32);
    for (offset, size, flags, name) in nodes {
        info.i64(*offset).i64(*size).u32(*flags).cstr(name);
    }
    let stored_info = compress(&info.buf, options.info_compression);

    let mut flags = options.info_compression;
    if options.info_at_end {
        flags |= 0x80;
    }
    if options.padded {
        flags |= 0x200;
    }

    let mut w = Writer::new(true);
    w.cstr("UnityFS").u32(options.format).cstr("5.x.x").cstr("2019.4.0f1");
    let size_at = w.len();
    w.i64(0)
        .u32(stored_info.len() as u32)
        .u32(info.buf.len() as u32)
        .u32(flags);
    if options.format >= 7 {
        w.align(16);
    }
    if !options.info_at_end {
        w.bytes(&stored_info);
    }
    if options.padded {
        w.align(16);
    }
    w.bytes(block_data);
    if options.info_at_end {
        w.bytes(&stored_info);
    }

    let total = (w.len() as i64).to_be_bytes();
    w.buf[size_at..size_at + 8].copy_from_slice(&total);
    w.buf
}

/// Assemble a legacy `UnityRaw` container
pub fn unity_raw(entries: &[EntryData]) -> Vec<u8> {
    let mut w = Writer::new(true);
    w.cstr("UnityRaw").u32(3).cstr("3.x.x").cstr("3.5.7f6");
    let header_at = w.len();
    w.u32(0).u32(0);
    w.align(4);
    let header_size = w.len() as u32;

    w.u32(entries.len() as u32);
    for e in entries {
        let fields = e.name.len() as u32 + 1 + 8;
        w.cstr(e.name).u32(fields + 4).u32(e.data.len() as u32);
        w.bytes(&e.data);
    }

    let file_size = (w.len() as u32).to_be_bytes();
    w.buf[header_at..header_at + 4].copy_from_slice(&file_size);
    w.buf[header_at + 4..header_at + 8].copy_from_slice(&header_size.to_be_bytes());
    w.buf
}
