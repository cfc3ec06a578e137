//! In-memory model of the end header's structural content: `StreamsInfo`
//! (`PackInfo` / `UnpackInfo` / `SubStreamsInfo`) and `FilesInfo`.
//!
//! This engine only ever writes one pack stream through one folder (solid,
//! single-coder, optionally with an AES coder chained ahead of LZMA2), so
//! the encode/decode logic below does not attempt to represent 7z's full
//! generality (multiple folders, complex coders, explicit packed-stream
//! index lists). See the container writer (component I) and container
//! reader (component J) for how these types are assembled and consumed.

use std::io::{self, Cursor, Read};

use crate::error::{Error, Result};
use crate::numcodec::{read_7z_number, write_7z_number};
use crate::timestamp::Timestamp;

use super::property_id;
use super::reader::{read_all_or_bits, read_bool_vector, read_bytes, read_u8, read_u32_le};

/// One coder in a folder's coder chain: a method ID plus its properties
/// block. This engine only emits simple (1 input, 1 output) coders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderInfo {
    /// Method ID, big-endian, 1-4 bytes (`0x21` for LZMA2, the 4-byte AES
    /// method ID for the optional encryption coder).
    pub method_id: Vec<u8>,
    /// Coder properties (LZMA2's 1-byte dictionary size, or the AES coder
    /// properties block).
    pub properties: Vec<u8>,
}

impl CoderInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        let has_attrs = !self.properties.is_empty();
        let id_size = self.method_id.len() as u8;
        let flags = id_size | if has_attrs { 0x20 } else { 0 };
        out.push(flags);
        out.extend_from_slice(&self.method_id);
        if has_attrs {
            write_7z_number(out, self.properties.len() as u64).expect("Vec write cannot fail");
            out.extend_from_slice(&self.properties);
        }
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let flags = read_u8(r).map_err(malformed)?;
        let id_size = (flags & 0x0F) as usize;
        if flags & 0x10 != 0 {
            return Err(Error::MalformedArchive(
                "complex coders (numInStreams/numOutStreams != 1) are not supported".into(),
            ));
        }
        let method_id = read_bytes(r, id_size).map_err(malformed)?;
        let properties = if flags & 0x20 != 0 {
            let size = read_7z_number(r).map_err(malformed)? as usize;
            read_bytes(r, size).map_err(malformed)?
        } else {
            Vec::new()
        };
        Ok(Self {
            method_id,
            properties,
        })
    }
}

/// A bind pair wires one coder's output stream into another coder's input
/// stream, identified by their folder-wide stream indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindPair {
    /// Global in-stream index of the consuming coder.
    pub in_index: u32,
    /// Global out-stream index of the producing coder.
    pub out_index: u32,
}

/// A folder: this engine's archives always have exactly one, with either a
/// single LZMA2 coder or an AES coder chained ahead of LZMA2
/// (`[AES, LZMA2]`, `BindPair { in_index: 1, out_index: 0 }`, so AES
/// decodes the pack stream and feeds its output into LZMA2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Coder chain, decode order (the coder that reads the pack stream
    /// comes first).
    pub coders: Vec<CoderInfo>,
    /// Bind pairs wiring coder outputs to coder inputs. Empty for a
    /// single-coder folder.
    pub bind_pairs: Vec<BindPair>,
    /// Unpack size for each coder's output stream, in coder order (this
    /// engine's coders are all 1-out, so this has one entry per coder).
    pub unpack_sizes: Vec<u64>,
    /// CRC of the folder's final output (the concatenated uncompressed
    /// bytes of every file in the folder), if recorded.
    pub crc: Option<u32>,
}

impl Folder {
    /// Builds the folder for an unencrypted archive: one LZMA2 coder.
    pub fn lzma2_only(lzma2_properties: Vec<u8>, unpack_total: u64, crc: u32) -> Self {
        Self {
            coders: vec![CoderInfo {
                method_id: vec![super::method_id::LZMA2 as u8],
                properties: lzma2_properties,
            }],
            bind_pairs: Vec::new(),
            unpack_sizes: vec![unpack_total],
            crc: Some(crc),
        }
    }

    /// Builds the folder for an encrypted archive: `[AES, LZMA2]` chained,
    /// AES decoding the pack stream and feeding LZMA2.
    pub fn aes_then_lzma2(
        aes_properties: Vec<u8>,
        lzma2_properties: Vec<u8>,
        lzma2_compressed_len: u64,
        unpack_total: u64,
        crc: u32,
    ) -> Self {
        let aes_id = super::method_id::AES_256_SHA_256;
        Self {
            coders: vec![
                CoderInfo {
                    method_id: vec![
                        (aes_id >> 24) as u8,
                        (aes_id >> 16) as u8,
                        (aes_id >> 8) as u8,
                        aes_id as u8,
                    ],
                    properties: aes_properties,
                },
                CoderInfo {
                    method_id: vec![super::method_id::LZMA2 as u8],
                    properties: lzma2_properties,
                },
            ],
            bind_pairs: vec![BindPair {
                in_index: 1,
                out_index: 0,
            }],
            unpack_sizes: vec![lzma2_compressed_len, unpack_total],
            crc: Some(crc),
        }
    }

    /// Whether this folder chains an AES coder ahead of LZMA2.
    pub fn is_encrypted(&self) -> bool {
        self.coders.len() == 2
    }

    /// The folder's final decompressed size: the unpack size of the
    /// out-stream not consumed by any bind pair.
    pub fn final_unpack_size(&self) -> Result<u64> {
        let bound: Vec<u32> = self.bind_pairs.iter().map(|b| b.out_index).collect();
        let mut candidates = self
            .unpack_sizes
            .iter()
            .enumerate()
            .filter(|(i, _)| !bound.contains(&(*i as u32)));
        let (_, size) = candidates
            .next()
            .ok_or_else(|| Error::MalformedArchive("folder has no unbound output stream".into()))?;
        if candidates.next().is_some() {
            return Err(Error::MalformedArchive(
                "folder has more than one unbound output stream".into(),
            ));
        }
        Ok(*size)
    }

    /// Returns the LZMA2 coder's properties (the dictionary-size byte),
    /// regardless of whether it is the only coder or chained after AES.
    pub fn lzma2_properties(&self) -> Result<&[u8]> {
        self.coders
            .iter()
            .find(|c| c.method_id == [super::method_id::LZMA2 as u8])
            .map(|c| c.properties.as_slice())
            .ok_or_else(|| Error::MalformedArchive("folder has no LZMA2 coder".into()))
    }

    /// Returns the AES coder's properties, if this folder is encrypted.
    pub fn aes_properties(&self) -> Option<&[u8]> {
        self.coders
            .iter()
            .find(|c| c.method_id.len() == 4)
            .map(|c| c.properties.as_slice())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        write_7z_number(out, self.coders.len() as u64).expect("Vec write cannot fail");
        for coder in &self.coders {
            coder.encode(out);
        }
        for pair in &self.bind_pairs {
            write_7z_number(out, pair.in_index as u64).expect("Vec write cannot fail");
            write_7z_number(out, pair.out_index as u64).expect("Vec write cannot fail");
        }
        // Exactly one packed stream per folder; with num_in_streams -
        // num_bind_pairs == 1 the index is implicit and omitted.
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let num_coders = read_7z_number(r).map_err(malformed)?;
        let mut coders = Vec::with_capacity(num_coders as usize);
        for _ in 0..num_coders {
            coders.push(CoderInfo::decode(r)?);
        }
        let num_bind_pairs = coders.len().saturating_sub(1);
        let mut bind_pairs = Vec::with_capacity(num_bind_pairs);
        for _ in 0..num_bind_pairs {
            let in_index = read_7z_number(r).map_err(malformed)? as u32;
            let out_index = read_7z_number(r).map_err(malformed)? as u32;
            bind_pairs.push(BindPair {
                in_index,
                out_index,
            });
        }
        Ok(Self {
            coders,
            bind_pairs,
            unpack_sizes: Vec::new(),
            crc: None,
        })
    }

    fn num_out_streams(&self) -> usize {
        self.coders.len()
    }
}

/// `PackInfo`: location and sizes of the archive's pack streams. This
/// engine always writes exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackInfo {
    /// Offset of the first pack stream, relative to the end of the
    /// signature header.
    pub pack_pos: u64,
    /// Size of each pack stream, in order.
    pub pack_sizes: Vec<u64>,
}

impl PackInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        write_7z_number(out, self.pack_pos).expect("Vec write cannot fail");
        write_7z_number(out, self.pack_sizes.len() as u64).expect("Vec write cannot fail");
        out.push(property_id::SIZE);
        for &size in &self.pack_sizes {
            write_7z_number(out, size).expect("Vec write cannot fail");
        }
        out.push(property_id::END);
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let pack_pos = read_7z_number(r).map_err(malformed)?;
        let num_pack_streams = read_7z_number(r).map_err(malformed)? as usize;
        let mut pack_sizes = Vec::new();
        loop {
            let id = read_u8(r).map_err(malformed)?;
            match id {
                property_id::END => break,
                property_id::SIZE => {
                    for _ in 0..num_pack_streams {
                        pack_sizes.push(read_7z_number(r).map_err(malformed)?);
                    }
                }
                property_id::CRC => {
                    // Per-pack-stream CRCs: this engine never writes them but
                    // tolerates them on read by skipping past the vector.
                    let _ = read_all_or_bits(r, num_pack_streams).map_err(malformed)?;
                    for _ in 0..num_pack_streams {
                        let _ = read_u32_le(r);
                    }
                }
                other => {
                    return Err(Error::MalformedArchive(format!(
                        "unexpected property id {other:#04x} in PackInfo"
                    )));
                }
            }
        }
        if pack_sizes.len() != num_pack_streams {
            return Err(Error::MalformedArchive(
                "PackInfo did not specify sizes for all pack streams".into(),
            ));
        }
        Ok(Self {
            pack_pos,
            pack_sizes,
        })
    }
}

/// `UnpackInfo`: the folder plan plus per-folder unpack sizes and CRCs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackInfo {
    /// Folders, in order. This engine always writes exactly one.
    pub folders: Vec<Folder>,
}

impl UnpackInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(property_id::FOLDER);
        write_7z_number(out, self.folders.len() as u64).expect("Vec write cannot fail");
        out.push(0); // external = 0
        for folder in &self.folders {
            folder.encode(out);
        }

        out.push(property_id::CODERS_UNPACK_SIZE);
        for folder in &self.folders {
            for &size in &folder.unpack_sizes {
                write_7z_number(out, size).expect("Vec write cannot fail");
            }
        }

        if self.folders.iter().any(|f| f.crc.is_some()) {
            out.push(property_id::CRC);
            let defined: Vec<bool> = self.folders.iter().map(|f| f.crc.is_some()).collect();
            encode_all_or_bits(out, &defined);
            for folder in &self.folders {
                if let Some(crc) = folder.crc {
                    out.extend_from_slice(&crc.to_le_bytes());
                }
            }
        }

        out.push(property_id::END);
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let id = read_u8(r).map_err(malformed)?;
        if id != property_id::FOLDER {
            return Err(Error::MalformedArchive(format!(
                "expected ID_FOLDER in UnpackInfo, got {id:#04x}"
            )));
        }
        let num_folders = read_7z_number(r).map_err(malformed)? as usize;
        let external = read_u8(r).map_err(malformed)?;
        if external != 0 {
            return Err(Error::MalformedArchive(
                "external folder definitions are not supported".into(),
            ));
        }
        let mut folders = Vec::with_capacity(num_folders);
        for _ in 0..num_folders {
            folders.push(Folder::decode(r)?);
        }

        let id = read_u8(r).map_err(malformed)?;
        if id != property_id::CODERS_UNPACK_SIZE {
            return Err(Error::MalformedArchive(format!(
                "expected ID_CODERS_UNPACK_SIZE, got {id:#04x}"
            )));
        }
        for folder in &mut folders {
            let n = folder.num_out_streams();
            for _ in 0..n {
                folder
                    .unpack_sizes
                    .push(read_7z_number(r).map_err(malformed)?);
            }
        }

        loop {
            let id = read_u8(r).map_err(malformed)?;
            match id {
                property_id::END => break,
                property_id::CRC => {
                    let defined = read_all_or_bits(r, num_folders).map_err(malformed)?;
                    for (folder, is_defined) in folders.iter_mut().zip(defined) {
                        if is_defined {
                            folder.crc = Some(read_u32_le(r).map_err(malformed)?);
                        }
                    }
                }
                other => {
                    return Err(Error::MalformedArchive(format!(
                        "unexpected property id {other:#04x} in UnpackInfo"
                    )));
                }
            }
        }

        Ok(Self { folders })
    }
}

/// `SubStreamsInfo`: the per-file decomposition of each folder's output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubStreamsInfo {
    /// Number of non-empty-stream files decoded from each folder, in
    /// folder order.
    pub num_unpack_streams_in_folders: Vec<u32>,
    /// Per-file uncompressed sizes, in file order, across all folders.
    pub sizes: Vec<u64>,
    /// Per-file CRCs, in file order. `None` for a file whose folder has
    /// only one substream and already carries a folder-level CRC.
    pub crcs: Vec<Option<u32>>,
}

impl SubStreamsInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(property_id::NUM_UNPACK_STREAM);
        for &n in &self.num_unpack_streams_in_folders {
            write_7z_number(out, n as u64).expect("Vec write cannot fail");
        }

        // Per-folder, emit every substream size but the last (implied by
        // the folder's total minus the sum of the others).
        out.push(property_id::SIZE);
        let mut idx = 0usize;
        for &n in &self.num_unpack_streams_in_folders {
            let n = n as usize;
            for _ in 0..n.saturating_sub(1) {
                write_7z_number(out, self.sizes[idx]).expect("Vec write cannot fail");
                idx += 1;
            }
            if n > 0 {
                idx += 1; // skip the implied last size
            }
        }

        let defined: Vec<bool> = self.crcs.iter().map(Option::is_some).collect();
        if defined.iter().any(|&d| d) {
            out.push(property_id::CRC);
            encode_all_or_bits(out, &defined);
            for crc in self.crcs.iter().flatten() {
                out.extend_from_slice(&crc.to_le_bytes());
            }
        }

        out.push(property_id::END);
    }

    fn decode<R: Read>(r: &mut R, folders: &[Folder]) -> Result<Self> {
        let mut num_unpack_streams_in_folders: Vec<u32> =
            folders.iter().map(|_| 1).collect();
        let mut sizes = Vec::new();
        let mut crcs = Vec::new();

        let mut next = read_u8(r).map_err(malformed)?;
        if next == property_id::NUM_UNPACK_STREAM {
            num_unpack_streams_in_folders.clear();
            for _ in folders {
                num_unpack_streams_in_folders.push(read_7z_number(r).map_err(malformed)? as u32);
            }
            next = read_u8(r).map_err(malformed)?;
        }

        if next == property_id::SIZE {
            for (folder, &n) in folders.iter().zip(&num_unpack_streams_in_folders) {
                let n = n as usize;
                if n == 0 {
                    continue;
                }
                let mut sum = 0u64;
                for _ in 0..n.saturating_sub(1) {
                    let size = read_7z_number(r).map_err(malformed)?;
                    sum += size;
                    sizes.push(size);
                }
                let folder_total = folder.final_unpack_size()?;
                sizes.push(folder_total.saturating_sub(sum));
            }
            next = read_u8(r).map_err(malformed)?;
        } else {
            // No explicit sizes: every folder's single substream takes the
            // whole folder output.
            for (folder, &n) in folders.iter().zip(&num_unpack_streams_in_folders) {
                if n == 1 {
                    sizes.push(folder.final_unpack_size()?);
                }
            }
        }

        // Number of substreams that still need a CRC: those not already
        // covered by a single-substream folder's own folder-level CRC.
        let num_digests_needed: usize = num_unpack_streams_in_folders
            .iter()
            .zip(folders)
            .map(|(&n, f)| {
                if n == 1 && f.crc.is_some() {
                    0
                } else {
                    n as usize
                }
            })
            .sum();

        let mut defined_digests = vec![true; num_digests_needed];
        if next == property_id::CRC {
            defined_digests = read_all_or_bits(r, num_digests_needed).map_err(malformed)?;
            next = read_u8(r).map_err(malformed)?;
        }

        let mut digest_iter = defined_digests.into_iter();
        for (folder, &n) in folders.iter().zip(&num_unpack_streams_in_folders) {
            if n == 1 && folder.crc.is_some() {
                crcs.push(folder.crc);
                continue;
            }
            for _ in 0..n {
                let is_defined = digest_iter.next().unwrap_or(false);
                if is_defined {
                    crcs.push(Some(read_u32_le(r).map_err(malformed)?));
                } else {
                    crcs.push(None);
                }
            }
        }

        if next != property_id::END {
            return Err(Error::MalformedArchive(format!(
                "unexpected property id {next:#04x} in SubStreamsInfo"
            )));
        }

        Ok(Self {
            num_unpack_streams_in_folders,
            sizes,
            crcs,
        })
    }
}

/// `StreamsInfo`: `PackInfo` + `UnpackInfo` + `SubStreamsInfo`, nested under
/// `ID_MainStreamsInfo` in the end header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamsInfo {
    /// Location and size of the pack stream(s).
    pub pack_info: Option<PackInfo>,
    /// Folder plan and per-folder accounting.
    pub unpack_info: Option<UnpackInfo>,
    /// Per-file decomposition of the folder output.
    pub substreams_info: Option<SubStreamsInfo>,
}

impl StreamsInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        if let Some(pack_info) = &self.pack_info {
            out.push(property_id::PACK_INFO);
            pack_info.encode(out);
        }
        if let Some(unpack_info) = &self.unpack_info {
            out.push(property_id::UNPACK_INFO);
            unpack_info.encode(out);
        }
        if let Some(substreams_info) = &self.substreams_info {
            out.push(property_id::SUBSTREAMS_INFO);
            substreams_info.encode(out);
        }
        out.push(property_id::END);
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut streams_info = StreamsInfo::default();
        loop {
            let id = read_u8(r).map_err(malformed)?;
            match id {
                property_id::END => break,
                property_id::PACK_INFO => {
                    streams_info.pack_info = Some(PackInfo::decode(r)?);
                }
                property_id::UNPACK_INFO => {
                    streams_info.unpack_info = Some(UnpackInfo::decode(r)?);
                }
                property_id::SUBSTREAMS_INFO => {
                    let folders = streams_info
                        .unpack_info
                        .as_ref()
                        .map(|u| u.folders.as_slice())
                        .unwrap_or(&[]);
                    streams_info.substreams_info = Some(SubStreamsInfo::decode(r, folders)?);
                }
                other => {
                    return Err(Error::MalformedArchive(format!(
                        "unexpected property id {other:#04x} in StreamsInfo"
                    )));
                }
            }
        }
        Ok(streams_info)
    }
}

/// One file record, as carried by `FilesInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name, relative, forward-slash separated.
    pub name: String,
    /// `false` for directories and zero-length files (they have no
    /// substream); `true` for everything else.
    pub has_stream: bool,
    /// `true` for zero-length regular files (only meaningful when
    /// `has_stream` is `false`); `false` for directories.
    pub is_empty_file: bool,
    /// Windows/Unix-extension attribute bits, if recorded.
    pub attributes: Option<u32>,
    /// Last-modified time, if recorded.
    pub mtime: Option<Timestamp>,
}

impl FileEntry {
    /// Whether this entry is a directory (`has_stream == false` and
    /// `is_empty_file == false`).
    pub fn is_directory(&self) -> bool {
        !self.has_stream && !self.is_empty_file
    }
}

/// `FilesInfo`: the file list and its typed property blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilesInfo {
    /// Files, in archive order (matching substream order for non-empty
    /// files).
    pub files: Vec<FileEntry>,
}

fn write_property(out: &mut Vec<u8>, id: u8, data: &[u8]) {
    out.push(id);
    write_7z_number(out, data.len() as u64).expect("Vec write cannot fail");
    out.extend_from_slice(data);
}

impl FilesInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        write_7z_number(out, self.files.len() as u64).expect("Vec write cannot fail");

        let empty_stream: Vec<bool> = self.files.iter().map(|f| !f.has_stream).collect();
        if empty_stream.iter().any(|&b| b) {
            let mut data = Vec::new();
            encode_bool_vector(&mut data, &empty_stream);
            write_property(out, property_id::EMPTY_STREAM, &data);

            let empty_files: Vec<bool> = self
                .files
                .iter()
                .filter(|f| !f.has_stream)
                .map(|f| f.is_empty_file)
                .collect();
            if empty_files.iter().any(|&b| b) {
                let mut data = Vec::new();
                encode_bool_vector(&mut data, &empty_files);
                write_property(out, property_id::EMPTY_FILE, &data);
            }
        }

        {
            let mut data = Vec::new();
            for file in &self.files {
                for unit in file.name.encode_utf16() {
                    data.extend_from_slice(&unit.to_le_bytes());
                }
                data.extend_from_slice(&0u16.to_le_bytes());
            }
            write_property(out, property_id::NAME, &{
                let mut with_external = Vec::with_capacity(data.len() + 1);
                with_external.push(0u8);
                with_external.extend_from_slice(&data);
                with_external
            });
        }

        if self.files.iter().any(|f| f.mtime.is_some()) {
            let defined: Vec<bool> = self.files.iter().map(|f| f.mtime.is_some()).collect();
            let mut data = Vec::new();
            encode_all_or_bits(&mut data, &defined);
            data.push(0); // external
            for file in &self.files {
                if let Some(mtime) = file.mtime {
                    data.extend_from_slice(&mtime.as_filetime().to_le_bytes());
                }
            }
            write_property(out, property_id::MTIME, &data);
        }

        if self.files.iter().any(|f| f.attributes.is_some()) {
            let defined: Vec<bool> = self.files.iter().map(|f| f.attributes.is_some()).collect();
            let mut data = Vec::new();
            encode_all_or_bits(&mut data, &defined);
            data.push(0); // external
            for file in &self.files {
                if let Some(attrs) = file.attributes {
                    data.extend_from_slice(&attrs.to_le_bytes());
                }
            }
            write_property(out, property_id::WIN_ATTRIBUTES, &data);
        }

        out.push(property_id::END);
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let num_files = read_7z_number(r).map_err(malformed)? as usize;

        let mut empty_stream = vec![false; num_files];
        let mut empty_file: Vec<bool> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut mtimes: Vec<Option<Timestamp>> = vec![None; num_files];
        let mut attributes: Vec<Option<u32>> = vec![None; num_files];

        loop {
            let id = read_u8(r).map_err(malformed)?;
            if id == property_id::END {
                break;
            }
            let size = read_7z_number(r).map_err(malformed)? as usize;
            let data = read_bytes(r, size).map_err(malformed)?;
            let mut cursor = Cursor::new(&data);

            match id {
                property_id::EMPTY_STREAM => {
                    empty_stream = read_bool_vector(&mut cursor, num_files).map_err(malformed)?;
                }
                property_id::EMPTY_FILE => {
                    let num_empty = empty_stream.iter().filter(|&&b| b).count();
                    empty_file = read_bool_vector(&mut cursor, num_empty).map_err(malformed)?;
                }
                property_id::NAME => {
                    let _external = read_u8(&mut cursor).map_err(malformed)?;
                    let rest = &data[1..];
                    names = decode_names(rest, num_files)?;
                }
                property_id::MTIME => {
                    let defined = read_all_or_bits(&mut cursor, num_files).map_err(malformed)?;
                    let _external = read_u8(&mut cursor).map_err(malformed)?;
                    for (i, is_defined) in defined.into_iter().enumerate() {
                        if is_defined {
                            let ft = crate::format::reader::read_u64_le(&mut cursor)
                                .map_err(malformed)?;
                            mtimes[i] = Some(Timestamp::from_filetime(ft));
                        }
                    }
                }
                property_id::WIN_ATTRIBUTES => {
                    let defined = read_all_or_bits(&mut cursor, num_files).map_err(malformed)?;
                    let _external = read_u8(&mut cursor).map_err(malformed)?;
                    for (i, is_defined) in defined.into_iter().enumerate() {
                        if is_defined {
                            attributes[i] = Some(read_u32_le(&mut cursor).map_err(malformed)?);
                        }
                    }
                }
                // Unrecognized/unused properties (CTime, ATime, Anti,
                // Dummy, ...) are skipped: their bytes were already fully
                // consumed via the generic size-prefixed read above.
                _ => {}
            }
        }

        if names.len() != num_files {
            return Err(Error::MalformedArchive(format!(
                "FilesInfo declared {num_files} files but NAME carried {}",
                names.len()
            )));
        }

        let mut empty_file_iter = empty_file.into_iter();
        let mut files = Vec::with_capacity(num_files);
        for i in 0..num_files {
            let has_stream = !empty_stream[i];
            let is_empty_file = if has_stream {
                false
            } else {
                empty_file_iter.next().unwrap_or(false)
            };
            files.push(FileEntry {
                name: std::mem::take(&mut names[i]),
                has_stream,
                is_empty_file,
                attributes: attributes[i],
                mtime: mtimes[i],
            });
        }

        Ok(Self { files })
    }
}

fn decode_names(data: &[u8], num_files: usize) -> Result<Vec<String>> {
    if data.len() % 2 != 0 {
        return Err(Error::MalformedArchive(
            "NAME property has an odd byte length".into(),
        ));
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    let mut names = Vec::with_capacity(num_files);
    let mut current = Vec::new();
    for unit in units {
        if unit == 0 {
            names.push(String::from_utf16_lossy(&current));
            current.clear();
        } else {
            current.push(unit);
        }
    }
    if names.len() != num_files {
        return Err(Error::MalformedArchive(format!(
            "NAME property carried {} null-terminated names, expected {num_files}",
            names.len()
        )));
    }
    Ok(names)
}

/// The decoded/to-be-encoded end header: `ID_Header` + `MainStreamsInfo` +
/// `FilesInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndHeader {
    /// Pack/unpack/substream accounting for the archive's one folder.
    pub streams_info: Option<StreamsInfo>,
    /// File list and metadata.
    pub files_info: Option<FilesInfo>,
}

impl EndHeader {
    /// Encodes the end header to its on-disk byte form, including the
    /// leading `ID_Header` and trailing `ID_End` markers.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(property_id::HEADER);
        if let Some(streams_info) = &self.streams_info {
            out.push(property_id::MAIN_STREAMS_INFO);
            streams_info.encode(&mut out);
        }
        if let Some(files_info) = &self.files_info {
            out.push(property_id::FILES_INFO);
            files_info.encode(&mut out);
        }
        out.push(property_id::END);
        out
    }

    /// Parses an end header from its raw bytes (the `ID_Header`-prefixed
    /// blob, CRC already verified by the caller against the signature
    /// header).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let id = read_u8(&mut cursor).map_err(malformed)?;
        if id != property_id::HEADER {
            return Err(Error::MalformedArchive(format!(
                "expected ID_Header, got {id:#04x}"
            )));
        }

        let mut end_header = EndHeader::default();
        loop {
            let id = read_u8(&mut cursor).map_err(malformed)?;
            match id {
                property_id::END => break,
                property_id::MAIN_STREAMS_INFO => {
                    end_header.streams_info = Some(StreamsInfo::decode(&mut cursor)?);
                }
                property_id::FILES_INFO => {
                    end_header.files_info = Some(FilesInfo::decode(&mut cursor)?);
                }
                property_id::ARCHIVE_PROPERTIES => {
                    // Skip archive-level properties: a sequence of
                    // (id, size, data) triples terminated by ID_End.
                    loop {
                        let prop_id = read_u8(&mut cursor).map_err(malformed)?;
                        if prop_id == property_id::END {
                            break;
                        }
                        let size = read_7z_number(&mut cursor).map_err(malformed)? as usize;
                        let _ = read_bytes(&mut cursor, size).map_err(malformed)?;
                    }
                }
                other => {
                    return Err(Error::MalformedArchive(format!(
                        "unexpected property id {other:#04x} in end header"
                    )));
                }
            }
        }

        Ok(end_header)
    }
}

fn malformed(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::TruncatedArchive(e.to_string())
    } else {
        Error::MalformedArchive(e.to_string())
    }
}

fn encode_bool_vector(out: &mut Vec<u8>, bits: &[bool]) {
    let num_bytes = bits.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    out.extend_from_slice(&bytes);
}

fn encode_all_or_bits(out: &mut Vec<u8>, bits: &[bool]) {
    if bits.iter().all(|&b| b) {
        out.push(1);
    } else {
        out.push(0);
        encode_bool_vector(out, bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_files() -> Vec<FileEntry> {
        vec![
            FileEntry {
                name: "a.txt".into(),
                has_stream: true,
                is_empty_file: false,
                attributes: Some(0x20),
                mtime: Some(Timestamp::from_unix_secs(1_700_000_000).unwrap()),
            },
            FileEntry {
                name: "dir".into(),
                has_stream: false,
                is_empty_file: false,
                attributes: Some(0x10),
                mtime: None,
            },
            FileEntry {
                name: "empty.bin".into(),
                has_stream: false,
                is_empty_file: true,
                attributes: None,
                mtime: None,
            },
        ]
    }

    #[test]
    fn files_info_roundtrip() {
        let files_info = FilesInfo {
            files: sample_files(),
        };
        let mut encoded = Vec::new();
        files_info.encode(&mut encoded);

        let mut cursor = Cursor::new(encoded);
        let decoded = FilesInfo::decode(&mut cursor).unwrap();
        assert_eq!(decoded, files_info);
    }

    #[test]
    fn folder_lzma2_only_roundtrip() {
        let folder = Folder::lzma2_only(vec![18], 12345, 0xDEAD_BEEF);
        let mut encoded = Vec::new();
        folder.encode(&mut encoded);

        let mut cursor = Cursor::new(encoded);
        let mut decoded = Folder::decode(&mut cursor).unwrap();
        decoded.unpack_sizes = vec![12345];
        decoded.crc = Some(0xDEAD_BEEF);
        assert_eq!(decoded, folder);
        assert_eq!(decoded.final_unpack_size().unwrap(), 12345);
    }

    #[test]
    fn folder_aes_then_lzma2_bind_pair() {
        let folder = Folder::aes_then_lzma2(vec![0x12, 0x00], vec![20], 900, 1000, 0x1234_5678);
        assert!(folder.is_encrypted());
        assert_eq!(folder.final_unpack_size().unwrap(), 1000);
        assert_eq!(folder.lzma2_properties().unwrap(), &[20][..]);
        assert!(folder.aes_properties().is_some());
    }

    #[test]
    fn streams_info_single_file_roundtrip() {
        let folder = Folder::lzma2_only(vec![18], 5, 0x1234_5678);
        let streams_info = StreamsInfo {
            pack_info: Some(PackInfo {
                pack_pos: 0,
                pack_sizes: vec![7],
            }),
            unpack_info: Some(UnpackInfo {
                folders: vec![folder],
            }),
            substreams_info: None,
        };

        let mut encoded = Vec::new();
        streams_info.encode(&mut encoded);
        let mut cursor = Cursor::new(encoded);
        let decoded = StreamsInfo::decode(&mut cursor).unwrap();

        assert_eq!(decoded.pack_info, streams_info.pack_info);
        assert_eq!(
            decoded.unpack_info.unwrap().folders[0].final_unpack_size().unwrap(),
            5
        );
    }

    #[test]
    fn substreams_info_multi_file_omits_last_size() {
        let folder = Folder::lzma2_only(vec![18], 30, 0);
        let substreams = SubStreamsInfo {
            num_unpack_streams_in_folders: vec![3],
            sizes: vec![5, 10, 15],
            crcs: vec![Some(1), Some(2), Some(3)],
        };

        let mut encoded = Vec::new();
        substreams.encode(&mut encoded);
        // ID_Size should carry only 2 of the 3 sizes (last is implied).
        let mut cursor = Cursor::new(encoded);
        let decoded = SubStreamsInfo::decode(&mut cursor, std::slice::from_ref(&folder)).unwrap();
        assert_eq!(decoded.sizes, vec![5, 10, 15]);
        assert_eq!(decoded.crcs, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn end_header_full_roundtrip() {
        let folder = Folder::lzma2_only(vec![18], 1029, 0x1111_2222);
        let end_header = EndHeader {
            streams_info: Some(StreamsInfo {
                pack_info: Some(PackInfo {
                    pack_pos: 0,
                    pack_sizes: vec![512],
                }),
                unpack_info: Some(UnpackInfo {
                    folders: vec![folder],
                }),
                substreams_info: Some(SubStreamsInfo {
                    num_unpack_streams_in_folders: vec![2],
                    sizes: vec![5],
                    crcs: vec![Some(0xAAAA), Some(0xBBBB)],
                }),
            }),
            files_info: Some(FilesInfo {
                files: vec![
                    FileEntry {
                        name: "a.txt".into(),
                        has_stream: true,
                        is_empty_file: false,
                        attributes: None,
                        mtime: None,
                    },
                    FileEntry {
                        name: "b.bin".into(),
                        has_stream: true,
                        is_empty_file: false,
                        attributes: None,
                        mtime: None,
                    },
                ],
            }),
        };

        let encoded = end_header.encode();
        let decoded = EndHeader::parse(&encoded).unwrap();
        assert_eq!(decoded, end_header);
    }
}
