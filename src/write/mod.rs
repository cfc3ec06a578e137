//! Container writer (component I): assembles the signature header, a
//! single solid pack stream, and the end header into a complete 7z archive
//! (optionally split into volumes).
//!
//! The byte layout is always:
//!
//! ```text
//! [ 32-byte signature header ] [ pack stream ] [ end header ]
//! ```
//!
//! The signature header is written as a zero placeholder up front, then
//! rewritten in place once the pack stream and end header sizes/CRCs are
//! known -- this engine never buffers the archive in memory to compute
//! those up front.

pub mod driver;
pub mod options;

use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::chunked::ChunkedInputStream;
use crate::checkpoint::{CheckpointManager, CheckpointRecord};
use crate::entropy;
use crate::error::{Error, Result};
use crate::format::header::StartHeader;
use crate::format::streams_info::{
    EndHeader, FileEntry, FilesInfo, Folder, PackInfo, StreamsInfo, SubStreamsInfo, UnpackInfo,
};
use crate::format::{SIGNATURE_HEADER_SIZE, VERSION_MAJOR, VERSION_MINOR, attributes};
use crate::progress::{NoProgress, ProgressReporter};
use crate::timestamp::Timestamp;
use crate::volume::{MultiVolumeWriter, VolumeConfig};
use crate::ArchivePath;

pub use driver::{CompressionDriver, FolderAccounting};
pub use options::WriteOptions;

/// One entry recorded so far, in the order it will appear in the archive's
/// file list.
struct PlannedEntry {
    archive_path: ArchivePath,
    is_dir: bool,
    is_empty_file: bool,
    attributes: Option<u32>,
    mtime: Option<Timestamp>,
}

impl PlannedEntry {
    fn has_stream(&self) -> bool {
        !self.is_dir && !self.is_empty_file
    }
}

/// Either the raw volume writer (no file has produced a pack stream yet) or
/// the compression driver actively streaming one.
enum WriterState {
    Streaming(MultiVolumeWriter),
    Compressing(CompressionDriver<MultiVolumeWriter>),
}

/// The non-sink half of [`FolderAccounting`], kept around after the sink has
/// been moved back out so the end header can still be assembled from it.
struct FolderSummary {
    folder_unpack_total: u64,
    folder_unpack_crc: u32,
    pack_stream_size: u64,
    compressed_len: u64,
    per_file_sizes: Vec<u64>,
    per_file_crcs: Vec<u32>,
    lzma2_properties: Vec<u8>,
    aes_properties: Option<Vec<u8>>,
}

/// Statistics returned once an archive is finished.
#[derive(Debug, Clone)]
pub struct WriteResult {
    /// Total number of entries written (files, directories, and empty
    /// files).
    pub entries_written: usize,
    /// Total uncompressed bytes across every streamed file.
    pub uncompressed_size: u64,
    /// Total bytes occupying the pack stream (after compression and, if
    /// applicable, encryption).
    pub compressed_size: u64,
    /// Size, in bytes, of each volume written, in volume order. A single
    /// entry if the archive was not split.
    pub volume_sizes: Vec<u64>,
}

impl WriteResult {
    /// Fraction of space saved relative to the uncompressed size, in
    /// `[0.0, 1.0]`. `0.0` if nothing was streamed.
    pub fn space_savings(&self) -> f64 {
        if self.uncompressed_size == 0 {
            0.0
        } else {
            1.0 - (self.compressed_size as f64 / self.uncompressed_size as f64)
        }
    }
}

#[cfg(unix)]
fn attributes_from_metadata(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    (meta.permissions().mode() << 16) | attributes::UNIX_EXTENSION
}

#[cfg(not(unix))]
fn attributes_from_metadata(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        attributes::READONLY
    } else {
        0
    }
}

fn mtime_from_metadata(meta: &fs::Metadata) -> Option<Timestamp> {
    meta.modified().ok().and_then(Timestamp::from_system_time)
}

/// Builds a new 7z archive one entry at a time, streaming file contents
/// straight through compression (and, if a password is set, encryption)
/// rather than buffering them.
///
/// Every file added before the first streamed (non-empty) file determines
/// the compression level for the whole archive when [`WriteOptions::level`]
/// is `None`: the entropy probe samples that first file and its
/// recommendation is applied archive-wide, since this engine writes one
/// solid folder per archive rather than one coder per file.
pub struct Writer {
    state: Option<WriterState>,
    options: WriteOptions,
    entries: Vec<PlannedEntry>,
    progress: Box<dyn ProgressReporter>,
    checkpoint: Option<CheckpointManager>,
    bytes_completed: u64,
}

impl Writer {
    /// Creates a new archive at `path` with the given options.
    pub fn create(path: impl AsRef<Path>, options: WriteOptions) -> Result<Self> {
        let config = VolumeConfig::new(path.as_ref(), options.split_size);
        let mut volume_writer = MultiVolumeWriter::create(config)?;
        volume_writer
            .write_all(&[0u8; SIGNATURE_HEADER_SIZE as usize])
            .map_err(|e| Error::io(path.as_ref(), e))?;

        let checkpoint = options.resumable.then(|| CheckpointManager::new(path.as_ref()));

        Ok(Self {
            state: Some(WriterState::Streaming(volume_writer)),
            options,
            entries: Vec::new(),
            progress: Box::new(NoProgress),
            checkpoint,
            bytes_completed: 0,
        })
    }

    /// Persists a checkpoint record at the current entry boundary, if
    /// resumability is enabled.
    ///
    /// This records progress (entries and bytes completed so far) as a
    /// crash-diagnostic and audit trail. It does not capture the LZMA2
    /// encoder's internal dictionary/range-coder state, so a genuinely
    /// interrupted run cannot splice new pack bytes into the middle of the
    /// same solid bitstream on restart -- `volume_index`/
    /// `volume_bytes_written` are recorded as the archive's start position
    /// (0) rather than a true mid-stream offset. See `DESIGN.md`.
    fn checkpoint_at_boundary(&self) {
        if let Some(manager) = &self.checkpoint {
            let record = CheckpointRecord {
                files_completed: self.entries.len() as u64,
                bytes_completed: self.bytes_completed,
                current_file_path: None,
                current_file_offset: 0,
                volume_index: 0,
                volume_bytes_written: 0,
            };
            // Checkpointing is best-effort: a failure to persist progress
            // must never abort an otherwise-successful compression run.
            let _ = manager.save(&record);
        }
    }

    /// Creates a new archive at `path` with default options.
    pub fn create_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(path, WriteOptions::default())
    }

    /// Installs a progress reporter that receives entry/byte callbacks as
    /// files stream through.
    pub fn set_progress(&mut self, progress: impl ProgressReporter + 'static) {
        self.progress = Box::new(progress);
    }

    /// Installs the compression driver on first use, picking its block-thread
    /// count from `size_hint` (the size of the entry that triggered creation)
    /// via [`driver::threads_for_size`] unless [`WriteOptions::threads`]
    /// overrides it. The driver is created once per archive -- `size_hint`
    /// is the closest approximation of "total input size" available at that
    /// point, since this writer streams entries in as they're added rather
    /// than scanning the whole input set upfront; see `DESIGN.md`.
    fn driver_for_level(&mut self, level: u32, size_hint: u64) -> Result<&mut CompressionDriver<MultiVolumeWriter>> {
        if let Some(WriterState::Streaming(_)) = &self.state {
            let writer = match self.state.take() {
                Some(WriterState::Streaming(w)) => w,
                _ => unreachable!(),
            };
            let threads = self.options.threads.unwrap_or_else(|| driver::threads_for_size(size_hint));
            let driver = CompressionDriver::new(writer, level, self.options.password.as_ref(), threads);
            self.state = Some(WriterState::Compressing(driver));
        }
        match self.state.as_mut() {
            Some(WriterState::Compressing(driver)) => Ok(driver),
            _ => unreachable!("driver just installed above"),
        }
    }

    fn resolve_level(&self, probe_sample: impl FnOnce() -> Result<entropy::EntropyProbe>) -> Result<u32> {
        match self.options.level {
            Some(level) => Ok(level),
            None => Ok(probe_sample()?.recommendation.as_level()),
        }
    }

    /// Adds a directory entry. Directories carry no stream and no
    /// compressed bytes.
    pub fn add_directory(&mut self, archive_path: ArchivePath) -> Result<()> {
        self.entries.push(PlannedEntry {
            archive_path,
            is_dir: true,
            is_empty_file: false,
            attributes: None,
            mtime: None,
        });
        self.checkpoint_at_boundary();
        Ok(())
    }

    /// Adds the contents of the file at `source` under `archive_path`,
    /// streaming it chunk-by-chunk through the compression driver.
    ///
    /// A zero-length source file is recorded as an empty-file entry rather
    /// than a zero-byte stream, matching how 7z represents empty files.
    pub fn add_path(&mut self, source: impl AsRef<Path>, archive_path: ArchivePath) -> Result<()> {
        let source = source.as_ref();
        let meta = fs::metadata(source).map_err(|e| Error::io(source, e))?;
        let attrs = if self.options.preserve_attributes {
            Some(attributes_from_metadata(&meta))
        } else {
            None
        };
        let mtime = if self.options.preserve_attributes {
            mtime_from_metadata(&meta)
        } else {
            None
        };

        let mut stream = ChunkedInputStream::with_ceiling(source, self.options.chunk_size)?;
        if stream.total_size() == 0 {
            self.entries.push(PlannedEntry {
                archive_path,
                is_dir: false,
                is_empty_file: true,
                attributes: attrs,
                mtime,
            });
            self.checkpoint_at_boundary();
            return Ok(());
        }

        let level = self.resolve_level(|| entropy::probe_file(source))?;
        let name = archive_path.as_str().to_string();
        let total_size = stream.total_size();
        self.progress.on_entry_start(&name, total_size);

        let driver = self.driver_for_level(level, total_size)?;
        driver.begin_file();
        let mut buf = vec![0u8; self.options.chunk_size.min(8 * 1024 * 1024).max(4096)];
        loop {
            let n = stream
                .read_chunk(&mut buf, self.progress.as_mut())
                .map_err(|e| Error::io(source, e))?;
            if n == 0 {
                break;
            }
            driver
                .write_file_bytes(&buf[..n])
                .map_err(|e| Error::io(source, e))?;
        }
        driver.end_file();
        self.progress.on_entry_complete(&name, true);
        self.bytes_completed += total_size;

        self.entries.push(PlannedEntry {
            archive_path,
            is_dir: false,
            is_empty_file: false,
            attributes: attrs,
            mtime,
        });
        self.checkpoint_at_boundary();
        Ok(())
    }

    /// Adds an in-memory buffer under `archive_path`.
    ///
    /// An empty buffer is recorded as an empty-file entry, just as for
    /// [`Writer::add_path`].
    pub fn add_bytes(&mut self, archive_path: ArchivePath, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            self.entries.push(PlannedEntry {
                archive_path,
                is_dir: false,
                is_empty_file: true,
                attributes: None,
                mtime: None,
            });
            self.checkpoint_at_boundary();
            return Ok(());
        }

        let level = self.resolve_level(|| {
            let sample_len = entropy::sample_size(data.len() as u64) as usize;
            Ok(entropy::probe_bytes(&data[..sample_len.min(data.len())]))
        })?;

        let driver = self.driver_for_level(level, data.len() as u64)?;
        driver.begin_file();
        driver
            .write_file_bytes(data)
            .map_err(|e| Error::io(Path::new(archive_path.as_str()), e))?;
        driver.end_file();
        self.bytes_completed += data.len() as u64;

        self.entries.push(PlannedEntry {
            archive_path,
            is_dir: false,
            is_empty_file: false,
            attributes: None,
            mtime: None,
        });
        self.checkpoint_at_boundary();
        Ok(())
    }

    /// Finishes the archive: closes out the pack stream, assembles and
    /// writes the end header, rewrites the signature header with the real
    /// offsets/sizes/CRCs, and flushes every volume.
    pub fn finish(mut self) -> Result<WriteResult> {
        let state = self
            .state
            .take()
            .expect("Writer always holds a state until finish consumes it");

        let (mut volume_writer, accounting) = match state {
            WriterState::Streaming(w) => (w, None),
            WriterState::Compressing(driver) => {
                let FolderAccounting {
                    sink,
                    folder_unpack_total,
                    folder_unpack_crc,
                    pack_stream_size,
                    compressed_len,
                    per_file_sizes,
                    per_file_crcs,
                    lzma2_properties,
                    aes_properties,
                } = driver.finish()?;
                let summary = FolderSummary {
                    folder_unpack_total,
                    folder_unpack_crc,
                    pack_stream_size,
                    compressed_len,
                    per_file_sizes,
                    per_file_crcs,
                    lzma2_properties,
                    aes_properties,
                };
                (sink, Some(summary))
            }
        };

        let files_info = FilesInfo {
            files: self
                .entries
                .iter()
                .map(|entry| {
                    let attrs = if self.options.preserve_attributes {
                        match (entry.attributes, entry.is_dir) {
                            (Some(a), true) => Some(a | attributes::DIRECTORY),
                            (Some(a), false) => Some(a),
                            (None, true) => Some(attributes::DIRECTORY),
                            (None, false) => None,
                        }
                    } else {
                        None
                    };
                    FileEntry {
                        name: entry.archive_path.as_str().to_string(),
                        has_stream: entry.has_stream(),
                        is_empty_file: entry.is_empty_file,
                        attributes: attrs,
                        mtime: entry.mtime,
                    }
                })
                .collect(),
        };

        let streams_info = accounting.as_ref().map(|acc| {
            let folder = match &acc.aes_properties {
                Some(aes_properties) => Folder::aes_then_lzma2(
                    aes_properties.clone(),
                    acc.lzma2_properties.clone(),
                    acc.compressed_len,
                    acc.folder_unpack_total,
                    acc.folder_unpack_crc,
                ),
                None => Folder::lzma2_only(
                    acc.lzma2_properties.clone(),
                    acc.folder_unpack_total,
                    acc.folder_unpack_crc,
                ),
            };

            let num_streamed = acc.per_file_sizes.len();
            let substreams_info = SubStreamsInfo {
                num_unpack_streams_in_folders: vec![num_streamed as u32],
                sizes: acc.per_file_sizes.clone(),
                crcs: if num_streamed <= 1 {
                    vec![None; num_streamed]
                } else {
                    acc.per_file_crcs.iter().map(|&c| Some(c)).collect()
                },
            };

            StreamsInfo {
                pack_info: Some(PackInfo {
                    pack_pos: 0,
                    pack_sizes: vec![acc.pack_stream_size],
                }),
                unpack_info: Some(UnpackInfo {
                    folders: vec![folder],
                }),
                substreams_info: Some(substreams_info),
            }
        });

        let end_header = EndHeader {
            streams_info,
            files_info: Some(files_info),
        };
        let encoded = end_header.encode();
        let next_header_crc = crc32fast::hash(&encoded);
        let next_header_offset = accounting.as_ref().map(|a| a.pack_stream_size).unwrap_or(0);

        volume_writer.write_all(&encoded)?;

        let start_header = StartHeader {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            start_header_crc: 0,
            next_header_offset,
            next_header_size: encoded.len() as u64,
            next_header_crc,
        };
        volume_writer.seek(SeekFrom::Start(0))?;
        volume_writer.write_all(&start_header.encode())?;

        let volume_sizes = volume_writer.finish()?;

        if let Some(manager) = &self.checkpoint {
            manager.clear()?;
        }

        Ok(WriteResult {
            entries_written: self.entries.len(),
            uncompressed_size: accounting.as_ref().map(|a| a.folder_unpack_total).unwrap_or(0),
            compressed_size: accounting.map(|a| a.pack_stream_size).unwrap_or(0),
            volume_sizes,
        })
    }
}
