//! Container reader (component J): the decode path. Parses the end header,
//! assembles the folder/substream plan, and demultiplexes the decoded pack
//! stream back into files or a pass/fail report, without ever writing the
//! whole archive into memory.
//!
//! Decoding proceeds in the order laid out by the format itself:
//!
//! 1. Read and verify the signature header (component F), locating the end
//!    header.
//! 2. Read the end header's raw bytes and verify their CRC before parsing.
//! 3. Parse the end header into folder/substream/file-list structures.
//! 4. Seek back to the packed data and stream it through the reverse
//!    pipeline: optional AES-256-CBC decryption, then LZMA2 decode.
//! 5. Demultiplex the decoded bytes into output files in file-list order,
//!    verifying each file's CRC as it is written.
//! 6. Apply recorded attributes and timestamps.

pub mod options;
pub(crate) mod path_safety;

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::ArchivePath;
use crate::checksum::Crc32Writer;
use crate::codec::Lzma2Decoder;
use crate::crypto::{Aes256Decoder, Password};
use crate::error::{Error, Result};
use crate::format::SIGNATURE_HEADER_SIZE;
use crate::format::header::StartHeader;
use crate::format::streams_info::{EndHeader, FileEntry, Folder, StreamsInfo, SubStreamsInfo};
use crate::progress::{NoProgress, ProgressReporter};
use crate::safety::{self, LimitedReader};
use crate::timestamp::Timestamp;
use crate::volume::UnifiedReader;

pub use options::{ExtractOptions, TestOptions};

/// Unix `st_mode` file-type mask and the symbolic-link bit within it. 7z
/// records the Unix mode in the high 16 bits of the Windows-attribute field
/// when [`crate::format::attributes::UNIX_EXTENSION`] is set.
const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

fn unix_mode(attributes: Option<u32>) -> Option<u32> {
    attributes.filter(|a| a & crate::format::attributes::UNIX_EXTENSION != 0).map(|a| a >> 16)
}

/// One file, directory, or empty-file record decoded from an archive's end
/// header.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Archive-relative name, forward-slash separated.
    pub name: String,
    /// Uncompressed size; `0` for directories and empty files.
    pub size: u64,
    /// CRC-32 of the uncompressed bytes, if one was recorded.
    pub crc: Option<u32>,
    /// Windows/Unix-extension attribute bits, if recorded.
    pub attributes: Option<u32>,
    /// Last-modified time, if recorded.
    pub mtime: Option<Timestamp>,
    has_stream: bool,
    is_empty_file: bool,
}

impl Entry {
    /// Whether this entry is a directory.
    pub fn is_directory(&self) -> bool {
        !self.has_stream && !self.is_empty_file
    }

    /// Whether this entry carries a compressed stream (a non-empty file).
    pub fn has_stream(&self) -> bool {
        self.has_stream
    }

    /// Whether this entry is a zero-length regular file.
    pub fn is_empty_file(&self) -> bool {
        self.is_empty_file
    }

    /// Whether this entry's recorded Unix mode marks it a symbolic link,
    /// whose stream content is the link's UTF-8 target path rather than
    /// file data.
    pub fn is_symlink(&self) -> bool {
        matches!(unix_mode(self.attributes), Some(mode) if mode & S_IFMT == S_IFLNK)
    }
}

/// Result of a successful [`Archive::extract`] call.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    /// Number of non-directory entries written to disk.
    pub files_extracted: usize,
    /// Number of directory entries created.
    pub directories_created: usize,
    /// Total uncompressed bytes written.
    pub bytes_written: u64,
}

/// A single entry that failed CRC verification during [`Archive::test`].
#[derive(Debug, Clone)]
pub struct TestFailure {
    /// Index of the failing entry within [`Archive::entries`].
    pub index: usize,
    /// Name of the failing entry.
    pub name: String,
    /// CRC recorded in the archive.
    pub expected: u32,
    /// CRC recomputed from the decompressed bytes.
    pub actual: u32,
}

/// Result of an [`Archive::test`] call.
#[derive(Debug, Clone, Default)]
pub struct TestResult {
    /// Number of entries whose stream was decoded and checked (or, for
    /// empty files and directories, trivially passed).
    pub files_tested: usize,
    /// Total uncompressed bytes decoded and checksummed.
    pub bytes_verified: u64,
    /// Entries whose recomputed CRC did not match the recorded one.
    pub failures: Vec<TestFailure>,
}

impl TestResult {
    /// Whether every tested entry's CRC matched.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

fn build_entries(
    files: &[FileEntry],
    substreams: Option<&SubStreamsInfo>,
) -> Result<Vec<Entry>> {
    let mut sizes = substreams.map(|s| s.sizes.iter()).into_iter().flatten();
    let mut crcs = substreams.map(|s| s.crcs.iter()).into_iter().flatten();

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let (size, crc) = if file.has_stream {
            let size = *sizes.next().ok_or_else(|| {
                Error::MalformedArchive("fewer substream sizes than non-empty files".into())
            })?;
            let crc = *crcs.next().ok_or_else(|| {
                Error::MalformedArchive("fewer substream CRCs than non-empty files".into())
            })?;
            (size, crc)
        } else {
            (0, None)
        };
        entries.push(Entry {
            name: file.name.clone(),
            size,
            crc,
            attributes: file.attributes,
            mtime: file.mtime,
            has_stream: file.has_stream,
            is_empty_file: file.is_empty_file,
        });
    }
    Ok(entries)
}

/// Builds the reverse codec pipeline for the archive's one folder: optional
/// AES-256-CBC decryption, then LZMA2 decode.
fn build_decoder<'a>(
    pack_reader: io::Take<&'a mut UnifiedReader>,
    folder: &Folder,
    password: Option<&Password>,
) -> Result<Box<dyn Read + Send + 'a>> {
    let lzma2_properties = folder.lzma2_properties()?.to_vec();
    match folder.aes_properties() {
        Some(aes_properties) => {
            let password = password.ok_or_else(|| {
                Error::InvalidParameter("archive is encrypted; a password is required".into())
            })?;
            let mut aes = Aes256Decoder::new(pack_reader, aes_properties, password)?;
            if !aes.validate_first_block()? {
                return Err(Error::WrongPassword);
            }
            Ok(Box::new(Lzma2Decoder::new(aes, &lzma2_properties)?))
        }
        None => Ok(Box::new(Lzma2Decoder::new(pack_reader, &lzma2_properties)?)),
    }
}

#[cfg(unix)]
fn apply_attributes(path: &Path, attributes: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = unix_mode(attributes) {
        let perm_bits = mode & 0o7777;
        if perm_bits != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(perm_bits))
                .map_err(|e| Error::io(path, e))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_attributes(path: &Path, attributes: Option<u32>) -> Result<()> {
    if let Some(attrs) = attributes {
        let mut perms = fs::metadata(path).map_err(|e| Error::io(path, e))?.permissions();
        perms.set_readonly(attrs & crate::format::attributes::READONLY != 0);
        fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

fn apply_mtime(path: &Path, mtime: Option<Timestamp>) -> Result<()> {
    if let Some(mtime) = mtime {
        let ft = filetime::FileTime::from_system_time(mtime.as_system_time());
        filetime::set_file_mtime(path, ft).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// An opened 7z archive: the parsed end header plus a handle on the
/// underlying (possibly multi-volume) file.
pub struct Archive {
    reader: UnifiedReader,
    streams_info: Option<StreamsInfo>,
    entries: Vec<Entry>,
    progress: Box<dyn ProgressReporter>,
}

impl Archive {
    /// Opens an archive, parsing its signature and end header. Transparently
    /// detects and spans multi-volume archives split across `.001`, `.002`,
    /// etc.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = UnifiedReader::open(path)?;

        let start_header = StartHeader::parse(&mut reader)?;
        reader.seek(SeekFrom::Start(start_header.next_header_position()))?;

        let mut header_bytes = vec![0u8; start_header.next_header_size as usize];
        reader.read_exact(&mut header_bytes)?;
        let actual_crc = crc32fast::hash(&header_bytes);
        if actual_crc != start_header.next_header_crc {
            return Err(Error::BadHeaderCrc {
                context: "end header",
            });
        }

        let EndHeader {
            streams_info,
            files_info,
        } = EndHeader::parse(&header_bytes)?;
        let files_info = files_info.unwrap_or_default();
        let entries = build_entries(
            &files_info.files,
            streams_info.as_ref().and_then(|s| s.substreams_info.as_ref()),
        )?;

        Ok(Self {
            reader,
            streams_info,
            entries,
            progress: Box::new(NoProgress),
        })
    }

    /// Installs a progress reporter that receives entry/byte callbacks as
    /// the archive is extracted or tested.
    pub fn set_progress(&mut self, progress: impl ProgressReporter + 'static) {
        self.progress = Box::new(progress);
    }

    /// The archive's file list, in archive order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the archive's folder is AES-256 encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.folder().map(Folder::is_encrypted).unwrap_or(false)
    }

    fn folder(&self) -> Option<&Folder> {
        self.streams_info
            .as_ref()
            .and_then(|s| s.unpack_info.as_ref())
            .and_then(|u| u.folders.first())
    }

    /// Total size of the packed (compressed, and encrypted if applicable)
    /// data, used as the denominator for the per-entry compression-ratio
    /// guard. All entries share one pack stream in this engine's solid
    /// archives, so this is a coarse archive-wide figure rather than a true
    /// per-entry packed size.
    fn pack_size(&self) -> u64 {
        self.streams_info
            .as_ref()
            .and_then(|s| s.pack_info.as_ref())
            .and_then(|p| p.pack_sizes.first())
            .copied()
            .unwrap_or(0)
    }

    /// Seeks to the start of the packed data and builds the reverse codec
    /// pipeline, if the archive has any streamed entries at all.
    fn open_decoder(&mut self, password: Option<&Password>) -> Result<Option<Box<dyn Read + Send + '_>>> {
        let Some(streams_info) = &self.streams_info else {
            return Ok(None);
        };
        let pack_info = streams_info.pack_info.as_ref().ok_or_else(|| {
            Error::MalformedArchive("streams info has no pack info".into())
        })?;
        let folder = streams_info
            .unpack_info
            .as_ref()
            .and_then(|u| u.folders.first())
            .ok_or_else(|| Error::MalformedArchive("streams info has no folder".into()))?;
        let pack_pos = pack_info.pack_pos;
        let pack_size = *pack_info.pack_sizes.first().ok_or_else(|| {
            Error::MalformedArchive("pack info has no pack stream size".into())
        })?;

        self.reader
            .seek(SeekFrom::Start(SIGNATURE_HEADER_SIZE + pack_pos))?;
        let take = (&mut self.reader).take(pack_size);
        Ok(Some(build_decoder(take, folder, password)?))
    }

    /// Extracts every entry into `dest_root`, creating it if necessary.
    ///
    /// Entry paths are validated against `options.path_safety` before any
    /// filesystem write; a non-empty file's CRC is verified as it streams
    /// to disk. Resource limits (`max_entry_bytes`, `max_ratio`,
    /// `max_total_bytes`) guard against compression-bomb archives.
    pub fn extract(&mut self, dest_root: impl AsRef<Path>, options: &ExtractOptions) -> Result<ExtractResult> {
        let dest_root = dest_root.as_ref();
        fs::create_dir_all(dest_root).map_err(|e| Error::io(dest_root, e))?;

        let total_bytes: u64 = self.entries.iter().map(|e| e.size).sum();
        self.progress.on_total(total_bytes);

        let total_tracker = Arc::new(AtomicU64::new(0));
        let pack_size = self.pack_size();
        let mut decoder = self.open_decoder(options.password.as_ref())?;

        let mut result = ExtractResult::default();
        let entries = self.entries.clone();
        for (index, entry) in entries.iter().enumerate() {
            let archive_path = ArchivePath::new(&entry.name)?;
            let target = safety::validate_extract_path(
                &archive_path,
                dest_root,
                options.path_safety,
                index,
            )?;

            if entry.is_directory() {
                fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
                apply_mtime(&target, entry.mtime)?;
                result.directories_created += 1;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }

            if !entry.has_stream {
                File::create(&target).map_err(|e| Error::io(&target, e))?;
                apply_attributes(&target, entry.attributes)?;
                apply_mtime(&target, entry.mtime)?;
                result.files_extracted += 1;
                continue;
            }

            self.progress.on_entry_start(&entry.name, entry.size);
            let decoder = decoder.as_mut().ok_or_else(|| {
                Error::MalformedArchive(
                    "entry carries a stream but the archive has no pack stream".into(),
                )
            })?;
            let bounded = (&mut **decoder).take(entry.size);
            let mut limited = LimitedReader::new(bounded)
                .max_entry_bytes(options.max_entry_bytes)
                .compressed_size(pack_size)
                .total_tracker(total_tracker.clone(), options.max_total_bytes);
            if let Some(ratio) = options.max_ratio {
                limited = limited.max_ratio(ratio);
            }

            let actual_crc = if entry.is_symlink() {
                write_symlink(limited, entry, index, &target)?
            } else {
                write_regular_file(limited, &target)?
            };

            if let Some(expected) = entry.crc {
                if expected != actual_crc {
                    return Err(Error::BadPerFileCrc {
                        index,
                        name: entry.name.clone(),
                        expected,
                        actual: actual_crc,
                    });
                }
            }

            if !entry.is_symlink() {
                apply_attributes(&target, entry.attributes)?;
                apply_mtime(&target, entry.mtime)?;
            }

            result.bytes_written += entry.size;
            result.files_extracted += 1;
            self.progress.on_entry_complete(&entry.name, true);
            self.progress.on_progress(result.bytes_written, total_bytes);
        }

        Ok(result)
    }

    /// Decodes every entry's stream and checks its CRC without writing any
    /// file to disk.
    pub fn test(&mut self, options: &TestOptions) -> Result<TestResult> {
        let mut decoder = self.open_decoder(options.password.as_ref())?;

        let mut result = TestResult::default();
        let entries = self.entries.clone();
        for (index, entry) in entries.iter().enumerate() {
            if entry.is_directory() || !entry.has_stream {
                result.files_tested += 1;
                continue;
            }

            let decoder = decoder.as_mut().ok_or_else(|| {
                Error::MalformedArchive(
                    "entry carries a stream but the archive has no pack stream".into(),
                )
            })?;
            let mut bounded = (&mut **decoder).take(entry.size);
            let mut sink = Crc32Writer::new(io::sink());
            io::copy(&mut bounded, &mut sink).map_err(|e| Error::io(Path::new(&entry.name), e))?;

            let actual = sink.crc();
            result.bytes_verified += entry.size;
            result.files_tested += 1;
            if let Some(expected) = entry.crc {
                if expected != actual {
                    result.failures.push(TestFailure {
                        index,
                        name: entry.name.clone(),
                        expected,
                        actual,
                    });
                }
            }
        }

        Ok(result)
    }
}

fn write_regular_file<R: Read>(mut reader: R, target: &Path) -> Result<u32> {
    let file = File::create(target).map_err(|e| Error::io(target, e))?;
    let mut writer = Crc32Writer::new(file);
    io::copy(&mut reader, &mut writer).map_err(|e| Error::io(target, e))?;
    Ok(writer.crc())
}

fn write_symlink<R: Read>(mut reader: R, entry: &Entry, index: usize, target: &Path) -> Result<u32> {
    let mut bytes = Vec::with_capacity(entry.size as usize);
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(target, e))?;
    let actual_crc = crate::checksum::Crc32::compute(&bytes);

    let link_target = String::from_utf8(bytes).map_err(|_| {
        Error::MalformedArchive(format!("symlink entry {index} target is not valid UTF-8"))
    })?;
    path_safety::validate_symlink_target(index, &entry.name, &link_target)?;
    if target.exists() || fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).map_err(|e| Error::io(target, e))?;
    }
    path_safety::create_symlink(target, &link_target)?;
    Ok(actual_crc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::PathSafety;
    use crate::write::{WriteOptions, Writer};
    use std::path::PathBuf;

    fn make_archive(build: impl FnOnce(&mut Writer)) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("test.7z");
        let mut writer = Writer::create_path(&archive_path).unwrap();
        build(&mut writer);
        writer.finish().unwrap();
        (dir, archive_path)
    }

    #[test]
    fn opens_and_lists_entries() {
        let (_dir, archive_path) = make_archive(|w| {
            w.add_bytes(ArchivePath::new("hello.txt").unwrap(), b"hello world").unwrap();
            w.add_directory(ArchivePath::new("sub").unwrap()).unwrap();
            w.add_bytes(ArchivePath::new("empty.bin").unwrap(), b"").unwrap();
        });

        let archive = Archive::open(&archive_path).unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.entries()[0].name, "hello.txt");
        assert_eq!(archive.entries()[0].size, 11);
        assert!(archive.entries()[1].is_directory());
        assert!(archive.entries()[2].is_empty_file());
        assert!(!archive.is_encrypted());
    }

    #[test]
    fn extracts_files_and_directories_byte_for_byte() {
        let (_dir, archive_path) = make_archive(|w| {
            w.add_bytes(ArchivePath::new("a/hello.txt").unwrap(), b"hello world").unwrap();
            w.add_directory(ArchivePath::new("a/empty_dir").unwrap()).unwrap();
        });

        let out_dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(&archive_path).unwrap();
        let result = archive.extract(out_dir.path(), &ExtractOptions::new()).unwrap();

        assert_eq!(result.files_extracted, 1);
        assert_eq!(result.directories_created, 1);
        assert!(out_dir.path().join("a/empty_dir").is_dir());
        let contents = fs::read(out_dir.path().join("a/hello.txt")).unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[test]
    fn test_reports_no_failures_for_a_valid_archive() {
        let (_dir, archive_path) = make_archive(|w| {
            w.add_bytes(ArchivePath::new("data.bin").unwrap(), &vec![7u8; 10_000]).unwrap();
        });

        let mut archive = Archive::open(&archive_path).unwrap();
        let result = archive.test(&TestOptions::new()).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.bytes_verified, 10_000);
    }

    #[test]
    fn test_detects_tampered_pack_stream() {
        let (_dir, archive_path) = make_archive(|w| {
            w.add_bytes(ArchivePath::new("data.bin").unwrap(), &vec![7u8; 10_000]).unwrap();
        });

        // Flip a byte inside the packed data (after the 32-byte signature
        // header, well before the end header).
        let mut bytes = fs::read(&archive_path).unwrap();
        bytes[40] ^= 0xFF;
        fs::write(&archive_path, &bytes).unwrap();

        let mut archive = Archive::open(&archive_path).unwrap();
        // Either the corrupted LZMA2 stream fails to decode, or it decodes
        // to the wrong bytes and test() reports the CRC mismatch.
        match archive.test(&TestOptions::new()) {
            Ok(result) => assert!(!result.is_ok()),
            Err(_) => {}
        }
    }

    #[test]
    fn extract_rejects_archive_path_escaping_destination() {
        // Round-trip through ArchivePath is impossible for ".." segments
        // (rejected at write time too), so this exercises the defense in
        // depth rather than a realistic archive.
        let archive_path = ArchivePath::new("safe/name.txt").unwrap();
        let dest = std::env::temp_dir();
        let resolved = safety::validate_extract_path(&archive_path, &dest, PathSafety::Strict, 0);
        assert!(resolved.is_ok());
    }

    #[test]
    fn roundtrips_through_multiple_volumes() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("vol.7z");
        let options = WriteOptions::new().with_split_size(512).with_level(0);
        let mut writer = Writer::create(&archive_path, options).unwrap();
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        writer.add_bytes(ArchivePath::new("big.bin").unwrap(), &payload).unwrap();
        writer.finish().unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(dir.path().join("vol.7z.001")).unwrap();
        archive.extract(out_dir.path(), &ExtractOptions::new()).unwrap();
        let extracted = fs::read(out_dir.path().join("big.bin")).unwrap();
        assert_eq!(extracted, payload);
    }

    #[test]
    fn extract_enforces_max_entry_bytes() {
        let (_dir, archive_path) = make_archive(|w| {
            w.add_bytes(ArchivePath::new("data.bin").unwrap(), &vec![1u8; 10_000]).unwrap();
        });

        let out_dir = tempfile::tempdir().unwrap();
        let mut archive = Archive::open(&archive_path).unwrap();
        let options = ExtractOptions::new().max_entry_bytes(100);
        let err = archive.extract(out_dir.path(), &options).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
