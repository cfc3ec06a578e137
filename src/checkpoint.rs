//! Checkpoint manager (component K): persists enough progress state that an
//! interrupted compression run can resume instead of restarting from
//! scratch.
//!
//! The checkpoint file sits next to the archive as `{archive_path}.checkpoint`
//! and uses a private binary layout -- callers other than this module must
//! not depend on its bytes. Writes go through a write-rename pattern so a
//! crash mid-write never leaves a torn checkpoint behind.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::numcodec::{read_7z_number, write_7z_number};

const MAGIC: &[u8; 4] = b"7ZCK";
const FORMAT_VERSION: u8 = 1;

/// Progress state recorded at file boundaries (and, for a large file, at
/// internal chunk boundaries) during a compression run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckpointRecord {
    /// Number of entries (in call order) whose stream has been fully
    /// written to the pack stream. On resume, the container writer skips
    /// this many entries and re-adds the rest.
    pub files_completed: u64,
    /// Total uncompressed bytes written across all completed entries.
    pub bytes_completed: u64,
    /// Path of the entry in progress when the checkpoint was taken, if any.
    pub current_file_path: Option<PathBuf>,
    /// Byte offset within the in-progress entry's source that has been
    /// consumed so far.
    pub current_file_offset: u64,
    /// Index of the volume the split output stream was writing to.
    pub volume_index: u32,
    /// Bytes written into that volume so far.
    pub volume_bytes_written: u64,
}

impl CheckpointRecord {
    fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        write_7z_number(&mut payload, self.files_completed).expect("writing to a Vec cannot fail");
        write_7z_number(&mut payload, self.bytes_completed).expect("writing to a Vec cannot fail");
        match &self.current_file_path {
            Some(path) => {
                let bytes = path.to_string_lossy().into_owned().into_bytes();
                payload.push(1);
                write_7z_number(&mut payload, bytes.len() as u64).expect("writing to a Vec cannot fail");
                payload.extend_from_slice(&bytes);
            }
            None => payload.push(0),
        }
        write_7z_number(&mut payload, self.current_file_offset).expect("writing to a Vec cannot fail");
        write_7z_number(&mut payload, self.volume_index as u64).expect("writing to a Vec cannot fail");
        write_7z_number(&mut payload, self.volume_bytes_written).expect("writing to a Vec cannot fail");

        let mut out = Vec::with_capacity(payload.len() + 9);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let malformed = |msg: String| Error::MalformedCheckpoint(msg);

        if bytes.len() < MAGIC.len() + 1 + 4 {
            return Err(malformed("checkpoint file is too short".into()));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(malformed("bad checkpoint magic".into()));
        }
        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(malformed(format!("unsupported checkpoint version {version}")));
        }

        let crc_start = MAGIC.len() + 1;
        let payload_start = crc_start + 4;
        let recorded_crc = u32::from_le_bytes(
            bytes[crc_start..payload_start]
                .try_into()
                .expect("slice is exactly 4 bytes"),
        );
        let payload = &bytes[payload_start..];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != recorded_crc {
            return Err(malformed(format!(
                "checkpoint CRC mismatch: expected {recorded_crc:#010x}, got {actual_crc:#010x}"
            )));
        }

        let mut cursor = io::Cursor::new(payload);
        let read_number = |cursor: &mut io::Cursor<&[u8]>| -> Result<u64> {
            read_7z_number(cursor).map_err(|e| malformed(format!("truncated field: {e}")))
        };

        let files_completed = read_number(&mut cursor)?;
        let bytes_completed = read_number(&mut cursor)?;

        let mut has_path = [0u8; 1];
        cursor
            .read_exact(&mut has_path)
            .map_err(|e| malformed(format!("truncated path flag: {e}")))?;
        let current_file_path = if has_path[0] == 1 {
            let len = read_number(&mut cursor)?;
            let mut buf = vec![0u8; len as usize];
            cursor
                .read_exact(&mut buf)
                .map_err(|e| malformed(format!("truncated path bytes: {e}")))?;
            let s = String::from_utf8(buf).map_err(|e| malformed(format!("non-UTF-8 path: {e}")))?;
            Some(PathBuf::from(s))
        } else {
            None
        };

        let current_file_offset = read_number(&mut cursor)?;
        let volume_index = read_number(&mut cursor)?;
        if volume_index > u32::MAX as u64 {
            return Err(malformed("volume index out of range".into()));
        }
        let volume_bytes_written = read_number(&mut cursor)?;

        Ok(Self {
            files_completed,
            bytes_completed,
            current_file_path,
            current_file_offset,
            volume_index: volume_index as u32,
            volume_bytes_written,
        })
    }
}

/// Owns the `{archive_path}.checkpoint` file alongside one archive.
///
/// Readers and writers never share this file concurrently; it is only ever
/// touched by the compression run that created it.
pub struct CheckpointManager {
    checkpoint_path: PathBuf,
}

impl CheckpointManager {
    /// Derives the checkpoint path for `archive_path` (`{archive_path}.checkpoint`).
    pub fn new(archive_path: impl AsRef<Path>) -> Self {
        let mut checkpoint_path = archive_path.as_ref().as_os_str().to_owned();
        checkpoint_path.push(".checkpoint");
        Self {
            checkpoint_path: PathBuf::from(checkpoint_path),
        }
    }

    /// The checkpoint file's path.
    pub fn path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Whether a checkpoint file currently exists at this path.
    pub fn exists(&self) -> bool {
        self.checkpoint_path.is_file()
    }

    /// Loads the checkpoint, if one exists.
    ///
    /// Returns `Ok(None)` if no checkpoint file is present. Returns
    /// [`Error::MalformedCheckpoint`] if one exists but fails to parse or
    /// its CRC does not match -- the caller must start the run from
    /// scratch in that case.
    pub fn load(&self) -> Result<Option<CheckpointRecord>> {
        let bytes = match fs::read(&self.checkpoint_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&self.checkpoint_path, e)),
        };
        CheckpointRecord::decode(&bytes).map(Some)
    }

    /// Persists `record` via write-rename: the new contents land in a
    /// sibling `.tmp` file first, then atomically replace the checkpoint.
    ///
    /// Checkpointing never blocks the codec path on fsync; a crash between
    /// the rename and the next flush at worst loses the most recent
    /// checkpoint, never corrupts it.
    pub fn save(&self, record: &CheckpointRecord) -> Result<()> {
        let tmp_path = self.checkpoint_path.with_extension("checkpoint.tmp");
        {
            let mut tmp = File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
            tmp.write_all(&record.encode())
                .map_err(|e| Error::io(&tmp_path, e))?;
            tmp.flush().map_err(|e| Error::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, &self.checkpoint_path).map_err(|e| Error::io(&self.checkpoint_path, e))?;
        Ok(())
    }

    /// Removes the checkpoint file after a successful run. Not finding one
    /// to remove is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.checkpoint_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&self.checkpoint_path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_is_archive_path_plus_suffix() {
        let manager = CheckpointManager::new("/tmp/archive.7z");
        assert_eq!(manager.path(), Path::new("/tmp/archive.7z.checkpoint"));
    }

    #[test]
    fn roundtrips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.7z");
        let manager = CheckpointManager::new(&archive_path);

        let record = CheckpointRecord {
            files_completed: 6,
            bytes_completed: 6 * 1024 * 1024,
            current_file_path: Some(PathBuf::from("file_7.bin")),
            current_file_offset: 4096,
            volume_index: 2,
            volume_bytes_written: 1500,
        };
        manager.save(&record).unwrap();
        assert!(manager.exists());

        let loaded = manager.load().unwrap().expect("checkpoint should be present");
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("missing.7z"));
        assert_eq!(manager.load().unwrap(), None);
    }

    #[test]
    fn load_rejects_corrupt_payload() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.7z");
        let manager = CheckpointManager::new(&archive_path);

        fs::write(manager.path(), b"not a checkpoint file at all").unwrap();
        let err = manager.load().unwrap_err();
        assert!(matches!(err, Error::MalformedCheckpoint(_)));
    }

    #[test]
    fn load_rejects_tampered_crc() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.7z");
        let manager = CheckpointManager::new(&archive_path);

        let record = CheckpointRecord {
            files_completed: 1,
            ..Default::default()
        };
        manager.save(&record).unwrap();

        let mut bytes = fs::read(manager.path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(manager.path(), &bytes).unwrap();

        let err = manager.load().unwrap_err();
        assert!(matches!(err, Error::MalformedCheckpoint(_)));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.7z");
        let manager = CheckpointManager::new(&archive_path);

        manager.save(&CheckpointRecord::default()).unwrap();
        manager.clear().unwrap();
        assert!(!manager.exists());
        manager.clear().unwrap();
    }

    #[test]
    fn record_without_current_file_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("out.7z");
        let manager = CheckpointManager::new(&archive_path);

        let record = CheckpointRecord {
            files_completed: 10,
            bytes_completed: 10 * 1024,
            current_file_path: None,
            current_file_offset: 0,
            volume_index: 0,
            volume_bytes_written: 10 * 1024,
        };
        manager.save(&record).unwrap();
        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded, record);
    }
}
