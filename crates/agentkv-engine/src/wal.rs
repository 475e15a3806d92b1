//! Write-Ahead Log
//!
//! Write ordering for every mutation:
//! 1. Serialize entry to buffer (CRC32C computed here)
//! 2. Append buffer to the current WAL file
//! 3. In [`SyncMode::Durable`], durable_sync() before returning
//! 4. Caller updates RAM only after this returns Ok
//!
//! Reads are served from RAM; the WAL exists to rebuild RAM on open.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{EngineError, EngineResult};
use crate::format::{deserialize_entry, serialize_entry, Operation, WalEntry, HEADER_SIZE, MAGIC_ARRAY};
use crate::platform_durability::{durable_sync, sync_dir};

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".akv";

fn wal_file_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

fn parse_wal_sequence(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(WAL_PREFIX)?.strip_suffix(WAL_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

/// WAL files in `wal_dir`, ascending by sequence. Other files are ignored.
fn list_wal_files(wal_dir: &Path) -> EngineResult<Vec<(u64, PathBuf)>> {
    let dir_entries = std::fs::read_dir(wal_dir)
        .map_err(|e| EngineError::io(wal_dir, "failed to read WAL directory", e))?;

    let mut wal_files = Vec::new();
    for entry in dir_entries {
        let entry = entry.map_err(|e| EngineError::io(wal_dir, "failed to read directory entry", e))?;
        let path = entry.path();
        if let Some(seq) = path.file_name().and_then(|n| n.to_str()).and_then(parse_wal_sequence) {
            wal_files.push((seq, path));
        }
    }
    wal_files.sort();
    Ok(wal_files)
}

/// Appends entries to the newest WAL file, rotating at a size threshold.
///
/// Invariant: `append()` completes (including the sync required by the
/// mode) before the caller touches the in-memory tables.
pub struct WalWriter {
    file: File,
    /// Path to current WAL file (for error context)
    path: PathBuf,
    /// Current file size in bytes (tracked to avoid stat calls)
    size: u64,
    wal_dir: PathBuf,
    sequence: u64,
    rotation_size: u64,
}

impl WalWriter {
    /// Open the WAL directory for appending.
    ///
    /// Appends never go to a file written by a previous run: if the newest
    /// file has content, a new sequence is started, so a torn tail left by
    /// a crash can never swallow entries written after recovery.
    pub fn new<P: AsRef<Path>>(wal_dir: P, rotation_size: u64) -> EngineResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();

        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| EngineError::io(&wal_dir, "failed to create WAL directory", e))?;

        let mut sequence = Self::find_max_sequence(&wal_dir)?;
        let latest_len = std::fs::metadata(wal_dir.join(wal_file_name(sequence))).map_or(0, |m| m.len());
        if latest_len > 0 {
            sequence += 1;
        }
        let path = wal_dir.join(wal_file_name(sequence));
        let file = Self::open_file(&path)?;

        let size = file
            .metadata()
            .map_err(|e| EngineError::io(&path, "failed to stat WAL file", e))?
            .len();

        Ok(Self { file, path, size, wal_dir, sequence, rotation_size })
    }

    fn open_file(path: &Path) -> EngineResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::io(path, "failed to open WAL file", e))
    }

    fn find_max_sequence(wal_dir: &Path) -> EngineResult<u64> {
        let entries = std::fs::read_dir(wal_dir)
            .map_err(|e| EngineError::io(wal_dir, "failed to read WAL directory", e))?;

        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_wal_sequence))
            .max()
            .unwrap_or(0))
    }

    /// Append one entry, syncing according to `mode`.
    ///
    /// If the process dies after the write but before the sync, the entry
    /// may or may not survive; after the sync it will be replayed on open.
    pub fn append(&mut self, namespace: &str, key: &[u8], value: &[u8], op: Operation, mode: SyncMode) -> EngineResult<()> {
        let entry_bytes = serialize_entry(namespace, key, value, op)?;

        if self.size > 0 && self.size + entry_bytes.len() as u64 > self.rotation_size {
            self.rotate()?;
        }

        self.file
            .write_all(&entry_bytes)
            .map_err(|e| EngineError::io(&self.path, "WAL write failed", e))?;

        if mode == SyncMode::Durable {
            self.sync()?;
        }

        self.size += entry_bytes.len() as u64;
        Ok(())
    }

    /// Start a new WAL file. The current one is synced first.
    fn rotate(&mut self) -> EngineResult<()> {
        self.sync()?;

        self.sequence += 1;
        let new_path = self.wal_dir.join(wal_file_name(self.sequence));
        self.file = Self::open_file(&new_path)?;
        sync_dir(&self.wal_dir)
            .map_err(|e| EngineError::io(&self.wal_dir, "failed to sync WAL directory", e))?;

        debug!(path = %new_path.display(), "rotated WAL");
        self.path = new_path;
        self.size = 0;
        Ok(())
    }

    /// Route further appends to a file of their own and return its sequence.
    ///
    /// A checkpoint writes the live state after this call, syncs, then drops
    /// everything older with [`remove_before`](Self::remove_before).
    pub fn begin_checkpoint(&mut self) -> EngineResult<u64> {
        if self.size > 0 {
            self.rotate()?;
        }
        Ok(self.sequence)
    }

    /// Delete WAL files with a sequence below `sequence`, oldest first.
    ///
    /// Oldest-first keeps a crash part way through safe: what is left is a
    /// suffix of the history followed by the checkpoint, which replays to
    /// the same state.
    pub fn remove_before(&self, sequence: u64) -> EngineResult<usize> {
        let stale: Vec<(u64, PathBuf)> = list_wal_files(&self.wal_dir)?
            .into_iter()
            .filter(|(seq, _)| *seq < sequence)
            .collect();

        for (_, path) in &stale {
            std::fs::remove_file(path).map_err(|e| EngineError::io(path, "failed to remove WAL file", e))?;
        }
        if !stale.is_empty() {
            sync_dir(&self.wal_dir)
                .map_err(|e| EngineError::io(&self.wal_dir, "failed to sync WAL directory", e))?;
            debug!(removed = stale.len(), keep_from = sequence, "removed WAL files");
        }
        Ok(stale.len())
    }

    /// Sync the current WAL file without appending.
    pub fn sync(&self) -> EngineResult<()> {
        durable_sync(&self.file).map_err(|e| EngineError::io(&self.path, "WAL durable_sync failed", e))
    }

    /// Confirm the WAL file is still reachable on disk.
    pub fn check(&self) -> EngineResult<()> {
        std::fs::metadata(&self.path)
            .map(|_| ())
            .map_err(|e| EngineError::io(&self.path, "WAL file is not accessible", e))
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.size
    }
}

/// Replays WAL files for recovery.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self { wal_dir: wal_dir.as_ref().to_path_buf() }
    }

    /// Recover all entries from WAL files in sequence order.
    ///
    /// Per file: check magic, check the declared length fits, verify CRC32C.
    /// A bad entry is skipped by scanning for the next magic; an incomplete
    /// entry at end of file is the crash point and ends that file.
    pub fn recover_entries(&self) -> EngineResult<Vec<WalEntry>> {
        let mut all_entries = Vec::new();
        for (_, wal_path) in &list_wal_files(&self.wal_dir)? {
            all_entries.extend(self.recover_from_file(wal_path)?);
        }
        Ok(all_entries)
    }

    fn recover_from_file(&self, path: &Path) -> EngineResult<Vec<WalEntry>> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut buffer))
            .map_err(|e| EngineError::io(path, "failed to read WAL file for recovery", e))?;

        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                warn!(path = %path.display(), offset, "bad magic in WAL, scanning for next entry");
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => { offset = next; continue; }
                    None => break,
                }
            }

            let length = u32::from_le_bytes([
                buffer[offset + 4], buffer[offset + 5],
                buffer[offset + 6], buffer[offset + 7],
            ]) as usize;
            let total_entry_size = HEADER_SIZE + length;

            if offset + total_entry_size > buffer.len() {
                warn!(
                    path = %path.display(),
                    offset,
                    needed = total_entry_size,
                    available = buffer.len() - offset,
                    "torn write at end of WAL, stopping replay of this file"
                );
                break;
            }

            match deserialize_entry(&buffer[offset..offset + total_entry_size]) {
                Ok(entry) => {
                    entries.push(entry);
                    offset += total_entry_size;
                }
                Err(e) => {
                    warn!(path = %path.display(), offset, error = %e, "corrupt WAL entry skipped");
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => { offset = next; continue; }
                        None => break,
                    }
                }
            }
        }

        Ok(entries)
    }
}

/// Next offset at or after `start` holding the WAL magic.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|window| window == MAGIC_ARRAY)
        .map(|pos| start + pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROTATION: u64 = 1024 * 1024;

    #[test]
    fn test_wal_write_read_back() {
        let temp = TempDir::new().unwrap();

        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("agents", b"", b"", Operation::CreateNamespace, SyncMode::Durable).unwrap();
        writer.append("agents", b"key1", b"value1", Operation::Put, SyncMode::Durable).unwrap();
        writer.append("agents", b"key2", b"value2", Operation::Put, SyncMode::Relaxed).unwrap();
        writer.append("agents", b"key1", b"", Operation::Delete, SyncMode::Durable).unwrap();
        drop(writer);

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].operation, Operation::CreateNamespace);
        assert_eq!(entries[1].namespace, "agents");
        assert_eq!(entries[1].key, b"key1");
        assert_eq!(entries[1].value, b"value1");
        assert_eq!(entries[2].key, b"key2");
        assert_eq!(entries[3].operation, Operation::Delete);
    }

    #[test]
    fn test_corruption_recovery_skips_bad_entry() {
        let temp = TempDir::new().unwrap();

        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"good1", b"val1", Operation::Put, SyncMode::Durable).unwrap();
        let first_len = writer.current_size() as usize;
        writer.append("ns", b"good2", b"val2", Operation::Put, SyncMode::Durable).unwrap();
        writer.append("ns", b"good3", b"val3", Operation::Put, SyncMode::Durable).unwrap();
        let wal_path = writer.current_path().to_path_buf();
        drop(writer);

        // Flip the last payload byte of the second entry
        let mut data = std::fs::read(&wal_path).unwrap();
        data[2 * first_len - 1] ^= 0xFF;
        std::fs::write(&wal_path, data).unwrap();

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        let keys: Vec<&[u8]> = entries.iter().map(|e| e.key.as_slice()).collect();
        assert_eq!(keys, vec![b"good1".as_slice(), b"good3".as_slice()]);
    }

    #[test]
    fn test_torn_write_stops_cleanly() {
        let temp = TempDir::new().unwrap();

        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"complete", b"entry", Operation::Put, SyncMode::Durable).unwrap();
        let wal_path = writer.current_path().to_path_buf();
        drop(writer);

        // Header claiming a 255-byte payload that never arrived
        let mut data = std::fs::read(&wal_path).unwrap();
        data.extend_from_slice(&MAGIC_ARRAY);
        data.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00]);
        data.extend_from_slice(&[0u8; HEADER_SIZE - 8]);
        std::fs::write(&wal_path, data).unwrap();

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, b"complete");
    }

    #[test]
    fn test_empty_wal_directory() {
        let temp = TempDir::new().unwrap();
        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_rotation_keeps_order() {
        let temp = TempDir::new().unwrap();
        // Tiny threshold so every append after the first rotates
        let mut writer = WalWriter::new(temp.path(), 64).unwrap();
        for i in 0..5u8 {
            writer.append("ns", &[b'k', b'0' + i], b"v", Operation::Put, SyncMode::Relaxed).unwrap();
        }
        let last_path = writer.current_path().to_path_buf();
        drop(writer);

        let name = last_path.file_name().unwrap().to_str().unwrap();
        assert_eq!(parse_wal_sequence(name), Some(4));

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        let keys: Vec<Vec<u8>> = entries.into_iter().map(|e| e.key).collect();
        assert_eq!(keys, (0..5u8).map(|i| vec![b'k', b'0' + i]).collect::<Vec<_>>());
    }

    #[test]
    fn test_reopen_starts_new_file() {
        let temp = TempDir::new().unwrap();
        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"a", b"1", Operation::Put, SyncMode::Relaxed).unwrap();
        let first_path = writer.current_path().to_path_buf();
        drop(writer);

        let writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        assert_ne!(writer.current_path(), first_path.as_path());
        assert_eq!(writer.current_size(), 0);
        let empty_path = writer.current_path().to_path_buf();
        drop(writer);

        // An empty newest file is reused rather than skipped
        let writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        assert_eq!(writer.current_path(), empty_path.as_path());
    }

    #[test]
    fn test_entries_after_torn_tail_survive() {
        let temp = TempDir::new().unwrap();
        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"big", &[7u8; 4096], Operation::Put, SyncMode::Relaxed).unwrap();
        let wal_path = writer.current_path().to_path_buf();
        drop(writer);

        // Crash leaves only the first part of the big entry
        let data = std::fs::read(&wal_path).unwrap();
        std::fs::write(&wal_path, &data[..100]).unwrap();

        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"after", b"crash", Operation::Put, SyncMode::Relaxed).unwrap();
        drop(writer);

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, b"after");
    }

    #[test]
    fn test_checkpoint_drops_older_files() {
        let temp = TempDir::new().unwrap();
        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        writer.append("ns", b"k", b"old", Operation::Put, SyncMode::Relaxed).unwrap();
        writer.append("ns", b"k", b"new", Operation::Put, SyncMode::Relaxed).unwrap();

        let keep_from = writer.begin_checkpoint().unwrap();
        assert_eq!(keep_from, 1);
        writer.append("ns", b"k", b"new", Operation::Put, SyncMode::Relaxed).unwrap();
        writer.sync().unwrap();
        assert_eq!(writer.remove_before(keep_from).unwrap(), 1);
        assert_eq!(writer.remove_before(keep_from).unwrap(), 0);

        let entries = WalReader::new(temp.path()).recover_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"new");
    }

    #[test]
    fn test_checkpoint_reuses_empty_file() {
        let temp = TempDir::new().unwrap();
        let mut writer = WalWriter::new(temp.path(), ROTATION).unwrap();
        let before = writer.current_path().to_path_buf();
        assert_eq!(writer.begin_checkpoint().unwrap(), 0);
        assert_eq!(writer.current_path(), before.as_path());
    }

    #[test]
    fn test_wal_file_naming() {
        assert_eq!(wal_file_name(26), "wal-000000000000001a.akv");
        assert_eq!(parse_wal_sequence("wal-000000000000001a.akv"), Some(26));
        assert_eq!(parse_wal_sequence("data-0000.akv"), None);
        assert_eq!(parse_wal_sequence("wal-zz.akv"), None);
    }
}
