//! Fixed-block, append-only storage volume.
//!
//! A volume is a single file: a header block holding the next-free offset,
//! followed by bin-framed records written back-to-back. Records are never
//! rewritten in place; deletion only flips a flag bit, and reclaiming space
//! is left to a future compaction pass (not part of this engine's scope).

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use idx_config::StorageSettings;

use crate::error::StorageError;

const CHECKSUM_SEED: u32 = 0x02DE_BC47;
const ALIGNMENT: u64 = 8;
const FLAG_COMPRESSED: u8 = 0x01;
const FLAG_DELETED: u8 = 0x02;

/// The highest byte offset a record may be written at. The header stores
/// the next-free offset as a `u32` count of 8-byte units (§6), so this is
/// the largest offset that count can represent.
const STORAGE_LAST_BLOCK_OFFSET: u64 = u32::MAX as u64 * ALIGNMENT;

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// An append-only, fixed-block storage volume backed by a single file.
pub struct Volume {
    file: File,
    path: PathBuf,
    settings: StorageSettings,
    /// Next free byte offset, persisted into the header block on commit.
    offset: u64,
    closed: bool,
}

impl Volume {
    /// Opens an existing volume or creates a new one with an empty header
    /// block.
    pub fn open(path: &Path, settings: StorageSettings) -> Result<Self, StorageError> {
        let is_new = !path.exists();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StorageError::io(path, e))?;

        let offset = if is_new {
            file.set_len(u64::from(settings.block_size)).map_err(|e| StorageError::io(path, e))?;
            let header_offset = u64::from(settings.block_size);
            Self::write_header(&mut file, path, header_offset, settings.block_size)?;
            header_offset
        } else {
            Self::read_header(&mut file, path)?
        };

        Ok(Self { file, path: path.to_path_buf(), settings, offset, closed: false })
    }

    /// Writes the `u32` next-free offset (in 8-byte units) at the start of
    /// the header block, zero-padded out to `block_size` (§6).
    fn write_header(file: &mut File, path: &Path, offset: u64, block_size: u32) -> Result<(), StorageError> {
        let units = u32::try_from(offset / ALIGNMENT)
            .map_err(|_| StorageError::Eof { offset })?;
        let mut header = vec![0u8; block_size as usize];
        header[..4].copy_from_slice(&units.to_le_bytes());
        file.seek(SeekFrom::Start(0)).map_err(|e| StorageError::io(path, e))?;
        file.write_all(&header).map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    fn read_header(file: &mut File, path: &Path) -> Result<u64, StorageError> {
        file.seek(SeekFrom::Start(0)).map_err(|e| StorageError::io(path, e))?;
        let mut buf = [0u8; 4];
        file.read_exact(&mut buf).map_err(|e| StorageError::io(path, e))?;
        Ok(u64::from(u32::from_le_bytes(buf)) * ALIGNMENT)
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed {
            return Err(StorageError::Closed { path: self.path.clone() });
        }
        Ok(())
    }

    /// Appends a record, optionally LZ4-compressing it per the volume's
    /// configured `compress` setting. Returns the byte offset the record
    /// was written at, to be used as its handle.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64, StorageError> {
        self.ensure_open()?;

        let (flags, body) = if self.settings.compress {
            let compressed = lz4::block::compress(payload, None, true)
                .map_err(|e| StorageError::io(&self.path, e))?;
            (FLAG_COMPRESSED, compressed)
        } else {
            (0u8, payload.to_vec())
        };

        let size = u32::try_from(body.len())
            .map_err(|_| StorageError::CorruptVolume { path: self.path.clone(), offset: self.offset, detail: "record too large".to_string() })?;
        let checksum = xxhash_rust::xxh32::xxh32(&body, CHECKSUM_SEED);

        let record_offset = self.offset;
        let record_len = 1 + 4 + body.len() as u64 + 4;
        let new_offset = record_offset + align_up(record_len, ALIGNMENT);
        if new_offset > STORAGE_LAST_BLOCK_OFFSET {
            return Err(StorageError::Eof { offset: record_offset });
        }

        self.grow_if_needed(body.len() as u64)?;

        self.file.seek(SeekFrom::Start(record_offset)).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.write_all(&[flags]).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.write_all(&size.to_le_bytes()).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.write_all(&body).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.write_all(&checksum.to_le_bytes()).map_err(|e| StorageError::io(&self.path, e))?;

        self.offset = new_offset;
        Ok(record_offset)
    }

    /// Reads the record at `offset`. Fails with [`StorageError::NotFound`]
    /// if the record has been deleted, and with
    /// [`StorageError::CorruptVolume`] on a checksum mismatch.
    pub fn read(&mut self, offset: u64) -> Result<Vec<u8>, StorageError> {
        self.ensure_open()?;

        self.file.seek(SeekFrom::Start(offset)).map_err(|e| StorageError::io(&self.path, e))?;
        let mut flags_buf = [0u8; 1];
        self.file.read_exact(&mut flags_buf).map_err(|e| StorageError::io(&self.path, e))?;
        let flags = flags_buf[0];

        if flags & FLAG_DELETED != 0 {
            return Err(StorageError::NotFound { path: self.path.clone(), offset });
        }

        let mut size_buf = [0u8; 4];
        self.file.read_exact(&mut size_buf).map_err(|e| StorageError::io(&self.path, e))?;
        let size = u32::from_le_bytes(size_buf) as usize;

        let mut body = vec![0u8; size];
        self.file.read_exact(&mut body).map_err(|e| StorageError::io(&self.path, e))?;

        let mut checksum_buf = [0u8; 4];
        self.file.read_exact(&mut checksum_buf).map_err(|e| StorageError::io(&self.path, e))?;
        let expected = u32::from_le_bytes(checksum_buf);
        let actual = xxhash_rust::xxh32::xxh32(&body, CHECKSUM_SEED);
        if actual != expected {
            return Err(StorageError::CorruptVolume {
                path: self.path.clone(),
                offset,
                detail: format!("checksum mismatch: expected {expected:#x}, got {actual:#x}"),
            });
        }

        if flags & FLAG_COMPRESSED != 0 {
            lz4::block::decompress(&body, None).map_err(|e| StorageError::io(&self.path, e))
        } else {
            Ok(body)
        }
    }

    /// Marks the record at `offset` as deleted without reclaiming its space.
    pub fn delete(&mut self, offset: u64) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| StorageError::io(&self.path, e))?;
        let mut flags_buf = [0u8; 1];
        self.file.read_exact(&mut flags_buf).map_err(|e| StorageError::io(&self.path, e))?;
        flags_buf[0] |= FLAG_DELETED;
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| StorageError::io(&self.path, e))?;
        self.file.write_all(&flags_buf).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }

    fn grow_if_needed(&mut self, incoming: u64) -> Result<(), StorageError> {
        let len = self.file.metadata().map_err(|e| StorageError::io(&self.path, e))?.len();
        let free = len.saturating_sub(self.offset);
        let min_free = u64::from(self.settings.blocks_min_free) * u64::from(self.settings.block_size);
        if free >= incoming + min_free {
            return Ok(());
        }
        let target = ((len as f64) * self.settings.growth_factor).ceil() as u64;
        let needed = self.offset + incoming + min_free;
        self.file.set_len(target.max(needed)).map_err(|e| StorageError::io(&self.path, e))?;
        Ok(())
    }

    /// Persists the header (next-free offset) and, per `sync_mode`, fsyncs
    /// the volume. `NoSync` and `AsyncSync` skip the synchronous fsync here;
    /// `AsyncSync` callers are expected to hand the path to a
    /// [`crate::debounce::FsyncDebouncer`] instead.
    pub fn commit(&mut self, sync_mode: idx_config::SyncMode) -> Result<(), StorageError> {
        self.ensure_open()?;
        let offset = self.offset;
        Self::write_header(&mut self.file, &self.path, offset, self.settings.block_size)?;
        match sync_mode {
            idx_config::SyncMode::NoSync | idx_config::SyncMode::AsyncSync => Ok(()),
            idx_config::SyncMode::Sync | idx_config::SyncMode::FullSync => {
                self.file.sync_all().map_err(|e| StorageError::io(&self.path, e))
            }
        }
    }

    /// Closes the volume; subsequent operations fail with [`StorageError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// The volume's file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Scans `dir` for files matching `<stem>.<n>` and returns the lowest and
/// highest numeric suffix found, for bootstrap recovery across a
/// multi-volume directory.
pub fn get_volumes_range(dir: &Path, stem: &str) -> Result<(u64, u64), StorageError> {
    let entries = std::fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;
    let prefix = format!("{stem}.");

    let mut numbers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(suffix) = name.strip_prefix(&prefix) {
            if let Ok(n) = suffix.parse::<u64>() {
                numbers.push(n);
            }
        }
    }

    if numbers.is_empty() {
        return Err(StorageError::NoFile { dir: dir.to_path_buf(), pattern: format!("{prefix}<n>") });
    }
    let lowest = *numbers.iter().min().unwrap();
    let highest = *numbers.iter().max().unwrap();
    Ok((lowest, highest))
}
