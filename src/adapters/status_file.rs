//! File-backed status store adapter.
//!
//! Implements [`StatusStore`] with one small file shared between the
//! monitor process (the only writer) and any number of reader processes.
//!
//! ## Format
//!
//! ```text
//!   ┌──────────┬──────────────────────────────────────────┐
//!   │ "PS"     │ postcard(StatusRecord)                   │
//!   │ 2 bytes  │ status code (u8) + count (varint)        │
//!   └──────────┴──────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//!
//! Writes go to `<path>.tmp`, are fsynced, then renamed over `<path>`.
//! `rename(2)` within one directory is atomic, so a reader opens either
//! the previous record or the new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::{StatusStore, StoreError};
use crate::status::StatusRecord;

/// Leading bytes of every record file.
const MAGIC: [u8; 2] = *b"PS";

/// Status store backed by a single file.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Encode a record into the on-disk format.
pub fn encode(record: &StatusRecord) -> Result<Vec<u8>, StoreError> {
    let mut bytes = MAGIC.to_vec();
    let body = postcard::to_allocvec(record).map_err(|_| StoreError::Corrupted)?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode the on-disk format.  Wrong magic, truncation and trailing bytes
/// are all [`StoreError::Corrupted`].
pub fn decode(bytes: &[u8]) -> Result<StatusRecord, StoreError> {
    let body = bytes.strip_prefix(&MAGIC).ok_or(StoreError::Corrupted)?;
    let (record, rest) =
        postcard::take_from_bytes::<StatusRecord>(body).map_err(|_| StoreError::Corrupted)?;
    if !rest.is_empty() {
        return Err(StoreError::Corrupted);
    }
    Ok(record)
}

impl StatusStore for StatusFile {
    fn try_read(&self) -> Result<StatusRecord, StoreError> {
        let bytes = fs::read(&self.path)?;
        decode(&bytes)
    }

    fn write(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let bytes = encode(record)?;
        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::from(e)
        })?;
        debug!("StatusFile: wrote {:?}", record);
        Ok(())
    }

    fn initialize(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.write(&StatusRecord::default())?;
        info!("StatusFile: created {}", self.path.display());
        Ok(())
    }

    fn destroy(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("StatusFile: removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
