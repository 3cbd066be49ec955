//! Append-only series files.
//!
//! One series file holds the records of one (symbol[, timeframe]). Writers
//! append encoded records and fsync before committing their cursor; readers
//! bound everything by the committed `out_pos` and may memory-map the file
//! concurrently with appends.

use crate::codec::{self, RECORD_SIZE};
use cascata_types::{BarRecord, CascataError, Result};
use memmap2::Mmap;
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An append-only record file opened for writing.
#[derive(Debug)]
pub struct SeriesFile {
    path: PathBuf,
    file: fs::File,
}

impl SeriesFile {
    /// Opens (creating if needed) the series file at `path`, creating
    /// parent directories as required.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CascataError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| CascataError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    /// Returns the series file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current physical length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if file metadata cannot be read.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Returns true if the file currently holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if file metadata cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Truncates the file down to `len` bytes.
    ///
    /// Called on batch start to drop uncommitted bytes: an append that
    /// began but never committed, or the previous batch's ephemeral
    /// trailing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the truncate fails.
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .map_err(|source| CascataError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Appends encoded records at the end of the file.
    ///
    /// Returns the new physical length. The data is not durable until
    /// [`Self::sync`] succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if seeking or writing fails.
    pub fn append(&mut self, bars: &[BarRecord]) -> Result<u64> {
        let write_err = |source| CascataError::Write {
            path: self.path.clone(),
            source,
        };
        let end = self.file.seek(SeekFrom::End(0)).map_err(write_err)?;
        self.file
            .write_all(&codec::encode_records(bars))
            .map_err(write_err)?;
        Ok(end + (bars.len() * RECORD_SIZE) as u64)
    }

    /// Flushes appended data to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the fsync fails.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().map_err(|source| CascataError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Reads the committed byte range `[from, to)` of a series file as decoded
/// records, via a zero-copy memory map.
///
/// `to` must come from the owning cursor's `out_pos` (or the source's
/// committed `out_pos`); bytes beyond it are never trusted. An absent file
/// with an empty requested range yields no records.
///
/// # Errors
///
/// Returns an error if the range exceeds the physical file, is misaligned,
/// or the file cannot be mapped.
pub fn read_committed(path: &Path, from: u64, to: u64) -> Result<Vec<BarRecord>> {
    if to <= from {
        return Ok(Vec::new());
    }

    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CascataError::Codec(format!(
                "committed range {from}..{to} on absent series '{}'",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let len = file.metadata()?.len();
    if to > len {
        return Err(CascataError::Codec(format!(
            "committed range {from}..{to} exceeds series '{}' length {len}",
            path.display()
        )));
    }

    // SAFETY: the mapped range is bounded by a committed out_pos; the only
    // concurrent writer appends strictly past it.
    let mmap = unsafe { Mmap::map(&file)? };
    let records = codec::decode_records(&mmap[from as usize..to as usize])?;
    Ok(records.collect())
}
