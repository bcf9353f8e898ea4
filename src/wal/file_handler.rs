//! Durable file I/O for log segments.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::util::filename;
use crate::{Error, Result};

/// How the active segment is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenMode {
    /// Create or truncate, write from the start.
    Write,
    /// Open an existing segment; reads anywhere, writes appended at the end.
    ReadWrite,
    /// Read only.
    Read,
}

/// Owns at most one segment file descriptor at a time.
///
/// Offsets mirror between file and slab: [`load`](LogFileHandler::load)
/// reads file bytes `[offset, offset + dst.len())` into a destination
/// slice the caller has positioned at the same slab offset, so in-memory
/// offsets equal on-disk offsets.
pub(crate) struct LogFileHandler {
    dir: PathBuf,
    name: String,
    mode: OpenMode,
    file: Option<File>,
}

impl LogFileHandler {
    /// Create a handler for segments under `dir`. Does not open anything.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            name: String::new(),
            mode: OpenMode::Write,
            file: None,
        }
    }

    /// Point the handler at segment `file_no`. Does not open.
    pub fn set_file_name(&mut self, file_no: u32) {
        self.name = filename::wal_file_name(file_no);
    }

    /// Set the mode the next open uses.
    pub fn set_open_mode(&mut self, mode: OpenMode) {
        self.mode = mode;
    }

    /// Full path of the active segment.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Whether the active segment exists on disk.
    pub fn file_exists(&self) -> bool {
        self.path().exists()
    }

    /// Open the active segment in the configured mode.
    pub fn open_file(&mut self) -> Result<()> {
        let file = match self.mode {
            OpenMode::Write => OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(self.path()),
            OpenMode::ReadWrite => OpenOptions::new().read(true).append(true).open(self.path()),
            OpenMode::Read => OpenOptions::new().read(true).open(self.path()),
        }?;
        self.file = Some(file);
        Ok(())
    }

    /// Close the active segment if open.
    pub fn close_file(&mut self) {
        self.file = None;
    }

    /// Size in bytes of the active segment.
    pub fn file_size(&self) -> Result<u64> {
        Ok(filename::file_size(&self.path())?)
    }

    /// Read `dst.len()` bytes at file offset `offset` into `dst`.
    pub fn load(&mut self, dst: &mut [u8], offset: u32) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let file = self.ensure_open()?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.read_exact(dst)?;
        Ok(())
    }

    /// Append `src` to the active segment, flushed to the OS on return.
    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        let file = self.ensure_open()?;
        file.write_all(src)?;
        file.sync_data()?;
        Ok(())
    }

    /// Truncate the active segment to `len` bytes. Later writes continue
    /// at the new end.
    pub fn truncate(&mut self, len: u32) -> Result<()> {
        let file = self.ensure_open()?;
        file.set_len(len as u64)?;
        file.seek(SeekFrom::Start(len as u64))?;
        Ok(())
    }

    /// Close the current segment and start `file_no` fresh for writing.
    pub fn reborn(&mut self, file_no: u32) -> Result<()> {
        self.close_file();
        self.set_file_name(file_no);
        self.set_open_mode(OpenMode::Write);
        self.open_file()
    }

    fn ensure_open(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            self.open_file()?;
        }
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(Error::Io("segment not open".into())),
        }
    }
}
