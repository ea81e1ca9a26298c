#![forbid(unsafe_code)]
//! Positional file access for record files.
//!
//! Every record file goes through a [`FileAccess`] handed out by the
//! engine's [`FileRegistry`]. Behind it sits a [`FileIo`]: a [`DiskFile`]
//! when the database has a data directory, a [`MemoryFile`] otherwise.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

use parking_lot::Mutex;
use tracing::trace;

use crate::types::{GraphError, Result};

mod registry;

pub use registry::{FileAccess, FileRegistry};

/// Byte-addressed storage behind one record file.
pub trait FileIo: Send + Sync + 'static {
    /// Fills `dst` from `off`; fails with `UnexpectedEof` past the end.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes `src` at `off`, growing the file when needed.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Makes previous writes durable.
    fn sync_all(&self) -> Result<()>;
    /// Current length in bytes.
    fn len(&self) -> Result<u64>;
    /// True when nothing was written yet.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], off: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, off)
}

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], off: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, off)
}

#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], off: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, off)
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], off: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, buf, off)
}

#[cfg(not(any(unix, windows)))]
fn pread(_file: &File, _buf: &mut [u8], _off: u64) -> io::Result<usize> {
    Err(io::Error::new(ErrorKind::Unsupported, "positional reads unsupported"))
}

#[cfg(not(any(unix, windows)))]
fn pwrite(_file: &File, _buf: &[u8], _off: u64) -> io::Result<usize> {
    Err(io::Error::new(ErrorKind::Unsupported, "positional writes unsupported"))
}

/// Record file on disk, opened read-write and never truncated.
pub struct DiskFile {
    file: File,
}

impl DiskFile {
    /// Opens `path`, creating an empty file when it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self { file })
    }
}

impl FileIo for DiskFile {
    fn read_at(&self, mut off: u64, mut dst: &mut [u8]) -> Result<()> {
        trace!(off, len = dst.len(), "io.read_at");
        while !dst.is_empty() {
            match pread(&self.file, dst, off)? {
                0 => {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "record file ended early",
                    )
                    .into())
                }
                n => {
                    dst = &mut std::mem::take(&mut dst)[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }

    fn write_at(&self, mut off: u64, mut src: &[u8]) -> Result<()> {
        trace!(off, len = src.len(), "io.write_at");
        while !src.is_empty() {
            match pwrite(&self.file, src, off)? {
                0 => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                n => {
                    src = &src[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// Growable buffer standing in for a record file of an ephemeral database.
#[derive(Default)]
pub struct MemoryFile {
    bytes: Mutex<Vec<u8>>,
}

impl MemoryFile {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

fn span(off: u64, len: usize) -> Result<(usize, usize)> {
    let start = usize::try_from(off).map_err(|_| GraphError::Invalid("offset out of range"))?;
    let end = start
        .checked_add(len)
        .ok_or(GraphError::Invalid("offset out of range"))?;
    Ok((start, end))
}

impl FileIo for MemoryFile {
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()> {
        let (start, end) = span(off, dst.len())?;
        let bytes = self.bytes.lock();
        let src = bytes
            .get(start..end)
            .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "record buffer ended early"))?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&self, off: u64, src: &[u8]) -> Result<()> {
        let (start, end) = span(off, src.len())?;
        let mut bytes = self.bytes.lock();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(src);
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.lock().len() as u64)
    }
}
