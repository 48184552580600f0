//! Flash readback
//!
//! A [`FlashSession`] is opened per device and copies the programmed image
//! into a file. Sessions report whether they are usable before any I/O is
//! attempted, and publish progress through [`ReadbackProgress`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::FlashError;

/// Default chunk size for reading (4 KiB)
pub const READ_CHUNK_SIZE: usize = 4096;

/// Device-scoped flash access
pub trait FlashSession {
    /// Whether the session refers to a live, readable flash
    fn is_valid(&self) -> bool;

    /// Total flash size in bytes
    fn size(&self) -> Result<u64, FlashError>;

    /// Copy the whole flash into `output`, returning the number of bytes written
    ///
    /// The output is created (or truncated) before the first read. If the
    /// transfer fails midway the partial file is left in place.
    fn read_back(
        &mut self,
        output: &Path,
        progress: &mut dyn ReadbackProgress,
    ) -> Result<u64, FlashError>;
}

/// Progress callbacks for a readback
pub trait ReadbackProgress {
    /// Transfer of `total_bytes` is about to start
    fn started(&mut self, total_bytes: u64);

    /// `bytes_read` bytes have been copied so far
    fn advanced(&mut self, bytes_read: u64);

    /// Transfer finished
    fn finished(&mut self, total_bytes: u64);
}

/// Progress sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ReadbackProgress for NoProgress {
    fn started(&mut self, _total_bytes: u64) {}
    fn advanced(&mut self, _bytes_read: u64) {}
    fn finished(&mut self, _total_bytes: u64) {}
}

/// Stream `total` bytes from `source` into a newly created file at `output`
///
/// Shared by backends whose flash is exposed as a readable stream.
pub fn copy_image<R: Read + ?Sized>(
    source: &mut R,
    total: u64,
    output: &Path,
    progress: &mut dyn ReadbackProgress,
) -> Result<u64, FlashError> {
    let file = File::create(output).map_err(|source| FlashError::Create {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    let write_err = |source| FlashError::Write {
        path: output.to_path_buf(),
        source,
    };

    progress.started(total);

    let mut buf = [0u8; READ_CHUNK_SIZE];
    let mut offset = 0u64;
    while offset < total {
        let chunk_size = core::cmp::min(READ_CHUNK_SIZE as u64, total - offset) as usize;
        let chunk = &mut buf[..chunk_size];

        source
            .read_exact(chunk)
            .map_err(|source| FlashError::Read {
                offset,
                len: chunk_size,
                source,
            })?;
        writer.write_all(chunk).map_err(write_err)?;

        offset += chunk_size as u64;
        progress.advanced(offset);
    }

    writer.flush().map_err(write_err)?;
    progress.finished(total);

    log::debug!("Copied {} bytes of flash to {}", total, output.display());
    Ok(total)
}
