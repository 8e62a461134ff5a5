//! Buffered file stream
//!
//! Holds a whole file in memory and writes it back on close.

use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::warn;

use crate::error::{FlashError, Result};
use crate::fs::FileHandle;

use super::{OpenMode, Volume};

/// An open file on a `Volume`
///
/// Content lives in an in-memory buffer bounded by the volume's maximum
/// file size. `close()` (or dropping a dirty stream) flushes the buffer to
/// flash through `Filesystem::flush`.
pub struct FlashFile {
    volume: Volume,
    handle: FileHandle,
    name: String,
    mode: OpenMode,
    /// Whole file content; `buffer.len()` is the file size
    buffer: Vec<u8>,
    /// Current position
    pos: usize,
    /// Buffer differs from what is on flash
    dirty: bool,
    closed: bool,
}

impl FlashFile {
    pub(super) fn open(volume: Volume, name: &str, mode: OpenMode) -> Result<Self> {
        let capacity = volume.max_file_size();
        let (handle, buffer) = {
            let mut fs = volume.lock();
            let handle = match fs.open_file(name) {
                Ok(handle) => handle,
                Err(FlashError::NotFound(_)) if mode.creates() => fs.create_file(name)?,
                Err(e) => return Err(e),
            };

            let mut buffer = Vec::new();
            if mode.loads_content() {
                buffer.resize(capacity, 0);
                let outcome = fs.load_into(handle, &mut buffer)?;
                buffer.truncate(outcome.bytes_written);
            }
            (handle, buffer)
        };

        let pos = if mode.appends() { buffer.len() } else { 0 };
        Ok(Self {
            volume,
            handle,
            name: name.to_string(),
            mode,
            buffer,
            pos,
            // Write modes always rewrite the file on close.
            dirty: mode.writable(),
            closed: false,
        })
    }

    /// Current position
    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    /// Current file size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Write the buffer to flash if it changed
    pub fn sync(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.volume.lock().flush(self.handle, &self.buffer)?;
        self.dirty = false;
        Ok(())
    }

    /// Flush and close the stream
    pub fn close(mut self) -> Result<()> {
        let result = self.sync();
        self.closed = true;
        result
    }

    fn read_buf(&mut self, out: &mut [u8]) -> Result<usize> {
        if !self.mode.readable() {
            return Err(FlashError::NotReadable);
        }
        // A seek may leave the position past the end; that reads as EOF.
        if self.pos >= self.buffer.len() {
            return Ok(0);
        }
        let n = (self.buffer.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write_buf(&mut self, data: &[u8]) -> Result<usize> {
        if !self.mode.writable() {
            return Err(FlashError::NotWritable);
        }
        if self.mode.appends() {
            self.pos = self.buffer.len();
        }

        let limit = self.volume.max_file_size();
        let end = self.pos + data.len();
        if end > limit {
            return Err(FlashError::FileTooLarge { limit });
        }
        if end > self.buffer.len() {
            // Zero-fills any gap left by seeking past the end.
            self.buffer.resize(end, 0);
        }
        self.buffer[self.pos..end].copy_from_slice(data);
        self.pos = end;
        self.dirty = true;
        Ok(data.len())
    }

    fn seek_to(&mut self, target: SeekFrom) -> Result<u64> {
        let new_pos = match target {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => (self.pos as i64).saturating_add(delta),
            SeekFrom::End(delta) => (self.buffer.len() as i64).saturating_add(delta),
        };
        if new_pos < 0 || new_pos as u64 > self.volume.max_file_size() as u64 {
            return Err(FlashError::InvalidSeek(new_pos));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }
}

impl Read for FlashFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_buf(buf)?)
    }
}

impl Write for FlashFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_buf(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.sync()?)
    }
}

impl Seek for FlashFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}

impl Drop for FlashFile {
    fn drop(&mut self) {
        if self.closed || !self.dirty {
            return;
        }
        if let Err(e) = self.sync() {
            warn!(name = %self.name, error = %e, "failed to flush stream on drop");
        }
    }
}
