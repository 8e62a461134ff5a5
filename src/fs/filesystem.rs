//! Filesystem context
//!
//! Owns the flash store, the directory and the log append cursor.

use std::collections::{BTreeMap, HashMap};

use bytes::{Bytes, BytesMut};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{FlashError, Result};
use crate::flash::FlashStore;
use crate::log::{self, LogEntry, LogLayout};

use super::file::{ChunkRef, FileHandle, FileStat, FsFile, HeaderRef, LoadOutcome};
use super::scan::{self, ScanReport};

/// Lifecycle of the in-memory directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    /// Log not scanned yet
    Uninitialized,
    /// Directory reflects the log
    Ready,
    /// The startup scan failed; nothing may touch the medium again
    Failed,
}

/// A log-structured filesystem over one flash store
///
/// ## Concurrency
/// All operations take `&mut self`; nothing here is safe to share without
/// an outer lock (see `stream::Volume`).
///
/// ## Initialization
/// The log is scanned on `init()` or lazily by the first file operation.
/// A failed scan is sticky: every later call returns
/// `FlashError::AlreadyInitFailed` without reading the medium.
pub struct Filesystem {
    /// Emulated flash device
    store: FlashStore,

    /// Slot geometry of the log
    layout: LogLayout,

    state: InitState,

    /// Name → handle, kept sorted by name
    directory: BTreeMap<String, FileHandle>,

    /// Handle → file
    files: HashMap<FileHandle, FsFile>,

    /// Next handle value to hand out (never reused)
    next_handle: u32,

    /// Next free log slot
    append_cursor: u32,

    /// Object id for the next new header
    next_object_id: u16,

    /// Report of the scan that initialized this instance
    scan_report: Option<ScanReport>,
}

impl Filesystem {
    /// Build a filesystem for the configured image; the log is not read yet
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = FlashStore::new(&config.image_path, config.geometry());
        Ok(Self::with_store(store, config.log_layout()))
    }

    /// Build a filesystem over an existing store
    pub fn with_store(store: FlashStore, layout: LogLayout) -> Self {
        Self {
            store,
            layout,
            state: InitState::Uninitialized,
            directory: BTreeMap::new(),
            files: HashMap::new(),
            next_handle: 1,
            append_cursor: 0,
            next_object_id: 1,
            scan_report: None,
        }
    }

    /// Scan the log and rebuild the directory
    ///
    /// Idempotent once it has succeeded. After a failure every call returns
    /// `AlreadyInitFailed`.
    pub fn init(&mut self) -> Result<()> {
        match self.state {
            InitState::Ready => return Ok(()),
            InitState::Failed => return Err(FlashError::AlreadyInitFailed),
            InitState::Uninitialized => {}
        }

        let outcome = match scan::scan(&mut self.store, &self.layout) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "log scan failed, filesystem disabled");
                self.state = InitState::Failed;
                return Err(e);
            }
        };

        // Retire shadowed headers so a later delete cannot resurrect them.
        for &slot in &outcome.shadowed_headers {
            if let Err(e) = log::invalidate(&mut self.store, &self.layout, slot) {
                error!(slot, error = %e, "failed to retire shadowed header, filesystem disabled");
                self.state = InitState::Failed;
                return Err(e);
            }
        }

        self.directory.clear();
        self.files.clear();
        for (name, file) in outcome.files {
            let handle = self.allocate_handle();
            self.directory.insert(name, handle);
            self.files.insert(handle, file);
        }
        self.append_cursor = outcome.report.append_cursor;
        self.next_object_id = outcome.next_object_id;

        info!(
            files = self.directory.len(),
            slots_used = outcome.report.slots_scanned,
            invalidated = outcome.report.invalidated,
            orphaned = outcome.report.orphaned_chunks,
            free = self.free_slots(),
            "filesystem initialized"
        );

        self.scan_report = Some(outcome.report);
        self.state = InitState::Ready;
        Ok(())
    }

    /// Look up a file by name
    pub fn open_file(&mut self, name: &str) -> Result<FileHandle> {
        self.ensure_ready()?;
        self.directory
            .get(name)
            .copied()
            .ok_or_else(|| FlashError::NotFound(name.to_string()))
    }

    /// Add a new, empty file to the directory
    ///
    /// Nothing is written to flash until the first flush.
    pub fn create_file(&mut self, name: &str) -> Result<FileHandle> {
        self.ensure_ready()?;
        if name.is_empty() || name.len() > self.layout.max_payload() as usize {
            return Err(FlashError::InvalidName(name.to_string()));
        }
        if self.directory.contains_key(name) {
            return Err(FlashError::AlreadyExists(name.to_string()));
        }

        let handle = self.allocate_handle();
        self.directory.insert(name.to_string(), handle);
        self.files.insert(handle, FsFile::new(name));

        debug!(name, "created file");
        Ok(handle)
    }

    /// Read a file's full content from flash
    ///
    /// The number of bytes read becomes the file's recorded size.
    pub fn load_data(&mut self, handle: FileHandle) -> Result<Bytes> {
        self.ensure_ready()?;
        let file = self.files.get(&handle).ok_or(FlashError::StaleHandle)?;
        let object_id = file.header.map(|h| h.object_id).unwrap_or_default();
        let chunks = file.chunks.clone();

        let mut data = BytesMut::new();
        for chunk in &chunks {
            let entry = LogEntry::data_chunk(chunk.slot, object_id, chunk.chunk_id, chunk.payload_size);
            let payload = log::decode_payload(&mut self.store, &self.layout, &entry)?;
            data.extend_from_slice(&payload);
        }

        if let Some(file) = self.files.get_mut(&handle) {
            file.set_data_size(data.len() as u64);
        }
        Ok(data.freeze())
    }

    /// Copy a file's content into `buffer`
    ///
    /// A buffer smaller than the file receives a prefix and the outcome is
    /// marked truncated.
    pub fn load_into(&mut self, handle: FileHandle, buffer: &mut [u8]) -> Result<LoadOutcome> {
        let data = self.load_data(handle)?;
        let n = data.len().min(buffer.len());
        buffer[..n].copy_from_slice(&data[..n]);

        let truncated = n < data.len();
        if truncated {
            warn!(
                file_size = data.len(),
                capacity = buffer.len(),
                "file content truncated to buffer capacity"
            );
        }
        Ok(LoadOutcome {
            bytes_written: n,
            file_size: data.len() as u64,
            truncated,
        })
    }

    /// Total bytes of content in a file
    pub fn file_size(&mut self, handle: FileHandle) -> Result<u64> {
        self.ensure_ready()?;
        self.file(handle).map(FsFile::data_size)
    }

    /// Replace a file's content on flash with `data`
    ///
    /// Steps:
    /// 1. Invalidate every existing data chunk record
    /// 2. Append a header record if the file has none yet
    /// 3. Grow or shrink the chunk id list to fit `data`
    /// 4. Append one record per chunk, in chunk id order
    ///
    /// Fails with `LogFull` when the log runs out of slots. Records appended
    /// before the failure stay on flash and the file keeps exactly the
    /// chunks that made it.
    pub fn flush(&mut self, handle: FileHandle, data: &[u8]) -> Result<()> {
        self.ensure_ready()?;
        let mut file = self.files.remove(&handle).ok_or(FlashError::StaleHandle)?;
        let result = self.flush_file(&mut file, data);
        self.files.insert(handle, file);
        result
    }

    /// Remove a file and invalidate all of its records
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        self.ensure_ready()?;
        let handle = self
            .directory
            .get(name)
            .copied()
            .ok_or_else(|| FlashError::NotFound(name.to_string()))?;
        let file = self.files.get(&handle).ok_or(FlashError::StaleHandle)?;

        let slots: Vec<u32> = file
            .header
            .iter()
            .map(|h| h.slot)
            .chain(file.chunks.iter().map(|c| c.slot))
            .collect();
        for slot in slots {
            log::invalidate(&mut self.store, &self.layout, slot)?;
        }

        self.directory.remove(name);
        self.files.remove(&handle);
        debug!(name, "deleted file");
        Ok(())
    }

    /// Erase the whole device and start over with an empty directory
    pub fn format(&mut self) -> Result<()> {
        if self.state == InitState::Failed {
            return Err(FlashError::AlreadyInitFailed);
        }
        self.store.erase_all()?;

        self.directory.clear();
        self.files.clear();
        self.append_cursor = 0;
        self.next_object_id = 1;
        self.scan_report = None;
        self.state = InitState::Ready;

        info!(slots = self.layout.total_entries(), "formatted filesystem");
        Ok(())
    }

    // =========================================================================
    // Accessors (for tooling, testing and debugging)
    // =========================================================================

    /// All file names in directory order
    pub fn file_names(&mut self) -> Result<Vec<String>> {
        self.ensure_ready()?;
        Ok(self.directory.keys().cloned().collect())
    }

    /// Summary of one file
    pub fn stat(&mut self, handle: FileHandle) -> Result<FileStat> {
        self.ensure_ready()?;
        let file = self.file(handle)?;
        Ok(FileStat {
            name: file.name().to_string(),
            size: file.data_size(),
            chunk_count: file.chunks().len(),
            object_id: file.header().map(|h| h.object_id),
        })
    }

    /// Chunk ids of a file's live data records, ascending
    pub fn chunk_ids(&mut self, handle: FileHandle) -> Result<Vec<u16>> {
        self.ensure_ready()?;
        self.file(handle).map(FsFile::chunk_ids)
    }

    /// Slots holding a file's live data records, in chunk order
    pub fn chunk_slots(&mut self, handle: FileHandle) -> Result<Vec<u32>> {
        self.ensure_ready()?;
        Ok(self.file(handle)?.chunks().iter().map(|c| c.slot).collect())
    }

    /// Decode the raw record header stored in `slot`
    pub fn entry_at(&mut self, slot: u32) -> Result<LogEntry> {
        self.ensure_ready()?;
        if slot >= self.layout.total_entries() {
            return Err(FlashError::BadAddress(self.layout.slot_address(slot)));
        }
        log::decode_header(&mut self.store, &self.layout, slot)
    }

    /// Next free log slot
    pub fn append_cursor(&self) -> u32 {
        self.append_cursor
    }

    /// Object id the next new file will get
    pub fn next_object_id(&self) -> u16 {
        self.next_object_id
    }

    /// Slots left before the log is full
    pub fn free_slots(&self) -> u32 {
        self.layout.total_entries().saturating_sub(self.append_cursor)
    }

    /// Slot geometry of the log
    pub fn layout(&self) -> &LogLayout {
        &self.layout
    }

    /// Report of the scan that initialized this instance, if any
    pub fn scan_report(&self) -> Option<&ScanReport> {
        self.scan_report.as_ref()
    }

    /// Whether the startup scan failed
    pub fn has_failed(&self) -> bool {
        self.state == InitState::Failed
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_ready(&mut self) -> Result<()> {
        match self.state {
            InitState::Ready => Ok(()),
            InitState::Failed => Err(FlashError::AlreadyInitFailed),
            InitState::Uninitialized => self.init(),
        }
    }

    fn file(&self, handle: FileHandle) -> Result<&FsFile> {
        self.files.get(&handle).ok_or(FlashError::StaleHandle)
    }

    fn allocate_handle(&mut self) -> FileHandle {
        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Next free log slot, left unclaimed until `append` succeeds
    fn next_slot(&self) -> Result<u32> {
        if self.append_cursor >= self.layout.total_entries() {
            return Err(FlashError::LogFull);
        }
        Ok(self.append_cursor)
    }

    /// Program a record at the append cursor and advance past it
    ///
    /// The cursor only moves once the write has landed, so a failed write
    /// never leaves a virgin hole in front of later records.
    fn append(&mut self, entry: &LogEntry, payload: &[u8]) -> Result<()> {
        log::write_entry(&mut self.store, &self.layout, entry, payload)?;
        self.append_cursor = entry.slot + 1;
        Ok(())
    }

    fn flush_file(&mut self, file: &mut FsFile, data: &[u8]) -> Result<()> {
        let max_payload = self.layout.max_payload() as usize;

        // Step 1: retire the current content
        for chunk in &file.chunks {
            log::invalidate(&mut self.store, &self.layout, chunk.slot)?;
        }
        let previous_ids = file.chunk_ids();
        file.chunks.clear();
        file.set_data_size(0);

        // Step 2: materialize the header on first flush
        let object_id = match file.header {
            Some(header) => header.object_id,
            None => {
                if self.next_object_id == u16::MAX {
                    return Err(FlashError::LogFull);
                }
                let slot = self.next_slot()?;
                let object_id = self.next_object_id;

                let name = file.name().as_bytes();
                let entry = LogEntry::header(slot, object_id, name.len() as u16);
                self.append(&entry, name)?;
                self.next_object_id += 1;
                file.header = Some(HeaderRef { slot, object_id });
                object_id
            }
        };

        // Step 3: keep existing ids, continue past the previous maximum
        let needed = self.layout.chunks_needed(data.len());
        let mut chunk_ids: Vec<u16> = previous_ids.iter().copied().take(needed).collect();
        let mut next_id = previous_ids.last().map_or(Some(0), |max| max.checked_add(1));
        while chunk_ids.len() < needed {
            let id = next_id.ok_or(FlashError::LogFull)?;
            chunk_ids.push(id);
            next_id = id.checked_add(1);
        }

        // Step 4: append one record per slice
        for (chunk_id, piece) in chunk_ids.into_iter().zip(data.chunks(max_payload)) {
            let slot = self.next_slot()?;
            let entry = LogEntry::data_chunk(slot, object_id, chunk_id, piece.len() as u16);
            self.append(&entry, piece)?;

            file.chunks.push(ChunkRef {
                chunk_id,
                slot,
                payload_size: entry.payload_size,
            });
            file.set_data_size(file.data_size() + piece.len() as u64);
        }

        debug!(
            name = file.name(),
            size = data.len(),
            chunks = file.chunks.len(),
            cursor = self.append_cursor,
            "flushed file"
        );
        Ok(())
    }
}
