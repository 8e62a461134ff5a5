//! Startup scan
//!
//! Rebuilds the directory by walking the log from slot 0.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::error::{FlashError, Result};
use crate::flash::FlashStore;
use crate::log::{self, EntryType, LogEntry, LogLayout};

use super::file::{ChunkRef, FsFile, HeaderRef};

/// Statistics from a startup scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Used slots walked before the first virgin slot
    pub slots_scanned: u32,

    /// First unused slot, where the next append goes
    pub append_cursor: u32,

    /// Valid header records that became files
    pub live_headers: u32,

    /// Valid data chunks attached to a file
    pub live_chunks: u32,

    /// Records whose valid bit was cleared
    pub invalidated: u32,

    /// Valid data chunks with no live header (or shadowed by a newer copy)
    pub orphaned_chunks: u32,

    /// Valid records of unknown type or with an impossible payload size
    pub skipped: u32,
}

/// Everything the filesystem needs from a scan
pub(crate) struct ScanOutcome {
    /// Files keyed by name, sorted
    pub files: BTreeMap<String, FsFile>,
    pub next_object_id: u16,
    pub report: ScanReport,
    /// Slots of valid headers shadowed by a newer header of the same name
    pub shadowed_headers: Vec<u32>,
}

/// Scan the log and stitch headers and chunks into files
///
/// Steps:
/// 1. Walk slots in order until the first unused one (the append cursor)
/// 2. Drop invalidated records, bucket the rest by type
/// 3. Join each header with the chunks sharing its object id
///
/// Any read failure aborts with `FlashError::Decode`.
pub(crate) fn scan(store: &mut FlashStore, layout: &LogLayout) -> Result<ScanOutcome> {
    let mut report = ScanReport {
        append_cursor: layout.total_entries(),
        ..ScanReport::default()
    };
    let mut headers: Vec<LogEntry> = Vec::new();
    let mut chunks: HashMap<u16, Vec<LogEntry>> = HashMap::new();
    let mut max_object_id: Option<u16> = None;

    // Step 1 + 2: scan and classify
    for slot in 0..layout.total_entries() {
        let entry = log::decode_header(store, layout, slot).map_err(|e| FlashError::Decode {
            slot,
            source: Box::new(e),
        })?;

        if !entry.status.is_used() {
            report.append_cursor = slot;
            break;
        }
        report.slots_scanned += 1;

        // Ids of dead records stay reserved so stray chunks never attach to
        // a future file.
        max_object_id = max_object_id.max(Some(entry.object_id));

        if !entry.status.is_valid() {
            report.invalidated += 1;
            continue;
        }
        if u32::from(entry.payload_size) > layout.max_payload() {
            warn!(slot, size = entry.payload_size, "log record payload too large, skipping");
            report.skipped += 1;
            continue;
        }

        match entry.entry_type {
            EntryType::Header => headers.push(entry),
            EntryType::DataChunk => chunks.entry(entry.object_id).or_default().push(entry),
            EntryType::Unknown(kind) => {
                warn!(slot, kind, "unknown log record type, skipping");
                report.skipped += 1;
            }
        }
    }

    // Step 3: stitch
    let mut files: BTreeMap<String, FsFile> = BTreeMap::new();
    let mut shadowed_headers = Vec::new();
    for header in headers {
        let name_bytes = log::decode_payload(store, layout, &header).map_err(|e| {
            FlashError::Decode {
                slot: header.slot,
                source: Box::new(e),
            }
        })?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let (file_chunks, shadowed) = collect_chunks(chunks.remove(&header.object_id));
        report.orphaned_chunks += shadowed;
        report.live_chunks += file_chunks.len() as u32;

        let header_ref = HeaderRef {
            slot: header.slot,
            object_id: header.object_id,
        };
        let file = FsFile::from_log(name.clone(), header_ref, file_chunks);

        // Headers arrive in slot order, so a later copy of a name wins.
        if let Some(older) = files.insert(name, file) {
            warn!(
                name = older.name(),
                header = ?older.header(),
                "duplicate file header, keeping the newer one"
            );
            report.live_headers -= 1;
            report.live_chunks -= older.chunks().len() as u32;
            report.orphaned_chunks += older.chunks().len() as u32;
            if let Some(header) = older.header() {
                shadowed_headers.push(header.slot);
            }
        }
        report.live_headers += 1;
    }

    let orphans: u32 = chunks.values().map(|v| v.len() as u32).sum();
    if orphans > 0 {
        warn!(count = orphans, "discarding data chunks with no live header");
        report.orphaned_chunks += orphans;
    }

    let next_object_id = match max_object_id {
        Some(max) => max.saturating_add(1),
        None => 1,
    };

    Ok(ScanOutcome {
        files,
        next_object_id,
        report,
        shadowed_headers,
    })
}

/// Order one object's chunk records by id, keeping the newest copy of a
/// repeated id. Returns the kept chunks and how many copies were dropped.
fn collect_chunks(entries: Option<Vec<LogEntry>>) -> (Vec<ChunkRef>, u32) {
    let mut entries = entries.unwrap_or_default();
    entries.sort_by_key(|e| (e.chunk_id, e.slot));

    let mut kept: Vec<ChunkRef> = Vec::with_capacity(entries.len());
    let mut shadowed = 0;
    for entry in entries {
        let chunk = ChunkRef {
            chunk_id: entry.chunk_id,
            slot: entry.slot,
            payload_size: entry.payload_size,
        };
        match kept.last_mut() {
            Some(last) if last.chunk_id == chunk.chunk_id => {
                *last = chunk;
                shadowed += 1;
            }
            _ => kept.push(chunk),
        }
    }
    (kept, shadowed)
}
