//! In-memory file records
//!
//! An `FsFile` is derived from the log: one header record plus the data
//! chunk records that share its object id.

/// Opaque handle to a file in a `Filesystem` directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(pub(crate) u32);

/// Location of a file's live header record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRef {
    pub slot: u32,
    pub object_id: u16,
}

/// Location of one live data chunk record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef {
    pub chunk_id: u16,
    pub slot: u32,
    pub payload_size: u16,
}

/// A file as seen by the filesystem
///
/// `chunks` is kept sorted by `chunk_id` with no duplicates. A file created
/// but never flushed has no header on flash yet.
#[derive(Debug, Clone)]
pub struct FsFile {
    name: String,
    data_size: u64,
    pub(crate) header: Option<HeaderRef>,
    pub(crate) chunks: Vec<ChunkRef>,
}

impl FsFile {
    /// A new, empty file with nothing on flash
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_size: 0,
            header: None,
            chunks: Vec::new(),
        }
    }

    /// A file stitched together from records found on flash
    pub fn from_log(name: impl Into<String>, header: HeaderRef, mut chunks: Vec<ChunkRef>) -> Self {
        chunks.sort_by_key(|c| c.chunk_id);
        let data_size = chunks.iter().map(|c| u64::from(c.payload_size)).sum();
        Self {
            name: name.into(),
            data_size,
            header: Some(header),
            chunks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total bytes of file content
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub(crate) fn set_data_size(&mut self, size: u64) {
        self.data_size = size;
    }

    pub fn header(&self) -> Option<HeaderRef> {
        self.header
    }

    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks
    }

    pub fn chunk_ids(&self) -> Vec<u16> {
        self.chunks.iter().map(|c| c.chunk_id).collect()
    }
}

/// Result of copying a file's content into a caller buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Bytes copied into the buffer
    pub bytes_written: usize,

    /// Full content length of the file
    pub file_size: u64,

    /// The buffer was too small and the copy was cut short
    pub truncated: bool,
}

/// Summary of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub size: u64,
    pub chunk_count: usize,
    /// `None` until the file is first flushed
    pub object_id: Option<u16>,
}
