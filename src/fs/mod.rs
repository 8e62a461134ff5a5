//! Filesystem Module
//!
//! Log-structured files on top of the flash log.
//!
//! ## Responsibilities
//! - Rebuild the directory from the log at startup (scan & stitch)
//! - Create, open, read, rewrite and delete files
//! - Invalidate superseded records; space is never reclaimed short of a
//!   full format
//!
//! ## Record Lifecycle
//! ```text
//!  virgin (0xFFFF) ──append──▶ used+valid ──invalidate──▶ used+invalid
//!        ▲                                                     │
//!        └──────────────────── erase ◀─────────────────────────┘
//! ```

mod file;
mod filesystem;
mod scan;

pub use file::{ChunkRef, FileHandle, FileStat, FsFile, HeaderRef, LoadOutcome};
pub use filesystem::Filesystem;
pub use scan::ScanReport;
