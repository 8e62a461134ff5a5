//! Stream Module
//!
//! stdio-like buffered file handles over the filesystem.
//!
//! ## Responsibilities
//! - Parse open modes (`rb`, `wb`, `w+b`, `ab`)
//! - Keep an open file's content in memory; read/write/seek on it
//! - Write the buffer back to flash on close
//! - Serialize all filesystem access behind one lock

mod file;
mod mode;
mod volume;

pub use file::FlashFile;
pub use mode::OpenMode;
pub use volume::Volume;
