//! # flashlog
//!
//! An emulated raw flash device with a minimal log-structured filesystem:
//! - Flash write/erase semantics (writes only clear bits, erase restores 1s)
//! - Append-only log of fixed-size records over the whole device
//! - Directory rebuilt by scanning the log at startup
//! - Buffered stdio-like streams on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Stream (FlashFile / Volume)                 │
//! │             open modes, in-memory buffer, close             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Filesystem                          │
//! │        scan & stitch, create/open/load/flush/delete         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Log codec                          │
//! │            fixed slots, 10-byte header + payload            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         FlashStore                          │
//! │        word read/AND-write, sector erase, image file        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod flash;
pub mod log;
pub mod fs;
pub mod stream;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlashError, Result};
pub use config::Config;
pub use flash::FlashStore;
pub use fs::{FileHandle, Filesystem, LoadOutcome};
pub use stream::{FlashFile, OpenMode, Volume};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flashlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
