//! Error types for flashlog
//!
//! Provides a unified error type for all layers: the flash medium, the log
//! codec, the filesystem and the stream adapter.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FlashError
pub type Result<T> = std::result::Result<T, FlashError>;

/// Unified error type for flashlog operations
#[derive(Debug, Error)]
pub enum FlashError {
    // -------------------------------------------------------------------------
    // Medium Errors
    // -------------------------------------------------------------------------
    #[error("flash medium unavailable at {}: {source}", .path.display())]
    MediumUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad flash address: {0:#x}")]
    BadAddress(u32),

    #[error("invalid sector: {0}")]
    InvalidSector(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("failed to decode log slot {slot}: {source}")]
    Decode {
        slot: u32,
        #[source]
        source: Box<FlashError>,
    },

    #[error("log is full")]
    LogFull,

    #[error("failed to read payload of log slot {slot}: {source}")]
    PayloadRead {
        slot: u32,
        #[source]
        source: Box<FlashError>,
    },

    // -------------------------------------------------------------------------
    // Filesystem Errors
    // -------------------------------------------------------------------------
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("file handle no longer refers to a live file")]
    StaleHandle,

    #[error("filesystem initialization previously failed")]
    AlreadyInitFailed,

    // -------------------------------------------------------------------------
    // Stream Errors
    // -------------------------------------------------------------------------
    #[error("invalid open mode: {0:?}")]
    InvalidMode(String),

    #[error("stream not opened for reading")]
    NotReadable,

    #[error("stream not opened for writing")]
    NotWritable,

    #[error("file would exceed the maximum size of {limit} bytes")]
    FileTooLarge { limit: usize },

    #[error("invalid seek to offset {0}")]
    InvalidSeek(i64),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<FlashError> for std::io::Error {
    fn from(err: FlashError) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            FlashError::Io(e) => e.kind(),
            FlashError::NotFound(_) | FlashError::StaleHandle => ErrorKind::NotFound,
            FlashError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            FlashError::NotReadable | FlashError::NotWritable => ErrorKind::PermissionDenied,
            FlashError::InvalidSeek(_)
            | FlashError::InvalidMode(_)
            | FlashError::BadAddress(_)
            | FlashError::InvalidSector(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
