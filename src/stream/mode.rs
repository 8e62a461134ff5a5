//! Open modes
//!
//! Binary stdio-style mode strings.

use std::fmt;
use std::str::FromStr;

use crate::error::FlashError;

/// How a stream was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `rb`: existing file, read only
    Read,

    /// `wb`: create or truncate, write only
    Write,

    /// `w+b`: create or truncate, read and write
    ReadWrite,

    /// `ab`: create or keep content, every write goes to the end
    Append,
}

impl OpenMode {
    pub fn readable(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    /// Opening creates the file when it is missing
    pub fn creates(&self) -> bool {
        self.writable()
    }

    /// Existing content is loaded into the stream buffer on open
    pub fn loads_content(&self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::Append)
    }

    pub fn appends(&self) -> bool {
        matches!(self, OpenMode::Append)
    }
}

impl FromStr for OpenMode {
    type Err = FlashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rb" => Ok(OpenMode::Read),
            "wb" => Ok(OpenMode::Write),
            "w+b" | "wb+" => Ok(OpenMode::ReadWrite),
            "ab" => Ok(OpenMode::Append),
            other => Err(FlashError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpenMode::Read => "rb",
            OpenMode::Write => "wb",
            OpenMode::ReadWrite => "w+b",
            OpenMode::Append => "ab",
        };
        f.write_str(s)
    }
}
