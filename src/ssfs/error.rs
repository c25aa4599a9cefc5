//! The closed set of failures the core can report.

use std::fmt;
use std::io;

use thiserror::Error;

/// Everything that can go wrong while formatting, mounting or operating on a
/// volume.
///
/// This is a closed set: every public operation either completes and returns
/// a non-negative result, or fails with one of these variants leaving the
/// mounted state's on-disk invariants intact.
#[derive(Debug, Error)]
pub enum Error {
    /// A volume is already mounted; `format`/`mount` refuse to run again.
    #[error("a disk is already mounted")]
    DiskAlreadyMounted,
    /// No volume is currently mounted.
    #[error("no disk is mounted")]
    DiskNotMounted,
    /// Block 0 does not carry the SSFS magic, or `block_size` isn't 1024.
    #[error("corrupt disk: {0}")]
    CorruptDisk(&'static str),
    /// No free data block was available, or an internal allocation failed.
    #[error("out of space")]
    OutOfSpace,
    /// No free inode slot was available.
    #[error("out of inodes")]
    OutOfInodes,
    /// The inode number is out of range, or refers to a free slot.
    #[error("invalid inode")]
    InvalidInode,
    /// The offset is negative, or addresses a logical block beyond the
    /// largest one the pointer tree can reach.
    #[error("invalid offset")]
    InvalidOffset,
    /// The block device reported an I/O failure.
    #[error("device error: {0}")]
    Device(#[from] io::Error),
}

/// A `Result` defaulted to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps the error to a stable negative integer code, for the CLI and for
    /// callers that want a C-style "negative errno" convention at the
    /// boundary instead of a typed `Result`.
    pub fn code(&self) -> i32 {
        match self {
            Self::DiskAlreadyMounted => -1,
            Self::DiskNotMounted => -2,
            Self::CorruptDisk(_) => -3,
            Self::OutOfSpace => -4,
            Self::OutOfInodes => -5,
            Self::InvalidInode => -6,
            Self::InvalidOffset => -7,
            Self::Device(_) => -8,
        }
    }
}

/// Wraps a value with the error code it would carry, for CLI-facing display.
pub struct Coded<'e>(pub &'e Error);

impl fmt::Display for Coded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.0, self.0.code())
    }
}
