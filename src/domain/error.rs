//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent malformed world data or invalid layouts.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("truncated data: {message}")]
    Truncated { message: String },

    #[error("corrupt header entry {index}: {message}")]
    CorruptHeader { index: usize, message: String },

    #[error("invalid chunk: {message}")]
    InvalidChunk { message: String },

    #[error("unsupported chunk compression: {0}")]
    UnsupportedCompression(String),

    #[error("chunk payload could not be decompressed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("invalid NBT: {message}")]
    InvalidNbt { message: String },

    #[error("not a region file name: {0}")]
    InvalidRegionName(String),

    #[error("unknown criterion: {0}")]
    UnknownCriterion(String),

    #[error("input directory does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("{first} and {second} directories cannot be the same: {path}")]
    OverlappingPaths {
        first: &'static str,
        second: &'static str,
        path: PathBuf,
    },
}

impl DomainError {
    pub(crate) fn truncated(message: impl Into<String>) -> Self {
        Self::Truncated {
            message: message.into(),
        }
    }

    pub(crate) fn nbt(message: impl Into<String>) -> Self {
        Self::InvalidNbt {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
