//! Domain layer: world data formats and trimming rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod chunk;
pub mod criteria;
pub mod error;
pub mod format;
pub mod nbt;
pub mod paths;
pub mod region;

pub use chunk::Chunk;
pub use criteria::Criterion;
pub use error::{DomainError, DomainResult};
pub use format::{ChunkLocation, Compression, Timestamp};
pub use nbt::{find_scalar, ChunkSummary, NbtScalar};
pub use paths::{DimensionPaths, Kind};
pub use region::{RegionFile, RegionPosition};

/// Expand `~` and environment variables in a path-like string.
///
/// Uses shellexpand crate for robust expansion.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
