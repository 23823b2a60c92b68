//! Resolve user-supplied directories into a checked `DimensionPaths`

use std::path::Path;

use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{DimensionPaths, DomainError};
use crate::infrastructure::traits::FileSystem;

/// Resolve input, output and backup to absolute paths and validate them.
///
/// The input directory must exist. Output and backup may not exist yet;
/// they are compared through their nearest existing ancestor, so two
/// spellings of one location through a symlink are recognized.
pub fn resolve_dimension(
    fs: &dyn FileSystem,
    input: &Path,
    output: &Path,
    backup: Option<&Path>,
) -> ApplicationResult<DimensionPaths> {
    if !fs.is_dir(input) {
        return Err(DomainError::InputNotFound(input.to_path_buf()).into());
    }
    let input = fs.absolute(input).with_path_context("resolve", input)?;
    let output = fs.absolute(output).with_path_context("resolve", output)?;
    let backup = match backup {
        Some(b) => Some(fs.absolute(b).with_path_context("resolve", b)?),
        None => None,
    };
    Ok(DimensionPaths::new(&input, &output, backup.as_deref())?)
}
