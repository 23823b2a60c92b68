//! Dimension directory layout: input, output and backup locations

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::error::{DomainError, DomainResult};

/// The three sibling folders of a dimension that share the container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Region,
    Entities,
    Poi,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Region, Kind::Entities, Kind::Poi];
    /// Folders that follow the region decisions.
    pub const COMPANIONS: [Kind; 2] = [Kind::Entities, Kind::Poi];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Kind::Region => "region",
            Kind::Entities => "entities",
            Kind::Poi => "poi",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resolved dimension directories for one trimming run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionPaths {
    input: PathBuf,
    output: PathBuf,
    backup: Option<PathBuf>,
}

impl DimensionPaths {
    /// Check an already resolved directory triple.
    ///
    /// Paths are compared as given, so callers pass absolute, symlink-free
    /// paths. Nothing is touched on disk.
    pub fn new(input: &Path, output: &Path, backup: Option<&Path>) -> DomainResult<Self> {
        if let Some(b) = backup {
            if b == input {
                return Err(DomainError::OverlappingPaths {
                    first: "input",
                    second: "backup",
                    path: b.to_path_buf(),
                });
            }
            if b == output {
                return Err(DomainError::OverlappingPaths {
                    first: "output",
                    second: "backup",
                    path: b.to_path_buf(),
                });
            }
        }

        Ok(Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            backup: backup.map(Path::to_path_buf),
        })
    }

    pub fn input(&self, kind: Kind) -> PathBuf {
        self.input.join(kind.dir_name())
    }

    pub fn output(&self, kind: Kind) -> PathBuf {
        self.output.join(kind.dir_name())
    }

    pub fn backup(&self, kind: Kind) -> Option<PathBuf> {
        self.backup.as_ref().map(|b| b.join(kind.dir_name()))
    }

    pub fn in_place(&self) -> bool {
        self.input == self.output
    }

    pub fn input_root(&self) -> &Path {
        &self.input
    }

    pub fn output_root(&self) -> &Path {
        &self.output
    }

    pub fn backup_root(&self) -> Option<&Path> {
        self.backup.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_backup_equal_to_input_when_creating_then_errors() {
        let result = DimensionPaths::new(
            Path::new("/w/world"),
            Path::new("/w/out"),
            Some(Path::new("/w/world")),
        );
        assert!(matches!(
            result,
            Err(DomainError::OverlappingPaths {
                second: "backup",
                first: "input",
                ..
            })
        ));
    }

    #[test]
    fn given_backup_equal_to_output_when_creating_then_errors() {
        let result = DimensionPaths::new(
            Path::new("/w/world"),
            Path::new("/w/out"),
            Some(Path::new("/w/out")),
        );
        assert!(matches!(
            result,
            Err(DomainError::OverlappingPaths { first: "output", .. })
        ));
    }

    #[test]
    fn given_same_input_and_output_when_creating_then_is_in_place() {
        let paths = DimensionPaths::new(
            Path::new("/w/world"),
            Path::new("/w/world"),
            Some(Path::new("/w/backup")),
        )
        .unwrap();
        assert!(paths.in_place());
        assert_eq!(paths.input(Kind::Region), PathBuf::from("/w/world/region"));
        assert_eq!(paths.output(Kind::Entities), PathBuf::from("/w/world/entities"));
        assert_eq!(paths.backup(Kind::Poi), Some(PathBuf::from("/w/backup/poi")));
        assert_eq!(paths.backup_root(), Some(Path::new("/w/backup")));
    }

    #[test]
    fn given_no_backup_when_creating_then_backup_dirs_absent() {
        let paths =
            DimensionPaths::new(Path::new("/w/world"), Path::new("/w/out"), None).unwrap();
        assert!(!paths.in_place());
        assert_eq!(paths.backup(Kind::Region), None);
    }
}
