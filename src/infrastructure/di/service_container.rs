//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::{TrimOptions, TrimService};
use crate::application::{resolve_dimension, ApplicationResult};
use crate::domain::{Criterion, DimensionPaths};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding shared dependencies and building services from them.
pub struct ServiceContainer {
    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new() -> Self {
        Self::with_deps(Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Resolve and validate the directories of one run.
    pub fn dimension_paths(
        &self,
        input: &Path,
        output: &Path,
        backup: Option<&Path>,
    ) -> ApplicationResult<DimensionPaths> {
        resolve_dimension(self.fs.as_ref(), input, output, backup)
    }

    /// Build a trimming service for one dimension.
    pub fn trim_service(
        &self,
        paths: DimensionPaths,
        criterion: Criterion,
        options: TrimOptions,
    ) -> TrimService {
        TrimService::new(Arc::clone(&self.fs), paths, criterion, options)
    }
}
