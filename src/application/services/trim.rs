//! Trimming service
//!
//! Applies a criterion to every region file of a dimension and propagates
//! the removed chunk slots to the same-named entity and POI files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::application::{
    ApplicationError, ApplicationResult, DomainResultExt, IoResultExt,
};
use crate::domain::{
    Chunk, ChunkSummary, Criterion, DimensionPaths, Kind, RegionFile, RegionPosition,
};
use crate::infrastructure::traits::FileSystem;

/// Region container extension.
pub const REGION_EXTENSION: &str = "mca";

/// Run-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimOptions {
    /// Decide and report, but write nothing.
    pub dry_run: bool,
    /// Worker threads; `None` processes regions sequentially.
    pub threads: Option<usize>,
}

/// What happened to one region file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStatus {
    Unchanged,
    Trimmed,
    /// Every chunk was trimmed; the file is removed rather than written.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOutcome {
    pub file: PathBuf,
    pub chunks_before: usize,
    pub chunks_removed: usize,
    /// Slots removed from the entity and POI files of the same region.
    pub companion_chunks_removed: usize,
    pub status: RegionStatus,
}

#[derive(Debug)]
pub struct RegionFailure {
    pub file: PathBuf,
    pub error: ApplicationError,
}

/// Aggregate result of a trimming run.
#[derive(Debug, Default)]
pub struct TrimReport {
    pub outcomes: Vec<RegionOutcome>,
    pub failures: Vec<RegionFailure>,
}

impl TrimReport {
    pub fn regions_trimmed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == RegionStatus::Trimmed)
            .count()
    }

    pub fn regions_deleted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == RegionStatus::Deleted)
            .count()
    }

    pub fn chunks_removed(&self) -> usize {
        self.outcomes.iter().map(|o| o.chunks_removed).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Service trimming one dimension.
pub struct TrimService {
    fs: Arc<dyn FileSystem>,
    paths: DimensionPaths,
    criterion: Criterion,
    options: TrimOptions,
}

impl TrimService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        paths: DimensionPaths,
        criterion: Criterion,
        options: TrimOptions,
    ) -> Self {
        Self {
            fs,
            paths,
            criterion,
            options,
        }
    }

    pub fn paths(&self) -> &DimensionPaths {
        &self.paths
    }

    /// Region files of the input dimension, sorted by name.
    pub fn discover(&self) -> ApplicationResult<Vec<PathBuf>> {
        let dir = self.paths.input(Kind::Region);
        if !self.fs.is_dir(&dir) {
            return Err(ApplicationError::InvalidInput(dir));
        }
        self.fs
            .list_files(&dir, REGION_EXTENSION)
            .with_path_context("list region files", &dir)
    }

    /// Process all regions; a failing region does not stop the others.
    pub fn run(&self) -> ApplicationResult<TrimReport> {
        let regions = self.discover()?;
        info!(
            "trimming {} region files with {} ({})",
            regions.len(),
            self.criterion,
            match self.options.threads {
                Some(n) => format!("{} threads", n.max(1)),
                None => "sequential".to_string(),
            }
        );

        let results: Vec<(PathBuf, ApplicationResult<RegionOutcome>)> = match self.options.threads
        {
            None => regions
                .iter()
                .map(|p| (p.clone(), self.process_region(p)))
                .collect(),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n.max(1))
                    .thread_name(|i| format!("trim-{}", i))
                    .build()?;
                pool.install(|| {
                    regions
                        .par_iter()
                        .map(|p| (p.clone(), self.process_region(p)))
                        .collect()
                })
            }
        };

        let mut report = TrimReport::default();
        for (file, result) in results {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => {
                    warn!("{}: {}", file.display(), error);
                    report.failures.push(RegionFailure { file, error });
                }
            }
        }
        Ok(report)
    }

    /// Trim a single region file and its companions.
    ///
    /// Every input is read and every output buffer built before the first
    /// write. Companions are written before the region, so an interrupted
    /// run leaves the region untouched and can simply be repeated.
    #[instrument(level = "debug", skip(self), fields(criterion = %self.criterion))]
    pub fn process_region(&self, path: &Path) -> ApplicationResult<RegionOutcome> {
        let name = file_name(path)?;
        let data = self.fs.read(path).with_path_context("read region", path)?;
        let mut region = RegionFile::parse(&data).in_file(path)?;
        let chunks_before = region.len();
        let position = match RegionPosition::from_file_name(&name) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!("{}; chunk coordinates unavailable", e);
                None
            }
        };

        let removed = region.retain(|index, chunk| !self.should_trim(&name, position, index, chunk));
        debug!("{}: {} of {} chunks selected", name, removed.len(), chunks_before);

        if removed.is_empty() {
            if !self.options.dry_run {
                for kind in Kind::ALL {
                    self.mirror(kind, &name)?;
                }
            }
            return Ok(RegionOutcome {
                file: path.to_path_buf(),
                chunks_before,
                chunks_removed: 0,
                companion_chunks_removed: 0,
                status: RegionStatus::Unchanged,
            });
        }

        let mut companions = Vec::with_capacity(Kind::COMPANIONS.len());
        let mut companion_chunks_removed = 0;
        for kind in Kind::COMPANIONS {
            let (plan, count) = self.plan_companion(kind, &name, &removed)?;
            companion_chunks_removed += count;
            companions.push((kind, plan));
        }
        let region_plan = Planned::from_container(&region);

        if !self.options.dry_run {
            self.backup(&name)?;
            for (kind, plan) in &companions {
                self.apply(*kind, &name, plan)?;
            }
            self.apply(Kind::Region, &name, &region_plan)?;
        }

        let status = if region.is_empty() {
            RegionStatus::Deleted
        } else {
            RegionStatus::Trimmed
        };
        info!(
            "{}: removed {} of {} chunks ({} companion slots){}",
            name,
            removed.len(),
            chunks_before,
            companion_chunks_removed,
            if self.options.dry_run { " [dry run]" } else { "" }
        );

        Ok(RegionOutcome {
            file: path.to_path_buf(),
            chunks_before,
            chunks_removed: removed.len(),
            companion_chunks_removed,
            status,
        })
    }

    /// Undecodable chunks are kept.
    fn should_trim(
        &self,
        name: &str,
        position: Option<RegionPosition>,
        index: usize,
        chunk: &Chunk,
    ) -> bool {
        let coords = position.map(|p| p.chunk_coords(index));
        match chunk
            .decompress()
            .and_then(|nbt| ChunkSummary::read(&nbt))
        {
            Ok(summary) => {
                if let (Some(expected), Some(x), Some(z)) = (coords, summary.x_pos, summary.z_pos) {
                    if expected != (x, z) {
                        debug!(
                            "{} slot {}: chunk claims ({}, {}), slot is ({}, {})",
                            name, index, x, z, expected.0, expected.1
                        );
                    }
                }
                self.criterion.matches(&summary)
            }
            Err(e) => {
                match coords {
                    Some((x, z)) => warn!("{} chunk ({}, {}): keeping undecodable chunk: {}", name, x, z, e),
                    None => warn!("{} slot {}: keeping undecodable chunk: {}", name, index, e),
                }
                false
            }
        }
    }

    /// Decide what happens to a companion file; returns the plan and the
    /// number of slots it drops.
    fn plan_companion(
        &self,
        kind: Kind,
        name: &str,
        indices: &[usize],
    ) -> ApplicationResult<(Planned, usize)> {
        let input = self.paths.input(kind).join(name);
        if !self.fs.is_file(&input) {
            return Ok((Planned::Keep, 0));
        }
        let data = self.fs.read(&input).with_path_context("read", &input)?;
        let mut container = match RegionFile::parse(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("{}: leaving unreadable {} file untouched: {}", input.display(), kind, e);
                return Ok((Planned::Keep, 0));
            }
        };

        let removed = container.remove(indices);
        if removed.is_empty() {
            return Ok((Planned::Keep, 0));
        }
        Ok((Planned::from_container(&container), removed.len()))
    }

    /// Copy originals of all existing containers for `name` to the backup.
    fn backup(&self, name: &str) -> ApplicationResult<()> {
        for kind in Kind::ALL {
            let Some(dir) = self.paths.backup(kind) else {
                return Ok(());
            };
            let src = self.paths.input(kind).join(name);
            if !self.fs.is_file(&src) {
                continue;
            }
            let dst = dir.join(name);
            self.fs
                .ensure_parent(&dst)
                .with_path_context("create backup directory", &dir)?;
            self.fs.copy(&src, &dst).with_path_context("backup", &src)?;
            debug!("backed up {} -> {}", src.display(), dst.display());
        }
        Ok(())
    }

    /// Carry an untouched file over to an out-of-place output.
    fn mirror(&self, kind: Kind, name: &str) -> ApplicationResult<()> {
        if self.paths.in_place() {
            return Ok(());
        }
        let src = self.paths.input(kind).join(name);
        if !self.fs.is_file(&src) {
            return Ok(());
        }
        let dst = self.paths.output(kind).join(name);
        self.fs
            .ensure_parent(&dst)
            .with_path_context("create output directory", &dst)?;
        self.fs.copy(&src, &dst).with_path_context("copy", &src)?;
        Ok(())
    }

    fn apply(&self, kind: Kind, name: &str, plan: &Planned) -> ApplicationResult<()> {
        let dst = self.paths.output(kind).join(name);
        match plan {
            Planned::Keep => self.mirror(kind, name),
            Planned::Delete => {
                if self.fs.exists(&dst) {
                    self.fs.remove_file(&dst).with_path_context("delete", &dst)?;
                    info!("deleted {}", dst.display());
                }
                Ok(())
            }
            Planned::Write(bytes) => {
                self.fs
                    .ensure_parent(&dst)
                    .with_path_context("create output directory", &dst)?;
                self.fs
                    .write_atomic(&dst, bytes)
                    .with_path_context("write", &dst)?;
                debug!("wrote {} ({} bytes)", dst.display(), bytes.len());
                Ok(())
            }
        }
    }
}

/// Output of one container, computed before anything is written.
enum Planned {
    /// Leave the input as it is (mirrored for out-of-place runs).
    Keep,
    /// Nothing left; remove the output file.
    Delete,
    Write(Vec<u8>),
}

impl Planned {
    fn from_container(container: &RegionFile) -> Self {
        if container.is_empty() {
            Planned::Delete
        } else {
            Planned::Write(container.to_bytes())
        }
    }
}

fn file_name(path: &Path) -> ApplicationResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ApplicationError::OperationFailed {
            context: format!("region path has no file name: {}", path.display()),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "missing file name",
            )),
        })
}
