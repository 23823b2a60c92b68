//! Command dispatch: resolves flags against settings and runs the trimmer

use std::io;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{RegionStatus, TrimOptions, TrimReport};
use crate::cli::args::Cli;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{Criterion, DimensionPaths};
use crate::infrastructure::di::ServiceContainer;

/// Fully resolved trimming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
    pub criterion: Criterion,
    pub options: TrimOptions,
}

impl TrimRequest {
    /// Merge command line flags over loaded settings; flags always win.
    pub fn resolve(cli: &Cli, settings: &Settings) -> CliResult<Self> {
        let input = cli
            .input
            .clone()
            .ok_or_else(|| CliError::Usage("--input-region <DIR> is required".into()))?;
        let criterion = cli.criteria.or(settings.criterion).ok_or_else(|| {
            CliError::Usage(format!(
                "--criteria is required (one of: {})",
                Criterion::ALL.map(|c| c.name()).join(", ")
            ))
        })?;
        let output = cli.output.clone().unwrap_or_else(|| input.clone());
        let backup = cli
            .backup
            .as_ref()
            .map(|b| b.clone().unwrap_or_else(|| settings.backup_dir.clone()));
        let threads = cli
            .parallel
            .map(|p| p.unwrap_or_else(|| settings.effective_threads()));
        if threads == Some(0) {
            return Err(CliError::InvalidArgs("--parallel needs at least 1 thread".into()));
        }

        Ok(Self {
            input,
            output,
            backup,
            criterion,
            options: TrimOptions {
                dry_run: cli.dry_run,
                threads,
            },
        })
    }
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }
    if cli.config_template {
        output::info(&Settings::template());
        return Ok(());
    }

    let settings = Settings::load()?;
    if cli.print_config {
        output::info(&settings.to_toml()?);
        return Ok(());
    }

    let request = TrimRequest::resolve(cli, &settings)?;
    _trim(&ServiceContainer::new(), request)
}

#[instrument(skip(container))]
fn _trim(container: &ServiceContainer, request: TrimRequest) -> CliResult<()> {
    let paths =
        container.dimension_paths(&request.input, &request.output, request.backup.as_deref())?;
    debug!("paths: {:?}", paths);

    let service = container.trim_service(paths, request.criterion, request.options);
    print_plan(service.paths(), request.criterion);
    let report = service.run()?;
    print_report(&report, request.options.dry_run);

    if report.has_failures() {
        return Err(CliError::RegionsFailed(report.failures.len()));
    }
    Ok(())
}

fn print_plan(paths: &DimensionPaths, criterion: Criterion) {
    output::header(&format!("Trimming {} ({})", paths.input_root().display(), criterion));
    if !paths.in_place() {
        output::info(&format!("  output: {}", paths.output_root().display()));
    }
    if let Some(backup) = paths.backup_root() {
        output::info(&format!("  backup: {}", backup.display()));
    }
}

fn print_report(report: &TrimReport, dry_run: bool) {
    if dry_run {
        output::header("Dry run: no files were written");
    }
    for outcome in &report.outcomes {
        let name = outcome
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.file.display().to_string());
        match outcome.status {
            RegionStatus::Unchanged => {}
            RegionStatus::Trimmed => output::action(
                "trimmed",
                &format!(
                    "{}: {}/{} chunks",
                    name, outcome.chunks_removed, outcome.chunks_before
                ),
            ),
            RegionStatus::Deleted => output::action(
                "deleted",
                &format!("{}: all {} chunks", name, outcome.chunks_before),
            ),
        }
    }
    for failure in &report.failures {
        output::failure(&format!("{}: {}", failure.file.display(), failure.error));
    }
    output::success(&format!(
        "{} regions scanned, {} trimmed, {} deleted, {} chunks removed",
        report.outcomes.len() + report.failures.len(),
        report.regions_trimmed(),
        report.regions_deleted(),
        report.chunks_removed()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mctrimmer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn given_minimal_flags_when_resolving_then_trims_in_place() {
        let cli = parse(&["-i", "world", "-c", "inhabited_time<1m"]);
        let req = TrimRequest::resolve(&cli, &Settings::default()).unwrap();
        assert_eq!(req.output, PathBuf::from("world"));
        assert_eq!(req.backup, None);
        assert_eq!(req.options.threads, None);
        assert_eq!(req.criterion, Criterion::InhabitedUnder1m);
    }

    #[test]
    fn given_bare_backup_when_resolving_then_uses_configured_dir() {
        let cli = parse(&["-i", "world", "-c", "inhabited_time<1m", "-b"]);
        let settings = Settings {
            backup_dir: PathBuf::from("/srv/bak"),
            ..Default::default()
        };
        let req = TrimRequest::resolve(&cli, &settings).unwrap();
        assert_eq!(req.backup, Some(PathBuf::from("/srv/bak")));
    }

    #[test]
    fn given_bare_parallel_when_resolving_then_uses_configured_threads() {
        let cli = parse(&["-i", "world", "-c", "inhabited_time<1m", "-p"]);
        let settings = Settings {
            threads: Some(6),
            ..Default::default()
        };
        let req = TrimRequest::resolve(&cli, &settings).unwrap();
        assert_eq!(req.options.threads, Some(6));

        let cli = parse(&["-i", "world", "-c", "inhabited_time<1m", "-p", "2"]);
        let req = TrimRequest::resolve(&cli, &settings).unwrap();
        assert_eq!(req.options.threads, Some(2));
    }

    #[test]
    fn given_zero_threads_when_resolving_then_invalid_args() {
        let cli = parse(&["-i", "world", "-c", "inhabited_time<1m", "-p", "0"]);
        let result = TrimRequest::resolve(&cli, &Settings::default());
        assert!(matches!(result, Err(CliError::InvalidArgs(_))));
    }

    #[test]
    fn given_no_criteria_when_resolving_then_falls_back_to_settings() {
        let cli = parse(&["-i", "world"]);
        assert!(matches!(
            TrimRequest::resolve(&cli, &Settings::default()),
            Err(CliError::Usage(_))
        ));

        let settings = Settings {
            criterion: Some(Criterion::InhabitedUnder10m),
            ..Default::default()
        };
        let req = TrimRequest::resolve(&cli, &settings).unwrap();
        assert_eq!(req.criterion, Criterion::InhabitedUnder10m);
    }

    #[test]
    fn given_no_input_when_resolving_then_usage_error() {
        let cli = parse(&["-c", "inhabited_time<1m"]);
        assert!(matches!(
            TrimRequest::resolve(&cli, &Settings::default()),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn given_unknown_criteria_when_parsing_then_clap_rejects() {
        let result = Cli::try_parse_from(["mctrimmer", "-i", "w", "-c", "inhabited_time<2m"]);
        assert!(result.is_err());
    }
}
