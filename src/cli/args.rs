//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

use crate::domain::Criterion;

/// Trim unused chunks from a Minecraft dimension (region, entities and poi files)
#[derive(Parser, Debug)]
#[command(name = "mctrimmer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to source the dimension files from. If no output directory is
    /// specified, in-place editing will be performed
    #[arg(short = 'i', long = "input-region", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub input: Option<PathBuf>,

    /// Directory to store the dimension files to. If unspecified, the input
    /// directory is edited in place
    #[arg(short = 'o', long = "output-region", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Backup files affected by trimming to this directory. Defaults to './backup'
    #[arg(short = 'b', long = "backup", value_name = "DIR", num_args = 0..=1, value_hint = ValueHint::DirPath)]
    pub backup: Option<Option<PathBuf>>,

    /// Parallelize the task. If no thread count is specified, the number of cpu cores -1 is taken
    #[arg(short = 'p', long = "parallel", value_name = "THREADS", num_args = 0..=1)]
    pub parallel: Option<Option<usize>>,

    /// Pre-defined criteria by which to determine if a chunk should be trimmed
    #[arg(short = 'c', long = "criteria", value_enum)]
    pub criteria: Option<Criterion>,

    /// Report what would be trimmed without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    pub debug: u8,

    /// Print the effective configuration as TOML and exit
    #[arg(long, conflicts_with = "config_template")]
    pub print_config: bool,

    /// Print a commented configuration template and exit
    #[arg(long)]
    pub config_template: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completion: Option<clap_complete::Shell>,
}
