//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mctrimmer/mctrimmer.toml`
//! 3. Environment variables: `MCTRIMMER_*` prefix
//! 4. Command line flags (applied by the CLI layer)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, Criterion};

const ENV_PREFIX: &str = "MCTRIMMER";

/// Unified configuration for mctrimmer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Backup directory used when `--backup` is given without a value
    pub backup_dir: PathBuf,
    /// Worker threads used when `--parallel` is given without a value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Criterion used when `--criteria` is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<Criterion>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("./backup"),
            threads: None,
            criterion: None,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub backup_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    pub criterion: Option<Criterion>,
}

/// Get the XDG config directory for mctrimmer.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mctrimmer").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mctrimmer.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Threads to use when none are configured: all cores but one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.backup_dir.to_string_lossy().as_ref());
        self.backup_dir = PathBuf::from(expanded);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            backup_dir: overlay
                .backup_dir
                .clone()
                .unwrap_or_else(|| self.backup_dir.clone()),
            threads: overlay.threads.or(self.threads),
            criterion: overlay.criterion.or(self.criterion),
        }
    }

    /// Load settings with layered precedence from the standard locations.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings from an explicit global file and environment source.
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. `global` TOML file, if it exists
    /// 3. Environment variables from `env`
    pub fn load_from(global: Option<&Path>, env: Environment) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current, env)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply `MCTRIMMER_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env.prefix_separator("_"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("backup_dir") {
            settings.backup_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("threads") {
            let threads = val.trim().parse::<usize>().map_err(|e| ApplicationError::Config {
                message: format!("{}_THREADS={}: {}", ENV_PREFIX, val, e),
            })?;
            settings.threads = Some(threads);
        }
        if let Ok(val) = config.get_string("criterion") {
            let criterion = val.parse::<Criterion>().map_err(|e| ApplicationError::Config {
                message: format!("{}_CRITERION: {}", ENV_PREFIX, e),
            })?;
            settings.criterion = Some(criterion);
        }

        Ok(settings)
    }

    /// Thread count for a bare `--parallel`.
    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(default_threads).max(1)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mctrimmer configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mctrimmer/mctrimmer.toml
#   Env:    MCTRIMMER_* environment variables (explicit overrides)
#   Flags:  command line arguments always win

# Backup directory used by a bare --backup
# backup_dir = "./backup"

# Worker threads used by a bare --parallel (default: cores - 1)
# threads = 4

# Criterion used when --criteria is omitted
# criterion = "inhabited_time<1m"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> Environment {
        let map: Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_from(None, env_of(&[])).expect("load defaults");
        assert_eq!(settings, Settings::default());
        assert!(settings.effective_threads() >= 1);
    }

    #[test]
    fn given_global_file_when_loading_then_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mctrimmer.toml");
        std::fs::write(
            &path,
            "backup_dir = \"/srv/backup\"\nthreads = 3\ncriterion = \"inhabited_time<5m\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path), env_of(&[])).unwrap();

        assert_eq!(settings.backup_dir, PathBuf::from("/srv/backup"));
        assert_eq!(settings.threads, Some(3));
        assert_eq!(settings.criterion, Some(Criterion::InhabitedUnder5m));
    }

    #[test]
    fn given_env_vars_when_loading_then_env_wins_over_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mctrimmer.toml");
        std::fs::write(&path, "threads = 3\n").unwrap();

        let env = env_of(&[
            ("MCTRIMMER_THREADS", "7"),
            ("MCTRIMMER_CRITERION", "inhabited_time<10m"),
        ]);
        let settings = Settings::load_from(Some(&path), env).unwrap();

        assert_eq!(settings.threads, Some(7));
        assert_eq!(settings.criterion, Some(Criterion::InhabitedUnder10m));
        assert_eq!(settings.effective_threads(), 7);
    }

    #[test]
    fn given_invalid_env_criterion_when_loading_then_config_error() {
        let env = env_of(&[("MCTRIMMER_CRITERION", "everything")]);
        let result = Settings::load_from(None, env);
        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_malformed_file_when_loading_then_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mctrimmer.toml");
        std::fs::write(&path, "threads = \"many\"\n").unwrap();
        let result = Settings::load_from(Some(&path), env_of(&[]));
        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_tilde_in_backup_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            backup_dir: PathBuf::from("~/mc-backup"),
            ..Default::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let backup = settings.backup_dir.to_string_lossy();
        assert!(backup.starts_with(&home), "backup_dir: {}", backup);
        assert!(!backup.contains('~'));
    }

    #[test]
    fn given_settings_when_serializing_then_produces_loadable_toml() {
        let settings = Settings {
            backup_dir: PathBuf::from("/tmp/b"),
            threads: Some(2),
            criterion: Some(Criterion::InhabitedUnder1m),
        };
        let text = settings.to_toml().unwrap();
        assert!(text.contains("criterion = \"inhabited_time<1m\""));
        let raw: RawSettings = toml::from_str(&text).unwrap();
        assert_eq!(Settings::default().merge_with(&raw), settings);
    }

    #[test]
    fn given_template_when_parsing_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.backup_dir.is_none());
    }
}
