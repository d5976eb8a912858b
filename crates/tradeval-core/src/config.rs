// Configuration loading (config/tradeval.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::league::SlotRequirements;
use crate::trade::verdict::Thresholds;

pub const CONFIG_FILE_NAME: &str = "tradeval.toml";
pub const DEFAULT_LOG_FILTER: &str = "tradeval=info,warn";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub thresholds: Thresholds,
    /// Slot counts used when league settings carry no roster positions.
    pub fallback_slots: SlotRequirements,
    pub logging: LoggingConfig,
    /// File the config was read from; `None` for built-in defaults.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thresholds: Thresholds::default(),
            fallback_slots: SlotRequirements::new(),
            logging: LoggingConfig::default(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Raw deserialization target for tradeval.toml. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    thresholds: Thresholds,
    /// Slot label -> count, e.g. `C = 2`.
    #[serde(default)]
    roster: HashMap<String, usize>,
    #[serde(default)]
    logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate config text. `path` is only used for error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = Config {
        thresholds: file.thresholds,
        fallback_slots: SlotRequirements::from_counts(&file.roster),
        logging: file.logging,
        source: Some(path.to_path_buf()),
    };

    validate(&config)?;
    Ok(config)
}

/// Load and validate a single config file.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    parse_config(&text, path)
}

/// Load `config/tradeval.toml` relative to `base_dir`, without copying
/// defaults first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    load_config_file(&base_dir.join("config").join(CONFIG_FILE_NAME))
}

/// Copy every file in `defaults/` that is missing from `config/`.
/// Returns the files that were copied. `.example` files are skipped.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if copy_if_absent(&path, &target)? {
            debug!("copied default config {}", target.display());
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Per-user config file location, e.g. `~/.config/tradeval/tradeval.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tradeval")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Resolve configuration for a working directory.
///
/// A project checkout (a `defaults/` or `config/` directory in `base_dir`)
/// wins; otherwise the per-user config file is used if present; otherwise
/// the built-in defaults.
pub fn load_config_in(base_dir: &Path) -> Result<Config, ConfigError> {
    if base_dir.join("defaults").exists() || base_dir.join("config").exists() {
        ensure_config_files(base_dir)?;
        return load_config_from(base_dir);
    }

    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        return load_config_file(&path);
    }

    debug!("no config file found, using built-in defaults");
    Ok(Config::default())
}

/// Convenience wrapper: resolves configuration relative to the current
/// working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_in(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Returns `Ok(false)` when `target` already exists.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };

    let content = std::fs::read(source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", source.display()),
    })?;
    dest.write_all(&content)
        .map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to write {}: {e}", target.display()),
        })?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check threshold sanity. Also used by callers that apply CLI overrides.
pub fn validate_thresholds(t: &Thresholds) -> Result<(), ConfigError> {
    let fields: &[(&str, f64)] = &[
        ("thresholds.loss_tol", t.loss_tol),
        ("thresholds.gain_min", t.gain_min),
        ("thresholds.imbalance_max", t.imbalance_max),
    ];
    for (name, val) in fields {
        if !val.is_finite() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be a finite number, got {val}"),
            });
        }
    }

    if t.imbalance_max < 0.0 {
        return Err(ConfigError::ValidationError {
            field: "thresholds.imbalance_max".into(),
            message: format!("must be >= 0, got {}", t.imbalance_max),
        });
    }

    if t.gain_min < t.loss_tol {
        return Err(ConfigError::ValidationError {
            field: "thresholds.gain_min".into(),
            message: format!(
                "must be >= thresholds.loss_tol ({}), got {}",
                t.loss_tol, t.gain_min
            ),
        });
    }

    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_thresholds(&config.thresholds)?;

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::SlotLabel;
    use crate::trade::verdict::{DEFAULT_GAIN_MIN, DEFAULT_IMBALANCE_MAX, DEFAULT_LOSS_TOL};
    use std::fs;

    /// The workspace `defaults/` directory shipped with the binary.
    fn shipped_defaults() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../defaults")
    }

    fn write_config(dir: &Path, body: &str) {
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(CONFIG_FILE_NAME), body).unwrap();
    }

    fn expect_validation_error(body: &str, expected_field: &str) {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), body);
        match load_config_from(tmp.path()) {
            Err(ConfigError::ValidationError { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected ValidationError for {expected_field}, got: {other:?}"),
        }
    }

    #[test]
    fn shipped_defaults_load() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults_dir = tmp.path().join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::copy(
            shipped_defaults().join(CONFIG_FILE_NAME),
            defaults_dir.join(CONFIG_FILE_NAME),
        )
        .unwrap();

        let config = load_config_in(tmp.path()).expect("should load shipped defaults");
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.fallback_slots.get(&SlotLabel::position("C")), 2);
        assert_eq!(config.fallback_slots.get(&SlotLabel::position("D")), 4);
        assert_eq!(config.fallback_slots.get(&SlotLabel::Goalie), 2);
        let order: Vec<&str> = config.fallback_slots.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(order, vec!["C", "LW", "RW", "D", "Util", "G"]);
        assert!(tmp.path().join("config").join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "");
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.thresholds.loss_tol, DEFAULT_LOSS_TOL);
        assert_eq!(config.thresholds.gain_min, DEFAULT_GAIN_MIN);
        assert_eq!(config.thresholds.imbalance_max, DEFAULT_IMBALANCE_MAX);
        assert!(config.fallback_slots.is_empty());
        assert_eq!(
            config.source.as_deref(),
            Some(tmp.path().join("config").join(CONFIG_FILE_NAME).as_path())
        );
    }

    #[test]
    fn partial_thresholds_override_independently() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "[thresholds]\ngain_min = 0.4\n");
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.thresholds.gain_min, 0.4);
        assert_eq!(config.thresholds.loss_tol, DEFAULT_LOSS_TOL);
    }

    #[test]
    fn roster_section_ignores_bench_labels() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "[roster]\nC = 2\nUtil = 1\nBN = 4\n");
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.fallback_slots.get(&SlotLabel::position("C")), 2);
        assert_eq!(config.fallback_slots.get(&SlotLabel::Utility), 1);
        assert_eq!(config.fallback_slots.total(), 3);
    }

    #[test]
    fn rejects_negative_imbalance() {
        expect_validation_error(
            "[thresholds]\nimbalance_max = -0.1\n",
            "thresholds.imbalance_max",
        );
    }

    #[test]
    fn rejects_gain_below_loss_tolerance() {
        expect_validation_error(
            "[thresholds]\nloss_tol = 0.5\ngain_min = 0.1\n",
            "thresholds.gain_min",
        );
    }

    #[test]
    fn rejects_non_finite_threshold() {
        expect_validation_error("[thresholds]\nloss_tol = nan\n", "thresholds.loss_tol");
    }

    #[test]
    fn rejects_empty_log_filter() {
        expect_validation_error("[logging]\nfilter = \"  \"\n", "logging.filter");
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = tempfile::tempdir().unwrap();
        write_config(tmp.path(), "[thresholds\nloss_tol = ");
        match load_config_from(tmp.path()) {
            Err(ConfigError::ParseError { path, .. }) => {
                assert!(path.ends_with(CONFIG_FILE_NAME));
            }
            other => panic!("expected ParseError, got: {other:?}"),
        }
    }

    #[test]
    fn file_not_found_when_config_missing() {
        let tmp = tempfile::tempdir().unwrap();
        match load_config_from(tmp.path()) {
            Err(ConfigError::FileNotFound { path }) => assert!(path.ends_with(CONFIG_FILE_NAME)),
            other => panic!("expected FileNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn ensure_config_files_skips_existing_and_examples() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults_dir = tmp.path().join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join(CONFIG_FILE_NAME), "[thresholds]\n").unwrap();
        fs::write(defaults_dir.join("extra.toml"), "").unwrap();
        fs::write(defaults_dir.join("tradeval.toml.example"), "").unwrap();
        write_config(tmp.path(), "# custom\n");

        let copied = ensure_config_files(tmp.path()).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(copied[0].ends_with("extra.toml"));
        assert!(!tmp.path().join("config/tradeval.toml.example").exists());

        let kept = fs::read_to_string(tmp.path().join("config").join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(kept, "# custom\n");
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = tempfile::tempdir().unwrap();
        match ensure_config_files(tmp.path()) {
            Err(ConfigError::DefaultsCopyError { message }) => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other:?}"),
        }
    }

    #[test]
    fn thresholds_validation_accepts_defaults() {
        assert!(validate_thresholds(&Thresholds::default()).is_ok());
    }
}
