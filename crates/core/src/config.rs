use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub thresholds: AlertThresholds,
    pub taxonomy: StatusTaxonomy,
    pub logging: LoggingConfig,
}

/// Alert cutoffs shared by every aggregator. Injected explicitly so tests can
/// vary them without touching global state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub days_without_edit_yellow: i64,
    pub days_without_edit_red: i64,
    pub version_count_yellow: u32,
    pub version_count_red: u32,
    pub active_quotations_yellow: usize,
    pub active_quotations_red: usize,
    pub efficiency_yellow: f64,
    pub efficiency_red: f64,
}

/// The statuses considered in-flight vs terminal. Comparisons are
/// case-insensitive on trimmed values; the same sets apply to quotation
/// records and budget documents alike.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusTaxonomy {
    pub active: Vec<String>,
    pub completed: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            days_without_edit_yellow: 7,
            days_without_edit_red: 15,
            version_count_yellow: 3,
            version_count_red: 5,
            active_quotations_yellow: 10,
            active_quotations_red: 15,
            efficiency_yellow: 70.0,
            efficiency_red: 50.0,
        }
    }
}

impl Default for StatusTaxonomy {
    fn default() -> Self {
        Self {
            active: vec!["pending".to_string()],
            completed: vec![
                "approved".to_string(),
                "accepted".to_string(),
                "rejected".to_string(),
                "finished".to_string(),
            ],
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            taxonomy: StatusTaxonomy::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl StatusTaxonomy {
    pub fn is_active(&self, status: &str) -> bool {
        let normalized = normalize_status(status);
        self.active.iter().any(|candidate| normalize_status(candidate) == normalized)
    }

    pub fn is_completed(&self, status: &str) -> bool {
        let normalized = normalize_status(status);
        self.completed.iter().any(|candidate| normalize_status(candidate) == normalized)
    }
}

pub fn normalize_status(status: &str) -> String {
    status.trim().to_ascii_lowercase()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AnalyticsConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cotiza.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(thresholds) = patch.thresholds {
            if let Some(value) = thresholds.days_without_edit_yellow {
                self.thresholds.days_without_edit_yellow = value;
            }
            if let Some(value) = thresholds.days_without_edit_red {
                self.thresholds.days_without_edit_red = value;
            }
            if let Some(value) = thresholds.version_count_yellow {
                self.thresholds.version_count_yellow = value;
            }
            if let Some(value) = thresholds.version_count_red {
                self.thresholds.version_count_red = value;
            }
            if let Some(value) = thresholds.active_quotations_yellow {
                self.thresholds.active_quotations_yellow = value;
            }
            if let Some(value) = thresholds.active_quotations_red {
                self.thresholds.active_quotations_red = value;
            }
            if let Some(value) = thresholds.efficiency_yellow {
                self.thresholds.efficiency_yellow = value;
            }
            if let Some(value) = thresholds.efficiency_red {
                self.thresholds.efficiency_red = value;
            }
        }

        if let Some(taxonomy) = patch.taxonomy {
            if let Some(active) = taxonomy.active {
                self.taxonomy.active = active;
            }
            if let Some(completed) = taxonomy.completed {
                self.taxonomy.completed = completed;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COTIZA_DAYS_WITHOUT_EDIT_YELLOW") {
            self.thresholds.days_without_edit_yellow =
                parse_i64("COTIZA_DAYS_WITHOUT_EDIT_YELLOW", &value)?;
        }
        if let Some(value) = read_env("COTIZA_DAYS_WITHOUT_EDIT_RED") {
            self.thresholds.days_without_edit_red =
                parse_i64("COTIZA_DAYS_WITHOUT_EDIT_RED", &value)?;
        }
        if let Some(value) = read_env("COTIZA_VERSION_COUNT_YELLOW") {
            self.thresholds.version_count_yellow =
                parse_u32("COTIZA_VERSION_COUNT_YELLOW", &value)?;
        }
        if let Some(value) = read_env("COTIZA_VERSION_COUNT_RED") {
            self.thresholds.version_count_red = parse_u32("COTIZA_VERSION_COUNT_RED", &value)?;
        }
        if let Some(value) = read_env("COTIZA_ACTIVE_QUOTATIONS_YELLOW") {
            self.thresholds.active_quotations_yellow =
                parse_usize("COTIZA_ACTIVE_QUOTATIONS_YELLOW", &value)?;
        }
        if let Some(value) = read_env("COTIZA_ACTIVE_QUOTATIONS_RED") {
            self.thresholds.active_quotations_red =
                parse_usize("COTIZA_ACTIVE_QUOTATIONS_RED", &value)?;
        }
        if let Some(value) = read_env("COTIZA_EFFICIENCY_YELLOW") {
            self.thresholds.efficiency_yellow = parse_f64("COTIZA_EFFICIENCY_YELLOW", &value)?;
        }
        if let Some(value) = read_env("COTIZA_EFFICIENCY_RED") {
            self.thresholds.efficiency_red = parse_f64("COTIZA_EFFICIENCY_RED", &value)?;
        }

        if let Some(value) = read_env("COTIZA_ACTIVE_STATUSES") {
            self.taxonomy.active = parse_status_list(&value);
        }
        if let Some(value) = read_env("COTIZA_COMPLETED_STATUSES") {
            self.taxonomy.completed = parse_status_list(&value);
        }

        let log_level = read_env("COTIZA_LOGGING_LEVEL").or_else(|| read_env("COTIZA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COTIZA_LOGGING_FORMAT").or_else(|| read_env("COTIZA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds(&self.thresholds)?;
        validate_taxonomy(&self.taxonomy)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cotiza.toml"), PathBuf::from("config/cotiza.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_thresholds(thresholds: &AlertThresholds) -> Result<(), ConfigError> {
    if thresholds.days_without_edit_yellow < 1 {
        return Err(ConfigError::Validation(
            "thresholds.days_without_edit_yellow must be at least 1".to_string(),
        ));
    }
    if thresholds.days_without_edit_yellow >= thresholds.days_without_edit_red {
        return Err(ConfigError::Validation(
            "thresholds.days_without_edit_yellow must be below days_without_edit_red".to_string(),
        ));
    }

    if thresholds.version_count_yellow < 1 {
        return Err(ConfigError::Validation(
            "thresholds.version_count_yellow must be at least 1".to_string(),
        ));
    }
    if thresholds.version_count_yellow >= thresholds.version_count_red {
        return Err(ConfigError::Validation(
            "thresholds.version_count_yellow must be below version_count_red".to_string(),
        ));
    }

    if thresholds.active_quotations_yellow >= thresholds.active_quotations_red {
        return Err(ConfigError::Validation(
            "thresholds.active_quotations_yellow must be below active_quotations_red".to_string(),
        ));
    }

    // Efficiency buckets invert: lower efficiency is worse, so red sits below yellow.
    if !(0.0..=100.0).contains(&thresholds.efficiency_red)
        || !(0.0..=100.0).contains(&thresholds.efficiency_yellow)
    {
        return Err(ConfigError::Validation(
            "thresholds.efficiency_yellow/efficiency_red must be in range 0..=100".to_string(),
        ));
    }
    if thresholds.efficiency_red >= thresholds.efficiency_yellow {
        return Err(ConfigError::Validation(
            "thresholds.efficiency_red must be below efficiency_yellow".to_string(),
        ));
    }

    Ok(())
}

fn validate_taxonomy(taxonomy: &StatusTaxonomy) -> Result<(), ConfigError> {
    if taxonomy.active.is_empty() {
        return Err(ConfigError::Validation(
            "taxonomy.active must declare at least one status".to_string(),
        ));
    }
    if taxonomy.completed.is_empty() {
        return Err(ConfigError::Validation(
            "taxonomy.completed must declare at least one status".to_string(),
        ));
    }

    for status in &taxonomy.active {
        if taxonomy.is_completed(status) {
            return Err(ConfigError::Validation(format!(
                "status `{status}` appears in both taxonomy.active and taxonomy.completed"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_status_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|status| status.trim().to_string())
        .filter(|status| !status.is_empty())
        .collect()
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    thresholds: Option<ThresholdsPatch>,
    taxonomy: Option<TaxonomyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdsPatch {
    days_without_edit_yellow: Option<i64>,
    days_without_edit_red: Option<i64>,
    version_count_yellow: Option<u32>,
    version_count_red: Option<u32>,
    active_quotations_yellow: Option<usize>,
    active_quotations_red: Option<usize>,
    efficiency_yellow: Option<f64>,
    efficiency_red: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TaxonomyPatch {
    active: Option<Vec<String>>,
    completed: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AnalyticsConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AnalyticsConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.thresholds.days_without_edit_yellow == 7, "default yellow days is 7")?;
        ensure(config.thresholds.days_without_edit_red == 15, "default red days is 15")?;
        ensure(config.taxonomy.is_active("Pending"), "pending should be active by default")?;
        ensure(
            config.taxonomy.is_completed("APPROVED"),
            "approved should be completed, case-insensitively",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COTIZA_DAYS_YELLOW", "5");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cotiza.toml");
            fs::write(
                &path,
                r#"
[thresholds]
days_without_edit_yellow = ${TEST_COTIZA_DAYS_YELLOW}
days_without_edit_red = 20
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AnalyticsConfig::load(LoadOptions {
                config_path: Some(path),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.thresholds.days_without_edit_yellow == 5,
                "yellow days should be interpolated from the environment",
            )?;
            ensure(
                config.thresholds.days_without_edit_red == 20,
                "red days should come from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_COTIZA_DAYS_YELLOW"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTIZA_LOG_LEVEL", "warn");
        env::set_var("COTIZA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AnalyticsConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env",
            )?;
            Ok(())
        })();

        clear_vars(&["COTIZA_LOG_LEVEL", "COTIZA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTIZA_VERSION_COUNT_RED", "9");
        env::set_var("COTIZA_LOG_LEVEL", "error");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cotiza.toml");
            fs::write(
                &path,
                r#"
[thresholds]
version_count_yellow = 4
version_count_red = 6

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AnalyticsConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.thresholds.version_count_yellow == 4, "file yellow version should win")?;
            ensure(config.thresholds.version_count_red == 9, "env red version should win")?;
            ensure(config.logging.level == "debug", "programmatic log level should win")?;
            Ok(())
        })();

        clear_vars(&["COTIZA_VERSION_COUNT_RED", "COTIZA_LOG_LEVEL"]);
        result
    }

    #[test]
    fn env_status_lists_replace_taxonomy() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTIZA_ACTIVE_STATUSES", "pending, in_review");
        env::set_var("COTIZA_COMPLETED_STATUSES", "approved,rejected");

        let result = (|| -> Result<(), String> {
            let config = AnalyticsConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.taxonomy.is_active("in_review"), "in_review should be active")?;
            ensure(!config.taxonomy.is_completed("finished"), "finished was replaced")?;
            ensure(config.taxonomy.is_completed("REJECTED"), "rejected should be completed")?;
            Ok(())
        })();

        clear_vars(&["COTIZA_ACTIVE_STATUSES", "COTIZA_COMPLETED_STATUSES"]);
        result
    }

    #[test]
    fn validation_rejects_inverted_day_thresholds() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTIZA_DAYS_WITHOUT_EDIT_YELLOW", "20");
        env::set_var("COTIZA_DAYS_WITHOUT_EDIT_RED", "10");

        let result = (|| -> Result<(), String> {
            let error = match AnalyticsConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("days_without_edit_yellow")
            );
            ensure(has_message, "validation failure should mention the day thresholds")
        })();

        clear_vars(&["COTIZA_DAYS_WITHOUT_EDIT_YELLOW", "COTIZA_DAYS_WITHOUT_EDIT_RED"]);
        result
    }

    #[test]
    fn validation_rejects_overlapping_taxonomy() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COTIZA_ACTIVE_STATUSES", "pending,approved");

        let result = (|| -> Result<(), String> {
            let error = match AnalyticsConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("approved")
            );
            ensure(has_message, "validation failure should name the overlapping status")
        })();

        clear_vars(&["COTIZA_ACTIVE_STATUSES"]);
        result
    }

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!("compact".parse::<LogFormat>().ok(), Some(LogFormat::Compact));
        assert_eq!("PRETTY".parse::<LogFormat>().ok(), Some(LogFormat::Pretty));
        assert_eq!(" json ".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert!("verbose".parse::<LogFormat>().is_err());
    }
}
