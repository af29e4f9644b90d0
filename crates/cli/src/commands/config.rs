use std::env;
use std::fs;
use std::path::PathBuf;

use cotiza_core::config::{AnalyticsConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AnalyticsConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file = ConfigFile::discover();
    let source =
        |key_path: &str, env_keys: &[&str]| field_source(key_path, env_keys, config_file.as_ref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "thresholds.days_without_edit_yellow",
        &config.thresholds.days_without_edit_yellow.to_string(),
        source("thresholds.days_without_edit_yellow", &["COTIZA_DAYS_WITHOUT_EDIT_YELLOW"]),
    ));
    lines.push(render_line(
        "thresholds.days_without_edit_red",
        &config.thresholds.days_without_edit_red.to_string(),
        source("thresholds.days_without_edit_red", &["COTIZA_DAYS_WITHOUT_EDIT_RED"]),
    ));
    lines.push(render_line(
        "thresholds.version_count_yellow",
        &config.thresholds.version_count_yellow.to_string(),
        source("thresholds.version_count_yellow", &["COTIZA_VERSION_COUNT_YELLOW"]),
    ));
    lines.push(render_line(
        "thresholds.version_count_red",
        &config.thresholds.version_count_red.to_string(),
        source("thresholds.version_count_red", &["COTIZA_VERSION_COUNT_RED"]),
    ));
    lines.push(render_line(
        "thresholds.active_quotations_yellow",
        &config.thresholds.active_quotations_yellow.to_string(),
        source("thresholds.active_quotations_yellow", &["COTIZA_ACTIVE_QUOTATIONS_YELLOW"]),
    ));
    lines.push(render_line(
        "thresholds.active_quotations_red",
        &config.thresholds.active_quotations_red.to_string(),
        source("thresholds.active_quotations_red", &["COTIZA_ACTIVE_QUOTATIONS_RED"]),
    ));
    lines.push(render_line(
        "thresholds.efficiency_yellow",
        &config.thresholds.efficiency_yellow.to_string(),
        source("thresholds.efficiency_yellow", &["COTIZA_EFFICIENCY_YELLOW"]),
    ));
    lines.push(render_line(
        "thresholds.efficiency_red",
        &config.thresholds.efficiency_red.to_string(),
        source("thresholds.efficiency_red", &["COTIZA_EFFICIENCY_RED"]),
    ));

    lines.push(render_line(
        "taxonomy.active",
        &config.taxonomy.active.join(","),
        source("taxonomy.active", &["COTIZA_ACTIVE_STATUSES"]),
    ));
    lines.push(render_line(
        "taxonomy.completed",
        &config.taxonomy.completed.join(","),
        source("taxonomy.completed", &["COTIZA_COMPLETED_STATUSES"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["COTIZA_LOGGING_LEVEL", "COTIZA_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["COTIZA_LOGGING_FORMAT", "COTIZA_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

/// Parsed config file used only for source attribution; `AnalyticsConfig::load`
/// does its own resolution.
struct ConfigFile {
    path: PathBuf,
    doc: Value,
}

impl ConfigFile {
    fn discover() -> Option<Self> {
        ["cotiza.toml", "config/cotiza.toml"].into_iter().find_map(|candidate| {
            let path = PathBuf::from(candidate);
            let raw = fs::read_to_string(&path).ok()?;
            let doc = raw.parse::<Value>().ok()?;
            Some(Self { path, doc })
        })
    }

    fn defines(&self, key_path: &str) -> bool {
        let mut node = Some(&self.doc);
        for segment in key_path.split('.') {
            node = node.and_then(|value| value.get(segment));
        }
        node.is_some()
    }
}

fn field_source(key_path: &str, env_keys: &[&str], file: Option<&ConfigFile>) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    match file {
        Some(file) if file.defines(key_path) => format!("file ({})", file.path.display()),
        _ => "default".to_string(),
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
