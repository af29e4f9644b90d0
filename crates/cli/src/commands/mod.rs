pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod health;
pub mod personal;
pub mod workload;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use cotiza_core::config::{AnalyticsConfig, LoadOptions};
use cotiza_core::correlate::RecordSnapshot;
use cotiza_core::period::{resolve_period, Window, DEFAULT_PERIOD_DAYS};
use cotiza_store::{DemoDataset, JsonDatasetSource, RecordLoader};

use crate::{DataArgs, PeriodArgs};

/// Failure triple carried through a command pipeline: error class for the
/// JSON envelope, operator message, process exit code.
pub(crate) type RunError = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            report: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_report(
        command: &str,
        message: impl Into<String>,
        report: &impl Serialize,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            report: Some(serde_json::to_value(report).unwrap_or(serde_json::Value::Null)),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            report: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config() -> Result<AnalyticsConfig, RunError> {
    AnalyticsConfig::load(LoadOptions::default())
        .map_err(|error| ("config_validation", format!("configuration issue: {error}"), 2))
}

/// Logging goes to stderr so the JSON envelope on stdout stays parseable.
/// `try_init` tolerates repeated command runs in one process.
pub(crate) fn init_logging(config: &AnalyticsConfig) {
    use cotiza_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, RunError> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

pub(crate) async fn load_snapshot(data: &DataArgs) -> Result<RecordSnapshot, RunError> {
    let loader = match &data.data {
        Some(path) => RecordLoader::from_json(JsonDatasetSource::open(path)),
        None => {
            DemoDataset::loader().map_err(|error| ("source_read", error.to_string(), 4u8))?
        }
    };

    loader.load().await.map_err(|error| ("source_read", error.to_string(), 4))
}

pub(crate) fn resolve_window(period: &PeriodArgs, now: DateTime<Utc>) -> Window {
    match (period.from, period.to) {
        (Some(from), Some(to)) => Window::explicit(start_of_day(from), start_of_day(to)),
        (Some(from), None) => Window::explicit(start_of_day(from), now),
        _ => match period.period.as_deref() {
            Some(token) => resolve_period(token, now),
            None => Window::trailing_days(now, DEFAULT_PERIOD_DAYS),
        },
    }
}

fn start_of_day(date: chrono::NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
