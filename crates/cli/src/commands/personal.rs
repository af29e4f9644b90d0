use chrono::Utc;

use cotiza_core::period::Window;
use cotiza_core::personal::{
    PersonalMetricsError, PersonalMetricsReport, PersonalPerformanceAnalyzer,
};

use crate::commands::{self, CommandResult, RunError};
use crate::{DataArgs, PeriodArgs};

const DEFAULT_TRAILING_MONTHS: u32 = 6;

pub fn run(user: i64, period: &PeriodArgs, data: &DataArgs) -> CommandResult {
    let config = match commands::load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("personal", error_class, message, exit_code);
        }
    };
    commands::init_logging(&config);

    let runtime = match commands::build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("personal", error_class, message, exit_code);
        }
    };

    let result: Result<PersonalMetricsReport, RunError> = runtime.block_on(async {
        let snapshot = commands::load_snapshot(data).await?;
        let now = Utc::now();
        // The scorecard spans six trailing calendar months unless a range was
        // asked for explicitly.
        let window = if period.period.is_some() || period.from.is_some() {
            commands::resolve_window(period, now)
        } else {
            Window::trailing_months(now, DEFAULT_TRAILING_MONTHS)
        };

        PersonalPerformanceAnalyzer::new(&config).analyze(now, &snapshot, user, &window).map_err(
            |error| match error {
                PersonalMetricsError::UserNotFound { .. } => {
                    ("entity_not_found", error.to_string(), 5u8)
                }
            },
        )
    });

    match result {
        Ok(report) => {
            let message = format!(
                "{}: {} quotations, {:?} tier, overall score {}",
                report.user_name, report.total_quotations, report.performance_tier,
                report.overall_score,
            );
            CommandResult::success_with_report("personal", message, &report)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("personal", error_class, message, exit_code)
        }
    }
}
