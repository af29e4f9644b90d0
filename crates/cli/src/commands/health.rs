use chrono::Utc;

use cotiza_core::health::{analyze_business_health, BusinessHealthReport};
use cotiza_core::period::Window;

use crate::commands::{self, CommandResult, RunError};
use crate::{DataArgs, PeriodArgs};

const SUPPORTED_MONTHS: &[u32] = &[1, 3, 6, 12];

pub fn run(months: u32, active_clients: usize, period: &PeriodArgs, data: &DataArgs) -> CommandResult {
    if !SUPPORTED_MONTHS.contains(&months) {
        return CommandResult::failure(
            "health",
            "invalid_argument",
            format!("unsupported --months value {months} (expected 1, 3, 6 or 12)"),
            2,
        );
    }

    let config = match commands::load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("health", error_class, message, exit_code);
        }
    };
    commands::init_logging(&config);

    let runtime = match commands::build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("health", error_class, message, exit_code);
        }
    };

    let result: Result<BusinessHealthReport, RunError> = runtime.block_on(async {
        let snapshot = commands::load_snapshot(data).await?;
        let now = Utc::now();
        // The health report defaults to whole trailing months; an explicit
        // --from/--to window still wins.
        let window = if period.from.is_some() {
            commands::resolve_window(period, now)
        } else {
            Window::trailing_months(now, months)
        };

        Ok(analyze_business_health(&snapshot, &window, active_clients))
    });

    match result {
        Ok(report) => {
            let message = format!(
                "revenue {} across {} months, approval rate {}%, {} alerts",
                report.total_revenue,
                report.monthly_trend.len(),
                report.approval_rate,
                report.alerts.len(),
            );
            CommandResult::success_with_report("health", message, &report)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("health", error_class, message, exit_code)
        }
    }
}
