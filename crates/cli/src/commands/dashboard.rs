use chrono::Utc;

use cotiza_core::kpi::{KpiAggregator, KpiSummary};

use crate::commands::{self, CommandResult, RunError};
use crate::{DataArgs, PeriodArgs};

pub fn run(period: &PeriodArgs, data: &DataArgs) -> CommandResult {
    let config = match commands::load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("dashboard", error_class, message, exit_code);
        }
    };
    commands::init_logging(&config);

    let runtime = match commands::build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("dashboard", error_class, message, exit_code);
        }
    };

    let result: Result<KpiSummary, RunError> = runtime.block_on(async {
        let snapshot = commands::load_snapshot(data).await?;
        let now = Utc::now();
        let window = commands::resolve_window(period, now);

        let current = snapshot.correlate(&window);
        let previous = snapshot.correlate(&window.comparison());

        Ok(KpiAggregator::new(&config).summarize(now, &current, &previous))
    });

    match result {
        Ok(summary) => {
            let message = format!(
                "{} active quotations, {} delayed, team efficiency {}%, {} active alerts",
                summary.active_quotations,
                summary.delayed_quotations,
                summary.team_efficiency,
                summary.active_alerts,
            );
            CommandResult::success_with_report("dashboard", message, &summary)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("dashboard", error_class, message, exit_code)
        }
    }
}
