use chrono::Utc;

use cotiza_core::problematic::{AlertLevel, ProblematicQuotation, ProblematicQuotationDetector};

use crate::commands::{self, CommandResult, RunError};
use crate::{DataArgs, PeriodArgs};

pub fn run(period: &PeriodArgs, data: &DataArgs) -> CommandResult {
    let config = match commands::load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("alerts", error_class, message, exit_code);
        }
    };
    commands::init_logging(&config);

    let runtime = match commands::build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("alerts", error_class, message, exit_code);
        }
    };

    let result: Result<Vec<ProblematicQuotation>, RunError> = runtime.block_on(async {
        let snapshot = commands::load_snapshot(data).await?;
        let now = Utc::now();
        let window = commands::resolve_window(period, now);
        let view = snapshot.correlate(&window);

        Ok(ProblematicQuotationDetector::new(&config).detect(now, &view))
    });

    match result {
        Ok(problems) => {
            let red =
                problems.iter().filter(|problem| problem.alert_level == AlertLevel::Red).count();
            let message =
                format!("{} problematic quotations ({} red), worst first", problems.len(), red);
            CommandResult::success_with_report("alerts", message, &problems)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("alerts", error_class, message, exit_code)
        }
    }
}
