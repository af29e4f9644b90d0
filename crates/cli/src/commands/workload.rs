use chrono::Utc;

use cotiza_core::workload::{UserWorkload, WorkloadAggregator};

use crate::commands::{self, CommandResult, RunError};
use crate::{DataArgs, PeriodArgs};

pub fn run(period: &PeriodArgs, data: &DataArgs) -> CommandResult {
    let config = match commands::load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("workload", error_class, message, exit_code);
        }
    };
    commands::init_logging(&config);

    let runtime = match commands::build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("workload", error_class, message, exit_code);
        }
    };

    let result: Result<Vec<UserWorkload>, RunError> = runtime.block_on(async {
        let snapshot = commands::load_snapshot(data).await?;
        let now = Utc::now();
        let window = commands::resolve_window(period, now);
        let view = snapshot.correlate(&window);

        Ok(WorkloadAggregator::new(&config).distribute(
            now,
            &window,
            &snapshot.quotations,
            &snapshot.users,
            &view,
        ))
    });

    match result {
        Ok(workloads) => {
            let message = format!("{} users ranked by active load", workloads.len());
            CommandResult::success_with_report("workload", message, &workloads)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("workload", error_class, message, exit_code)
        }
    }
}
