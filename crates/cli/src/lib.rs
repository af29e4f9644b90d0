pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cotiza",
    about = "Cotiza analytics CLI",
    long_about = "Aggregate quotation and budget records into dashboards, workload \
                  distributions, alerts, personal scorecards, and business-health reports.",
    after_help = "Examples:\n  cotiza dashboard --period 30d\n  cotiza personal --user 1 --from 2025-06-01 --to 2025-09-01\n  cotiza health --months 6 --active-clients 12\n  cotiza config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Reporting window selection shared by every report command. An explicit
/// `--from`/`--to` pair wins over `--period`; `--to` is exclusive. With no
/// range flags at all, each command applies its own default span (30 trailing
/// days; `personal` uses six calendar months).
#[derive(Debug, Args)]
pub struct PeriodArgs {
    #[arg(long, help = "Trailing period token, e.g. 7d or 30d")]
    pub period: Option<String>,
    #[arg(long, help = "Window start date (YYYY-MM-DD)")]
    pub from: Option<NaiveDate>,
    #[arg(long, help = "Window end date, exclusive (YYYY-MM-DD); requires --from")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    #[arg(long, help = "Path to a JSON dataset export; defaults to the bundled demo dataset")]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Company KPI summary with trends against the previous period")]
    Dashboard {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    #[command(about = "Per-user workload distribution with alert colors")]
    Workload {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    #[command(about = "Stale and over-versioned quotations, worst first")]
    Alerts {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    #[command(about = "One salesperson's performance scorecard")]
    Personal {
        #[arg(long, help = "User id to report on")]
        user: i64,
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    #[command(about = "Business-health report: revenue, concentration, seasonality, forecast")]
    Health {
        #[arg(
            long,
            default_value_t = 12,
            help = "Trailing months to analyze when no explicit window is given (1, 3, 6 or 12)"
        )]
        months: u32,
        #[arg(
            long,
            default_value_t = 0,
            help = "Active client count used as the recurrence-rate denominator"
        )]
        active_clients: usize,
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        data: DataArgs,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Dashboard { period, data } => commands::dashboard::run(&period, &data),
        Command::Workload { period, data } => commands::workload::run(&period, &data),
        Command::Alerts { period, data } => commands::alerts::run(&period, &data),
        Command::Personal { user, period, data } => commands::personal::run(user, &period, &data),
        Command::Health { months, active_clients, period, data } => {
            commands::health::run(months, active_clients, &period, &data)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
