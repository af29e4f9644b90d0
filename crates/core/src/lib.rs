pub mod config;
pub mod correlate;
pub mod domain;
pub mod health;
pub mod kpi;
pub mod period;
pub mod personal;
pub mod problematic;
pub mod workload;

pub use config::{
    AlertThresholds, AnalyticsConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat,
    LoggingConfig, StatusTaxonomy,
};
pub use correlate::{latest_budgets, latest_budgets_in_window, Assignee, CorrelatedView, RecordSnapshot};
pub use domain::budget::{BudgetDocument, BudgetStatus, CustomerSnapshot, ProductLine};
pub use domain::quotation::QuotationRecord;
pub use domain::user::UserRecord;
pub use health::{analyze_business_health, BusinessHealthReport, RevenueForecast};
pub use kpi::{KpiAggregator, KpiSummary, Trend};
pub use period::{resolve_period, Window, DEFAULT_PERIOD_DAYS};
pub use personal::{PersonalMetricsError, PersonalMetricsReport, PersonalPerformanceAnalyzer};
pub use problematic::{AlertLevel, ProblematicQuotation, ProblematicQuotationDetector};
pub use workload::{UserWorkload, WorkloadAggregator, NO_DATA_EFFICIENCY};
