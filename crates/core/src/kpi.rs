use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AlertThresholds, AnalyticsConfig, StatusTaxonomy};
use crate::correlate::CorrelatedView;
use crate::domain::budget::BudgetDocument;
use crate::problematic::{AlertLevel, ProblematicQuotationDetector};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// Company-wide dashboard summary over one window, with trends against the
/// gap-separated comparison window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub active_quotations: usize,
    pub delayed_quotations: usize,
    pub team_efficiency: f64,
    pub active_alerts: usize,
    pub trends: BTreeMap<String, Trend>,
}

pub struct KpiAggregator<'a> {
    thresholds: &'a AlertThresholds,
    taxonomy: &'a StatusTaxonomy,
}

struct WindowMetrics {
    active: usize,
    delayed: usize,
    efficiency: f64,
    alerts: usize,
}

impl<'a> KpiAggregator<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self { thresholds: &config.thresholds, taxonomy: &config.taxonomy }
    }

    pub fn summarize(
        &self,
        now: DateTime<Utc>,
        current: &CorrelatedView<'_>,
        previous: &CorrelatedView<'_>,
    ) -> KpiSummary {
        let current_metrics = self.window_metrics(now, current);
        let previous_metrics = self.window_metrics(now, previous);

        let mut trends = BTreeMap::new();
        trends.insert(
            "activeQuotations".to_string(),
            count_trend(current_metrics.active, previous_metrics.active),
        );
        trends.insert(
            "delayedQuotations".to_string(),
            count_trend(current_metrics.delayed, previous_metrics.delayed),
        );
        trends.insert(
            "teamEfficiency".to_string(),
            value_trend(current_metrics.efficiency, previous_metrics.efficiency),
        );
        trends.insert(
            "activeAlerts".to_string(),
            count_trend(current_metrics.alerts, previous_metrics.alerts),
        );

        KpiSummary {
            active_quotations: current_metrics.active,
            delayed_quotations: current_metrics.delayed,
            team_efficiency: current_metrics.efficiency,
            active_alerts: current_metrics.alerts,
            trends,
        }
    }

    // NOTE: staleness and alert counts for the comparison window are still
    // measured against the live `now`, so older windows read as almost
    // entirely delayed and the delayed/alert trends lean "down". Inherited
    // from the source system unchanged.
    fn window_metrics(&self, now: DateTime<Utc>, view: &CorrelatedView<'_>) -> WindowMetrics {
        let active = view
            .latest_budgets
            .iter()
            .filter(|document| self.taxonomy.is_active(document.status.as_str()))
            .count();
        let delayed = view
            .latest_budgets
            .iter()
            .filter(|document| {
                self.taxonomy.is_active(document.status.as_str())
                    && is_stale(document, now, self.thresholds.days_without_edit_yellow)
            })
            .count();

        let completed = view
            .latest_budgets
            .iter()
            .filter(|document| self.taxonomy.is_completed(document.status.as_str()))
            .count();
        let efficiency = completion_efficiency(completed, view.latest_budgets.len());

        let detector = ProblematicQuotationDetector::with_parts(self.thresholds, self.taxonomy);
        let alerts = detector
            .detect(now, view)
            .iter()
            .filter(|problem| matches!(problem.alert_level, AlertLevel::Red | AlertLevel::Yellow))
            .count();

        WindowMetrics { active, delayed, efficiency, alerts }
    }
}

/// A document counts as stale once it has gone more than the yellow
/// days-without-edit threshold since creation.
pub(crate) fn is_stale(document: &BudgetDocument, now: DateTime<Utc>, yellow_days: i64) -> bool {
    now.signed_duration_since(document.creation_date) > Duration::days(yellow_days)
}

/// `completed / total * 100`, rounded to two decimals; 0 on an empty cohort.
pub(crate) fn completion_efficiency(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(completed as f64 / total as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn count_trend(current: usize, previous: usize) -> Trend {
    if current > previous {
        Trend::Up
    } else if current < previous {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn value_trend(current: f64, previous: f64) -> Trend {
    if current > previous {
        Trend::Up
    } else if current < previous {
        Trend::Down
    } else {
        Trend::Stable
    }
}
