use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{AlertThresholds, AnalyticsConfig, StatusTaxonomy};
use crate::correlate::CorrelatedView;
use crate::domain::budget::BudgetStatus;
use crate::kpi::is_stale;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Red,
    Yellow,
    Green,
}

/// One stale or over-versioned in-flight quotation, with enough context for
/// an operator to chase it down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblematicQuotation {
    pub budget_id: String,
    pub status: BudgetStatus,
    pub customer_name: String,
    pub assignee_id: i64,
    pub assignee_name: String,
    pub days_without_edit: i64,
    pub version_count: u32,
    pub total_price: Decimal,
    pub alert_level: AlertLevel,
}

pub struct ProblematicQuotationDetector<'a> {
    thresholds: &'a AlertThresholds,
    taxonomy: &'a StatusTaxonomy,
}

impl<'a> ProblematicQuotationDetector<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self::with_parts(&config.thresholds, &config.taxonomy)
    }

    pub fn with_parts(thresholds: &'a AlertThresholds, taxonomy: &'a StatusTaxonomy) -> Self {
        Self { thresholds, taxonomy }
    }

    /// Flags every latest in-window document that is still in-flight and has
    /// gone past the yellow days-without-edit threshold. Sorted worst-first:
    /// days descending, version descending, budget id ascending.
    pub fn detect(&self, now: DateTime<Utc>, view: &CorrelatedView<'_>) -> Vec<ProblematicQuotation> {
        let mut problems: Vec<ProblematicQuotation> = view
            .latest_budgets
            .iter()
            .filter(|document| {
                self.taxonomy.is_active(document.status.as_str())
                    && is_stale(document, now, self.thresholds.days_without_edit_yellow)
            })
            .map(|document| {
                let assignee = view.resolve_assignee(document);
                let days_without_edit =
                    now.signed_duration_since(document.creation_date).num_days();

                ProblematicQuotation {
                    budget_id: document.budget_id.clone(),
                    status: document.status,
                    customer_name: document.customer.full_name(),
                    assignee_id: assignee.id,
                    assignee_name: assignee.name,
                    days_without_edit,
                    version_count: document.version,
                    total_price: document.total,
                    alert_level: self.classify(days_without_edit, document.version),
                }
            })
            .collect();

        problems.sort_by(|left, right| {
            right
                .days_without_edit
                .cmp(&left.days_without_edit)
                .then(right.version_count.cmp(&left.version_count))
                .then(left.budget_id.cmp(&right.budget_id))
        });

        problems
    }

    fn classify(&self, days_without_edit: i64, version_count: u32) -> AlertLevel {
        if days_without_edit >= self.thresholds.days_without_edit_red
            || version_count >= self.thresholds.version_count_red
        {
            AlertLevel::Red
        } else if days_without_edit >= self.thresholds.days_without_edit_yellow
            || version_count >= self.thresholds.version_count_yellow
        {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        }
    }
}
