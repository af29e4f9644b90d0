use std::collections::BTreeMap;

use chrono::{Datelike, Duration};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::correlate::{latest_budgets_in_window, CorrelatedView, RecordSnapshot};
use crate::domain::budget::{BudgetDocument, BudgetStatus};
use crate::kpi::round2;
use crate::period::Window;

const TOP_CLIENT_LIMIT: usize = 10;
const HIGH_RISK_SHARE: f64 = 20.0;
const MEDIUM_RISK_SHARE: f64 = 10.0;
const SEASONALITY_MEDIUM_COV: f64 = 0.3;
const SEASONALITY_HIGH_COV: f64 = 0.6;
const FORECAST_HIGH_RATE: f64 = 0.7;
const FORECAST_MEDIUM_RATE: f64 = 0.4;
const NO_HISTORY_RATE: f64 = 0.6;
const REJECTION_PENALTY_STEP: f64 = 0.03;
const REJECTION_PENALTY_CAP: f64 = 0.3;
const FLOOR_WITH_SUCCESS: f64 = 0.4;
const FLOOR_WITHOUT_SUCCESS: f64 = 0.2;
const GROWTH_STRENGTH_PCT: f64 = 10.0;
const TOP_PRODUCT_ALERT_SHARE: f64 = 40.0;
const LOW_APPROVAL_RATE_PCT: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConcentrationRisk {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeasonalityLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: Decimal,
    pub previous_year_revenue: Decimal,
    pub growth_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductShare {
    pub opening_type: String,
    pub revenue: Decimal,
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConcentration {
    pub customer_key: String,
    pub customer_name: String,
    pub revenue: Decimal,
    pub share: f64,
    pub risk: ConcentrationRisk,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalityReport {
    pub coefficient_of_variation: f64,
    pub level: SeasonalityLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub budget_id: String,
    pub customer_key: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub conversion_rate: f64,
}

/// Probability-weighted forecast over pending quotations. Low-probability
/// pendings are left out entirely; only high/medium entries are surfaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueForecast {
    pub high_probability: Vec<ForecastEntry>,
    pub medium_probability: Vec<ForecastEntry>,
    pub weighted_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHealthReport {
    pub window: Window,
    pub total_revenue: Decimal,
    pub average_ticket: Decimal,
    pub growth_rate: f64,
    pub approval_rate: f64,
    pub monthly_trend: Vec<MonthlyRevenue>,
    pub product_mix: Vec<ProductShare>,
    pub client_concentration: Vec<ClientConcentration>,
    pub diversification_score: f64,
    pub seasonality: SeasonalityReport,
    pub recurrence_rate: f64,
    pub forecast: RevenueForecast,
    pub strengths: Vec<String>,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Company-wide sustainability report over one window. `active_clients` is
/// the externally-supplied denominator for the recurrence rate.
pub fn analyze_business_health(
    snapshot: &RecordSnapshot,
    window: &Window,
    active_clients: usize,
) -> BusinessHealthReport {
    let view = snapshot.correlate(window);
    let approved: Vec<&BudgetDocument> = view
        .latest_budgets
        .iter()
        .filter(|document| document.status.is_converted())
        .copied()
        .collect();

    let total_revenue: Decimal = approved.iter().map(|document| document.total).sum();
    let average_ticket = if approved.is_empty() {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(approved.len())).round_dp(2)
    };
    let growth_rate = growth_rate(snapshot, window, total_revenue);
    let approval_rate = if view.latest_budgets.is_empty() {
        0.0
    } else {
        round2(approved.len() as f64 / view.latest_budgets.len() as f64 * 100.0)
    };

    let monthly_trend = monthly_trend(snapshot, window, &approved);
    let product_mix = product_mix(&approved);
    let clients = client_revenue(&view, &approved);
    let client_concentration = client_concentration(&clients, total_revenue);
    let diversification_score = diversification_score(&clients, total_revenue);
    let seasonality = seasonality(&monthly_trend);
    let recurrence_rate = if active_clients == 0 {
        0.0
    } else {
        round2(clients.len() as f64 / active_clients as f64 * 100.0)
    };
    let forecast = forecast(snapshot, &view);

    let (strengths, alerts, recommendations) = narrative(
        growth_rate,
        approval_rate,
        !view.latest_budgets.is_empty(),
        client_concentration.first(),
        product_mix.first(),
        &seasonality,
    );

    BusinessHealthReport {
        window: *window,
        total_revenue,
        average_ticket,
        growth_rate,
        approval_rate,
        monthly_trend,
        product_mix,
        client_concentration,
        diversification_score,
        seasonality,
        recurrence_rate,
        forecast,
        strengths,
        alerts,
        recommendations,
    }
}

/// `(current − previous) / previous * 100` over the contiguous preceding
/// window; 0 when the preceding period had no revenue.
fn growth_rate(snapshot: &RecordSnapshot, window: &Window, current_revenue: Decimal) -> f64 {
    let preceding = window.preceding();
    let previous_revenue: Decimal = latest_budgets_in_window(&snapshot.budgets, &preceding)
        .iter()
        .filter(|document| document.status.is_converted())
        .map(|document| document.total)
        .sum();

    if previous_revenue.is_zero() {
        return 0.0;
    }

    let current = current_revenue.to_f64().unwrap_or(0.0);
    let previous = previous_revenue.to_f64().unwrap_or(0.0);
    round2((current - previous) / previous * 100.0)
}

fn month_span(window: &Window) -> Vec<(i32, u32)> {
    if window.end <= window.start {
        return Vec::new();
    }

    let last = window.end - Duration::seconds(1);
    let (mut year, mut month) = (window.start.year(), window.start.month());
    let mut months = Vec::new();

    while (year, month) <= (last.year(), last.month()) {
        months.push((year, month));
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }

    months
}

/// Per calendar month of the window: converted revenue, the same month one
/// year earlier (resolved against the full history), and a growth rate.
fn monthly_trend(
    snapshot: &RecordSnapshot,
    window: &Window,
    approved: &[&BudgetDocument],
) -> Vec<MonthlyRevenue> {
    let mut in_window: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for document in approved {
        let key = (document.creation_date.year(), document.creation_date.month());
        *in_window.entry(key).or_insert(Decimal::ZERO) += document.total;
    }

    let mut history: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();
    for document in crate::correlate::latest_budgets(&snapshot.budgets) {
        if document.status.is_converted() {
            let key = (document.creation_date.year(), document.creation_date.month());
            *history.entry(key).or_insert(Decimal::ZERO) += document.total;
        }
    }

    month_span(window)
        .into_iter()
        .map(|(year, month)| {
            let revenue = in_window.get(&(year, month)).copied().unwrap_or(Decimal::ZERO);
            let previous_year_revenue =
                history.get(&(year - 1, month)).copied().unwrap_or(Decimal::ZERO);
            let growth_rate = if previous_year_revenue.is_zero() {
                0.0
            } else {
                let current = revenue.to_f64().unwrap_or(0.0);
                let previous = previous_year_revenue.to_f64().unwrap_or(0.0);
                round2((current - previous) / previous * 100.0)
            };

            MonthlyRevenue { year, month, revenue, previous_year_revenue, growth_rate }
        })
        .collect()
}

fn product_mix(approved: &[&BudgetDocument]) -> Vec<ProductShare> {
    let mut revenue_by_product: BTreeMap<String, Decimal> = BTreeMap::new();
    for document in approved {
        for line in &document.products {
            *revenue_by_product.entry(line.opening_type.name.clone()).or_insert(Decimal::ZERO) +=
                line.line_revenue();
        }
    }

    let total: Decimal = revenue_by_product.values().copied().sum();
    let mut mix: Vec<ProductShare> = revenue_by_product
        .into_iter()
        .map(|(opening_type, revenue)| {
            let share = if total.is_zero() {
                0.0
            } else {
                round2((revenue / total).to_f64().unwrap_or(0.0) * 100.0)
            };
            ProductShare { opening_type, revenue, share }
        })
        .collect();

    mix.sort_by(|left, right| {
        right.revenue.cmp(&left.revenue).then(left.opening_type.cmp(&right.opening_type))
    });
    mix
}

struct ClientRevenue {
    name: String,
    revenue: Decimal,
}

/// Approved revenue per customer, keyed by the stable customer identifier
/// (relational id when the join holds, embedded dni otherwise) so two
/// customers sharing a name never collapse into one.
fn client_revenue(
    view: &CorrelatedView<'_>,
    approved: &[&BudgetDocument],
) -> BTreeMap<String, ClientRevenue> {
    let mut clients: BTreeMap<String, ClientRevenue> = BTreeMap::new();
    for document in approved {
        let key = customer_key(view, document);
        let entry = clients.entry(key).or_insert(ClientRevenue {
            name: document.customer.full_name(),
            revenue: Decimal::ZERO,
        });
        entry.revenue += document.total;
    }
    clients
}

fn customer_key(view: &CorrelatedView<'_>, document: &BudgetDocument) -> String {
    view.quotation_by_id
        .get(&document.budget_id)
        .map(|quotation| quotation.customer_id.to_string())
        .unwrap_or_else(|| document.customer.dni.clone())
}

fn client_concentration(
    clients: &BTreeMap<String, ClientRevenue>,
    total_revenue: Decimal,
) -> Vec<ClientConcentration> {
    let mut concentration: Vec<ClientConcentration> = clients
        .iter()
        .map(|(key, client)| {
            let share = if total_revenue.is_zero() {
                0.0
            } else {
                round2((client.revenue / total_revenue).to_f64().unwrap_or(0.0) * 100.0)
            };
            let risk = if share >= HIGH_RISK_SHARE {
                ConcentrationRisk::High
            } else if share >= MEDIUM_RISK_SHARE {
                ConcentrationRisk::Medium
            } else {
                ConcentrationRisk::Low
            };

            ClientConcentration {
                customer_key: key.clone(),
                customer_name: client.name.clone(),
                revenue: client.revenue,
                share,
                risk,
            }
        })
        .collect();

    concentration.sort_by(|left, right| {
        right.revenue.cmp(&left.revenue).then(left.customer_key.cmp(&right.customer_key))
    });
    concentration.truncate(TOP_CLIENT_LIMIT);
    concentration
}

/// Inverted Herfindahl index over per-customer revenue shares:
/// `100 * (1 - sum(share^2))`. One customer holding everything scores 0; an
/// even split over N customers approaches `100 * (1 - 1/N)`.
fn diversification_score(
    clients: &BTreeMap<String, ClientRevenue>,
    total_revenue: Decimal,
) -> f64 {
    if total_revenue.is_zero() {
        return 0.0;
    }

    let total = total_revenue.to_f64().unwrap_or(0.0);
    let hhi: f64 = clients
        .values()
        .map(|client| {
            let share = client.revenue.to_f64().unwrap_or(0.0) / total;
            share * share
        })
        .sum();

    round2(100.0 * (1.0 - hhi))
}

/// Coefficient of variation of monthly revenue across every calendar month
/// of the window, months with no revenue counting as zero.
fn seasonality(monthly_trend: &[MonthlyRevenue]) -> SeasonalityReport {
    let revenues: Vec<f64> =
        monthly_trend.iter().map(|month| month.revenue.to_f64().unwrap_or(0.0)).collect();
    if revenues.is_empty() {
        return SeasonalityReport { coefficient_of_variation: 0.0, level: SeasonalityLevel::Low };
    }

    let mean = revenues.iter().sum::<f64>() / revenues.len() as f64;
    if mean == 0.0 {
        return SeasonalityReport { coefficient_of_variation: 0.0, level: SeasonalityLevel::Low };
    }

    let variance =
        revenues.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / revenues.len() as f64;
    let coefficient = round2(variance.sqrt() / mean);

    let level = if coefficient >= SEASONALITY_HIGH_COV {
        SeasonalityLevel::High
    } else if coefficient >= SEASONALITY_MEDIUM_COV {
        SeasonalityLevel::Medium
    } else {
        SeasonalityLevel::Low
    };

    SeasonalityReport { coefficient_of_variation: coefficient, level }
}

fn forecast(snapshot: &RecordSnapshot, view: &CorrelatedView<'_>) -> RevenueForecast {
    let mut high_probability = Vec::new();
    let mut medium_probability = Vec::new();
    let mut weighted_total = Decimal::ZERO;

    let pending =
        view.latest_budgets.iter().filter(|document| document.status == BudgetStatus::Pending);
    for document in pending {
        let rate = customer_conversion_rate(snapshot, view, document);
        if rate < FORECAST_MEDIUM_RATE {
            continue;
        }

        let entry = ForecastEntry {
            budget_id: document.budget_id.clone(),
            customer_key: customer_key(view, document),
            customer_name: document.customer.full_name(),
            amount: document.total,
            conversion_rate: round2(rate),
        };
        weighted_total += document.total * Decimal::from_f64(rate).unwrap_or(Decimal::ZERO);

        if rate >= FORECAST_HIGH_RATE {
            high_probability.push(entry);
        } else {
            medium_probability.push(entry);
        }
    }

    RevenueForecast {
        high_probability,
        medium_probability,
        weighted_total: weighted_total.round_dp(2),
    }
}

/// Heuristic close probability from the customer's track record: success
/// share on latest versions, penalized for rejected versions, floored by
/// whether they have ever closed, defaulting to 0.6 with no history at all.
fn customer_conversion_rate(
    snapshot: &RecordSnapshot,
    view: &CorrelatedView<'_>,
    pending: &BudgetDocument,
) -> f64 {
    let key = customer_key(view, pending);
    let history: Vec<&BudgetDocument> = snapshot
        .budgets
        .iter()
        .filter(|document| {
            document.budget_id != pending.budget_id && customer_key(view, document) == key
        })
        .collect();

    let mut latest_per_budget: BTreeMap<&str, &BudgetDocument> = BTreeMap::new();
    for document in &history {
        latest_per_budget
            .entry(document.budget_id.as_str())
            .and_modify(|current| {
                if document.version > current.version {
                    *current = document;
                }
            })
            .or_insert(document);
    }

    let total_budgets = latest_per_budget.len();
    if total_budgets == 0 {
        return NO_HISTORY_RATE;
    }

    let successful = latest_per_budget.values().filter(|document| document.status.is_successful()).count();
    let rejected_versions =
        history.iter().filter(|document| document.status == BudgetStatus::Rejected).count();

    let base = successful as f64 / total_budgets as f64;
    let penalty = (rejected_versions as f64 * REJECTION_PENALTY_STEP).min(REJECTION_PENALTY_CAP);
    let floor = if successful >= 1 { FLOOR_WITH_SUCCESS } else { FLOOR_WITHOUT_SUCCESS };

    (base - penalty).max(floor)
}

fn narrative(
    growth_rate: f64,
    approval_rate: f64,
    has_documents: bool,
    top_client: Option<&ClientConcentration>,
    top_product: Option<&ProductShare>,
    seasonality: &SeasonalityReport,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut alerts = Vec::new();
    let mut recommendations = Vec::new();

    if growth_rate > GROWTH_STRENGTH_PCT {
        strengths.push(format!("Revenue grew {growth_rate}% against the preceding period"));
    }

    if let Some(client) = top_client {
        if client.share > HIGH_RISK_SHARE {
            alerts.push(format!(
                "Top client {} holds {}% of revenue",
                client.customer_name, client.share
            ));
            recommendations
                .push("Diversify the client base to reduce top-client dependence".to_string());
        }
    }

    if let Some(product) = top_product {
        if product.share > TOP_PRODUCT_ALERT_SHARE {
            alerts.push(format!(
                "Product line {} concentrates {}% of revenue",
                product.opening_type, product.share
            ));
            recommendations
                .push("Broaden the product mix beyond the dominant opening type".to_string());
        }
    }

    if seasonality.level == SeasonalityLevel::High {
        alerts.push("Monthly revenue is highly seasonal".to_string());
        recommendations
            .push("Build a pipeline buffer to smooth out seasonal revenue swings".to_string());
    }

    if has_documents && approval_rate < LOW_APPROVAL_RATE_PCT {
        recommendations.push(format!(
            "Approval rate is {approval_rate}%: review the quotation process"
        ));
    }

    (strengths, alerts, recommendations)
}
