use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AnalyticsConfig, StatusTaxonomy};
use crate::correlate::RecordSnapshot;
use crate::domain::budget::BudgetDocument;
use crate::domain::quotation::QuotationRecord;
use crate::kpi::{round2, Trend};
use crate::period::Window;

/// Soft revenue cap in the weighted composite: approved revenue at or above
/// this contributes the full 30 points.
const REVENUE_SOFT_CAP: f64 = 50_000.0;
/// Below this average response time the responsiveness component scores full
/// marks; above it, half.
const FAST_RESPONSE_HOURS: f64 = 48.0;
/// Response-time proxy cap (30 days). True first-response timestamps are not
/// modeled, so age-since-creation stands in, clamped.
const RESPONSE_CAP_HOURS: i64 = 720;
/// A pending quotation older than this many days demands a follow-up action.
const STALE_PENDING_DAYS: i64 = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonalMetricsError {
    #[error("user {user_id} was not found")]
    UserNotFound { user_id: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductPerformance {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    High,
    Medium,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPerformance {
    pub year: i32,
    pub month: u32,
    pub quotations: usize,
    pub accepted: usize,
    pub conversion_rate: f64,
    pub revenue: Decimal,
    pub trend: Trend,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEfficiency {
    pub opening_type: String,
    pub quoted: usize,
    pub accepted: usize,
    pub conversion_rate: f64,
    pub average_price: Decimal,
    pub performance: ProductPerformance,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopClient {
    pub customer_id: i64,
    pub customer_name: String,
    pub approved_revenue: Decimal,
    pub quotations: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientHighlights {
    pub distinct_clients: usize,
    pub top_client: Option<TopClient>,
    pub repeat_clients: usize,
    pub retention_rate: f64,
    pub new_clients: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmediateAction {
    pub priority: ActionPriority,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRanking {
    pub position: usize,
    pub peer_count: usize,
}

/// One salesperson's scorecard over a window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalMetricsReport {
    pub user_id: i64,
    pub user_name: String,
    pub window: Window,
    pub total_quotations: usize,
    pub approved_quotations: usize,
    pub conversion_rate: f64,
    pub performance_tier: PerformanceTier,
    pub overall_score: f64,
    pub approved_revenue: Decimal,
    pub average_response_time_hours: f64,
    pub average_time_to_close_days: f64,
    pub monthly_trend: Vec<MonthlyPerformance>,
    pub product_efficiency: Vec<ProductEfficiency>,
    pub client_highlights: ClientHighlights,
    pub immediate_actions: Vec<ImmediateAction>,
    pub ranking: PeerRanking,
}

pub struct PersonalPerformanceAnalyzer<'a> {
    taxonomy: &'a StatusTaxonomy,
}

impl<'a> PersonalPerformanceAnalyzer<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self { taxonomy: &config.taxonomy }
    }

    pub fn analyze(
        &self,
        now: DateTime<Utc>,
        snapshot: &RecordSnapshot,
        user_id: i64,
        window: &Window,
    ) -> Result<PersonalMetricsReport, PersonalMetricsError> {
        let user = snapshot
            .users
            .iter()
            .find(|user| user.id == user_id)
            .ok_or(PersonalMetricsError::UserNotFound { user_id })?;

        let mine: Vec<&QuotationRecord> = snapshot
            .quotations
            .iter()
            .filter(|quotation| {
                quotation.user_id == user_id && window.contains(quotation.creation_date)
            })
            .collect();
        let assigned: BTreeSet<String> =
            mine.iter().map(|quotation| quotation.budget_key()).collect();
        let view = snapshot.correlate(window);
        let my_budgets: Vec<&BudgetDocument> = view
            .latest_budgets
            .iter()
            .filter(|document| assigned.contains(&document.budget_id))
            .copied()
            .collect();

        let total = mine.len();
        let approved = mine.iter().filter(|quotation| quotation.is_approved()).count();
        let conversion_rate = if total == 0 { 0.0 } else { approved as f64 / total as f64 };
        let approved_revenue: Decimal = mine
            .iter()
            .filter(|quotation| quotation.is_approved())
            .map(|quotation| quotation.total_price)
            .sum();

        let average_response_time_hours = response_time_proxy(now, &my_budgets);
        let average_time_to_close_days = self.time_to_close(&mine);
        let overall_score =
            overall_score(conversion_rate, approved_revenue, average_response_time_hours);

        Ok(PersonalMetricsReport {
            user_id,
            user_name: user.full_name(),
            window: *window,
            total_quotations: total,
            approved_quotations: approved,
            conversion_rate,
            performance_tier: tier(conversion_rate),
            overall_score,
            approved_revenue,
            average_response_time_hours,
            average_time_to_close_days,
            monthly_trend: monthly_trend(&mine),
            product_efficiency: product_efficiency(&my_budgets),
            client_highlights: self.client_highlights(snapshot, &mine, window),
            immediate_actions: self.immediate_actions(now, &mine),
            ranking: peer_ranking(snapshot, user_id),
        })
    }

    fn time_to_close(&self, mine: &[&QuotationRecord]) -> f64 {
        let closed_days: Vec<f64> = mine
            .iter()
            .filter(|quotation| !self.taxonomy.is_active(&quotation.status))
            .map(|quotation| {
                quotation.last_edit_date.signed_duration_since(quotation.creation_date).num_days()
                    as f64
            })
            .collect();

        mean(&closed_days)
    }

    fn client_highlights(
        &self,
        snapshot: &RecordSnapshot,
        mine: &[&QuotationRecord],
        window: &Window,
    ) -> ClientHighlights {
        struct ClientBucket {
            quotations: usize,
            approved_revenue: Decimal,
        }

        let mut clients: BTreeMap<i64, ClientBucket> = BTreeMap::new();
        for quotation in mine {
            let bucket = clients
                .entry(quotation.customer_id)
                .or_insert(ClientBucket { quotations: 0, approved_revenue: Decimal::ZERO });
            bucket.quotations += 1;
            if quotation.is_approved() {
                bucket.approved_revenue += quotation.total_price;
            }
        }

        let distinct_clients = clients.len();
        let repeat_clients = clients.values().filter(|bucket| bucket.quotations > 1).count();
        let retention_rate = if distinct_clients == 0 {
            0.0
        } else {
            round2(repeat_clients as f64 / distinct_clients as f64 * 100.0)
        };

        let top_client = clients
            .iter()
            .max_by(|(left_id, left), (right_id, right)| {
                left.approved_revenue
                    .cmp(&right.approved_revenue)
                    .then(right_id.cmp(left_id))
            })
            .filter(|(_, bucket)| bucket.approved_revenue > Decimal::ZERO)
            .map(|(customer_id, bucket)| TopClient {
                customer_id: *customer_id,
                customer_name: customer_name(snapshot, *customer_id),
                approved_revenue: bucket.approved_revenue,
                quotations: bucket.quotations,
            });

        // A client is "new" when their earliest quotation anywhere in the
        // history falls after the window start.
        let new_clients = clients
            .keys()
            .filter(|customer_id| {
                snapshot
                    .quotations
                    .iter()
                    .filter(|quotation| quotation.customer_id == **customer_id)
                    .map(|quotation| quotation.creation_date)
                    .min()
                    .is_some_and(|earliest| earliest >= window.start)
            })
            .count();

        ClientHighlights {
            distinct_clients,
            top_client,
            repeat_clients,
            retention_rate,
            new_clients,
        }
    }

    fn immediate_actions(
        &self,
        now: DateTime<Utc>,
        mine: &[&QuotationRecord],
    ) -> Vec<ImmediateAction> {
        let mut actions = Vec::new();

        let stale_pending = mine
            .iter()
            .filter(|quotation| {
                self.taxonomy.is_active(&quotation.status)
                    && now.signed_duration_since(quotation.creation_date)
                        > Duration::days(STALE_PENDING_DAYS)
            })
            .count();
        if stale_pending >= 1 {
            actions.push(ImmediateAction {
                priority: ActionPriority::High,
                message: format!(
                    "{stale_pending} pending quotation(s) older than {STALE_PENDING_DAYS} days need a follow-up"
                ),
            });
        }

        let mut rejected_per_client: BTreeMap<i64, usize> = BTreeMap::new();
        for quotation in mine.iter().filter(|quotation| quotation.is_rejected()) {
            *rejected_per_client.entry(quotation.customer_id).or_insert(0) += 1;
        }
        let repeat_rejections =
            rejected_per_client.values().filter(|rejections| **rejections >= 2).count();
        if repeat_rejections >= 1 {
            actions.push(ImmediateAction {
                priority: ActionPriority::Medium,
                message: format!(
                    "{repeat_rejections} client(s) with two or more rejected quotations: review pricing and scope"
                ),
            });
        }

        actions
    }
}

fn tier(conversion_rate: f64) -> PerformanceTier {
    if conversion_rate >= 0.7 {
        PerformanceTier::High
    } else if conversion_rate >= 0.4 {
        PerformanceTier::Medium
    } else {
        PerformanceTier::Low
    }
}

/// Weighted composite: conversion 40, revenue-to-cap 30, responsiveness 30.
/// The bounds are soft caps, not hard invariants.
fn overall_score(conversion_rate: f64, approved_revenue: Decimal, response_hours: f64) -> f64 {
    let revenue_factor = (approved_revenue.to_f64().unwrap_or(0.0) / REVENUE_SOFT_CAP).min(1.0);
    let responsiveness = if response_hours < FAST_RESPONSE_HOURS { 1.0 } else { 0.5 };

    round2(conversion_rate * 40.0 + revenue_factor * 30.0 + responsiveness * 30.0)
}

/// Age-since-creation in hours, capped at 30 days, over budgets older than a
/// day. A stand-in for response time until first-response timestamps exist.
fn response_time_proxy(now: DateTime<Utc>, budgets: &[&BudgetDocument]) -> f64 {
    let hours: Vec<f64> = budgets
        .iter()
        .filter(|document| now.signed_duration_since(document.creation_date) > Duration::days(1))
        .map(|document| {
            now.signed_duration_since(document.creation_date)
                .num_hours()
                .min(RESPONSE_CAP_HOURS) as f64
        })
        .collect();

    mean(&hours)
}

fn monthly_trend(mine: &[&QuotationRecord]) -> Vec<MonthlyPerformance> {
    struct MonthBucket {
        quotations: usize,
        accepted: usize,
        revenue: Decimal,
    }

    let mut months: BTreeMap<(i32, u32), MonthBucket> = BTreeMap::new();
    for quotation in mine {
        let key = (quotation.creation_date.year(), quotation.creation_date.month());
        let bucket = months
            .entry(key)
            .or_insert(MonthBucket { quotations: 0, accepted: 0, revenue: Decimal::ZERO });
        bucket.quotations += 1;
        if quotation.is_approved() {
            bucket.accepted += 1;
            bucket.revenue += quotation.total_price;
        }
    }

    let mut earlier_revenues: Vec<f64> = Vec::new();
    months
        .into_iter()
        .map(|((year, month), bucket)| {
            let revenue = bucket.revenue.to_f64().unwrap_or(0.0);
            // Compared to the mean of all strictly-earlier months, not just
            // the adjacent one; the first month compares against 0.
            let baseline = mean(&earlier_revenues);
            earlier_revenues.push(revenue);

            MonthlyPerformance {
                year,
                month,
                quotations: bucket.quotations,
                accepted: bucket.accepted,
                conversion_rate: if bucket.quotations == 0 {
                    0.0
                } else {
                    bucket.accepted as f64 / bucket.quotations as f64
                },
                revenue: bucket.revenue,
                trend: if revenue > baseline { Trend::Up } else { Trend::Down },
            }
        })
        .collect()
}

fn product_efficiency(budgets: &[&BudgetDocument]) -> Vec<ProductEfficiency> {
    struct ProductBucket {
        quoted: usize,
        accepted: usize,
        price_sum: Decimal,
        priced_lines: usize,
    }

    let mut products: BTreeMap<String, ProductBucket> = BTreeMap::new();
    for document in budgets {
        // Acceptance is judged on the budget document's own status, not the
        // relational quotation's.
        let converted = document.status.is_converted();
        for line in &document.products {
            let bucket = products.entry(line.opening_type.name.clone()).or_insert(ProductBucket {
                quoted: 0,
                accepted: 0,
                price_sum: Decimal::ZERO,
                priced_lines: 0,
            });
            bucket.quoted += 1;
            if converted {
                bucket.accepted += 1;
            }
            if let Some(price) = line.price {
                bucket.price_sum += price;
                bucket.priced_lines += 1;
            }
        }
    }

    products
        .into_iter()
        .map(|(opening_type, bucket)| {
            let conversion_rate =
                if bucket.quoted == 0 { 0.0 } else { bucket.accepted as f64 / bucket.quoted as f64 };
            let average_price = if bucket.priced_lines == 0 {
                Decimal::ZERO
            } else {
                (bucket.price_sum / Decimal::from(bucket.priced_lines)).round_dp(2)
            };

            ProductEfficiency {
                opening_type,
                quoted: bucket.quoted,
                accepted: bucket.accepted,
                conversion_rate,
                average_price,
                performance: product_performance(conversion_rate),
            }
        })
        .collect()
}

fn product_performance(conversion_rate: f64) -> ProductPerformance {
    if conversion_rate >= 0.7 {
        ProductPerformance::Excellent
    } else if conversion_rate >= 0.5 {
        ProductPerformance::Good
    } else if conversion_rate >= 0.3 {
        ProductPerformance::Fair
    } else {
        ProductPerformance::Poor
    }
}

/// Ranks every active user with any quotation history by conversion rate,
/// then accepted count, then user id. A target with no history ranks last.
fn peer_ranking(snapshot: &RecordSnapshot, user_id: i64) -> PeerRanking {
    struct PeerStats {
        user_id: i64,
        conversion_rate: f64,
        accepted: usize,
    }

    let mut peers: Vec<PeerStats> = snapshot
        .users
        .iter()
        .filter(|user| user.is_active())
        .filter_map(|user| {
            let history: Vec<&QuotationRecord> = snapshot
                .quotations
                .iter()
                .filter(|quotation| quotation.user_id == user.id)
                .collect();
            if history.is_empty() {
                return None;
            }

            let accepted = history.iter().filter(|quotation| quotation.is_approved()).count();
            Some(PeerStats {
                user_id: user.id,
                conversion_rate: accepted as f64 / history.len() as f64,
                accepted,
            })
        })
        .collect();

    peers.sort_by(|left, right| {
        right
            .conversion_rate
            .partial_cmp(&left.conversion_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(right.accepted.cmp(&left.accepted))
            .then(left.user_id.cmp(&right.user_id))
    });

    let peer_count = peers.len();
    let position = peers
        .iter()
        .position(|peer| peer.user_id == user_id)
        .map(|index| index + 1)
        .unwrap_or(peer_count + 1);

    PeerRanking { position, peer_count }
}

fn customer_name(snapshot: &RecordSnapshot, customer_id: i64) -> String {
    snapshot
        .quotations
        .iter()
        .filter(|quotation| quotation.customer_id == customer_id)
        .find_map(|quotation| {
            let key = quotation.budget_key();
            snapshot
                .budgets
                .iter()
                .find(|document| document.budget_id == key)
                .map(|document| document.customer.full_name())
        })
        .unwrap_or_else(|| format!("Customer {customer_id}"))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round2(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::config::AnalyticsConfig;
    use crate::correlate::RecordSnapshot;
    use crate::domain::budget::{
        BudgetDocument, BudgetStatus, CustomerSnapshot, OpeningType, ProductLine, UserSnapshot,
        WorkPlaceSnapshot,
    };
    use crate::domain::quotation::QuotationRecord;
    use crate::domain::user::{UserRecord, UserRole};
    use crate::kpi::Trend;
    use crate::period::Window;

    use super::{
        PerformanceTier, PersonalMetricsError, PersonalPerformanceAnalyzer, ProductPerformance,
    };

    fn now() -> chrono::DateTime<chrono::Utc> {
        Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap()
    }

    fn quotation(
        id: i64,
        user_id: i64,
        customer_id: i64,
        status: &str,
        total: i64,
        age_days: i64,
    ) -> QuotationRecord {
        QuotationRecord {
            id,
            customer_id,
            user_id,
            work_place_id: 9,
            status: status.to_string(),
            total_price: Decimal::new(total * 100, 2),
            creation_date: now() - Duration::days(age_days),
            last_edit_date: now() - Duration::days((age_days - 2).max(0)),
        }
    }

    fn budget(
        budget_id: &str,
        status: BudgetStatus,
        age_days: i64,
        products: Vec<(&str, u32, Option<i64>)>,
    ) -> BudgetDocument {
        BudgetDocument {
            budget_id: budget_id.to_string(),
            version: 1,
            status,
            creation_date: now() - Duration::days(age_days),
            expiration_date: now() + Duration::days(30),
            end_date: None,
            total: Decimal::new(100_000, 2),
            customer: CustomerSnapshot {
                name: "Elena".to_string(),
                last_name: "Rios".to_string(),
                dni: "30111222".to_string(),
            },
            work_place: WorkPlaceSnapshot { name: "Casa Central".to_string() },
            user: UserSnapshot { name: "Lucia".to_string(), last_name: "Paredes".to_string() },
            products: products
                .into_iter()
                .map(|(name, quantity, price)| ProductLine {
                    opening_type: OpeningType { name: name.to_string() },
                    quantity,
                    price: price.map(|value| Decimal::new(value * 100, 2)),
                })
                .collect(),
        }
    }

    fn user(id: i64, status: i32) -> UserRecord {
        UserRecord {
            id,
            name: format!("User{id}"),
            last_name: "Test".to_string(),
            mail: format!("user{id}@example.com"),
            status,
            role: UserRole { role_name: "quotator".to_string() },
        }
    }

    fn analyze(
        snapshot: &RecordSnapshot,
        user_id: i64,
    ) -> Result<super::PersonalMetricsReport, PersonalMetricsError> {
        let config = AnalyticsConfig::default();
        let window = Window::trailing_months(now(), 6);
        PersonalPerformanceAnalyzer::new(&config).analyze(now(), snapshot, user_id, &window)
    }

    #[test]
    fn unknown_user_is_the_one_hard_error() {
        let snapshot = RecordSnapshot::default();
        let error = analyze(&snapshot, 99).expect_err("missing user must surface");
        assert_eq!(error, PersonalMetricsError::UserNotFound { user_id: 99 });
    }

    #[test]
    fn conversion_rate_and_tier_follow_the_approved_share() {
        let snapshot = RecordSnapshot {
            quotations: vec![
                quotation(1001, 1, 501, "approved", 20_000, 10),
                quotation(1002, 1, 501, "accepted", 15_000, 20),
                quotation(1003, 1, 502, "rejected", 5_000, 30),
            ],
            budgets: Vec::new(),
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");

        assert_eq!(report.total_quotations, 3);
        assert_eq!(report.approved_quotations, 2);
        assert!((report.conversion_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.performance_tier, PerformanceTier::Medium);
        assert_eq!(report.approved_revenue, Decimal::new(3_500_000, 2));
    }

    #[test]
    fn conversion_rate_is_zero_for_an_empty_cohort() {
        let snapshot = RecordSnapshot {
            quotations: Vec::new(),
            budgets: Vec::new(),
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");

        assert_eq!(report.conversion_rate, 0.0);
        assert_eq!(report.performance_tier, PerformanceTier::Low);
        assert_eq!(report.average_response_time_hours, 0.0);
    }

    #[test]
    fn overall_score_caps_the_revenue_component() {
        // 100% conversion, revenue far past the cap, stale budgets: the
        // responsiveness factor halves and the revenue factor saturates.
        let snapshot = RecordSnapshot {
            quotations: vec![quotation(1001, 1, 501, "approved", 200_000, 20)],
            budgets: vec![budget("1001", BudgetStatus::Approved, 20, Vec::new())],
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");

        assert_eq!(report.overall_score, 40.0 + 30.0 + 15.0);
    }

    #[test]
    fn monthly_trend_compares_each_month_to_the_mean_of_earlier_months() {
        let snapshot = RecordSnapshot {
            quotations: vec![
                quotation(1001, 1, 501, "approved", 10_000, 100),
                quotation(1002, 1, 501, "approved", 4_000, 40),
                quotation(1003, 1, 502, "approved", 30_000, 5),
            ],
            budgets: Vec::new(),
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");
        let trend: Vec<Trend> = report.monthly_trend.iter().map(|month| month.trend).collect();

        assert_eq!(report.monthly_trend.len(), 3);
        assert_eq!(
            trend,
            vec![Trend::Up, Trend::Down, Trend::Up],
            "first month beats 0, second is below the earlier mean, third beats it",
        );
    }

    #[test]
    fn product_efficiency_derives_from_the_budget_document_status() {
        let snapshot = RecordSnapshot {
            quotations: vec![
                quotation(1001, 1, 501, "pending", 10_000, 10),
                quotation(1002, 1, 501, "pending", 10_000, 12),
            ],
            budgets: vec![
                budget(
                    "1001",
                    BudgetStatus::Accepted,
                    10,
                    vec![("Ventana corrediza", 2, Some(450)), ("Puerta", 1, None)],
                ),
                budget("1002", BudgetStatus::Pending, 12, vec![("Ventana corrediza", 1, Some(550))]),
            ],
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");
        let window = report
            .product_efficiency
            .iter()
            .find(|product| product.opening_type == "Ventana corrediza")
            .expect("window product");
        let door = report
            .product_efficiency
            .iter()
            .find(|product| product.opening_type == "Puerta")
            .expect("door product");

        assert_eq!(window.quoted, 2);
        assert_eq!(window.accepted, 1);
        assert_eq!(window.average_price, Decimal::new(50_000, 2));
        assert_eq!(window.performance, ProductPerformance::Good);
        assert_eq!(door.average_price, Decimal::ZERO, "unpriced lines are ignored");
        assert_eq!(door.performance, ProductPerformance::Excellent);
    }

    #[test]
    fn client_highlights_track_repeats_retention_and_new_clients() {
        let mut quotations = vec![
            quotation(1001, 1, 501, "approved", 12_000, 10),
            quotation(1002, 1, 501, "approved", 8_000, 20),
            quotation(1003, 1, 502, "pending", 5_000, 5),
        ];
        // Customer 502 already quoted a year ago, so they are not new.
        let mut old = quotation(9001, 2, 502, "rejected", 3_000, 10);
        old.creation_date = now() - Duration::days(400);
        quotations.push(old);

        let snapshot = RecordSnapshot {
            quotations,
            budgets: Vec::new(),
            users: vec![user(1, 1), user(2, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");
        let highlights = &report.client_highlights;

        assert_eq!(highlights.distinct_clients, 2);
        assert_eq!(highlights.repeat_clients, 1);
        assert_eq!(highlights.retention_rate, 50.0);
        assert_eq!(highlights.new_clients, 1, "customer 502 has pre-window history");
        let top = highlights.top_client.as_ref().expect("top client");
        assert_eq!(top.customer_id, 501);
        assert_eq!(top.approved_revenue, Decimal::new(2_000_000, 2));
    }

    #[test]
    fn immediate_actions_flag_stale_pendings_and_repeat_rejections() {
        let snapshot = RecordSnapshot {
            quotations: vec![
                quotation(1001, 1, 501, "pending", 10_000, 12),
                quotation(1002, 1, 502, "rejected", 5_000, 15),
                quotation(1003, 1, 502, "rejected", 5_500, 25),
            ],
            budgets: Vec::new(),
            users: vec![user(1, 1)],
        };

        let report = analyze(&snapshot, 1).expect("report");

        assert_eq!(report.immediate_actions.len(), 2);
        assert_eq!(report.immediate_actions[0].priority, super::ActionPriority::High);
        assert_eq!(report.immediate_actions[1].priority, super::ActionPriority::Medium);
    }

    #[test]
    fn peer_ranking_orders_by_conversion_then_accepted_count() {
        let snapshot = RecordSnapshot {
            quotations: vec![
                // User 1: 1/2 converted. User 2: 2/2. User 3 inactive, ignored.
                quotation(1001, 1, 501, "approved", 10_000, 10),
                quotation(1002, 1, 502, "pending", 5_000, 10),
                quotation(2001, 2, 503, "approved", 8_000, 10),
                quotation(2002, 2, 503, "accepted", 9_000, 12),
                quotation(3001, 3, 504, "approved", 50_000, 10),
            ],
            budgets: Vec::new(),
            users: vec![user(1, 1), user(2, 1), user(3, 0)],
        };

        let report = analyze(&snapshot, 1).expect("report");

        assert_eq!(report.ranking.peer_count, 2);
        assert_eq!(report.ranking.position, 2);
    }
}
