use std::sync::Arc;

use rust_decimal::Decimal;

use cotiza_core::correlate::RecordSnapshot;

use crate::loader::RecordLoader;
use crate::memory::{InMemoryBudgetSource, InMemoryQuotationSource, InMemoryUserSource};
use crate::sources::SourceError;

const QUOTATION_COUNT: usize = 7;
const BUDGET_DOCUMENT_COUNT: usize = 10;
const USER_COUNT: usize = 6;

/// Budget revised twice; only version 3 may reach any aggregate.
const MULTI_VERSION_BUDGET_ID: &str = "1001";
const MULTI_VERSION_LATEST: u32 = 3;

/// Budget with no relational counterpart, exercising assignee fallback.
const UNLINKED_BUDGET_ID: &str = "3001";

/// Pending budget for a customer with no prior history, exercising the
/// forecast's no-history default.
const NEW_CUSTOMER_BUDGET_ID: &str = "1006";

/// Deterministic demo export covering every correlation and coercion path:
/// multi-version budgets, legacy total shapes, a drifted budget with no
/// quotation, eligible and excluded user roles, and an inactive account.
pub struct DemoDataset;

impl DemoDataset {
    pub const JSON: &str = include_str!("../../../config/fixtures/demo_dataset.json");

    pub fn snapshot() -> Result<RecordSnapshot, SourceError> {
        serde_json::from_str(Self::JSON).map_err(|error| SourceError::Decode(error.to_string()))
    }

    /// A loader over in-memory sources seeded with the demo export.
    pub fn loader() -> Result<RecordLoader, SourceError> {
        let snapshot = Self::snapshot()?;
        Ok(RecordLoader::new(
            Arc::new(InMemoryQuotationSource::new(snapshot.quotations)),
            Arc::new(InMemoryBudgetSource::new(snapshot.budgets)),
            Arc::new(InMemoryUserSource::new(snapshot.users)),
        ))
    }

    /// Checks the decoded dataset against the fixture contract. Run by tests
    /// whenever the JSON is touched so the scenarios it pins stay pinned.
    pub fn verify(snapshot: &RecordSnapshot) -> VerificationResult {
        let mut checks = Vec::new();

        checks.push(("quotation-count", snapshot.quotations.len() == QUOTATION_COUNT));
        checks.push(("budget-document-count", snapshot.budgets.len() == BUDGET_DOCUMENT_COUNT));
        checks.push(("user-count", snapshot.users.len() == USER_COUNT));

        let latest_revision = snapshot
            .budgets
            .iter()
            .filter(|document| document.budget_id == MULTI_VERSION_BUDGET_ID)
            .map(|document| document.version)
            .max();
        checks.push(("multi-version-latest", latest_revision == Some(MULTI_VERSION_LATEST)));

        let version_total = |version: u32| {
            snapshot
                .budgets
                .iter()
                .find(|document| {
                    document.budget_id == MULTI_VERSION_BUDGET_ID && document.version == version
                })
                .map(|document| document.total)
        };
        checks.push(("legacy-string-total", version_total(1) == Some(Decimal::new(148_000, 2))));
        checks.push(("legacy-wrapper-total", version_total(2) == Some(Decimal::new(150_000, 2))));

        let unlinked_present =
            snapshot.budgets.iter().any(|document| document.budget_id == UNLINKED_BUDGET_ID)
                && !snapshot
                    .quotations
                    .iter()
                    .any(|quotation| quotation.budget_key() == UNLINKED_BUDGET_ID);
        checks.push(("unlinked-budget", unlinked_present));

        let new_customer_pending = snapshot
            .budgets
            .iter()
            .filter(|document| document.budget_id == NEW_CUSTOMER_BUDGET_ID)
            .count()
            == 1;
        checks.push(("new-customer-pending", new_customer_pending));

        let eligible_roles = snapshot
            .users
            .iter()
            .filter(|user| user.is_active() && user.role_name() != "admin")
            .count();
        checks.push(("eligible-users", eligible_roles == 4));

        let all_present = checks.iter().all(|(_, present)| *present);
        VerificationResult { all_present, checks }
    }
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
