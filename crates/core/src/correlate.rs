use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::budget::BudgetDocument;
use crate::domain::quotation::QuotationRecord;
use crate::domain::user::UserRecord;
use crate::period::Window;

/// The three immutable collections a run consumes. Produced by the record
/// loader; nothing in the engine ever calls back into storage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub quotations: Vec<QuotationRecord>,
    pub budgets: Vec<BudgetDocument>,
    pub users: Vec<UserRecord>,
}

/// Cross-store join over one window: latest budget version per budget id,
/// plus O(1) lookups into the relational side.
pub struct CorrelatedView<'a> {
    pub latest_budgets: Vec<&'a BudgetDocument>,
    pub quotation_by_id: HashMap<String, &'a QuotationRecord>,
    pub user_by_id: HashMap<i64, &'a UserRecord>,
}

impl RecordSnapshot {
    pub fn correlate(&self, window: &Window) -> CorrelatedView<'_> {
        CorrelatedView {
            latest_budgets: latest_budgets_in_window(&self.budgets, window),
            quotation_by_id: self
                .quotations
                .iter()
                .map(|quotation| (quotation.budget_key(), quotation))
                .collect(),
            user_by_id: self.users.iter().map(|user| (user.id, user)).collect(),
        }
    }
}

/// For every budget id with at least one document created in the window,
/// selects the document with the maximum version among those in-window
/// documents. Superseded versions stay out of every downstream aggregate.
/// Output is ordered by budget id so reruns are byte-identical.
pub fn latest_budgets_in_window<'a>(
    budgets: &'a [BudgetDocument],
    window: &Window,
) -> Vec<&'a BudgetDocument> {
    let mut latest: BTreeMap<&str, &BudgetDocument> = BTreeMap::new();

    for document in budgets.iter().filter(|document| window.contains(document.creation_date)) {
        latest
            .entry(document.budget_id.as_str())
            .and_modify(|current| {
                if document.version > current.version {
                    *current = document;
                }
            })
            .or_insert(document);
    }

    latest.into_values().collect()
}

/// Latest version per budget id over the full history, no window filter.
/// Used where a customer's complete track record matters (forecast, YoY).
pub fn latest_budgets<'a>(budgets: &'a [BudgetDocument]) -> Vec<&'a BudgetDocument> {
    let mut latest: BTreeMap<&str, &BudgetDocument> = BTreeMap::new();

    for document in budgets {
        latest
            .entry(document.budget_id.as_str())
            .and_modify(|current| {
                if document.version > current.version {
                    *current = document;
                }
            })
            .or_insert(document);
    }

    latest.into_values().collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub id: i64,
    pub name: String,
}

impl CorrelatedView<'_> {
    /// Resolves the person responsible for a budget document: relational join
    /// first, falling back to the document's embedded user snapshot (with id
    /// 0) when the stores have drifted apart. Never fails.
    pub fn resolve_assignee(&self, document: &BudgetDocument) -> Assignee {
        if let Some(quotation) = self.quotation_by_id.get(&document.budget_id) {
            if let Some(user) = self.user_by_id.get(&quotation.user_id) {
                return Assignee { id: user.id, name: user.full_name() };
            }
        }

        Assignee { id: 0, name: document.user.full_name() }
    }
}
