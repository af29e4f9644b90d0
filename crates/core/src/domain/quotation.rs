use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::normalize_status;

/// Relational source of truth for assignment and lifecycle. `id` joins into
/// budget documents via string equality with `BudgetDocument::budget_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationRecord {
    pub id: i64,
    pub customer_id: i64,
    pub user_id: i64,
    pub work_place_id: i64,
    pub status: String,
    pub total_price: Decimal,
    pub creation_date: DateTime<Utc>,
    pub last_edit_date: DateTime<Utc>,
}

impl QuotationRecord {
    pub fn budget_key(&self) -> String {
        self.id.to_string()
    }

    /// "approved"/"accepted" are the two textual spellings of a won
    /// quotation; comparisons are case-insensitive on trimmed values.
    pub fn is_approved(&self) -> bool {
        let normalized = normalize_status(&self.status);
        normalized == "approved" || normalized == "accepted"
    }

    pub fn is_rejected(&self) -> bool {
        normalize_status(&self.status) == "rejected"
    }
}
