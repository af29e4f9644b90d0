use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Document-store snapshot of one budget version. A new version is appended
/// whenever a quotation is revised; the maximum `version` per `budget_id` is
/// the authoritative current state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDocument {
    pub budget_id: String,
    pub version: u32,
    pub status: BudgetStatus,
    pub creation_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_legacy_total")]
    pub total: Decimal,
    pub customer: CustomerSnapshot,
    pub work_place: WorkPlaceSnapshot,
    pub user: UserSnapshot,
    pub products: Vec<ProductLine>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    Pending,
    Approved,
    Accepted,
    Rejected,
    Finished,
    Expired,
    #[serde(other)]
    Unknown,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Finished => "Finished",
            Self::Expired => "Expired",
            Self::Unknown => "Unknown",
        }
    }

    /// Terminal-success statuses used for revenue and product-efficiency
    /// aggregation.
    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Approved | Self::Accepted | Self::Finished)
    }

    /// The narrower success set used by the forecast's customer history:
    /// an explicit acceptance or a finished job.
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Accepted | Self::Finished)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub name: String,
    pub last_name: String,
    pub dni: String,
}

impl CustomerSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkPlaceSnapshot {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub name: String,
    pub last_name: String,
}

impl UserSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.last_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub opening_type: OpeningType,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl ProductLine {
    pub fn line_revenue(&self) -> Decimal {
        let mut revenue = self.price.unwrap_or(Decimal::ZERO) * Decimal::from(self.quantity);
        revenue.rescale(2);
        revenue
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpeningType {
    pub name: String,
}

/// Legacy documents carry `total` in several shapes: a plain number, a
/// numeric string, or a `{"$numberDecimal": "..."}` wrapper. Coercion happens
/// once here so every aggregator downstream sees a plain decimal; shapes that
/// cannot be resolved degrade to zero with a warning instead of failing the
/// whole load.
fn deserialize_legacy_total<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let mut total = coerce_total(&raw);
    // Fixed two-decimal scale: a JSON number loses its trailing zeros on the
    // way through f64, so sums over mixed shapes would otherwise serialize
    // with input-dependent precision.
    total.rescale(2);
    Ok(total)
}

fn coerce_total(raw: &serde_json::Value) -> Decimal {
    match raw {
        serde_json::Value::Number(number) => number
            .to_string()
            .parse::<Decimal>()
            .ok()
            .or_else(|| number.as_f64().and_then(Decimal::from_f64))
            .unwrap_or_else(|| warn_unresolvable(raw)),
        serde_json::Value::String(text) => {
            text.trim().parse::<Decimal>().unwrap_or_else(|_| warn_unresolvable(raw))
        }
        serde_json::Value::Object(fields) => fields
            .get("$numberDecimal")
            .and_then(|value| value.as_str())
            .and_then(|text| text.trim().parse::<Decimal>().ok())
            .unwrap_or_else(|| warn_unresolvable(raw)),
        serde_json::Value::Null => Decimal::ZERO,
        other => warn_unresolvable(other),
    }
}

fn warn_unresolvable(raw: &serde_json::Value) -> Decimal {
    tracing::warn!(shape = %raw, "unresolvable legacy total shape, defaulting to 0");
    Decimal::ZERO
}
