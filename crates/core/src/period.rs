use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Fallback span for missing or unrecognized period tokens.
pub const DEFAULT_PERIOD_DAYS: i64 = 30;

/// A half-open `[start, end)` time window. Containment is
/// `start <= t && t < end` everywhere in the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn explicit(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self { start: now - Duration::days(days), end: now }
    }

    /// Trailing window over whole calendar months, ending at `now`.
    pub fn trailing_months(now: DateTime<Utc>, months: u32) -> Self {
        let start = now
            .checked_sub_months(Months::new(months))
            .unwrap_or_else(|| now - Duration::days(i64::from(months) * 30));
        Self { start, end: now }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Equal-length window immediately before this one, separated by a
    /// one-day gap so the two never overlap. Used for dashboard trend
    /// comparison.
    pub fn comparison(&self) -> Self {
        let end = self.start - Duration::days(1);
        Self { start: end - self.length(), end }
    }

    /// Contiguous equal-length window ending where this one starts. Used for
    /// the business-health growth rate.
    pub fn preceding(&self) -> Self {
        Self { start: self.start - self.length(), end: self.start }
    }
}

/// Resolves a loose time-range token ("7d", "30d", "90d", bare numbers) into
/// a concrete window ending at `now`. Unrecognized tokens fall back to 30
/// days; there is no failure mode.
pub fn resolve_period(token: &str, now: DateTime<Utc>) -> Window {
    Window::trailing_days(now, parse_period_days(token))
}

fn parse_period_days(token: &str) -> i64 {
    let trimmed = token.trim();
    let digits = trimmed.strip_suffix('d').or_else(|| trimmed.strip_suffix('D')).unwrap_or(trimmed);

    match digits.parse::<i64>() {
        Ok(days) if days > 0 => days,
        _ => DEFAULT_PERIOD_DAYS,
    }
}
