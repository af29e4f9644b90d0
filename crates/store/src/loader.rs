use std::sync::Arc;

use tracing::debug;

use cotiza_core::correlate::RecordSnapshot;

use crate::json::JsonDatasetSource;
use crate::sources::{BudgetSource, QuotationSource, SourceError, UserSource};

/// Fans out to the three sources concurrently and assembles the immutable
/// snapshot every aggregator consumes. One failed source fails the whole
/// load; nothing downstream ever sees a partial snapshot.
pub struct RecordLoader {
    quotations: Arc<dyn QuotationSource>,
    budgets: Arc<dyn BudgetSource>,
    users: Arc<dyn UserSource>,
}

impl RecordLoader {
    pub fn new(
        quotations: Arc<dyn QuotationSource>,
        budgets: Arc<dyn BudgetSource>,
        users: Arc<dyn UserSource>,
    ) -> Self {
        Self { quotations, budgets, users }
    }

    /// A single export file backing all three collections.
    pub fn from_json(source: JsonDatasetSource) -> Self {
        let shared = Arc::new(source);
        Self::new(shared.clone(), shared.clone(), shared)
    }

    pub async fn load(&self) -> Result<RecordSnapshot, SourceError> {
        let (quotations, budgets, users) = tokio::try_join!(
            self.quotations.fetch_all(),
            self.budgets.fetch_all(),
            self.users.fetch_all(),
        )?;

        debug!(
            quotations = quotations.len(),
            budgets = budgets.len(),
            users = users.len(),
            "loaded record snapshot"
        );

        Ok(RecordSnapshot { quotations, budgets, users })
    }
}
