use tokio::sync::RwLock;

use cotiza_core::domain::budget::BudgetDocument;
use cotiza_core::domain::quotation::QuotationRecord;
use cotiza_core::domain::user::UserRecord;

use crate::sources::{BudgetSource, QuotationSource, SourceError, UserSource};

#[derive(Default)]
pub struct InMemoryQuotationSource {
    records: RwLock<Vec<QuotationRecord>>,
}

impl InMemoryQuotationSource {
    pub fn new(records: Vec<QuotationRecord>) -> Self {
        Self { records: RwLock::new(records) }
    }
}

#[async_trait::async_trait]
impl QuotationSource for InMemoryQuotationSource {
    async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, SourceError> {
        Ok(self.records.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryBudgetSource {
    documents: RwLock<Vec<BudgetDocument>>,
}

impl InMemoryBudgetSource {
    pub fn new(documents: Vec<BudgetDocument>) -> Self {
        Self { documents: RwLock::new(documents) }
    }

    pub async fn push(&self, document: BudgetDocument) {
        self.documents.write().await.push(document);
    }
}

#[async_trait::async_trait]
impl BudgetSource for InMemoryBudgetSource {
    async fn fetch_all(&self) -> Result<Vec<BudgetDocument>, SourceError> {
        Ok(self.documents.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemoryUserSource {
    records: RwLock<Vec<UserRecord>>,
}

impl InMemoryUserSource {
    pub fn new(records: Vec<UserRecord>) -> Self {
        Self { records: RwLock::new(records) }
    }
}

#[async_trait::async_trait]
impl UserSource for InMemoryUserSource {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError> {
        Ok(self.records.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use cotiza_core::domain::quotation::QuotationRecord;
    use cotiza_core::domain::user::{UserRecord, UserRole};

    use crate::sources::{QuotationSource, UserSource};

    use super::{InMemoryQuotationSource, InMemoryUserSource};

    fn quotation(id: i64) -> QuotationRecord {
        QuotationRecord {
            id,
            customer_id: 501,
            user_id: 1,
            work_place_id: 9,
            status: "pending".to_string(),
            total_price: Decimal::new(152_550, 2),
            creation_date: Utc.with_ymd_and_hms(2025, 7, 20, 10, 0, 0).unwrap(),
            last_edit_date: Utc.with_ymd_and_hms(2025, 7, 22, 10, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn in_memory_quotation_source_round_trip() {
        let source = InMemoryQuotationSource::new(vec![quotation(1001), quotation(1002)]);

        let records = source.fetch_all().await.expect("fetch quotations");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1001);
    }

    #[tokio::test]
    async fn empty_sources_fetch_empty_collections() {
        let source = InMemoryUserSource::default();
        assert!(source.fetch_all().await.expect("fetch users").is_empty());

        let source = InMemoryUserSource::new(vec![UserRecord {
            id: 1,
            name: "Lucia".to_string(),
            last_name: "Paredes".to_string(),
            mail: "lucia@example.com".to_string(),
            status: 1,
            role: UserRole { role_name: "quotator".to_string() },
        }]);
        assert_eq!(source.fetch_all().await.expect("fetch users").len(), 1);
    }
}
