use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use cotiza_core::domain::budget::BudgetDocument;
use cotiza_core::domain::quotation::QuotationRecord;
use cotiza_core::domain::user::UserRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Relational-side quotation headers. A source hands back its full collection;
/// window filtering and version selection happen in the engine, never here.
#[async_trait]
pub trait QuotationSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, SourceError>;
}

/// Document-side budget versions, every revision included.
#[async_trait]
pub trait BudgetSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<BudgetDocument>, SourceError>;
}

#[async_trait]
pub trait UserSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError>;
}
