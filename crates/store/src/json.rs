use std::path::{Path, PathBuf};

use async_trait::async_trait;

use cotiza_core::correlate::RecordSnapshot;
use cotiza_core::domain::budget::BudgetDocument;
use cotiza_core::domain::quotation::QuotationRecord;
use cotiza_core::domain::user::UserRecord;

use crate::sources::{BudgetSource, QuotationSource, SourceError, UserSource};

/// One JSON file holding all three collections, the shape an operator gets
/// from a nightly export. Re-read on every fetch so a rerun picks up a
/// refreshed export without restarting anything.
pub struct JsonDatasetSource {
    path: PathBuf,
}

impl JsonDatasetSource {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_snapshot(&self) -> Result<RecordSnapshot, SourceError> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|source| SourceError::Io { path: self.path.clone(), source })?;
        serde_json::from_str(&raw).map_err(|error| SourceError::Decode(error.to_string()))
    }
}

#[async_trait]
impl QuotationSource for JsonDatasetSource {
    async fn fetch_all(&self) -> Result<Vec<QuotationRecord>, SourceError> {
        Ok(self.read_snapshot()?.quotations)
    }
}

#[async_trait]
impl BudgetSource for JsonDatasetSource {
    async fn fetch_all(&self) -> Result<Vec<BudgetDocument>, SourceError> {
        Ok(self.read_snapshot()?.budgets)
    }
}

#[async_trait]
impl UserSource for JsonDatasetSource {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, SourceError> {
        Ok(self.read_snapshot()?.users)
    }
}
