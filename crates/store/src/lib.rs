pub mod fixtures;
pub mod json;
pub mod loader;
pub mod memory;
pub mod sources;

pub use fixtures::{DemoDataset, VerificationResult};
pub use json::JsonDatasetSource;
pub use loader::RecordLoader;
pub use memory::{InMemoryBudgetSource, InMemoryQuotationSource, InMemoryUserSource};
pub use sources::{BudgetSource, QuotationSource, SourceError, UserSource};
