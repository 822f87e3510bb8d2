use crate::domain::model::{Company, Ledger, LedgerRow};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of accounting data, normally a running Tally instance.
#[async_trait]
pub trait TallySource: Send + Sync {
    async fn fetch_companies(&self) -> Result<Vec<Company>>;
    async fn fetch_ledgers(&self) -> Result<Vec<Ledger>>;
}

/// Persistent sink and query source for synced ledger rows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn ensure_schema(&self) -> Result<()>;

    /// Newest `altered_on` currently stored; the incremental sync watermark.
    async fn latest_altered_on(&self) -> Result<Option<NaiveDate>>;

    async fn insert_rows(&self, rows: &[LedgerRow]) -> Result<u64>;

    async fn fetch_all(&self) -> Result<Vec<LedgerRow>>;
}

/// Free-form completion backend for questions the rule engine cannot answer.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
