//! Ledger storage back ends.
//!
//! `PgLedgerStore` is the production store; `MemoryLedgerStore` backs
//! `sync --dry-run` and the test suite.

use crate::domain::model::LedgerRow;
use crate::domain::ports::LedgerStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

const TABLE_NAME: &str = "tally_ledger_data";

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                ledger_name TEXT NOT NULL,
                parent TEXT NOT NULL DEFAULT '',
                opening_balance DOUBLE PRECISION NOT NULL DEFAULT 0,
                closing_balance DOUBLE PRECISION NOT NULL DEFAULT 0,
                altered_on DATE NOT NULL
            )",
            TABLE_NAME
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_altered_on(&self) -> Result<Option<NaiveDate>> {
        let row = sqlx::query(&format!("SELECT MAX(altered_on) AS max_date FROM {}", TABLE_NAME))
            .fetch_one(&self.pool)
            .await?;
        let max_date: Option<NaiveDate> = row.try_get("max_date")?;
        Ok(max_date)
    }

    async fn insert_rows(&self, rows: &[LedgerRow]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for row in rows {
            let result = sqlx::query(&format!(
                "INSERT INTO {} (ledger_name, parent, opening_balance, closing_balance, altered_on)
                 VALUES ($1, $2, $3, $4, $5)",
                TABLE_NAME
            ))
            .bind(&row.ledger_name)
            .bind(&row.parent)
            .bind(row.opening_balance)
            .bind(row.closing_balance)
            .bind(row.altered_on)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn fetch_all(&self) -> Result<Vec<LedgerRow>> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT ledger_name, parent, opening_balance, closing_balance, altered_on
             FROM {} ORDER BY altered_on DESC, ledger_name",
            TABLE_NAME
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Volatile store with the same contract as the PostgreSQL one.
#[derive(Default)]
pub struct MemoryLedgerStore {
    rows: RwLock<Vec<LedgerRow>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, rows: Vec<LedgerRow>) {
        *self.rows.write().await = rows;
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn latest_altered_on(&self) -> Result<Option<NaiveDate>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().map(|r| r.altered_on).max())
    }

    async fn insert_rows(&self, rows: &[LedgerRow]) -> Result<u64> {
        let mut guard = self.rows.write().await;
        guard.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn fetch_all(&self) -> Result<Vec<LedgerRow>> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| {
            b.altered_on
                .cmp(&a.altered_on)
                .then_with(|| a.ledger_name.cmp(&b.ledger_name))
        });
        Ok(rows)
    }
}
