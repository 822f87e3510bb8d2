//! Incremental Tally → store synchronization.

use crate::domain::model::{Ledger, LedgerRow, SyncReport};
use crate::domain::ports::{LedgerStore, TallySource};
use crate::utils::error::Result;
use std::time::Duration;

pub struct SyncEngine<S: TallySource, L: LedgerStore> {
    source: S,
    store: L,
}

impl<S: TallySource, L: LedgerStore> SyncEngine<S, L> {
    pub fn new(source: S, store: L) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    /// One extract → filter → load cycle.
    ///
    /// Only rows altered strictly after the stored watermark are inserted;
    /// on an empty table everything with a usable date goes in.
    pub async fn run_once(&self) -> Result<SyncReport> {
        self.store.ensure_schema().await?;

        tracing::info!("Fetching ledgers from Tally...");
        let ledgers = self.source.fetch_ledgers().await?;
        let fetched = ledgers.len();
        tracing::info!("Fetched {} ledgers", fetched);

        let watermark = self.store.latest_altered_on().await?;
        if let Some(date) = watermark {
            tracing::debug!("Current watermark: {}", date);
        }

        let rows: Vec<LedgerRow> = ledgers
            .into_iter()
            .filter_map(Ledger::into_row)
            .filter(|row| watermark.is_none_or(|w| row.altered_on > w))
            .collect();
        let skipped = fetched - rows.len();

        let inserted = if rows.is_empty() {
            tracing::info!("No new data to insert");
            0
        } else {
            let inserted = self.store.insert_rows(&rows).await?;
            tracing::info!("Inserted {} new records into the database", inserted);
            inserted
        };

        Ok(SyncReport {
            fetched,
            skipped,
            inserted,
            watermark_before: watermark,
        })
    }

    /// Repeat `run_once` forever on a fixed interval. A failing cycle is
    /// logged and the loop continues; only the first tick runs immediately.
    pub async fn run_watch(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(report) => {
                    tracing::info!(
                        fetched = report.fetched,
                        skipped = report.skipped,
                        inserted = report.inserted,
                        "Sync cycle complete"
                    );
                }
                Err(e) => {
                    tracing::error!("Sync cycle failed: {}", e);
                    tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLedgerStore;
    use crate::domain::model::Company;
    use crate::utils::error::BridgeError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct FixedSource {
        ledgers: Vec<Ledger>,
    }

    /// Fails the first fetch, then behaves like `FixedSource`.
    struct FlakySource {
        ledgers: Vec<Ledger>,
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl TallySource for FlakySource {
        async fn fetch_companies(&self) -> Result<Vec<Company>> {
            Ok(vec![])
        }

        async fn fetch_ledgers(&self) -> Result<Vec<Ledger>> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(BridgeError::ProcessingError {
                    message: "transient fetch failure".to_string(),
                });
            }
            Ok(self.ledgers.clone())
        }
    }

    #[async_trait]
    impl TallySource for FixedSource {
        async fn fetch_companies(&self) -> Result<Vec<Company>> {
            Ok(vec![])
        }

        async fn fetch_ledgers(&self) -> Result<Vec<Ledger>> {
            Ok(self.ledgers.clone())
        }
    }

    fn ledger(name: &str, closing: f64, altered_on: Option<NaiveDate>) -> Ledger {
        Ledger {
            name: name.to_string(),
            parent: "Sundry Debtors".to_string(),
            address: String::new(),
            state: String::new(),
            country: String::new(),
            pincode: String::new(),
            email: String::new(),
            phone: String::new(),
            mobile: String::new(),
            gstin: String::new(),
            opening_balance: 0.0,
            closing_balance: closing,
            altered_on,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn first_sync_inserts_all_dated_ledgers() {
        let source = FixedSource {
            ledgers: vec![
                ledger("ABC Suppliers", 1000.0, Some(date(2025, 1, 5))),
                ledger("Cash", 500.0, Some(date(2025, 2, 1))),
                ledger("Never Edited", 5.0, None),
            ],
        };
        let engine = SyncEngine::new(source, MemoryLedgerStore::new());

        let report = engine.run_once().await.unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.watermark_before, None);
    }

    #[tokio::test]
    async fn second_sync_only_inserts_newer_rows() {
        let store = MemoryLedgerStore::new();
        store
            .seed(vec![LedgerRow {
                ledger_name: "Cash".to_string(),
                parent: String::new(),
                opening_balance: 0.0,
                closing_balance: 500.0,
                altered_on: date(2025, 2, 1),
            }])
            .await;

        let source = FixedSource {
            ledgers: vec![
                // Same watermark date: not re-inserted.
                ledger("Cash", 500.0, Some(date(2025, 2, 1))),
                ledger("New Customer", 99.0, Some(date(2025, 2, 10))),
            ],
        };
        let engine = SyncEngine::new(source, store);

        let report = engine.run_once().await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.watermark_before, Some(date(2025, 2, 1)));

        let rows = engine.store().fetch_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ledger_name, "New Customer");
    }

    #[tokio::test(start_paused = true)]
    async fn watch_keeps_going_after_a_failed_cycle() {
        let source = FlakySource {
            ledgers: vec![ledger("Cash", 500.0, Some(date(2025, 2, 1)))],
            failed_once: AtomicBool::new(false),
        };
        let engine = Arc::new(SyncEngine::new(source, MemoryLedgerStore::new()));

        let watcher = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.run_watch(Duration::from_secs(60)).await }
        });

        // First tick fires immediately and fails; the next one at +60s
        // succeeds. Paused time advances as soon as both tasks are idle.
        tokio::time::sleep(Duration::from_secs(61)).await;
        watcher.abort();

        let rows = engine.store().fetch_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ledger_name, "Cash");
    }
}
