pub mod config;
pub mod db;
pub mod domain;
pub mod llm;
pub mod query;
pub mod sync;
pub mod tally;
pub mod utils;
pub mod web;

pub use config::{AppConfig, Cli, Command};
pub use db::{MemoryLedgerStore, PgLedgerStore};
pub use llm::OllamaClient;
pub use query::QueryEngine;
pub use sync::SyncEngine;
pub use tally::TallyClient;
pub use utils::error::{BridgeError, Result};
