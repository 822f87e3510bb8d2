use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "tallybridge")]
#[command(about = "Sync Tally ERP ledgers into PostgreSQL and ask questions about them")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "tallybridge.toml")]
    pub config: String,

    /// Enable verbose output.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Fetch ledgers from Tally and load new rows into PostgreSQL.
    Sync {
        /// Keep running, syncing on a fixed interval.
        #[arg(long)]
        watch: bool,

        /// Seconds between sync cycles (overrides the config file).
        #[arg(long)]
        interval: Option<u64>,

        /// Fetch and report, but keep everything in memory.
        #[arg(long)]
        dry_run: bool,
    },

    /// Serve the web chat form over the synced data.
    Serve,

    /// Ask a single question from the command line.
    Ask {
        /// The question, e.g. "show all ledgers with balances".
        question: Vec<String>,
    },

    /// List the companies loaded in the Tally instance.
    Companies,
}
