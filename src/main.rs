use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tallybridge::domain::ports::{AnswerModel, LedgerStore, TallySource};
use tallybridge::utils::{logger, validation::Validate};
use tallybridge::web::{self, AppState};
use tallybridge::{
    AppConfig, BridgeError, Cli, Command, MemoryLedgerStore, OllamaClient, PgLedgerStore,
    QueryEngine, SyncEngine, TallyClient,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting tallybridge");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "tallybridge failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            tallybridge::utils::error::ErrorSeverity::Low => 0,
            tallybridge::utils::error::ErrorSeverity::Medium => 2,
            tallybridge::utils::error::ErrorSeverity::High => 1,
            tallybridge::utils::error::ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> tallybridge::Result<()> {
    let config = AppConfig::load_or_default(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Sync {
            watch,
            interval,
            dry_run,
        } => {
            let source = tally_client(&config)?;
            let interval = Duration::from_secs(interval.unwrap_or(config.sync.interval_seconds));
            let watch = watch || config.sync.watch;
            if dry_run {
                let engine = SyncEngine::new(source, MemoryLedgerStore::new());
                run_sync(&engine, watch, interval).await
            } else {
                let store = PgLedgerStore::connect(config.require_database_url()?).await?;
                let engine = SyncEngine::new(source, store);
                run_sync(&engine, watch, interval).await
            }
        }

        Command::Serve => {
            let store = PgLedgerStore::connect(config.require_database_url()?).await?;
            store.ensure_schema().await?;
            let engine = QueryEngine::new(answer_model(&config)?);
            let state = AppState::new(Arc::new(store), engine);
            web::serve(state, &config.server).await
        }

        Command::Ask { question } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                return Err(BridgeError::ProcessingError {
                    message: "No question given. Try: tallybridge ask \"show all ledgers with \
                              balances\""
                        .to_string(),
                });
            }
            let store = PgLedgerStore::connect(config.require_database_url()?).await?;
            store.ensure_schema().await?;
            let rows = store.fetch_all().await?;
            let engine = QueryEngine::new(answer_model(&config)?);
            let answer = engine.answer(&rows, &question).await;
            println!("{}", answer.to_text());
            Ok(())
        }

        Command::Companies => {
            let source = tally_client(&config)?;
            let companies = source.fetch_companies().await?;
            if companies.is_empty() {
                println!("No companies found");
            } else {
                for company in companies {
                    println!("{}", company.name);
                }
            }
            Ok(())
        }
    }
}

async fn run_sync<S: TallySource, L: LedgerStore>(
    engine: &SyncEngine<S, L>,
    watch: bool,
    interval: Duration,
) -> tallybridge::Result<()> {
    if watch {
        tracing::info!("Watching Tally every {}s, Ctrl-C to stop", interval.as_secs());
        engine.run_watch(interval).await
    } else {
        let report = engine.run_once().await?;
        println!(
            "✅ Sync complete: {} fetched, {} skipped, {} inserted",
            report.fetched, report.skipped, report.inserted
        );
        Ok(())
    }
}

fn tally_client(config: &AppConfig) -> tallybridge::Result<TallyClient> {
    TallyClient::new(
        config.tally.endpoint(),
        Duration::from_secs(config.tally.timeout_seconds),
    )
}

fn answer_model(config: &AppConfig) -> tallybridge::Result<Option<Box<dyn AnswerModel>>> {
    if !config.llm.enabled {
        tracing::info!("Language model fallback disabled by configuration");
        return Ok(None);
    }
    let client = OllamaClient::new(
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_seconds),
    )?;
    Ok(Some(Box::new(client)))
}
