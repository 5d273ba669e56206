use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pagewatch_core::types::{ScheduleSpec, Target};
use pagewatch_core::PagewatchConfig;
use pagewatch_renderer::{HttpRenderer, RenderBackend, RetryPolicy};
use pagewatch_scheduler::{wake_queue, Executor, HttpSink, PayloadSink, SchedulerEngine, Wake};
use pagewatch_store::DocumentStore;

#[derive(Parser)]
#[command(name = "pagewatch", version, about = "Scheduled page-capture daemon")]
struct Cli {
    /// Path to pagewatch.toml (defaults to ~/.pagewatch/pagewatch.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (the default when no subcommand is given).
    Run,
    /// Add or replace a capture target.
    AddTarget {
        #[arg(long)]
        id: String,
        #[arg(long)]
        url: String,
        /// Schedule as JSON, e.g. '{"kind":"hourly","minute":0}'.
        #[arg(long)]
        schedule: String,
        #[arg(long, default_value_t = 60)]
        timeout_seconds: u32,
        /// Create the target disabled; it keeps its slot but never runs.
        #[arg(long)]
        disabled: bool,
    },
    /// Delete a target and its run state together.
    RemoveTarget {
        #[arg(long)]
        id: String,
    },
    /// Print all configured targets with their run state.
    ListTargets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagewatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: explicit path > PAGEWATCH_CONFIG env > ~/.pagewatch/pagewatch.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("PAGEWATCH_CONFIG").ok());
    let config = PagewatchConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        PagewatchConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    pagewatch_store::db::init_db(&conn)?;
    let store = Arc::new(DocumentStore::new(conn));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(config, store).await,
        Command::AddTarget {
            id,
            url,
            schedule,
            timeout_seconds,
            disabled,
        } => {
            let schedule: ScheduleSpec = serde_json::from_str(&schedule)?;
            let target = Target {
                id: id.clone(),
                url,
                enabled: !disabled,
                timeout_seconds,
                schedule,
            };
            store.upsert_target(target)?;
            println!("target '{id}' saved");
            Ok(())
        }
        Command::RemoveTarget { id } => {
            store.delete_target(&id)?;
            println!("target '{id}' removed");
            Ok(())
        }
        Command::ListTargets => {
            let targets = store.load_targets()?;
            let states = store.load_run_states()?;
            for (id, target) in &targets {
                let flag = if target.enabled { "" } else { " (disabled)" };
                println!("{id}{flag}  {}", target.url);
                match states.get(id) {
                    Some(state) => println!(
                        "    next {}  last {}  failures {}",
                        state.next_run_at.to_rfc3339(),
                        state
                            .last_status
                            .map_or_else(|| "never".to_string(), |s| s.to_string()),
                        state.fail_count
                    ),
                    None => println!("    not yet scheduled"),
                }
            }
            Ok(())
        }
    }
}

async fn run_daemon(config: PagewatchConfig, store: Arc<DocumentStore>) -> anyhow::Result<()> {
    info!(path = %config.database.path, "document store ready");

    // A missing run-state document means this is the first-ever start, not
    // a restart — that one gets an immediate cycle.
    let first_install = !store.has_run_state_doc()?;

    let backend: Arc<dyn RenderBackend> = Arc::new(HttpRenderer::new(&config.renderer.base_url));
    let sink: Arc<dyn PayloadSink> = Arc::new(HttpSink::new(&config.submission.endpoint));
    let retry = RetryPolicy {
        max_attempts: config.collector.max_send_attempts,
        delay: Duration::from_millis(config.collector.send_retry_delay_ms),
    };
    let executor = Executor::new(
        Arc::clone(&store),
        backend,
        sink,
        retry,
        Duration::from_secs(config.collector.response_margin_secs),
    );
    let engine = SchedulerEngine::new(Arc::clone(&store), executor);

    // Restart path: reconciliation only. New targets get a slot; existing
    // entries stay untouched and run at their recorded times.
    engine.reconcile(chrono::Utc::now())?;

    let (wake, wake_rx) = wake_queue();
    if first_install {
        info!("first install — triggering an immediate cycle");
        wake.trigger(Wake::FirstInstall);
    }

    // Recurring wake timer. The first interval tick fires immediately and
    // is consumed so a restart does not double-run everything.
    let period = Duration::from_secs(config.scheduler.wake_interval_secs);
    let timer_wake = wake.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            timer_wake.trigger(Wake::Timer);
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(wake_rx, shutdown_rx));

    info!(
        wake_interval_secs = config.scheduler.wake_interval_secs,
        renderer = %config.renderer.base_url,
        "pagewatch daemon running"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
