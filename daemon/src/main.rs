//! tangle daemon: runs the transaction engine and its operator commands.

mod metrics;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tangle_engine::{Engine, EngineConfig, ShutdownController};
use tangle_types::Network;
use tangle_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "tangle-daemon", about = "Ledger transaction engine daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and environment variables override them.
    #[arg(long, env = "TANGLE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the LMDB store.
    #[arg(long, env = "TANGLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Attempts a transaction gets before it is abandoned.
    #[arg(long, env = "TANGLE_MAX_RETRY")]
    max_retry: Option<u32>,

    /// Seconds after which a stalled transaction is flagged for retry.
    #[arg(long, env = "TANGLE_STALE_AFTER_SECS")]
    stale_after_secs: Option<u64>,

    /// Log level or filter directive.
    #[arg(long, env = "TANGLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TANGLE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Serve Prometheus metrics while running.
    #[arg(long, env = "TANGLE_ENABLE_METRICS")]
    metrics: bool,

    #[arg(long, env = "TANGLE_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the dispatcher and the retry sweep until interrupted.
    Run,
    /// Generate an address and store its mnemonic.
    NewAddress {
        #[arg(long)]
        network: Network,
    },
    /// Flag stale transactions for retry once and print their ids.
    Sweep,
    /// Print the execution state of a transaction.
    Status { id: String },
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(max_retry) = self.max_retry {
            config.max_retry = max_retry;
        }
        if let Some(stale_after_secs) = self.stale_after_secs {
            config.stale_after_secs = stale_after_secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        config.enable_metrics |= self.metrics;
        Ok(config)
    }
}

async fn run(mut engine: Engine) -> anyhow::Result<()> {
    let config = engine.config().clone();
    let shutdown = ShutdownController::new();
    let mut handles = engine.start(&shutdown)?;

    if config.enable_metrics {
        let addr = format!("0.0.0.0:{}", config.metrics_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
        tracing::info!(%addr, "metrics server listening");
        let router = metrics::router(engine.metrics().clone());
        let mut stop = shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "metrics server failed");
            }
        }));
    }

    // Records left pending by an earlier run get a trigger right away.
    let queued = engine.scheduler().tick(engine.queue()).await?;
    tracing::info!(
        queued,
        networks = ?engine.executor().networks().networks().collect::<Vec<_>>(),
        max_retry = config.max_retry,
        "engine running"
    );

    shutdown.wait_for_signal().await;
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "task ended abnormally");
        }
    }
    tracing::info!("tangle daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.engine_config()?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    let engine = Engine::open(config).context("failed to open engine")?;
    match cli.command {
        Command::Run => run(engine).await?,
        Command::NewAddress { network } => {
            let details = engine.new_address(network)?;
            println!("{}", details.bech32());
        }
        Command::Sweep => {
            for id in engine.sweep_once()? {
                println!("{id}");
            }
        }
        Command::Status { id } => {
            let record = engine.status(&id)?;
            let status = serde_json::json!({
                "id": record.id,
                "type": record.workflow_type.as_str(),
                "network": record.network.to_string(),
                "shouldRetry": record.should_retry,
                "dependsOnBillPayment": record.depends_on_bill_payment,
                "walletReference": record.wallet_reference,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
