//! halexp-tester - configuration fan-out harness for the halexp search API
//!
//! `run` sweeps a configuration space once and prints the result table;
//! `serve` exposes the same dispatcher over HTTP with SSE progress events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use halexp_common::config::{self, ConfigResolver, HarnessConfig};
use halexp_common::events::EventBus;
use halexp_common::{HitsPolicy, QueryMode};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use halexp_tester::busy::DEFAULT_POLL_INTERVAL;
use halexp_tester::details::{DetailStore, DetailSummary};
use halexp_tester::dispatcher::QueryDispatcher;
use halexp_tester::normalize::{DetailKey, ProfileLink};
use halexp_tester::plan::RunRequest;
use halexp_tester::render::{render_summary, render_table};
use halexp_tester::transport::HttpTransport;
use halexp_tester::{build_router, AppState};

const MODULE_NAME: &str = "halexp-tester";

/// Command-line arguments for halexp-tester
#[derive(Parser, Debug)]
#[command(name = "halexp-tester")]
#[command(about = "Fan a query out over search configurations and compare rankings")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch one sweep, wait for every row and print the table
    Run(RunArgs),
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Query text
    query: String,

    /// Search instance base URL (repeatable)
    #[arg(short, long = "instance")]
    instances: Vec<String>,

    /// Minimum publication year (repeatable)
    #[arg(short = 'y', long = "min-year")]
    min_years: Vec<String>,

    /// Score threshold (repeatable)
    #[arg(short, long = "threshold")]
    thresholds: Vec<String>,

    /// Rank metric (repeatable)
    #[arg(short, long = "metric")]
    metrics: Vec<String>,

    /// Query mode: authors or docs
    #[arg(long)]
    mode: Option<QueryMode>,

    /// Results kept per configuration
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Leave the `hits` parameter out of query URLs
    #[arg(long)]
    no_hits: bool,

    /// Reject malformed axis values instead of substituting sentinels
    #[arg(long)]
    strict: bool,

    /// Print the detail summary of every result after the table
    #[arg(long)]
    details: bool,
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long, env = "HALEXP_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "HALEXP_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(MODULE_NAME).with_cli_path(args.config.clone());
    let config = HarnessConfig::load(&resolver).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "halexp_tester={level},halexp_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting halexp-tester v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config.validate().context("Invalid configuration")?;

    match args.command {
        Command::Run(run_args) => run_once(config, run_args).await,
        Command::Serve(serve_args) => serve(config, serve_args).await,
        Command::Config => {
            print!("{}", config::to_toml_string(&config)?);
            Ok(())
        }
    }
}

fn build_dispatcher(config: &HarnessConfig, event_capacity: usize) -> Result<QueryDispatcher> {
    let timeout = config.upstream.request_timeout_secs.map(Duration::from_secs);
    let transport = HttpTransport::new(timeout).context("Failed to build HTTP client")?;
    Ok(QueryDispatcher::new(
        Arc::new(transport),
        DetailStore::new(),
        EventBus::new(event_capacity),
        ProfileLink::new(config.upstream.profile_url_template.clone()),
    ))
}

async fn run_once(config: HarnessConfig, args: RunArgs) -> Result<()> {
    let request = RunRequest {
        instances: args.instances,
        min_years: args.min_years,
        thresholds: args.thresholds,
        metrics: args.metrics,
        query_mode: args.mode,
        query: args.query,
        result_count: args.count,
        hits: args.no_hits.then_some(HitsPolicy::Omit),
        strict: args.strict.then_some(true),
    };
    let plan = request.into_plan(&config)?;
    if plan.space.is_empty() {
        bail!("No configurations to dispatch: pass at least one --instance or set defaults.instances");
    }

    let dispatcher = build_dispatcher(&config, config.event_capacity_for(plan.space.len()))?;
    let busy = dispatcher.busy_indicator();
    let handle = dispatcher.dispatch(plan.space, plan.params).await;
    let run = Arc::clone(handle.run());

    busy.wait_until_idle(DEFAULT_POLL_INTERVAL).await;
    let snapshot = run.snapshot().await;
    print!("{}", render_table(&snapshot));

    if args.details {
        for (config_index, row) in snapshot.rows.iter().enumerate() {
            let halexp_common::events::RowState::Loaded { items } = &row.state else {
                continue;
            };
            for rank in 0..items.len() {
                let key = DetailKey::new(config_index, rank);
                let Some(record) = dispatcher.details().get(run.run_id(), key).await else {
                    continue;
                };
                match DetailSummary::from_record(&record) {
                    Some(summary) => {
                        println!();
                        print!("{}", render_summary(&key.to_string(), &summary));
                    }
                    None => warn!(key = %key, "Record has no recognizable shape"),
                }
            }
        }
    }

    Ok(())
}

async fn serve(config: HarnessConfig, args: ServeArgs) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let dispatcher = build_dispatcher(&config, config.server.event_capacity)?;
    let watcher = dispatcher
        .busy_indicator()
        .spawn_watcher(DEFAULT_POLL_INTERVAL, dispatcher.event_bus().clone());

    let app = build_router(AppState::new(dispatcher, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("halexp-tester listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    watcher.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
