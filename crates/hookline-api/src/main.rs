//! Hookline server entry point.
//!
//! Binary name: `hookline`
//!
//! Parses CLI arguments, initializes the database and dispatcher, then
//! serves the trigger API. A background task periodically purges expired
//! deduplication keys.

mod http;
mod state;

use std::time::Duration;

use clap::Parser;

use state::AppState;

/// How often the expired dedup keys are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(900);

#[derive(Parser)]
#[command(name = "hookline", version, about = "Webhook trigger ingestion and workflow dispatch")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "HOOKLINE_PORT")]
    port: u16,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1", env = "HOOKLINE_HOST")]
    host: String,

    /// SQLite database URL (defaults to $HOOKLINE_DATA_DIR/hookline.db)
    #[arg(long, env = "HOOKLINE_DATABASE_URL")]
    database_url: Option<String>,

    /// Execution engine base URL
    #[arg(long, default_value = "http://127.0.0.1:8081", env = "HOOKLINE_ENGINE_URL")]
    engine_url: String,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long)]
    otel: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,hookline=debug",
        _ => "trace",
    };
    hookline_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let database_url = match cli.database_url {
        Some(url) => url,
        None => {
            let data_dir = std::env::var("HOOKLINE_DATA_DIR").unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                format!("{home}/.hookline")
            });
            tokio::fs::create_dir_all(&data_dir).await?;
            format!("sqlite://{data_dir}/hookline.db?mode=rwc")
        }
    };

    let state = AppState::init(&database_url, &cli.engine_url).await?;

    // Sweep expired dedup keys so the table does not grow unbounded
    let dedup = state.dedup.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            match dedup.purge_expired().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "purged expired dedup keys");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "dedup purge failed");
                }
            }
        }
    });

    let router = http::router::build_router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, engine = %cli.engine_url, "hookline listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    hookline_observe::tracing_setup::shutdown_tracing();
    Ok(())
}
