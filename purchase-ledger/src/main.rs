use anyhow::Context;
use purchase_ledger::{Ledger, LedgerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Purchase Ledger - idempotent purchases with historical currency conversion

USAGE:
    purchase-ledger [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    HOST                Server host (default: 0.0.0.0)
    PORT                Server port (default: 8080)
    TREASURY_BASE_URL   Rates of Exchange API base URL
    DATABASE_PATH       SQLite file (default: in-memory storage)
    RUST_LOG            Log level filter

EXAMPLES:
    # Run with defaults
    purchase-ledger

    # Run with config file
    purchase-ledger --config ledger.json

    # Persist to SQLite on a custom port
    PORT=9000 DATABASE_PATH=ledger.db purchase-ledger
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purchase_ledger=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            LedgerConfig::from_file(&path)?
        }
        None => {
            tracing::info!("Using default configuration");
            LedgerConfig::default()
        }
    };
    config
        .apply_env_overrides()
        .context("invalid environment override")?;

    tracing::info!(
        lookback_months = config.rates.lookback_months,
        cache_ttl_hours = config.rates.cache_ttl_hours,
        pivot = %config.rates.pivot_currency,
        rate_source = %config.rate_source.base_url,
        "Rate settings"
    );

    let ledger = Ledger::from_config(config).context("failed to start purchase ledger")?;

    tracing::info!("Available endpoints:");
    tracing::info!("  POST /api/v1/purchases");
    tracing::info!("  GET  /api/v1/purchases/{{id}}");
    tracing::info!("  GET  /api/v1/purchases/{{id}}/converted?currency=XXX");
    tracing::info!("  GET  /health/live");
    tracing::info!("  GET  /health/ready");

    ledger.run().await?;
    Ok(())
}
