use anyhow::{anyhow, Result};
use clap::Parser;
use tilted_dashboard::config::parse_base_url;
use tilted_dashboard::{ClientConfig, Dashboard, FetchOutcome, QueryWindow};

/// Runs one dashboard load against the API and prints the resulting state.
#[derive(Debug, Parser)]
#[command(name = "tilted-dashboard", version)]
struct Args {
    /// API root, e.g. http://127.0.0.1:8080/api (overrides TILTED_API_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Sensor to load; defaults to the first sensor the API reports
    #[arg(long)]
    sensor: Option<String>,

    /// Load the trailing N hours
    #[arg(long, conflicts_with_all = ["start_ms", "end_ms"])]
    hours: Option<u32>,

    #[arg(long, requires = "end_ms")]
    start_ms: Option<i64>,

    #[arg(long, requires = "start_ms")]
    end_ms: Option<i64>,
}

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tilted_dashboard=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = ClientConfig::from_env()?;
    init_tracing()?;

    if let Some(base_url) = args.base_url.as_deref() {
        config.api_base_url = parse_base_url(base_url)?;
    }

    let window = match (args.hours, args.start_ms, args.end_ms) {
        (Some(hours), _, _) => QueryWindow::trailing_hours(hours),
        (None, Some(start), Some(end)) => QueryWindow::new(start, end)?,
        _ => QueryWindow::trailing_hours(config.default_window_hours),
    };

    let dashboard = Dashboard::from_config(&config)?;
    let store = dashboard.store().clone();
    store.update(|txn| txn.set_query_window(window));
    tracing::info!(
        base_url = %dashboard.client().base_url(),
        start_time = window.start_time(),
        end_time = window.end_time(),
        "loading dashboard"
    );

    let mut loading_rx = store.subscribe_loading();
    let mut error_rx = store.subscribe_error_message();
    let watcher = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = loading_rx.changed() => {
                    if changed.is_err() { break; }
                    let loading = *loading_rx.borrow_and_update();
                    tracing::debug!(loading, "loading changed");
                }
                changed = error_rx.changed() => {
                    if changed.is_err() { break; }
                    let message = error_rx.borrow_and_update().clone();
                    if let Some(message) = message {
                        tracing::warn!(error = %message, "dashboard error");
                    }
                }
            }
        }
    });

    let outcome = tokio::select! {
        outcome = dashboard.load(args.sensor.as_deref()) => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            watcher.abort();
            return Ok(());
        }
    };
    watcher.abort();

    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);

    match outcome? {
        FetchOutcome::Failed(message) => Err(anyhow!(message)),
        FetchOutcome::NoSelection => {
            tracing::warn!("no sensors available");
            Ok(())
        }
        FetchOutcome::Applied | FetchOutcome::Superseded => Ok(()),
    }
}
