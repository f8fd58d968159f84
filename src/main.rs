use api_rest::{router, AppState};
use census_core::sync::IncomingDecision;
use census_core::{CensusService, DaySession};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the sync watcher checks whether the calendar day has rolled over.
const DAY_ROLLOVER_CHECK: Duration = Duration::from_secs(60);

/// Main entry point for the census application
///
/// Runs the REST server and the remote sync watcher concurrently:
/// - REST server on port 3000 (configurable via CENSUS_REST_ADDR)
/// - Sync watcher following today's record, when remote sync is enabled
///
/// # Environment Variables
/// - `CENSUS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CENSUS_DATA_DIR`: Directory for record storage (default: "census_data")
/// - `CENSUS_NAMESPACE`: Storage namespace prefix (default: "hanga_roa")
/// - `CENSUS_BED_CATALOG`: Optional YAML bed catalog replacing the standard ward layout
/// - `CENSUS_REMOTE_SYNC`: Enable remote mirroring (`1`, `true`, `yes`, `on`)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("census_run=info".parse()?)
                .add_directive("census_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CENSUS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let state = AppState::from_env()?;
    let production = state.production();

    let watcher = tokio::spawn(watch_remote(production));

    let rest_server = tokio::spawn(async move {
        tracing::info!("++ Starting census REST API on {}", rest_addr);
        let app = router(state);
        let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
        axum::serve(listener, app).await?;
        Ok::<(), anyhow::Error>(())
    });

    let (watcher_result, rest_result) = tokio::try_join!(watcher, rest_server)?;
    watcher_result?;
    rest_result?;

    Ok(())
}

/// Follow remote versions of today's record and store accepted ones locally.
///
/// Returns immediately when remote sync is disabled.
async fn watch_remote(service: Arc<CensusService>) -> anyhow::Result<()> {
    let today = || chrono::Local::now().date_naive();
    let mut session = DaySession::new(service, today());
    session.load()?;
    if !session.is_subscribed() {
        tracing::info!("remote sync disabled; watcher not started");
        return Ok(());
    }
    tracing::info!("++ Watching remote updates for {}", session.date());

    let mut rollover = tokio::time::interval(DAY_ROLLOVER_CHECK);
    loop {
        tokio::select! {
            incoming = session.next_remote() => match incoming {
                Some(Ok(IncomingDecision::Accept)) => {
                    tracing::info!("accepted remote version of {}", session.date());
                }
                Some(Ok(IncomingDecision::IgnoreEcho | IncomingDecision::IgnoreStale)) => {}
                Some(Err(e)) => tracing::error!("remote update error: {}", e),
                None => {
                    tracing::warn!("remote subscription closed");
                    return Ok(());
                }
            },
            _ = rollover.tick() => {
                let now = today();
                if now != session.date() {
                    session.open(now)?;
                    tracing::info!("++ Watching remote updates for {}", now);
                }
            }
        }
    }
}
