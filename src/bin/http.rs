#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use class_calendar::http_api::{self, AppState};
    use class_calendar::{JsonFileStore, KeyValueStore, MemoryStore, Planner, PlannerConfig};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("class_calendar=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("CLASS_CALENDAR_HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;

    let config = PlannerConfig::from_env()?;
    let store: Box<dyn KeyValueStore> = match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using JSON file store");
            Box::new(JsonFileStore::new(path.clone()))
        }
        None => {
            tracing::warn!("no store path configured, calendars are kept in memory");
            Box::new(MemoryStore::new())
        }
    };

    let state = AppState::new(Planner::new(store, config));
    http_api::serve(addr, state).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
