
use anyhow::Context;
use scribe::util::env::load_dotenv;
use scribe::{create_app, AppState};
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(fmt::layer())
        .init();

    let app_state = AppState::new().await?;

    let config = &app_state.config;
    config.validate()?;
    debug!("Config:\n {:#?}", config);

    // This integrates database migrations into the application binary
    // to ensure the database is properly migrated during startup.
    if config.db.auto_migrate {
        debug!("Migrating database...");
        app_state.db.migrate().await.context("Cannot migrate database")?;
    }

    let addr = format!("{}:{}", &config.http.ip, &config.http.port);
    let app = create_app(app_state.clone()).await?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot listen on {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
