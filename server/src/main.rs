use anyhow::{Context, Result};
use tokio::net::TcpListener;

use academy_server::{config::Config, db::DataStore, logging, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _log_guard = logging::init(&config.log_file)?;

    if config.mail.is_configured() {
        tracing::info!(
            "Mail configured: server={} port={} tls={}",
            config.mail.server.as_deref().unwrap_or_default(),
            config.mail.port,
            config.mail.use_tls
        );
    } else {
        tracing::warn!("MAIL_SERVER not set, mail is not configured");
    }

    // Run without a database rather than refuse to start
    let store = match DataStore::connect(&config.database).await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::error!("Database initialization failed: {}", e);
            None
        }
    };

    let app = router(AppState::new(store, config.mail.is_configured()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
