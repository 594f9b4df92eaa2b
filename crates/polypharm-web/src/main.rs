//! PolyPharm interaction server
//!
//! Run with: cargo run -p polypharm-web

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("polypharm_web=debug,info")),
        )
        .init();

    info!("💊 PolyPharm starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = polypharm_web::config::AppConfig::load()?;
    let addr = config.server.bind_addr()?;

    // Table, model and checkpoint loading happens here; first run
    // downloads the encoder from the Hugging Face Hub.
    let state = polypharm_web::state::AppState::init(config).await?;
    info!("✅ Predictor initialised.");

    let app = polypharm_web::router::build_router(state);

    info!("🚀 Server listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
