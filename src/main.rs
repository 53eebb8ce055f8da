// Happen Server - event and venue discovery API

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use happen::{api::create_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let addr = config.server_address();

    let app_state = AppState::new(config).await?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Happen server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
