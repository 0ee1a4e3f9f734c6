//! Application entry point: read env config, connect, mount routes, serve.
//!
//! Run from repo root: `cargo run -p web-toolset-app`

mod handler;
mod model;

use tracing_subscriber::EnvFilter;
use web_toolset::{connect, make_app, serve, AppState, DbConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let server_config = ServerConfig::from_env()?;
    let default_level = if server_config.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(debug = server_config.debug, "{} starting", env!("CARGO_PKG_NAME"));

    let db_config = DbConfig::from_env()?;
    let db = connect(&db_config).await?;

    let app = make_app(handler::route(), AppState::new(db), &server_config)?;
    serve(app, &server_config.listen).await?;
    tracing::info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
