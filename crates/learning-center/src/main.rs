mod catalog;
mod config;
mod error;
mod filter;
mod model;
mod preview;
mod progress;
mod server;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use progress::ProgressStore;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::from_env()?;
    info!(
        data_dir = %config.data_dir.display(),
        bind = %config.bind,
        cache_dir = %config.remote_cache_dir.display(),
        "learning center configured"
    );

    std::fs::create_dir_all(config.templates_dir())?;
    std::fs::create_dir_all(config.user_progress_dir())?;
    ProgressStore::new(config.progress_file()).ensure_initialized()?;

    let state = AppState::new(&config)?;
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %listener.local_addr()?, "learning center listening");
    axum::serve(listener, app).await?;

    Ok(())
}
