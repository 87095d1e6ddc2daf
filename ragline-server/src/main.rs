use ragline_core::Settings;
use ragline_server::server::{ServerConfig, initialize, run_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let config = ServerConfig::from_env()?;
    let state = initialize(&settings).await?;

    run_server(config, state).await
}
