use soundvault_api::{app, config::AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    soundvault_observability::init();

    let config = AppConfig::from_env()?;
    let app = app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
