use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

pub async fn serve(service_name: &str, app: Router, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    tracing::info!("{service_name} listening on {bind_addr}");
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
