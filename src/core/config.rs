use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub application: ApplicationConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    /// Shop name printed on top of every order document.
    pub name: String,
    /// Directory order documents are written to.
    pub documents_dir: PathBuf,
    /// Product whose purchase marks the seasonal-special challenge.
    pub seasonal_product_id: i32,
    /// When enabled, checkouts with a negative total are rejected instead of
    /// being flagged.
    pub safety_mode: bool,
}

pub fn load() -> Result<AppConfig> {
    Ok(AppConfig {
        database: DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
        },
        server: ServerConfig {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or("0.0.0.0:3000".to_string()),
        },
        application: ApplicationConfig {
            name: std::env::var("APP_NAME").unwrap_or("Vuln Shop".to_string()),
            documents_dir: std::env::var("DOCUMENTS_DIR")
                .unwrap_or("ftp".to_string())
                .into(),
            seasonal_product_id: std::env::var("SEASONAL_PRODUCT_ID")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(4),
            safety_mode: std::env::var("SAFETY_MODE")
                .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        },
    })
}
