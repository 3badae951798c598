use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tower_http::trace::TraceLayer;
use vulnshop_orderservice::{
    core::{app_state::AppState, bootstrap, config, db, swagger},
    routes,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::baskets::routes_with_openapi()
        .merge(routes::orders::routes_with_openapi())
        .merge(routes::wallets::routes_with_openapi())
        .merge(routes::reviews::routes_with_openapi())
        .merge(routes::challenges::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("VulnShop OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let db_pool = db::connect(&config.database.url).await?;
    let bind_addr = config.server.bind_addr.clone();
    let state = AppState {
        db_pool,
        config: Arc::new(config),
    };

    let app = Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    bootstrap::serve("OrderService", app, &bind_addr).await
}
