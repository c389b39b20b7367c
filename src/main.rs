use std::sync::Arc;

use anyhow::Context;
use foodgram_backend::{api, Config};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::load());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let port = config.port;
    let routes = api::routes::routes(pool, config).recover(api::rejections::handle_rejection);

    info!("listening on 0.0.0.0:{port}");
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
