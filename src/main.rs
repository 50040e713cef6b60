mod cache;
mod certificate;
mod config;
mod db;
mod error;
mod layout;
mod render;
mod routes;
mod state;
mod storage;
mod templates;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skl=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    crate::storage::ensure_dirs(&config.upload_folder, &config.temp_folder)?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    let state = Arc::new(state::AppState::new(pool, config.clone()));

    let app = Router::new()
        .route("/certificates/:student_id/preview", get(routes::certificate_preview))
        .route("/api/certificates/batch", get(routes::download_batch))
        .route("/api/certificates/:student_id/pdf", get(routes::download_pdf))
        .route("/api/certificates/:student_id/image", get(routes::download_image))
        .route("/api/settings", get(routes::get_settings))
        .route("/api/dashboard/stats", get(routes::dashboard_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("SKL service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
