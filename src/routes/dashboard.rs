use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::{cached_settings, json_error};
use crate::db;
use crate::state::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match cached_settings(&state).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => {
            tracing::error!("Failed to load settings: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "error", "Database error.")
        }
    }
}

pub async fn dashboard_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Some(stats) = state.stats_cache.lock().ok().and_then(|cache| cache.get()) {
        return Json(stats).into_response();
    }

    match db::dashboard_stats(state.pool.as_ref()).await {
        Ok(stats) => {
            if let Ok(mut cache) = state.stats_cache.lock() {
                cache.set(stats.clone());
            }
            Json(stats).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to load dashboard stats: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "error", "Database error.")
        }
    }
}
