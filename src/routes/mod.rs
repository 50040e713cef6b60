mod certificates;
mod dashboard;
mod pages;

pub use certificates::*;
pub use dashboard::*;
pub use pages::*;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::certificate::CertificateData;
use crate::db::{self, Settings};
use crate::render::raster::RasterFormat;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CertificateQuery {
    #[serde(default)]
    pub grades: bool,
    pub format: Option<RasterFormat>,
}

pub(crate) fn json_error(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": kind,
            "message": message
        })),
    )
        .into_response()
}

pub(crate) fn attachment(content: Vec<u8>, content_type: &str, filename: &str) -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(content))
        .unwrap_or_else(|e| {
            tracing::error!("Failed to build download response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

/// Settings row, served from the in-process cache while fresh.
pub(crate) async fn cached_settings(state: &AppState) -> Result<Settings, sqlx::Error> {
    if let Some(settings) = state
        .settings_cache
        .lock()
        .ok()
        .and_then(|cache| cache.get())
    {
        return Ok(settings);
    }

    let row = db::get_settings(state.pool.as_ref()).await?;
    Ok(match state.settings_cache.lock() {
        Ok(mut cache) => remember_settings(&mut cache, row),
        Err(_) => row.unwrap_or_default(),
    })
}

/// Caches a configured settings row. A missing row falls back to defaults
/// and is not cached, so a newly configured school is picked up at once.
fn remember_settings(cache: &mut TtlCache<Settings>, row: Option<Settings>) -> Settings {
    match row {
        Some(settings) => {
            cache.set(settings.clone());
            settings
        }
        None => {
            cache.invalidate();
            Settings::default()
        }
    }
}

pub(crate) async fn load_certificate_data(
    state: &Arc<AppState>,
    student_id: i32,
    with_grades: bool,
) -> Result<Option<CertificateData>, sqlx::Error> {
    let student = match db::get_student(state.pool.as_ref(), student_id).await? {
        Some(s) => s,
        None => return Ok(None),
    };
    let settings = cached_settings(state).await?;
    let grades = if with_grades {
        db::get_student_grades(state.pool.as_ref(), student_id).await?
    } else {
        Vec::new()
    };

    Ok(Some(CertificateData::assemble(
        &student,
        &settings,
        &grades,
        with_grades,
    )))
}

/// Shared error mapping for certificate lookups.
pub(crate) fn certificate_or_error(
    student_id: i32,
    result: Result<Option<CertificateData>, sqlx::Error>,
) -> Result<CertificateData, Response> {
    match result {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "Student not found.",
        )),
        Err(e) => {
            tracing::error!(
                "Failed to load certificate data for student {}: {}",
                student_id,
                e
            );
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Database error.",
            ))
        }
    }
}
