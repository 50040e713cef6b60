use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::{attachment, certificate_or_error, json_error, load_certificate_data, CertificateQuery};
use crate::certificate::document::compose;
use crate::certificate::CertificateData;
use crate::db;
use crate::layout::{layout, PageGeometry};
use crate::render::pdf::{generate_certificate, render_pdf};
use crate::render::raster::{self, RasterFormat, DOCUMENT_ELEMENT_ID};
use crate::render::RenderOptions;
use crate::state::AppState;
use crate::storage;

fn generation_failed(error: impl std::fmt::Display) -> Response {
    tracing::error!("Certificate generation failed: {}", error);
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "error",
        "Failed to generate certificate.",
    )
}

/// Runs `job` on the blocking pool, bounded by `budget`.
///
/// A timeout answers 504; a job error or panic answers 500. A timed-out job
/// keeps running to completion in the background and its result is dropped.
pub(crate) async fn run_bounded<T, E, F>(
    what: &str,
    budget: Duration,
    job: F,
) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    match tokio::time::timeout(budget, tokio::task::spawn_blocking(job)).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => {
            tracing::error!("{} failed: {}", what, e);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                &format!("{} failed.", what),
            ))
        }
        Ok(Err(e)) => {
            tracing::error!("{} job aborted: {}", what, e);
            Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                &format!("{} failed.", what),
            ))
        }
        Err(_) => {
            tracing::error!("{} timed out after {:?}", what, budget);
            Err(json_error(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                &format!("{} took too long.", what),
            ))
        }
    }
}

/// Server-side PDF: rendered into a scratch file, streamed back, then removed.
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i32>,
    Query(query): Query<CertificateQuery>,
) -> impl IntoResponse {
    let span = tracing::info_span!("download_pdf", student_id);
    async move {
        let data = match certificate_or_error(
            student_id,
            load_certificate_data(&state, student_id, query.grades).await,
        ) {
            Ok(d) => d,
            Err(response) => return response,
        };

        let temp = match storage::certificate_temp_file(&state.config.temp_folder, "pdf") {
            Ok(t) => t,
            Err(e) => return generation_failed(e),
        };

        let filename = storage::server_pdf_filename(&data.full_name, query.grades);
        let options = state.render_options();

        // The scratch file moves into the job, so a timed-out request cannot
        // delete it while the job is still writing.
        let job = move || generate_certificate(&data, temp.path(), &options).map(|_| temp);
        let generated = run_bounded("PDF generation", state.config.generation_timeout, job);
        let temp = match generated.await {
            Ok(temp) => temp,
            Err(response) => return response,
        };

        let content = match tokio::fs::read(temp.path()).await {
            Ok(c) => c,
            Err(e) => return generation_failed(e),
        };
        drop(temp);

        attachment(content, "application/pdf", &filename)
    }
    .instrument(span)
    .await
}

/// Captured image of the rendered certificate, as PNG or an image-wrapping PDF.
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i32>,
    Query(query): Query<CertificateQuery>,
) -> impl IntoResponse {
    let span = tracing::info_span!("download_image", student_id);
    async move {
        let data = match certificate_or_error(
            student_id,
            load_certificate_data(&state, student_id, query.grades).await,
        ) {
            Ok(d) => d,
            Err(response) => return response,
        };

        let format = query.format.unwrap_or(RasterFormat::Png);
        let filename =
            storage::client_image_filename(&data.nisn, query.grades, format.extension());
        let temp =
            match storage::certificate_temp_file(&state.config.temp_folder, format.extension()) {
                Ok(t) => t,
                Err(e) => return generation_failed(e),
            };
        let options = state.render_options();

        let job = move || -> crate::error::Result<_> {
            let laid_out = layout(&compose(&data), &PageGeometry::f4());
            let mut progress = |step: &str, percent: u8| {
                tracing::debug!(percent, "{}", step);
            };
            raster::export(
                &laid_out,
                DOCUMENT_ELEMENT_ID,
                temp.path(),
                format,
                &options,
                Some(&mut progress),
            )?;
            Ok(temp)
        };
        let temp = match run_bounded("Image export", state.config.generation_timeout, job).await {
            Ok(temp) => temp,
            Err(response) => return response,
        };

        let content = match tokio::fs::read(temp.path()).await {
            Ok(c) => c,
            Err(e) => return generation_failed(e),
        };
        drop(temp);

        let mime = mime_guess::from_path(&filename)
            .first_raw()
            .unwrap_or("application/octet-stream");
        attachment(content, mime, &filename)
    }
    .instrument(span)
    .await
}

/// Every student's certificate in one archive.
pub async fn download_batch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CertificateQuery>,
) -> impl IntoResponse {
    let ids = match db::list_student_ids(state.pool.as_ref()).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("Failed to list students: {}", e);
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Database error.",
            );
        }
    };

    let mut certificates = Vec::with_capacity(ids.len());
    for id in ids {
        match load_certificate_data(&state, id, query.grades).await {
            Ok(Some(data)) => certificates.push(data),
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping student {} in batch: {}", id, e),
        }
    }

    let budget = state.config.generation_timeout * certificates.len().max(1) as u32;
    let options = state.render_options();
    let job = move || build_batch_zip(&certificates, &options);

    match run_bounded("Batch generation", budget, job).await {
        Ok((content, written)) => {
            tracing::info!("Batch archive built with {} certificates", written);
            attachment(
                content,
                "application/zip",
                &storage::batch_zip_filename(query.grades),
            )
        }
        Err(response) => response,
    }
}

/// Zips one PDF per certificate. Certificates that fail to render are logged
/// and left out; returns the archive and how many entries it holds.
pub(crate) fn build_batch_zip(
    certificates: &[CertificateData],
    options: &RenderOptions,
) -> Result<(Vec<u8>, usize), zip::result::ZipError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
    let mut written = 0;

    for data in certificates {
        let laid_out = layout(&compose(data), &PageGeometry::f4());
        let bytes = match render_pdf(&laid_out, options) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Skipping certificate for student {}: {}", data.id, e);
                continue;
            }
        };

        let entry = format!(
            "{}_{}",
            data.nisn,
            storage::server_pdf_filename(&data.full_name, data.show_grades)
        );
        zip.start_file(entry, file_options)?;
        zip.write_all(&bytes)?;
        written += 1;
    }

    let cursor = zip.finish()?;
    Ok((cursor.into_inner(), written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::fixtures;

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn slow_job_answers_gateway_timeout() {
        let job = || {
            std::thread::sleep(Duration::from_millis(300));
            Ok::<_, String>(())
        };
        let response = run_bounded("PDF generation", Duration::from_millis(20), job)
            .await
            .unwrap_err();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["status"], "timeout");
        assert_eq!(body["message"], "PDF generation took too long.");
    }

    #[tokio::test]
    async fn failing_job_answers_server_error() {
        let job = || Err::<(), _>("font table missing".to_string());
        let response = run_bounded("Image export", Duration::from_secs(5), job)
            .await
            .unwrap_err();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["status"], "error");
    }

    #[tokio::test]
    async fn job_within_budget_returns_its_value() {
        let value = run_bounded("Batch generation", Duration::from_secs(5), || {
            Ok::<_, String>(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn batch_zip_holds_one_pdf_per_student() {
        let mut second = fixtures::with_grades(8);
        second.id = 2;
        second.nisn = "0059999999".to_string();
        second.full_name = "Budi Santoso".to_string();
        let certificates = vec![fixtures::sample_data(), second];

        let options = RenderOptions::new(std::env::temp_dir());
        let (bytes, written) = build_batch_zip(&certificates, &options).unwrap();
        assert_eq!(written, 2);

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"0059999999_SKL_Budi_Santoso_dengan_nilai.pdf".to_string()));

        let mut entry = archive.by_index(0).unwrap();
        let mut head = [0u8; 5];
        std::io::Read::read_exact(&mut entry, &mut head).unwrap();
        assert_eq!(&head, b"%PDF-");
    }

    #[test]
    fn empty_batch_is_a_valid_archive() {
        let options = RenderOptions::new(std::env::temp_dir());
        let (bytes, written) = build_batch_zip(&[], &options).unwrap();
        assert_eq!(written, 0);
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
