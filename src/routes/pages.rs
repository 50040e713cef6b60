use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tera::Context;

use super::{certificate_or_error, json_error, load_certificate_data, CertificateQuery};
use crate::certificate::document::compose;
use crate::layout::{layout, PageGeometry};
use crate::render::raster;
use crate::state::AppState;
use crate::templates::{get_tera, PREVIEW_TEMPLATE};

/// On-screen certificate with download links; the same markup the image
/// export captures.
pub async fn certificate_preview(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i32>,
    Query(query): Query<CertificateQuery>,
) -> impl IntoResponse {
    let data = match certificate_or_error(
        student_id,
        load_certificate_data(&state, student_id, query.grades).await,
    ) {
        Ok(d) => d,
        Err(response) => return response,
    };

    let full_name = data.full_name.clone();
    let options = state.render_options();
    let svg = match tokio::task::spawn_blocking(move || {
        raster::to_svg(&layout(&compose(&data), &PageGeometry::f4()), &options)
    })
    .await
    {
        Ok(svg) => svg,
        Err(e) => {
            tracing::error!("Preview rendering failed for student {}: {}", student_id, e);
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Failed to render preview.",
            );
        }
    };

    let mut ctx = Context::new();
    ctx.insert("full_name", &full_name);
    ctx.insert("student_id", &student_id);
    ctx.insert("with_grades", &query.grades);
    ctx.insert("certificate_svg", &svg);

    render_template(PREVIEW_TEMPLATE, ctx).into_response()
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let rendered = get_tera().render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Template {} failed to render: {}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_errors_render_a_message() {
        let Html(body) = render_template("missing.html", Context::new());
        assert_eq!(body, "Template error: missing.html");
    }
}
