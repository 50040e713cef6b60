// Markup-and-capture path: the laid-out pages become SVG markup, which is
// rasterized with resvg and delivered as PNG or as a one-page PDF.
use base64::Engine as _;
use resvg::tiny_skia;
use resvg::usvg;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::assets::{load_image, DecodedImage};
use super::pdf::single_image_pdf;
use super::RenderOptions;
use crate::error::{CertificateError, Result};
use crate::layout::metrics::{FontFace, ASCENT_FACTOR};
use crate::layout::{DrawOp, LaidOutDocument, Page};

/// Element id of the whole certificate, all pages stacked.
pub const DOCUMENT_ELEMENT_ID: &str = "skl-certificate";
const PAGE_GAP: f32 = 20.0;
const FONT_FAMILY: &str = "Helvetica, Arial, 'Liberation Sans', sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    Png,
    Pdf,
}

impl RasterFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Pdf => "pdf",
        }
    }
}

pub fn page_element_id(index: usize) -> String {
    format!("skl-page-{}", index + 1)
}

/// Markup for the whole certificate.
pub fn to_svg(laid_out: &LaidOutDocument, options: &RenderOptions) -> String {
    let height = stacked_height(laid_out);
    let mut out = svg_open(DOCUMENT_ELEMENT_ID, laid_out.geometry.width, height);
    let step = laid_out.geometry.height + PAGE_GAP;
    for (index, page) in laid_out.pages.iter().enumerate() {
        page_group(&mut out, laid_out, page, index, index as f32 * step, options);
    }
    out.push_str("</svg>");
    out
}

fn stacked_height(laid_out: &LaidOutDocument) -> f32 {
    let pages = laid_out.pages.len().max(1) as f32;
    pages * laid_out.geometry.height + (pages - 1.0) * PAGE_GAP
}

/// Markup for one element plus its size in points.
fn element_svg(
    laid_out: &LaidOutDocument,
    element_id: &str,
    options: &RenderOptions,
) -> Result<(String, f32, f32)> {
    let width = laid_out.geometry.width;
    if element_id == DOCUMENT_ELEMENT_ID {
        return Ok((to_svg(laid_out, options), width, stacked_height(laid_out)));
    }

    let index = element_id
        .strip_prefix("skl-page-")
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .filter(|i| *i < laid_out.pages.len())
        .ok_or_else(|| CertificateError::ElementNotFound(element_id.to_string()))?;

    let height = laid_out.geometry.height;
    let mut out = svg_open(element_id, width, height);
    page_group(&mut out, laid_out, &laid_out.pages[index], index, 0.0, options);
    out.push_str("</svg>");
    Ok((out, width, height))
}

fn svg_open(id: &str, width: f32, height: f32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        id,
        w = width,
        h = height
    )
}

fn page_group(
    out: &mut String,
    laid_out: &LaidOutDocument,
    page: &Page,
    index: usize,
    offset_y: f32,
    options: &RenderOptions,
) {
    let _ = write!(
        out,
        r#"<g id="{}" transform="translate(0 {})"><rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        page_element_id(index),
        offset_y,
        laid_out.geometry.width,
        laid_out.geometry.height
    );

    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                text,
                face,
                size,
                word_spacing,
            } => {
                let weight = match face {
                    FontFace::Regular => "normal",
                    FontFace::Bold => "bold",
                };
                let _ = write!(
                    out,
                    r#"<text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" word-spacing="{}" xml:space="preserve">{}</text>"#,
                    x,
                    y + size * ASCENT_FACTOR,
                    FONT_FAMILY,
                    size,
                    weight,
                    word_spacing,
                    escape_xml(text)
                );
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                let _ = write!(
                    out,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="black" stroke-width="{}"/>"#,
                    x1, y1, x2, y2, width
                );
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                stroke,
            } => {
                let _ = write!(
                    out,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="black" stroke-width="{}"/>"#,
                    x, y, width, height, stroke
                );
            }
            DrawOp::Image {
                source,
                x,
                y,
                width,
                height,
            } => match image_href(source, options) {
                Ok(href) => {
                    let _ = write!(
                        out,
                        r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid meet" href="{}"/>"#,
                        x, y, width, height, href
                    );
                }
                Err(e) => tracing::warn!("skipping certificate image {}: {}", source, e),
            },
        }
    }

    out.push_str("</g>");
}

fn image_href(source: &str, options: &RenderOptions) -> Result<String> {
    let png = load_image(source, &options.asset_dir)?.to_png()?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!("loaded {} font faces for raster capture", db.len());
            Arc::new(db)
        })
        .clone()
}

/// Rasterizes one element onto a white pixmap. `progress` hears about the
/// markup (20%) and capture (50%) steps.
pub fn capture(
    laid_out: &LaidOutDocument,
    element_id: &str,
    options: &RenderOptions,
    mut progress: Option<&mut dyn FnMut(&str, u8)>,
) -> Result<tiny_skia::Pixmap> {
    let mut report = |step: &str, percent: u8| {
        if let Some(callback) = progress.as_mut() {
            callback(step, percent);
        }
    };

    let (svg, width, height) = element_svg(laid_out, element_id, options)?;
    report("Rendering markup", 20);
    let pixmap = rasterize(&svg, width, height, options.raster_scale)?;
    report("Capturing image", 50);
    Ok(pixmap)
}

fn rasterize(svg: &str, width: f32, height: f32, scale: f32) -> Result<tiny_skia::Pixmap> {
    let mut opt = usvg::Options::default();
    opt.fontdb = font_database();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|e| CertificateError::Raster(e.to_string()))?;

    let px_width = (width * scale).ceil() as u32;
    let px_height = (height * scale).ceil() as u32;
    let mut pixmap = tiny_skia::Pixmap::new(px_width, px_height).ok_or_else(|| {
        CertificateError::Raster(format!("cannot allocate {}x{} pixmap", px_width, px_height))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

/// Captures `element_id` and encodes it. `progress` receives coarse
/// milestones at 0, 20, 50, 80 and 100 percent.
pub fn export_bytes(
    laid_out: &LaidOutDocument,
    element_id: &str,
    format: RasterFormat,
    options: &RenderOptions,
    mut progress: Option<&mut dyn FnMut(&str, u8)>,
) -> Result<Vec<u8>> {
    let mut report = |step: &str, percent: u8| {
        if let Some(callback) = progress.as_mut() {
            callback(step, percent);
        }
    };

    report("Preparing certificate", 0);
    let pixmap = capture(laid_out, element_id, options, Some(&mut report))?;
    report("Encoding output", 80);

    let bytes = match format {
        RasterFormat::Png => pixmap
            .encode_png()
            .map_err(|e| CertificateError::Raster(e.to_string()))?,
        RasterFormat::Pdf => {
            let image = DecodedImage {
                width: pixmap.width(),
                height: pixmap.height(),
                rgb: pixmap
                    .data()
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect(),
            };
            let scale = options.raster_scale;
            single_image_pdf(
                &image,
                pixmap.width() as f32 / scale,
                pixmap.height() as f32 / scale,
            )?
        }
    };
    report("Done", 100);
    Ok(bytes)
}

pub fn export(
    laid_out: &LaidOutDocument,
    element_id: &str,
    output_path: &Path,
    format: RasterFormat,
    options: &RenderOptions,
    progress: Option<&mut dyn FnMut(&str, u8)>,
) -> Result<()> {
    let bytes = export_bytes(laid_out, element_id, format, options, progress)?;
    std::fs::write(output_path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::document::compose;
    use crate::certificate::{fixtures, CertificateData};
    use crate::layout::{layout, PageGeometry};

    fn options() -> RenderOptions {
        RenderOptions::new(std::env::temp_dir()).with_raster_scale(0.5)
    }

    fn laid_out(data: &CertificateData) -> LaidOutDocument {
        layout(&compose(data), &PageGeometry::f4())
    }

    #[test]
    fn unknown_element_is_rejected() {
        let doc = laid_out(&fixtures::sample_data());
        for id in ["certificate", "skl-page-0", "skl-page-2", "skl-page-x"] {
            let err = export_bytes(&doc, id, RasterFormat::Png, &options(), None).unwrap_err();
            assert!(matches!(err, CertificateError::ElementNotFound(ref e) if e == id), "{id}");
        }
    }

    #[test]
    fn png_export_reports_every_milestone() {
        let doc = laid_out(&fixtures::sample_data());
        let mut seen = Vec::new();
        let mut record = |_: &str, percent: u8| seen.push(percent);

        let bytes = export_bytes(
            &doc,
            DOCUMENT_ELEMENT_ID,
            RasterFormat::Png,
            &options(),
            Some(&mut record),
        )
        .unwrap();

        assert!(bytes.starts_with(b"\x89PNG"));
        assert_eq!(seen, vec![0, 20, 50, 80, 100]);
    }

    #[test]
    fn encoding_is_announced_before_the_artifact_is_built() {
        let doc = laid_out(&fixtures::sample_data());
        let mut steps = Vec::new();
        let mut record = |step: &str, percent: u8| steps.push((step.to_string(), percent));

        export_bytes(&doc, "skl-page-1", RasterFormat::Pdf, &options(), Some(&mut record)).unwrap();

        let steps: Vec<(&str, u8)> = steps.iter().map(|(s, p)| (s.as_str(), *p)).collect();
        assert_eq!(
            steps,
            vec![
                ("Preparing certificate", 0),
                ("Rendering markup", 20),
                ("Capturing image", 50),
                ("Encoding output", 80),
                ("Done", 100),
            ]
        );
    }

    #[test]
    fn failed_export_stops_before_capture() {
        let doc = laid_out(&fixtures::sample_data());
        let mut seen = Vec::new();
        let mut record = |_: &str, percent: u8| seen.push(percent);
        let result = export_bytes(&doc, "nope", RasterFormat::Png, &options(), Some(&mut record));
        assert!(result.is_err());
        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn page_capture_matches_page_size() {
        let doc = laid_out(&fixtures::with_grades(20));
        let pixmap = capture(&doc, "skl-page-2", &options().with_raster_scale(1.0), None).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (596, 936));

        let whole = capture(&doc, DOCUMENT_ELEMENT_ID, &options(), None).unwrap();
        let expected = (stacked_height(&doc) * 0.5).ceil() as u32;
        assert_eq!(whole.height(), expected);
        assert!(doc.pages.len() >= 2);
    }

    #[test]
    fn pdf_export_embeds_capture_on_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SKL_Tanpa_Nilai_0051234567.pdf");
        let doc = laid_out(&fixtures::sample_data());

        export(&doc, "skl-page-1", &path, RasterFormat::Pdf, &options(), None).unwrap();

        let pdf = lopdf::Document::load(&path).unwrap();
        assert_eq!(pdf.get_pages().len(), 1);
    }

    #[test]
    fn markup_has_page_regions_and_escaped_text() {
        let data = CertificateData {
            school_name: "SMK Tunas & Bangsa".to_string(),
            ..fixtures::with_grades(20)
        };
        let svg = to_svg(&laid_out(&data), &options());
        assert!(svg.contains(r#"id="skl-certificate""#));
        assert!(svg.contains(r#"id="skl-page-1""#));
        assert!(svg.contains(r#"id="skl-page-2""#));
        assert!(svg.contains("SMK TUNAS &amp; BANGSA"));
        assert!(svg.contains(">LULUS</text>"));
    }

    #[test]
    fn images_become_inline_png() {
        let data = CertificateData {
            school_logo: Some(crate::render::assets::test_images::png_data_uri(4, 4)),
            ministry_logo: Some("missing/logo.png".to_string()),
            ..fixtures::sample_data()
        };
        let svg = to_svg(&laid_out(&data), &options());
        assert_eq!(svg.matches("<image ").count(), 1);
        assert!(svg.contains(r#"href="data:image/png;base64,"#));
    }

    #[test]
    fn format_parses_from_query_value() {
        let format: RasterFormat = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(format, RasterFormat::Pdf);
        assert_eq!(RasterFormat::Png.extension(), "png");
    }
}
