// Page-based PDF output drawn with absolute coordinates.
// Uses the standard Type1 Helvetica faces, so no font files are needed and
// nothing time- or randomness-dependent ends up in the file.
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use super::assets::{load_image, DecodedImage};
use super::RenderOptions;
use crate::certificate::document::compose;
use crate::certificate::CertificateData;
use crate::error::Result;
use crate::layout::metrics::{FontFace, ASCENT_FACTOR};
use crate::layout::{layout, DrawOp, LaidOutDocument, Page, PageGeometry};

/// Composes, lays out and writes one certificate to `output_path`.
///
/// Returns only after the file has been flushed and synced. The caller owns
/// the file afterwards, including deleting it.
pub fn generate_certificate(
    data: &CertificateData,
    output_path: &Path,
    options: &RenderOptions,
) -> Result<()> {
    let laid_out = layout(&compose(data), &PageGeometry::f4());
    let bytes = render_pdf(&laid_out, options)?;

    let file = std::fs::File::create(output_path)?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(&bytes)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    tracing::info!(
        student_id = data.id,
        pages = laid_out.pages.len(),
        with_grades = data.has_grade_table(),
        "certificate written to {}",
        output_path.display()
    );
    Ok(())
}

pub fn render_pdf(laid_out: &LaidOutDocument, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new(laid_out.geometry);
    for page in &laid_out.pages {
        writer.add_page(page, options)?;
    }
    writer.finish()
}

/// Writes a single page holding one full-bleed PNG, for raster captures.
pub fn single_image_pdf(image: &DecodedImage, width: f32, height: f32) -> Result<Vec<u8>> {
    let geometry = PageGeometry {
        width,
        height,
        margin: 0.0,
    };
    let mut writer = PdfWriter::new(geometry);
    let name = writer.register_image(image);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    };
    writer.push_page(content)?;
    writer.finish()
}

struct PdfWriter {
    document: Document,
    geometry: PageGeometry,
    pages_id: ObjectId,
    resources_id: ObjectId,
    fonts: Vec<(FontFace, ObjectId)>,
    page_ids: Vec<ObjectId>,
    images: Vec<(String, ObjectId)>,
    image_cache: HashMap<String, Option<(String, DecodedImage)>>,
}

impl PdfWriter {
    fn new(geometry: PageGeometry) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let resources_id = document.new_object_id();

        let fonts = [FontFace::Regular, FontFace::Bold]
            .into_iter()
            .map(|face| {
                let id = document.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => face.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                (face, id)
            })
            .collect();

        Self {
            document,
            geometry,
            pages_id,
            resources_id,
            fonts,
            page_ids: Vec::new(),
            images: Vec::new(),
            image_cache: HashMap::new(),
        }
    }

    fn page_y(&self, y: f32) -> f32 {
        self.geometry.height - y
    }

    fn register_image(&mut self, image: &DecodedImage) -> String {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.rgb.clone(),
        );
        let id = self.document.add_object(stream);
        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((name.clone(), id));
        name
    }

    /// Loads each distinct source once. Failures are logged and the region stays blank.
    fn image_for(&mut self, source: &str, options: &RenderOptions) -> Option<(String, DecodedImage)> {
        if let Some(cached) = self.image_cache.get(source) {
            return cached.clone();
        }

        let entry = match load_image(source, &options.asset_dir) {
            Ok(image) => {
                let name = self.register_image(&image);
                Some((name, image))
            }
            Err(e) => {
                tracing::warn!("skipping certificate image {}: {}", source, e);
                None
            }
        };
        self.image_cache.insert(source.to_string(), entry.clone());
        entry
    }

    fn add_page(&mut self, page: &Page, options: &RenderOptions) -> Result<()> {
        let mut operations = Vec::new();

        for op in &page.ops {
            match op {
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    width,
                } => {
                    operations.push(Operation::new("w", vec![(*width).into()]));
                    operations.push(Operation::new("m", vec![(*x1).into(), self.page_y(*y1).into()]));
                    operations.push(Operation::new("l", vec![(*x2).into(), self.page_y(*y2).into()]));
                    operations.push(Operation::new("S", vec![]));
                }
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    stroke,
                } => {
                    operations.push(Operation::new("w", vec![(*stroke).into()]));
                    operations.push(Operation::new(
                        "re",
                        vec![
                            (*x).into(),
                            self.page_y(y + height).into(),
                            (*width).into(),
                            (*height).into(),
                        ],
                    ));
                    operations.push(Operation::new("S", vec![]));
                }
                DrawOp::Text {
                    x,
                    y,
                    text,
                    face,
                    size,
                    word_spacing,
                } => {
                    let baseline = self.page_y(y + size * ASCENT_FACTOR);
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![face.resource_name().into(), (*size).into()],
                    ));
                    operations.push(Operation::new("Tw", vec![(*word_spacing).into()]));
                    operations.push(Operation::new("Td", vec![(*x).into(), baseline.into()]));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::string_literal(encode_win_ansi(text))],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                DrawOp::Image {
                    source,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some((name, image)) = self.image_for(source, options) else {
                        continue;
                    };
                    let (dx, dy, w, h) = image.fit(*width, *height);
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            w.into(),
                            0.into(),
                            0.into(),
                            h.into(),
                            (x + dx).into(),
                            self.page_y(y + dy + h).into(),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    operations.push(Operation::new("Q", vec![]));
                }
            }
        }

        self.push_page(Content { operations })
    }

    fn push_page(&mut self, content: Content) -> Result<()> {
        let content_id = self
            .document
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.geometry.width.into(),
                self.geometry.height.into(),
            ],
            "Contents" => content_id,
            "Resources" => self.resources_id,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let mut font_dict = lopdf::Dictionary::new();
        for (face, id) in &self.fonts {
            font_dict.set(face.resource_name(), *id);
        }
        let mut xobjects = lopdf::Dictionary::new();
        for (name, id) in &self.images {
            xobjects.set(name.as_str(), *id);
        }
        self.document.objects.insert(
            self.resources_id,
            Object::Dictionary(dictionary! {
                "Font" => font_dict,
                "XObject" => xobjects,
            }),
        );

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.document.add_object(dictionary! {
            "Title" => Object::string_literal("Surat Keterangan Lulus"),
            "Producer" => Object::string_literal("skl"),
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.trailer.set("Info", info_id);
        self.document.compress();

        let mut out = Vec::new();
        self.document.save_to(&mut out)?;
        Ok(out)
    }
}

/// WinAnsi bytes for the standard fonts; unmapped characters print as `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{0}'..='\u{7f}' | '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}
