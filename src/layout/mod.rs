// Page layout: projects a certificate document onto fixed-size pages
pub mod metrics;

use serde::Serialize;

use crate::certificate::document::{Block, CertificateDocument, Field, Letterhead, Signature};
use crate::certificate::grades::{
    GradeTable, TableRow, NUMBER_COLUMN_WIDTH, ROW_HEIGHT, SUBJECT_COLUMN_WIDTH, TABLE_WIDTH,
    VALUE_COLUMN_WIDTH,
};
use metrics::{line_height, text_width, wrap, FontFace};

const MM: f32 = 72.0 / 25.4;

const BODY_SIZE: f32 = 11.0;
const PARAGRAPH_GAP: f32 = 8.0;
const MARK_ARM: f32 = 5.0;
const LOGO_SIZE: f32 = 60.0;
const LABEL_COLUMN_WIDTH: f32 = 150.0;
const COLON_COLUMN_WIDTH: f32 = 10.0;
const FIELD_INDENT: f32 = 20.0;
const STAMP_WIDTH: f32 = 200.0;
const STAMP_HEIGHT: f32 = 40.0;
const CELL_PADDING: f32 = 5.0;
const SIGNATURE_ALLOWANCE: f32 = 180.0;
const SIGNATURE_IMAGE_WIDTH: f32 = 120.0;
const SIGNATURE_IMAGE_HEIGHT: f32 = 60.0;
const STAMP_IMAGE_SIZE: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// F4 paper, 210 x 330 mm, with 20 mm margins.
    pub fn f4() -> Self {
        Self {
            width: 210.0 * MM,
            height: 330.0 * MM,
            margin: 20.0 * MM,
        }
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.width - self.margin
    }

    pub fn top(&self) -> f32 {
        self.margin
    }

    pub fn bottom(&self) -> f32 {
        self.height - self.margin
    }

    pub fn content_width(&self) -> f32 {
        self.right() - self.left()
    }
}

/// A positioned drawing instruction. Coordinates are points from the top-left
/// corner of the page; text `y` is the top of the line box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        face: FontFace,
        size: f32,
        word_spacing: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: f32,
    },
    Image {
        source: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[cfg(test)]
impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutDocument {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

#[cfg(test)]
impl LaidOutDocument {
    /// Index of the first page drawing exactly `text`.
    pub fn page_of(&self, text: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.texts().any(|t| t == text))
    }
}

pub fn layout(document: &CertificateDocument, geometry: &PageGeometry) -> LaidOutDocument {
    let mut engine = Engine::new(*geometry);
    for block in &document.blocks {
        engine.block(block);
    }
    LaidOutDocument {
        geometry: *geometry,
        pages: engine.pages,
    }
}

struct Engine {
    geometry: PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl Engine {
    fn new(geometry: PageGeometry) -> Self {
        let mut engine = Self {
            geometry,
            pages: Vec::new(),
            y: geometry.top(),
        };
        engine.new_page();
        engine
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.geometry.top();
        self.registration_marks();
    }

    fn registration_marks(&mut self) {
        let g = self.geometry;
        for (cx, cy) in [
            (g.left(), g.top()),
            (g.right(), g.top()),
            (g.left(), g.bottom()),
            (g.right(), g.bottom()),
        ] {
            self.push(DrawOp::Line {
                x1: cx - MARK_ARM,
                y1: cy,
                x2: cx + MARK_ARM,
                y2: cy,
                width: 0.5,
            });
            self.push(DrawOp::Line {
                x1: cx,
                y1: cy - MARK_ARM,
                x2: cx,
                y2: cy + MARK_ARM,
                width: 0.5,
            });
        }
    }

    fn remaining(&self) -> f32 {
        self.geometry.bottom() - self.y
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.geometry.top()
    }

    /// Starts a new page when `height` does not fit below the cursor.
    fn ensure(&mut self, height: f32) {
        if height > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn text(&mut self, x: f32, y: f32, text: &str, face: FontFace, size: f32) {
        if text.is_empty() {
            return;
        }
        self.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            face,
            size,
            word_spacing: 0.0,
        });
    }

    fn centered(&mut self, text: &str, face: FontFace, size: f32) {
        let x = self.geometry.width / 2.0 - text_width(text, face, size) / 2.0;
        self.text(x, self.y, text, face, size);
        self.y += line_height(size);
    }

    fn right_aligned(&mut self, text: &str, face: FontFace, size: f32) {
        let x = self.geometry.right() - text_width(text, face, size);
        self.text(x, self.y, text, face, size);
        self.y += line_height(size);
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Letterhead(head) => self.letterhead(head),
            Block::Rule => self.rule(),
            Block::Title { title, number } => {
                self.ensure(line_height(14.0) + line_height(BODY_SIZE));
                self.centered(title, FontFace::Bold, 14.0);
                self.y += 2.0;
                self.centered(number, FontFace::Regular, BODY_SIZE);
                self.y += 12.0;
            }
            Block::Paragraph(text) => {
                self.justified(text);
                self.y += PARAGRAPH_GAP;
            }
            Block::Lines(lines) => {
                for line in lines {
                    self.justified(line);
                }
                self.y += PARAGRAPH_GAP;
            }
            Block::Fields(fields) => self.fields(fields),
            Block::Stamp(label) => self.stamp(label),
            Block::GradeTable(table) => self.grade_table(table),
            Block::Signature(signature) => self.signature(signature),
        }
    }

    fn letterhead(&mut self, head: &Letterhead) {
        let top = self.y;
        if let Some(source) = &head.left_logo {
            self.push(DrawOp::Image {
                source: source.clone(),
                x: self.geometry.left(),
                y: top,
                width: LOGO_SIZE,
                height: LOGO_SIZE,
            });
        }
        if let Some(source) = &head.right_logo {
            self.push(DrawOp::Image {
                source: source.clone(),
                x: self.geometry.right() - LOGO_SIZE,
                y: top,
                width: LOGO_SIZE,
                height: LOGO_SIZE,
            });
        }

        self.centered(&head.lines[0], FontFace::Bold, 12.0);
        self.centered(&head.lines[1], FontFace::Bold, 12.0);
        self.centered(&head.lines[2], FontFace::Bold, 14.0);
        self.centered(&head.address, FontFace::Regular, 9.0);
        if let Some(contact) = &head.contact {
            self.centered(contact, FontFace::Regular, 9.0);
        }

        self.y = self.y.max(top + LOGO_SIZE) + 6.0;
    }

    fn rule(&mut self) {
        let (left, right) = (self.geometry.left(), self.geometry.right());
        self.push(DrawOp::Line {
            x1: left,
            y1: self.y,
            x2: right,
            y2: self.y,
            width: 2.0,
        });
        self.push(DrawOp::Line {
            x1: left,
            y1: self.y + 3.0,
            x2: right,
            y2: self.y + 3.0,
            width: 0.5,
        });
        self.y += 15.0;
    }

    fn justified(&mut self, text: &str) {
        let lh = line_height(BODY_SIZE);
        let left = self.geometry.left();
        for line in wrap(text, FontFace::Regular, BODY_SIZE, self.geometry.content_width(), true) {
            self.ensure(lh);
            self.push(DrawOp::Text {
                x: left,
                y: self.y,
                text: line.text,
                face: FontFace::Regular,
                size: BODY_SIZE,
                word_spacing: line.word_spacing,
            });
            self.y += lh;
        }
    }

    fn fields(&mut self, fields: &[Field]) {
        let row_height = line_height(BODY_SIZE) + 4.0;
        self.ensure(row_height * fields.len() as f32);

        let label_x = self.geometry.left() + FIELD_INDENT;
        let colon_x = label_x + LABEL_COLUMN_WIDTH;
        let value_x = colon_x + COLON_COLUMN_WIDTH;
        for field in fields {
            let face = if field.bold {
                FontFace::Bold
            } else {
                FontFace::Regular
            };
            self.text(label_x, self.y, field.label, FontFace::Regular, BODY_SIZE);
            self.text(colon_x, self.y, ":", FontFace::Regular, BODY_SIZE);
            self.text(value_x, self.y, &field.value, face, BODY_SIZE);
            self.y += row_height;
        }
        self.y += PARAGRAPH_GAP;
    }

    fn stamp(&mut self, label: &str) {
        self.ensure(STAMP_HEIGHT);
        let x = self.geometry.width / 2.0 - STAMP_WIDTH / 2.0;
        let top = self.y;
        self.push(DrawOp::Rect {
            x,
            y: top,
            width: STAMP_WIDTH,
            height: STAMP_HEIGHT,
            stroke: 1.5,
        });
        self.y = top + (STAMP_HEIGHT - line_height(18.0)) / 2.0;
        self.centered(label, FontFace::Bold, 18.0);
        self.y = top + STAMP_HEIGHT + 12.0;
    }

    fn grade_table(&mut self, table: &GradeTable) {
        if table.estimated_height() > self.remaining() && !self.at_page_top() {
            self.new_page();
        }

        let x0 = self.geometry.left() + (self.geometry.content_width() - TABLE_WIDTH) / 2.0;
        for row in &table.rows {
            if self.y + ROW_HEIGHT > self.geometry.bottom() {
                self.new_page();
            }
            self.table_row(x0, row);
            self.y += ROW_HEIGHT;
        }
        self.y += 12.0;
    }

    fn table_row(&mut self, x0: f32, row: &TableRow) {
        let subject_x = x0 + NUMBER_COLUMN_WIDTH;
        let value_x = subject_x + SUBJECT_COLUMN_WIDTH;
        let face = if row.is_bold() {
            FontFace::Bold
        } else {
            FontFace::Regular
        };

        match row {
            TableRow::Header => {
                self.cell(x0, NUMBER_COLUMN_WIDTH, "No", face, true);
                self.cell(subject_x, SUBJECT_COLUMN_WIDTH, "Mata Pelajaran", face, true);
                self.cell(value_x, VALUE_COLUMN_WIDTH, "Nilai", face, true);
            }
            TableRow::Category(label) => {
                self.cell(x0, TABLE_WIDTH, label, face, false);
            }
            TableRow::Grade {
                number,
                name,
                value,
            } => {
                self.cell(x0, NUMBER_COLUMN_WIDTH, &number.to_string(), face, true);
                self.cell(subject_x, SUBJECT_COLUMN_WIDTH, name, face, false);
                self.cell(value_x, VALUE_COLUMN_WIDTH, value, face, true);
            }
            TableRow::Average(value) => {
                self.cell(
                    x0,
                    NUMBER_COLUMN_WIDTH + SUBJECT_COLUMN_WIDTH,
                    "RATA RATA",
                    face,
                    true,
                );
                self.cell(value_x, VALUE_COLUMN_WIDTH, value, face, true);
            }
        }
    }

    /// Bordered cell with text vertically centered on its measured height.
    fn cell(&mut self, x: f32, width: f32, text: &str, face: FontFace, center: bool) {
        self.push(DrawOp::Rect {
            x,
            y: self.y,
            width,
            height: ROW_HEIGHT,
            stroke: 0.5,
        });
        let text_y = self.y + (ROW_HEIGHT - line_height(BODY_SIZE)) / 2.0;
        let text_x = if center {
            x + (width - text_width(text, face, BODY_SIZE)) / 2.0
        } else {
            x + CELL_PADDING
        };
        self.text(text_x, text_y, text, face, BODY_SIZE);
    }

    fn signature(&mut self, signature: &Signature) {
        if self.remaining() < SIGNATURE_ALLOWANCE && !self.at_page_top() {
            self.new_page();
        }

        self.y += 10.0;
        self.right_aligned(&signature.place_date, FontFace::Regular, BODY_SIZE);
        self.right_aligned(signature.role, FontFace::Regular, BODY_SIZE);

        let image_top = self.y + 5.0;
        let right = self.geometry.right();
        if let Some(source) = &signature.stamp_image {
            self.push(DrawOp::Image {
                source: source.clone(),
                x: right - SIGNATURE_IMAGE_WIDTH - STAMP_IMAGE_SIZE / 2.0,
                y: image_top - 10.0,
                width: STAMP_IMAGE_SIZE,
                height: STAMP_IMAGE_SIZE,
            });
        }
        if let Some(source) = &signature.signature_image {
            self.push(DrawOp::Image {
                source: source.clone(),
                x: right - SIGNATURE_IMAGE_WIDTH,
                y: image_top,
                width: SIGNATURE_IMAGE_WIDTH,
                height: SIGNATURE_IMAGE_HEIGHT,
            });
        }
        self.y = image_top + SIGNATURE_IMAGE_HEIGHT + 5.0;

        self.right_aligned(&signature.name, FontFace::Bold, BODY_SIZE);
        self.right_aligned(&signature.nip, FontFace::Regular, BODY_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::document::{compose, STAMP_LABEL};
    use crate::certificate::{fixtures, CertificateData};

    fn laid_out(data: &CertificateData) -> LaidOutDocument {
        layout(&compose(data), &PageGeometry::f4())
    }

    fn stamp_bottom(doc: &LaidOutDocument) -> (usize, f32) {
        doc.pages
            .iter()
            .enumerate()
            .find_map(|(index, page)| {
                page.ops.iter().find_map(|op| match op {
                    DrawOp::Rect {
                        y,
                        height,
                        width,
                        ..
                    } if *width == STAMP_WIDTH => Some((index, y + height)),
                    _ => None,
                })
            })
            .expect("stamp box present")
    }

    #[test]
    fn f4_geometry_in_points() {
        let g = PageGeometry::f4();
        assert!((g.width - 595.28).abs() < 0.01);
        assert!((g.height - 935.43).abs() < 0.01);
        assert!((g.margin - 56.69).abs() < 0.01);
    }

    #[test]
    fn every_page_starts_with_registration_marks() {
        let doc = laid_out(&fixtures::with_grades(20));
        assert!(doc.pages.len() > 1);
        for page in &doc.pages {
            let marks = page.ops[..8]
                .iter()
                .filter(|op| matches!(op, DrawOp::Line { width, .. } if *width == 0.5))
                .count();
            assert_eq!(marks, 8);
        }
    }

    #[test]
    fn table_moves_to_next_page_only_when_estimate_overflows() {
        let g = PageGeometry::f4();
        for n in 1..=30 {
            let doc = laid_out(&fixtures::with_grades(n));
            let (stamp_page, bottom) = stamp_bottom(&doc);
            let table_top = bottom + 12.0;
            let estimate = (n + 5) as f32 * ROW_HEIGHT;
            let header_page = doc.page_of("Mata Pelajaran").unwrap();

            if estimate > g.bottom() - table_top {
                assert_eq!(header_page, stamp_page + 1, "n = {n}");
            } else {
                assert_eq!(header_page, stamp_page, "n = {n}");
            }
        }
    }

    #[test]
    fn twenty_grades_span_pages_with_continuous_numbering() {
        let doc = laid_out(&fixtures::with_grades(20));
        assert!(doc.page_of("Mata Pelajaran").unwrap() > 0);
        assert!(doc.page_of("Kelompok D").is_some());
        for number in 1..=20 {
            assert!(doc.page_of(&number.to_string()).is_some(), "row {number}");
        }
        assert!(doc.page_of("21").is_none());
    }

    #[test]
    fn continuation_pages_skip_letterhead() {
        let data = fixtures::with_grades(20);
        let doc = laid_out(&data);
        let school = data.school_name.to_uppercase();
        assert_eq!(doc.page_of(&school), Some(0));
        for page in &doc.pages[1..] {
            assert!(!page.texts().any(|t| t == school));
        }
    }

    #[test]
    fn short_certificate_fits_one_page() {
        let doc = laid_out(&fixtures::sample_data());
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.page_of("Mata Pelajaran").is_none());
        assert_eq!(doc.page_of(STAMP_LABEL), Some(0));
    }

    #[test]
    fn signature_keeps_its_allowance() {
        let g = PageGeometry::f4();
        for n in [0, 6, 14, 20, 26] {
            let data = fixtures::with_grades(n);
            let doc = laid_out(&data);
            let last = doc.pages.len() - 1;
            assert_eq!(doc.page_of(&data.headmaster_name), Some(last), "n = {n}");

            let place_y = doc.pages[last]
                .ops
                .iter()
                .find_map(|op| match op {
                    DrawOp::Text { text, y, .. } if text == "Bandung, 4 Mei 2024" => Some(*y),
                    _ => None,
                })
                .unwrap();
            // 10pt spacing precedes the city/date line.
            let start = place_y - 10.0;
            assert!(g.bottom() - start >= SIGNATURE_ALLOWANCE || start <= g.top(), "n = {n}");
        }
    }

    #[test]
    fn ops_stay_on_the_page() {
        let g = PageGeometry::f4();
        let doc = laid_out(&fixtures::with_grades(26));
        for page in &doc.pages {
            for op in &page.ops {
                let (x, y) = match op {
                    DrawOp::Text { x, y, .. }
                    | DrawOp::Rect { x, y, .. }
                    | DrawOp::Image { x, y, .. } => (*x, *y),
                    DrawOp::Line { x1, y1, .. } => (*x1, *y1),
                };
                assert!(x >= 0.0 && x <= g.width, "{op:?}");
                assert!(y >= 0.0 && y <= g.height, "{op:?}");
            }
        }
    }

    #[test]
    fn missing_images_leave_regions_empty() {
        let doc = laid_out(&fixtures::sample_data());
        let images = doc.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count();
        assert_eq!(images, 0);

        let data = CertificateData {
            school_logo: Some("logo.png".to_string()),
            headmaster_signature: Some("ttd.png".to_string()),
            ..fixtures::sample_data()
        };
        let doc = laid_out(&data);
        let images = doc.pages[0]
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count();
        assert_eq!(images, 2);
    }

    #[test]
    fn layout_is_deterministic() {
        let data = fixtures::with_grades(18);
        assert_eq!(laid_out(&data), laid_out(&data));
    }
}
