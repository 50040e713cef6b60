use regex::Regex;
use std::sync::OnceLock;

use super::format::{format_long_date, format_optional_date};
use super::grades::GradeTable;
use super::CertificateData;

pub const TITLE: &str = "SURAT KETERANGAN LULUS";
pub const STAMP_LABEL: &str = "LULUS";
pub const HEADMASTER_ROLE: &str = "Kepala,";

pub const DEFAULT_REGULATION_TEXT: &str = "Berdasarkan Peraturan Menteri Pendidikan, Kebudayaan, Riset, dan Teknologi Nomor 21 Tahun 2022 tentang Standar Penilaian Pendidikan pada Pendidikan Anak Usia Dini, Jenjang Pendidikan Dasar, dan Jenjang Pendidikan Menengah, kelulusan peserta didik ditetapkan oleh satuan pendidikan dengan kriteria sebagai berikut:";

pub const DEFAULT_BEFORE_STUDENT_TEXT: &str =
    "Yang bertanda tangan di bawah ini, Kepala Sekolah menerangkan bahwa:";

pub const DEFAULT_AFTER_STUDENT_TEXT: &str = "Berdasarkan kriteria kelulusan peserta didik dan hasil rapat pleno dewan guru, peserta didik tersebut di atas dinyatakan:";

pub const CLOSING_TEXT: &str = "Surat Keterangan Lulus ini berlaku sementara sampai dengan diterbitkannya Ijazah. Demikian surat keterangan ini dibuat untuk dapat dipergunakan sebagaimana mestinya.";

#[derive(Debug, Clone, PartialEq)]
pub struct Letterhead {
    pub left_logo: Option<String>,
    pub right_logo: Option<String>,
    pub lines: [String; 3],
    pub address: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub place_date: String,
    pub role: &'static str,
    pub name: String,
    pub nip: String,
    pub signature_image: Option<String>,
    pub stamp_image: Option<String>,
}

/// One node of the backend-neutral certificate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Letterhead(Letterhead),
    Rule,
    Title { title: String, number: String },
    Paragraph(String),
    Lines(Vec<String>),
    Fields(Vec<Field>),
    Stamp(&'static str),
    GradeTable(GradeTable),
    Signature(Signature),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDocument {
    pub blocks: Vec<Block>,
}

#[cfg(test)]
impl CertificateDocument {
    pub fn grade_table(&self) -> Option<&GradeTable> {
        self.blocks.iter().find_map(|b| match b {
            Block::GradeTable(table) => Some(table),
            _ => None,
        })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

pub fn compose(data: &CertificateData) -> CertificateDocument {
    let mut blocks = vec![
        Block::Letterhead(letterhead(data)),
        Block::Rule,
        Block::Title {
            title: TITLE.to_string(),
            number: format!("Nomor: {}", data.certificate_number()),
        },
        Block::Paragraph(or_default(&data.cert_regulation_text, DEFAULT_REGULATION_TEXT)),
        Block::Lines(criteria(data)),
        Block::Paragraph(or_default(
            &data.cert_before_student_data,
            DEFAULT_BEFORE_STUDENT_TEXT,
        )),
        Block::Fields(student_fields(data)),
        Block::Paragraph(or_default(
            &data.cert_after_student_data,
            DEFAULT_AFTER_STUDENT_TEXT,
        )),
        Block::Stamp(STAMP_LABEL),
    ];

    if data.has_grade_table() {
        blocks.push(Block::GradeTable(GradeTable::build(
            &data.grades,
            data.average_grade,
        )));
    }

    blocks.push(Block::Paragraph(CLOSING_TEXT.to_string()));
    blocks.push(Block::Signature(signature(data)));

    CertificateDocument { blocks }
}

fn or_default(text: &str, default: &str) -> String {
    if text.trim().is_empty() {
        default.to_string()
    } else {
        text.trim().to_string()
    }
}

fn letterhead(data: &CertificateData) -> Letterhead {
    let contact = match (data.school_email.trim(), data.school_website.trim()) {
        ("", "") => None,
        (email, "") => Some(format!("Email: {}", email)),
        ("", website) => Some(format!("Website: {}", website)),
        (email, website) => Some(format!("Email: {} | Website: {}", email, website)),
    };

    Letterhead {
        left_logo: data.ministry_logo.clone(),
        right_logo: data.school_logo.clone(),
        lines: [
            format!("PEMERINTAH PROVINSI {}", data.province_name.to_uppercase())
                .trim_end()
                .to_string(),
            "DINAS PENDIDIKAN".to_string(),
            data.school_name.to_uppercase(),
        ],
        address: data.school_address.clone(),
        contact,
    }
}

fn student_fields(data: &CertificateData) -> Vec<Field> {
    let class = if data.major_name.trim().is_empty() {
        data.class_name.clone()
    } else {
        format!("{} / {}", data.class_name, data.major_name)
    };

    vec![
        Field {
            label: "Nama",
            value: data.full_name.clone(),
            bold: true,
        },
        Field {
            label: "Tempat, Tanggal Lahir",
            value: format!("{}, {}", data.birth_place, format_optional_date(data.birth_date)),
            bold: false,
        },
        Field {
            label: "NIS / NISN",
            value: format!("{} / {}", data.nis, data.nisn),
            bold: false,
        },
        Field {
            label: "Nama Orang Tua / Wali",
            value: data.parent_name.clone(),
            bold: false,
        },
        Field {
            label: "Kelas / Program Keahlian",
            value: class,
            bold: false,
        },
    ]
}

fn signature(data: &CertificateData) -> Signature {
    let place_date = match data.issue_date {
        Some(date) => format!("{}, {}", data.city_name, format_long_date(date)),
        None => data.city_name.clone(),
    };

    Signature {
        place_date,
        role: HEADMASTER_ROLE,
        name: data.headmaster_name.clone(),
        nip: format!("NIP. {}", data.headmaster_nip),
        signature_image: data.headmaster_signature.clone(),
        stamp_image: data.school_stamp.clone(),
    }
}

fn criteria(data: &CertificateData) -> Vec<String> {
    let lines = criteria_lines(&data.cert_criteria_text);
    if lines.is_empty() {
        default_criteria(data)
    } else {
        lines
    }
}

pub fn default_criteria(data: &CertificateData) -> Vec<String> {
    vec![
        format!(
            "1. Menyelesaikan seluruh program pembelajaran di {} sampai dengan Tahun Pelajaran {};",
            data.school_name, data.academic_year
        ),
        "2. Memperoleh nilai sikap dan perilaku minimal baik;".to_string(),
        format!(
            "3. Mengikuti asesmen sumatif akhir jenjang yang diselenggarakan oleh {};",
            data.school_name
        ),
        format!(
            "4. Memenuhi kriteria kelulusan yang ditetapkan oleh Dinas Pendidikan Provinsi {}.",
            data.province_name
        ),
    ]
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
}

fn line_break_tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|<(p|ul|ol)(\s[^>]*)?>|</p\s*>").expect("valid block pattern")
    })
}

fn list_end_tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(li|ul|ol)\s*>").expect("valid list end pattern"))
}

fn list_item_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<li(\s[^>]*)?>").expect("valid list pattern"))
}

/// Flattens rich-text criteria into plain lines; list items get a bullet.
pub fn criteria_lines(markup: &str) -> Vec<String> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    if !any_tag().is_match(markup) {
        return markup
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }

    let text = list_end_tags().replace_all(markup, "\n\u{E001}\n");
    let text = list_item_tag().replace_all(&text, "\n\u{E000}\n");
    let text = line_break_tags().replace_all(&text, "\n");
    let text = any_tag().replace_all(&text, "");
    let text = decode_entities(&text);

    // U+E000 opens a list item, U+E001 closes one. Only the first text line
    // inside an open item is bulleted.
    let mut lines: Vec<String> = Vec::new();
    let mut in_item = false;
    for line in text.lines().map(str::trim) {
        match line {
            "\u{E000}" => in_item = true,
            "\u{E001}" => in_item = false,
            "" | "\u{2022}" => {}
            _ if in_item => {
                lines.push(format!("\u{2022} {}", line));
                in_item = false;
            }
            _ => lines.push(line.to_string()),
        }
    }
    lines
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::fixtures;

    #[test]
    fn markup_criteria_become_plain_lines() {
        let lines = criteria_lines("<p>Line one</p><ul><li>Item</li></ul>");
        assert_eq!(lines, vec!["Line one", "\u{2022} Item"]);
    }

    #[test]
    fn inline_tags_and_entities_are_flattened() {
        let lines = criteria_lines(
            "<P class=\"x\">Lulus <strong>semua</strong> <em>mata pelajaran</em><br/>dan &amp; sikap</P><ol><li><p>Nested</p></li></ol>",
        );
        assert_eq!(
            lines,
            vec!["Lulus semua mata pelajaran", "dan & sikap", "\u{2022} Nested"]
        );
    }

    #[test]
    fn empty_list_items_do_not_bullet_later_lines() {
        assert_eq!(
            criteria_lines("<ul><li></li></ul><p>Next paragraph</p>"),
            vec!["Next paragraph"]
        );
        assert_eq!(
            criteria_lines("<ol><li>  </li><li>Kedua</li></ol>Penutup"),
            vec!["\u{2022} Kedua", "Penutup"]
        );
    }

    #[test]
    fn bullet_only_lines_are_dropped() {
        assert_eq!(criteria_lines("<p>\u{2022}</p><p>Kriteria</p>"), vec!["Kriteria"]);
    }

    #[test]
    fn plain_criteria_split_on_newlines() {
        let lines = criteria_lines("satu\n\n  dua  \n");
        assert_eq!(lines, vec!["satu", "dua"]);
    }

    #[test]
    fn empty_texts_fall_back_to_defaults() {
        let data = fixtures::sample_data();
        let doc = compose(&data);
        let paragraphs: Vec<&str> = doc.paragraphs().collect();

        assert!(paragraphs.contains(&DEFAULT_REGULATION_TEXT));
        assert!(paragraphs.contains(&DEFAULT_BEFORE_STUDENT_TEXT));
        assert!(paragraphs.contains(&DEFAULT_AFTER_STUDENT_TEXT));

        let lines = doc.blocks.iter().find_map(|b| match b {
            Block::Lines(lines) => Some(lines.clone()),
            _ => None,
        });
        assert_eq!(lines, Some(default_criteria(&data)));
        assert!(default_criteria(&data)[0].contains("SMK Negeri 1 Bandung"));
        assert!(default_criteria(&data)[0].contains("2023/2024"));
        assert!(default_criteria(&data)[3].contains("Jawa Barat"));
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let data = CertificateData {
            cert_regulation_text: "   \n".to_string(),
            cert_criteria_text: "<p> </p>".to_string(),
            ..fixtures::sample_data()
        };
        let doc = compose(&data);
        assert!(doc.paragraphs().any(|p| p == DEFAULT_REGULATION_TEXT));
        assert!(doc.blocks.contains(&Block::Lines(default_criteria(&data))));
    }

    #[test]
    fn supplied_texts_replace_defaults() {
        let data = CertificateData {
            cert_before_student_data: "Kepala sekolah menerangkan:".to_string(),
            ..fixtures::sample_data()
        };
        let doc = compose(&data);
        assert!(doc.paragraphs().any(|p| p == "Kepala sekolah menerangkan:"));
        assert!(!doc.paragraphs().any(|p| p == DEFAULT_BEFORE_STUDENT_TEXT));
    }

    #[test]
    fn grade_table_requires_grades_and_flag() {
        let empty = CertificateData {
            show_grades: true,
            ..fixtures::sample_data()
        };
        assert!(compose(&empty).grade_table().is_none());

        let hidden = CertificateData {
            show_grades: false,
            ..fixtures::with_grades(10)
        };
        assert!(compose(&hidden).grade_table().is_none());

        assert!(compose(&fixtures::with_grades(10)).grade_table().is_some());
    }

    #[test]
    fn blocks_follow_certificate_order() {
        let doc = compose(&fixtures::with_grades(3));
        let kinds: Vec<&str> = doc
            .blocks
            .iter()
            .map(|b| match b {
                Block::Letterhead(_) => "letterhead",
                Block::Rule => "rule",
                Block::Title { .. } => "title",
                Block::Paragraph(_) => "paragraph",
                Block::Lines(_) => "lines",
                Block::Fields(_) => "fields",
                Block::Stamp(_) => "stamp",
                Block::GradeTable(_) => "table",
                Block::Signature(_) => "signature",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "letterhead", "rule", "title", "paragraph", "lines", "paragraph", "fields",
                "paragraph", "stamp", "table", "paragraph", "signature"
            ]
        );
    }

    #[test]
    fn student_name_field_is_bold() {
        let doc = compose(&fixtures::sample_data());
        let fields = doc
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Fields(fields) => Some(fields.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(fields.len(), 5);
        assert!(fields[0].bold);
        assert_eq!(fields[0].value, "Siti Rahmawati");
        assert_eq!(fields[1].value, "Bandung, 17 Agustus 2006");
        assert!(fields[1..].iter().all(|f| !f.bold));
    }

    #[test]
    fn signature_and_contact_lines() {
        let doc = compose(&fixtures::sample_data());
        let signature = doc.blocks.iter().find_map(|b| match b {
            Block::Signature(s) => Some(s.clone()),
            _ => None,
        });
        let signature = signature.unwrap();
        assert_eq!(signature.place_date, "Bandung, 4 Mei 2024");
        assert_eq!(signature.nip, "NIP. 196805121994031005");

        let Block::Letterhead(head) = &doc.blocks[0] else {
            panic!("letterhead first");
        };
        assert_eq!(
            head.contact.as_deref(),
            Some("Email: info@smkn1bdg.sch.id | Website: smkn1bdg.sch.id")
        );
        assert_eq!(head.lines[0], "PEMERINTAH PROVINSI JAWA BARAT");
    }
}
