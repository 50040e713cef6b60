//! Standard-14 Helvetica metrics.
//!
//! Widths are the Adobe AFM advance widths in 1/1000 em for the printable
//! ASCII range (32..=126). The same tables drive measuring here and the
//! unembedded Type1 fonts in the PDF backend, so measured and printed
//! widths agree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn base_font(self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
        }
    }

    pub fn resource_name(self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
        }
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const BULLET_WIDTH: u16 = 350;
const FALLBACK_WIDTH: u16 = 556;

/// Ascender minus descender plus line gap of the Helvetica AFM, in em.
pub const LINE_HEIGHT_FACTOR: f32 = 1.156;
/// Half the line gap plus the ascender: top of a line box to its baseline, in em.
pub const ASCENT_FACTOR: f32 = 0.834;

fn char_width(face: FontFace, ch: char) -> u16 {
    let table = match face {
        FontFace::Regular => &HELVETICA,
        FontFace::Bold => &HELVETICA_BOLD,
    };
    match ch {
        ' '..='~' => table[ch as usize - 32],
        '\u{2022}' => BULLET_WIDTH,
        '\u{a0}' => table[0],
        _ => FALLBACK_WIDTH,
    }
}

pub fn text_width(text: &str, face: FontFace, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(face, c) as u32).sum();
    units as f32 * size / 1000.0
}

pub fn line_height(size: f32) -> f32 {
    size * LINE_HEIGHT_FACTOR
}

/// One wrapped line and the extra spacing to add at each space when justified.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    pub word_spacing: f32,
}

/// Greedy word wrap. Lines other than the last are justified to `width`
/// when `justify` is set. A single word wider than `width` gets its own line.
pub fn wrap(text: &str, face: FontFace, size: f32, width: f32, justify: bool) -> Vec<WrappedLine> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if text_width(&candidate, face, size) <= width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let last = lines.len().saturating_sub(1);
    lines
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let gaps = text.matches(' ').count();
            let word_spacing = if justify && index < last && gaps > 0 {
                ((width - text_width(&text, face, size)) / gaps as f32).max(0.0)
            } else {
                0.0
            };
            WrappedLine { text, word_spacing }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_afm_tables() {
        assert_eq!(text_width("A", FontFace::Regular, 1000.0), 667.0);
        assert_eq!(text_width("i", FontFace::Regular, 1000.0), 222.0);
        assert_eq!(text_width("i", FontFace::Bold, 1000.0), 278.0);
        assert_eq!(text_width("\u{2022} ", FontFace::Regular, 1000.0), 628.0);
        assert!((text_width("Hello", FontFace::Regular, 10.0) - 22.78).abs() < 0.001);
    }

    #[test]
    fn bold_is_never_narrower() {
        let sample = "SURAT KETERANGAN LULUS 2024";
        assert!(text_width(sample, FontFace::Bold, 12.0) >= text_width(sample, FontFace::Regular, 12.0));
    }

    #[test]
    fn wrap_keeps_lines_within_width() {
        let text = "Berdasarkan kriteria kelulusan peserta didik dan hasil rapat pleno dewan guru, peserta didik tersebut di atas dinyatakan";
        let lines = wrap(text, FontFace::Regular, 11.0, 200.0, true);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(&line.text, FontFace::Regular, 11.0) <= 200.0);
        }
        let rejoined: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(rejoined.join(" "), text);
    }

    #[test]
    fn justified_lines_fill_width_except_last() {
        let text = "satu dua tiga empat lima enam tujuh delapan sembilan sepuluh sebelas dua belas";
        let lines = wrap(text, FontFace::Regular, 11.0, 120.0, true);
        let (last, rest) = lines.split_last().unwrap();
        assert_eq!(last.word_spacing, 0.0);
        for line in rest {
            let gaps = line.text.matches(' ').count() as f32;
            let filled = text_width(&line.text, FontFace::Regular, 11.0) + gaps * line.word_spacing;
            assert!((filled - 120.0).abs() < 0.01, "{:?}", line);
        }
    }

    #[test]
    fn empty_text_wraps_to_nothing() {
        assert!(wrap("   ", FontFace::Regular, 11.0, 100.0, true).is_empty());
    }
}
