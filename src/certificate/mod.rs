// Certificate record, document model and grade table
pub mod document;
pub mod format;
pub mod grades;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{GradeRow, Settings, Student};

/// Subject group used to lay out the grade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeCategory {
    A,
    B,
    C,
    D,
}

impl GradeCategory {
    pub const ALL: [GradeCategory; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Kelompok A",
            Self::B => "Kelompok B",
            Self::C => "Kelompok C",
            Self::D => "Kelompok D",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    /// Legacy curriculum boundaries for subjects without a stored category.
    pub fn for_position(index: usize) -> Self {
        match index {
            0..=5 => Self::A,
            6..=8 => Self::B,
            9..=13 => Self::C,
            _ => Self::D,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub name: String,
    pub value: f64,
    pub category: GradeCategory,
}

/// Everything needed to render one certificate. Read-only input to the layout core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub id: i32,
    pub nisn: String,
    pub nis: String,
    pub full_name: String,
    pub birth_place: String,
    pub birth_date: Option<NaiveDate>,
    pub parent_name: String,
    pub class_name: String,
    pub major_name: String,

    pub cert_number: String,
    pub cert_number_prefix: String,
    pub cert_before_student_data: String,
    pub cert_after_student_data: String,
    pub cert_regulation_text: String,
    pub cert_criteria_text: String,
    pub issue_date: Option<NaiveDate>,
    pub graduation_date: Option<NaiveDate>,
    pub graduation_time: String,

    pub school_name: String,
    pub school_address: String,
    pub school_email: String,
    pub school_website: String,
    pub school_logo: Option<String>,
    pub ministry_logo: Option<String>,
    pub school_stamp: Option<String>,
    pub headmaster_name: String,
    pub headmaster_nip: String,
    pub headmaster_signature: Option<String>,
    pub city_name: String,
    pub province_name: String,
    pub academic_year: String,

    pub show_grades: bool,
    pub grades: Vec<Grade>,
    pub average_grade: f64,
}

impl CertificateData {
    /// Merges a student row, the settings row and the student's grades.
    ///
    /// This is the only place the average is computed; renderers print
    /// `average_grade` as given.
    pub fn assemble(
        student: &Student,
        settings: &Settings,
        grade_rows: &[GradeRow],
        show_grades: bool,
    ) -> Self {
        let grades: Vec<Grade> = grade_rows
            .iter()
            .enumerate()
            .map(|(index, row)| Grade {
                name: row.subject_name.clone(),
                value: row.value,
                category: row
                    .subject_category
                    .as_deref()
                    .and_then(GradeCategory::from_code)
                    .unwrap_or_else(|| GradeCategory::for_position(index)),
            })
            .collect();

        let average_grade = if grades.is_empty() {
            0.0
        } else {
            grades.iter().map(|g| g.value).sum::<f64>() / grades.len() as f64
        };

        Self {
            id: student.id,
            nisn: student.nisn.clone(),
            nis: student.nis.clone(),
            full_name: student.full_name.clone(),
            birth_place: student.birth_place.clone(),
            birth_date: student.birth_date,
            parent_name: student.parent_name.clone(),
            class_name: student.class_name.clone(),
            major_name: student.major_name.clone().unwrap_or_default(),

            cert_number: student.cert_number.clone().unwrap_or_default(),
            cert_number_prefix: settings.cert_number_prefix.clone().unwrap_or_default(),
            cert_before_student_data: settings.cert_before_student_data.clone().unwrap_or_default(),
            cert_after_student_data: settings.cert_after_student_data.clone().unwrap_or_default(),
            cert_regulation_text: settings.cert_regulation_text.clone().unwrap_or_default(),
            cert_criteria_text: settings.cert_criteria_text.clone().unwrap_or_default(),
            issue_date: settings.issue_date,
            graduation_date: settings.graduation_date,
            graduation_time: settings.graduation_time.clone().unwrap_or_default(),

            school_name: settings.school_name.clone(),
            school_address: settings.school_address.clone(),
            school_email: settings.school_email.clone().unwrap_or_default(),
            school_website: settings.school_website.clone().unwrap_or_default(),
            school_logo: non_empty(&settings.school_logo),
            ministry_logo: non_empty(&settings.ministry_logo),
            school_stamp: non_empty(&settings.school_stamp),
            headmaster_name: settings.headmaster_name.clone(),
            headmaster_nip: settings.headmaster_nip.clone(),
            headmaster_signature: non_empty(&settings.headmaster_signature),
            city_name: settings.city_name.clone(),
            province_name: settings.province_name.clone(),
            academic_year: settings.academic_year.clone(),

            show_grades,
            grades,
            average_grade,
        }
    }

    pub fn certificate_number(&self) -> String {
        format::certificate_number(&self.cert_number_prefix, &self.cert_number, self.id)
    }

    /// Whether the grade table is drawn at all.
    pub fn has_grade_table(&self) -> bool {
        self.show_grades && !self.grades.is_empty()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
