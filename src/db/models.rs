use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i32,
    pub nisn: String,
    pub nis: String,
    pub full_name: String,
    pub birth_place: String,
    pub birth_date: Option<NaiveDate>,
    pub parent_name: String,
    pub class_name: String,
    pub major_name: Option<String>,
    pub cert_number: Option<String>,
}

/// The single school-configuration row merged into every certificate.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct Settings {
    pub school_name: String,
    pub school_address: String,
    pub school_email: Option<String>,
    pub school_website: Option<String>,
    pub school_logo: Option<String>,
    pub ministry_logo: Option<String>,
    pub school_stamp: Option<String>,
    pub headmaster_name: String,
    pub headmaster_nip: String,
    pub headmaster_signature: Option<String>,
    pub city_name: String,
    pub province_name: String,
    pub academic_year: String,
    pub cert_number_prefix: Option<String>,
    pub cert_before_student_data: Option<String>,
    pub cert_after_student_data: Option<String>,
    pub cert_regulation_text: Option<String>,
    pub cert_criteria_text: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub graduation_date: Option<NaiveDate>,
    pub graduation_time: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GradeRow {
    pub subject_name: String,
    pub subject_category: Option<String>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_subjects: i64,
    pub students_with_grades: i64,
    pub settings_configured: bool,
}
