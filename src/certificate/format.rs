use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Indonesian long-form date, e.g. `4 Mei 2024`.
pub fn format_long_date(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_long_date).unwrap_or_else(|| "-".to_string())
}

pub fn format_grade(value: f64) -> String {
    format!("{:.2}", value)
}

/// `<prefix>/<number>`, where the number falls back to the zero-padded student id.
pub fn certificate_number(prefix: &str, number: &str, student_id: i32) -> String {
    let number = if number.trim().is_empty() {
        format!("{:03}", student_id)
    } else {
        number.trim().to_string()
    };

    let prefix = prefix.trim().trim_end_matches('/');
    if prefix.is_empty() {
        number
    } else {
        format!("{}/{}", prefix, number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_date_uses_indonesian_months_without_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        assert_eq!(format_long_date(date), "4 Mei 2024");

        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(format_long_date(date), "31 Desember 2025");
    }

    #[test]
    fn missing_date_renders_dash() {
        assert_eq!(format_optional_date(None), "-");
    }

    #[test]
    fn grades_have_two_decimals() {
        assert_eq!(format_grade(85.0), "85.00");
        assert_eq!(format_grade(78.456), "78.46");
    }

    #[test]
    fn certificate_number_falls_back_to_padded_id() {
        assert_eq!(certificate_number("", "", 7), "007");
        assert_eq!(certificate_number("", "", 1234), "1234");
        assert_eq!(certificate_number("421.3/SMK", "", 12), "421.3/SMK/012");
        assert_eq!(certificate_number("421.3/", "045", 12), "421.3/045");
        assert_eq!(certificate_number("", " 99 ", 12), "99");
    }
}
