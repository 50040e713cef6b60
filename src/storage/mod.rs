use std::path::Path;
use tempfile::NamedTempFile;

pub fn ensure_dirs(upload_folder: &Path, temp_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)?;
    std::fs::create_dir_all(temp_folder)?;
    Ok(())
}

/// A scratch file for one generated certificate; removed when dropped.
pub fn certificate_temp_file(
    temp_folder: &Path,
    extension: &str,
) -> std::io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix("skl_")
        .suffix(&format!(".{}", extension))
        .tempfile_in(temp_folder)
}

/// Keeps download names header-safe: ASCII letters, digits, `.`, `-` and `_`.
fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `SKL_<studentName>_<dengan|tanpa>_nilai.pdf`
pub fn server_pdf_filename(student_name: &str, with_grades: bool) -> String {
    format!(
        "SKL_{}_{}_nilai.pdf",
        sanitize(student_name),
        if with_grades { "dengan" } else { "tanpa" }
    )
}

/// `SKL_<Dengan|Tanpa>_Nilai_<nisn>.<ext>`
pub fn client_image_filename(nisn: &str, with_grades: bool, extension: &str) -> String {
    format!(
        "SKL_{}_Nilai_{}.{}",
        if with_grades { "Dengan" } else { "Tanpa" },
        sanitize(nisn),
        extension
    )
}

pub fn batch_zip_filename(with_grades: bool) -> String {
    format!(
        "SKL_Semua_{}_nilai.zip",
        if with_grades { "dengan" } else { "tanpa" }
    )
}
