mod models;

pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    Ok(sqlx::migrate!("./migrations").run(pool).await?)
}

pub async fn get_student(pool: &PgPool, student_id: i32) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        r#"
        SELECT id, nisn, nis, full_name, birth_place, birth_date, parent_name,
               class_name, major_name, cert_number
        FROM students
        WHERE id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_student_ids(pool: &PgPool) -> Result<Vec<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM students ORDER BY full_name, id")
        .fetch_all(pool)
        .await
}

pub async fn get_settings(pool: &PgPool) -> Result<Option<Settings>, sqlx::Error> {
    sqlx::query_as::<_, Settings>(
        r#"
        SELECT school_name, school_address, school_email, school_website, school_logo,
               ministry_logo, school_stamp, headmaster_name, headmaster_nip,
               headmaster_signature, city_name, province_name, academic_year,
               cert_number_prefix, cert_before_student_data, cert_after_student_data,
               cert_regulation_text, cert_criteria_text, issue_date, graduation_date,
               graduation_time
        FROM settings
        ORDER BY id
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

/// Grades for one student in subject display order.
pub async fn get_student_grades(
    pool: &PgPool,
    student_id: i32,
) -> Result<Vec<GradeRow>, sqlx::Error> {
    sqlx::query_as::<_, GradeRow>(
        r#"
        SELECT s.name AS subject_name, s.category AS subject_category, g.value
        FROM grades g
        JOIN subjects s ON s.id = g.subject_id
        WHERE g.student_id = $1
        ORDER BY s.display_order, s.id
        "#,
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub async fn dashboard_stats(pool: &PgPool) -> Result<DashboardStats, sqlx::Error> {
    let (total_students, total_subjects, students_with_grades, settings_configured) =
        sqlx::query_as::<_, (i64, i64, i64, bool)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM students),
                (SELECT COUNT(*) FROM subjects),
                (SELECT COUNT(*) FROM students st
                 WHERE EXISTS (SELECT 1 FROM subjects)
                   AND (SELECT COUNT(DISTINCT g.subject_id) FROM grades g WHERE g.student_id = st.id)
                       >= (SELECT COUNT(*) FROM subjects)),
                EXISTS (SELECT 1 FROM settings)
            "#,
        )
        .fetch_one(pool)
        .await?;

    Ok(DashboardStats {
        total_students,
        total_subjects,
        students_with_grades,
        settings_configured,
    })
}
