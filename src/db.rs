use std::collections::HashMap;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::grading::Scale;
use crate::models::{GradeRow, GradeStatus, ImportSummary, UploadError};

/// One line of a faculty bulk-upload file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CsvGradeRow {
    pub student_number: String,
    pub full_name: String,
    pub email: String,
    pub program: String,
    pub course_code: String,
    pub course_title: String,
    pub units: f64,
    pub score: f64,
    pub scale: String,
    pub semester: String,
    pub status: Option<String>,
    pub encoded_by: String,
    pub recorded_at: NaiveDate,
    pub source_key: Option<String>,
}

/// Checks a bulk-upload line before it is written. `row` is 1-based, counting
/// the header as line 1.
pub fn validate_row(row: usize, line: &CsvGradeRow) -> Result<(Scale, GradeStatus), UploadError> {
    let refuse = |field: &'static str, message: String| UploadError {
        row,
        student_number: line.student_number.clone(),
        field,
        message,
    };

    if line.student_number.trim().is_empty() {
        return Err(refuse("student_number", "student number is required".to_string()));
    }
    if line.course_code.trim().is_empty() {
        return Err(refuse("course_code", "course code is required".to_string()));
    }
    let scale: Scale = line
        .scale
        .parse()
        .map_err(|err: crate::error::GradeError| refuse("scale", err.to_string()))?;
    if !line.score.is_finite() {
        return Err(refuse("score", format!("score must be a number, got {}", line.score)));
    }
    if !line.units.is_finite() || line.units <= 0.0 {
        return Err(refuse("units", format!("units must be positive, got {}", line.units)));
    }
    let status = match line.status.as_deref() {
        None | Some("") => GradeStatus::Submitted,
        Some(value) => value
            .parse()
            .map_err(|err: crate::error::GradeError| refuse("status", err.to_string()))?,
    };

    Ok((scale, status))
}

async fn upsert_student(
    pool: &PgPool,
    student_number: &str,
    full_name: &str,
    email: &str,
    program: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO gradehub.students (id, student_number, full_name, email, program)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_number) DO UPDATE
        SET full_name = EXCLUDED.full_name, email = EXCLUDED.email, program = EXCLUDED.program
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_number)
    .bind(full_name)
    .bind(email)
    .bind(program)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to upsert student {student_number}"))?
    .get("id");

    Ok(id)
}

struct NewGrade<'a> {
    student_id: Uuid,
    course_code: &'a str,
    course_title: &'a str,
    units: f64,
    raw_score: f64,
    scale: Scale,
    semester: &'a str,
    status: GradeStatus,
    encoded_by: &'a str,
    recorded_at: NaiveDate,
    source_key: String,
}

/// Returns false when a grade with the same source key already exists.
async fn insert_grade(pool: &PgPool, grade: NewGrade<'_>) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO gradehub.grades
        (id, student_id, course_code, course_title, units, raw_score, scale,
         semester, status, encoded_by, recorded_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(grade.student_id)
    .bind(grade.course_code)
    .bind(grade.course_title)
    .bind(grade.units)
    .bind(grade.raw_score)
    .bind(grade.scale.as_str())
    .bind(grade.semester)
    .bind(grade.status.as_str())
    .bind(grade.encoded_by)
    .bind(grade.recorded_at)
    .bind(&grade.source_key)
    .execute(pool)
    .await
    .with_context(|| format!("failed to insert grade {}", grade.source_key))?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let students = [
        ("2024-0001", "Alice Brown", "alice.brown@student.gams.edu", "BSCS"),
        ("2024-0002", "Bob Wilson", "bob.wilson@student.gams.edu", "BSCS"),
        ("2024-0003", "Carol Martinez", "carol.martinez@student.gams.edu", "BSIT"),
    ];

    let grades = [
        ("seed-001", "2024-0001", "CS-101", "Introduction to Computer Science", 4.0, 1.25, "approved"),
        ("seed-002", "2024-0001", "CS-201", "Data Structures", 4.0, 1.75, "approved"),
        ("seed-003", "2024-0002", "CS-101", "Introduction to Computer Science", 4.0, 2.25, "approved"),
        ("seed-004", "2024-0002", "CS-201", "Data Structures", 4.0, 3.5, "submitted"),
        ("seed-005", "2024-0003", "CS-101", "Introduction to Computer Science", 4.0, 1.0, "approved"),
        ("seed-006", "2024-0003", "CS-301", "Database Systems", 3.0, 2.0, "under_review"),
    ];

    let recorded_at = NaiveDate::from_ymd_opt(2024, 12, 16).context("invalid date")?;
    let mut inserted = 0usize;

    let mut student_ids = HashMap::new();
    for (number, name, email, program) in students {
        let id = upsert_student(pool, number, name, email, program).await?;
        student_ids.insert(number, id);
    }

    for (source_key, number, code, title, units, score, status) in grades {
        let student_id = *student_ids
            .get(number)
            .context("seed grade references an unknown student")?;

        let grade = NewGrade {
            student_id,
            course_code: code,
            course_title: title,
            units,
            raw_score: score,
            scale: Scale::Point,
            semester: "2024-FALL",
            status: status.parse()?,
            encoded_by: "Dr. John Smith",
            recorded_at,
            source_key: source_key.to_string(),
        };
        if insert_grade(pool, grade).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Optional narrowing applied by `fetch_grades`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradeFilter<'a> {
    pub student: Option<&'a str>,
    pub semester: Option<&'a str>,
    pub course: Option<&'a str>,
}

impl<'a> GradeFilter<'a> {
    /// Values to bind, in placeholder order.
    fn values(&self) -> Vec<&'a str> {
        [self.student, self.semester, self.course]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// SQL for `fetch_grades`. Placeholders are numbered in the order of
/// `GradeFilter::values`, so `$N` only counts the filters that are set.
pub fn grade_query(filter: &GradeFilter<'_>) -> String {
    let mut query = String::from(
        "SELECT g.id AS grade_id, st.id AS student_id, st.student_number, st.full_name, \
         st.program, g.course_code, g.course_title, g.units, g.raw_score, g.scale, \
         g.semester, g.status, g.encoded_by, g.recorded_at \
         FROM gradehub.grades g \
         JOIN gradehub.students st ON st.id = g.student_id \
         WHERE TRUE",
    );

    let columns = [
        ("st.student_number", filter.student),
        ("g.semester", filter.semester),
        ("g.course_code", filter.course),
    ];
    let mut position = 0;
    for (column, value) in columns {
        if value.is_some() {
            position += 1;
            query.push_str(&format!(" AND {column} = ${position}"));
        }
    }
    query.push_str(" ORDER BY st.student_number, g.semester, g.course_code");
    query
}

pub async fn fetch_grades(pool: &PgPool, filter: &GradeFilter<'_>) -> anyhow::Result<Vec<GradeRow>> {
    let query = grade_query(filter);
    let mut rows = sqlx::query(&query);
    for value in filter.values() {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await.context("failed to fetch grades")?;
    let mut grades = Vec::with_capacity(records.len());

    for row in records {
        let scale: String = row.get("scale");
        let status: String = row.get("status");
        grades.push(GradeRow {
            grade_id: row.get("grade_id"),
            student_id: row.get("student_id"),
            student_number: row.get("student_number"),
            student_name: row.get("full_name"),
            program: row.get("program"),
            course_code: row.get("course_code"),
            course_title: row.get("course_title"),
            units: row.get("units"),
            raw_score: row.get("raw_score"),
            scale: scale.parse()?,
            semester: row.get("semester"),
            status: status.parse()?,
            encoded_by: row.get("encoded_by"),
            recorded_at: row.get("recorded_at"),
        });
    }

    Ok(grades)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<CsvGradeRow>().enumerate() {
        let line = index + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(line, "unreadable upload row: {err}");
                summary.errors.push(UploadError {
                    row: line,
                    student_number: String::new(),
                    field: "row",
                    message: err.to_string(),
                });
                continue;
            }
        };

        let (scale, status) = match validate_row(line, &row) {
            Ok(checked) => checked,
            Err(refused) => {
                tracing::warn!(line, field = refused.field, "{}", refused.message);
                summary.errors.push(refused);
                continue;
            }
        };

        let student_id = upsert_student(
            pool,
            &row.student_number,
            &row.full_name,
            &row.email,
            &row.program,
        )
        .await?;

        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let grade = NewGrade {
            student_id,
            course_code: &row.course_code,
            course_title: &row.course_title,
            units: row.units,
            raw_score: row.score,
            scale,
            semester: &row.semester,
            status,
            encoded_by: &row.encoded_by,
            recorded_at: row.recorded_at,
            source_key,
        };

        if insert_grade(pool, grade).await? {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }

    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        rejected = summary.errors.len(),
        "bulk upload finished"
    );
    Ok(summary)
}

/// Registrar verification. Returns false when no grade has that id.
pub async fn update_status(
    pool: &PgPool,
    grade_id: Uuid,
    status: GradeStatus,
    verified_by: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE gradehub.grades
        SET status = $2, verified_by = $3, verified_at = $4
        WHERE id = $1
        "#,
    )
    .bind(grade_id)
    .bind(status.as_str())
    .bind(verified_by)
    .bind(Utc::now())
    .execute(pool)
    .await
    .with_context(|| format!("failed to update grade {grade_id}"))?;

    Ok(result.rows_affected() > 0)
}
