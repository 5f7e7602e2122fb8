use std::collections::HashMap;

use uuid::Uuid;

use crate::grading::{self, GradeConversion};
use crate::models::{ClassStatistics, GradeDistribution, GradeRow, ScoreRecord, StudentStanding};

/// Whether a stored grade enters the GPA. Pending grades only count on request.
pub fn counts(row: &GradeRow, include_pending: bool) -> bool {
    row.status.counts_toward_gpa() || (include_pending && row.status.is_pending())
}

/// Summarises each student on their own scale, ordered by student number.
/// A student whose counted grades mix scales is left out with a warning.
pub fn student_summaries(rows: &[GradeRow], include_pending: bool) -> Vec<StudentStanding> {
    let mut grouped: HashMap<Uuid, (&GradeRow, Vec<ScoreRecord>)> = HashMap::new();

    for row in rows.iter() {
        if !counts(row, include_pending) {
            continue;
        }

        let record = match row.score_record() {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(grade_id = %row.grade_id, "skipping grade: {err}");
                continue;
            }
        };

        grouped
            .entry(row.student_id)
            .or_insert_with(|| (row, Vec::new()))
            .1
            .push(record);
    }

    let mut standings = Vec::with_capacity(grouped.len());
    for (student, records) in grouped.into_values() {
        match grading::summarize(&records) {
            Ok(statistics) => standings.push(StudentStanding {
                student_number: student.student_number.clone(),
                student_name: student.student_name.clone(),
                program: student.program.clone(),
                statistics,
            }),
            Err(err) => {
                tracing::warn!(student = %student.student_number, "skipping standing: {err}");
            }
        }
    }

    standings.sort_by(|a, b| a.student_number.cmp(&b.student_number));
    standings
}

pub fn rank_students(rows: &[GradeRow], include_pending: bool) -> Vec<StudentStanding> {
    let mut standings = student_summaries(rows, include_pending);

    // lower grade point is better on both scales
    standings.sort_by(|a, b| {
        a.statistics
            .weighted_gpa
            .total_cmp(&b.statistics.weighted_gpa)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    standings
}

pub fn distribution(conversions: &[GradeConversion]) -> GradeDistribution {
    let mut dist = GradeDistribution::default();
    if conversions.is_empty() {
        return dist;
    }

    for conversion in conversions {
        match conversion.letter_grade.family() {
            'A' => dist.a += 1,
            'B' => dist.b += 1,
            'C' => dist.c += 1,
            'D' => dist.d += 1,
            _ => dist.f += 1,
        }
    }

    let mut scores: Vec<f64> = conversions.iter().map(|c| c.numeric_grade).collect();
    scores.sort_by(f64::total_cmp);
    dist.average_score = scores.iter().sum::<f64>() / scores.len() as f64;
    let mid = scores.len() / 2;
    dist.median_score = if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) / 2.0
    } else {
        scores[mid]
    };
    let variance = scores
        .iter()
        .map(|score| (score - dist.average_score).powi(2))
        .sum::<f64>()
        / scores.len() as f64;
    dist.standard_deviation = variance.sqrt();
    dist.lowest_score = scores[0];
    dist.highest_score = scores[scores.len() - 1];
    dist
}

/// Per-course statistics over counted grades, ordered by course code. A course
/// whose counted grades mix scales is left out with a warning.
pub fn class_statistics(rows: &[GradeRow], include_pending: bool) -> Vec<ClassStatistics> {
    let mut grouped: HashMap<&str, (&GradeRow, Vec<GradeConversion>)> = HashMap::new();

    for row in rows.iter().filter(|row| counts(row, include_pending)) {
        let record = match row.score_record() {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(grade_id = %row.grade_id, "skipping grade: {err}");
                continue;
            }
        };

        grouped
            .entry(row.course_code.as_str())
            .or_insert_with(|| (row, Vec::new()))
            .1
            .push(grading::convert(&record));
    }

    let mut classes = Vec::with_capacity(grouped.len());
    for (course, conversions) in grouped.into_values() {
        if let Some(other) = conversions.iter().find(|c| c.scale != course.scale) {
            tracing::warn!(
                course = %course.course_code,
                "skipping class report: grades mix {} and {} scales",
                course.scale,
                other.scale
            );
            continue;
        }

        let total_students = conversions.len();
        let passed_students = conversions.iter().filter(|c| c.passed).count();
        classes.push(ClassStatistics {
            course_code: course.course_code.clone(),
            course_title: course.course_title.clone(),
            scale: course.scale,
            total_students,
            passed_students,
            pass_percentage: passed_students as f64 / total_students as f64 * 100.0,
            distribution: distribution(&conversions),
        });
    }

    classes.sort_by(|a, b| a.course_code.cmp(&b.course_code));
    classes
}
