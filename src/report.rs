use std::fmt::Write;

use crate::error::GradeError;
use crate::grading::{self, GradeConversion};
use crate::models::{GradeRow, ScoreRecord};
use crate::standing;

pub fn build_report(
    student: Option<&str>,
    semester: Option<&str>,
    rows: &[GradeRow],
    include_pending: bool,
) -> Result<String, GradeError> {
    let counted: Vec<&GradeRow> = rows
        .iter()
        .filter(|row| standing::counts(row, include_pending))
        .collect();

    let mut records: Vec<ScoreRecord> = Vec::with_capacity(counted.len());
    for row in counted.iter() {
        match row.score_record() {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(grade_id = %row.grade_id, "left out of report totals: {err}"),
        }
    }
    let conversions: Vec<GradeConversion> = records.iter().map(grading::convert).collect();
    let distribution = standing::distribution(&conversions);

    let mut output = String::new();
    let student_label = student.unwrap_or("all students");
    let semester_label = semester.unwrap_or("all semesters");

    let _ = writeln!(output, "# GradeHub Grade Report");
    let _ = writeln!(output, "Generated for {} ({})", student_label, semester_label);
    if include_pending {
        let _ = writeln!(output, "Includes grades still pending verification.");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if student.is_some() {
        let statistics = grading::summarize(&records)?;
        if statistics.total_courses == 0 {
            let _ = writeln!(output, "No counted grades for this selection.");
        } else {
            let _ = writeln!(
                output,
                "- Courses: {} ({} passed, {} failed)",
                statistics.total_courses, statistics.passed_courses, statistics.failed_courses
            );
            let _ = writeln!(
                output,
                "- Units earned: {} of {}",
                statistics.earned_credits, statistics.total_credits
            );
            let _ = writeln!(output, "- Weighted GPA: {:.2}", statistics.weighted_gpa);
            let _ = writeln!(output, "- Pass rate: {:.1}%", statistics.pass_percentage);
        }
    } else {
        // one GPA per student; students on different scales are never pooled
        let summaries = standing::student_summaries(rows, include_pending);
        if summaries.is_empty() {
            let _ = writeln!(output, "No counted grades for this selection.");
        } else {
            let _ = writeln!(
                output,
                "| Student | Name | Program | Courses | Passed | Units Earned | GPA | Pass Rate |"
            );
            let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
            for summary in summaries.iter() {
                let stats = &summary.statistics;
                let _ = writeln!(
                    output,
                    "| {} | {} | {} | {} | {} | {} of {} | {:.2} | {:.1}% |",
                    summary.student_number,
                    summary.student_name,
                    summary.program,
                    stats.total_courses,
                    stats.passed_courses,
                    stats.earned_credits,
                    stats.total_credits,
                    stats.weighted_gpa,
                    stats.pass_percentage
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");

    if rows.is_empty() {
        let _ = writeln!(output, "No grades recorded for this selection.");
    } else {
        let _ = writeln!(
            output,
            "| Student | Semester | Code | Title | Units | Score | Grade | Point | Remarks | Status |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|");
        for row in rows.iter() {
            let conversion = grading::convert_score(row.scale, row.raw_score);
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {:.2} | {} | {} |",
                row.student_number,
                row.semester,
                row.course_code,
                row.course_title,
                row.units,
                row.raw_score,
                conversion.letter_grade,
                conversion.grade_point,
                conversion.remarks,
                row.status
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");

    if conversions.is_empty() {
        let _ = writeln!(output, "No counted grades for this selection.");
    } else {
        for (letter, count) in [
            ('A', distribution.a),
            ('B', distribution.b),
            ('C', distribution.c),
            ('D', distribution.d),
            ('F', distribution.f),
        ] {
            let _ = writeln!(output, "- {}: {}", letter, count);
        }
        let _ = writeln!(
            output,
            "- Average numeric grade {:.1}, median {:.1}, standard deviation {:.2}",
            distribution.average_score, distribution.median_score, distribution.standard_deviation
        );
    }

    let pending: Vec<&GradeRow> = rows
        .iter()
        .filter(|row| row.status.is_pending() && !include_pending)
        .collect();
    if !pending.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Pending Review");
        for row in pending {
            let _ = writeln!(
                output,
                "- {} {} ({}) encoded by {} on {}",
                row.student_number, row.course_code, row.status, row.encoded_by, row.recorded_at
            );
        }
    }

    Ok(output)
}

pub fn build_class_report(
    course: Option<&str>,
    semester: Option<&str>,
    rows: &[GradeRow],
    include_pending: bool,
) -> String {
    let classes = standing::class_statistics(rows, include_pending);

    let mut output = String::new();
    let _ = writeln!(output, "# GradeHub Class Report");
    let _ = writeln!(
        output,
        "Generated for {} ({})",
        course.unwrap_or("all courses"),
        semester.unwrap_or("all semesters")
    );
    if include_pending {
        let _ = writeln!(output, "Includes grades still pending verification.");
    }

    if classes.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No counted grades for this selection.");
        return output;
    }

    for class in classes.iter() {
        let dist = &class.distribution;
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} {}", class.course_code, class.course_title);
        let _ = writeln!(output, "- Scale: {}", class.scale);
        let _ = writeln!(
            output,
            "- Students: {} ({} passed, pass rate {:.1}%)",
            class.total_students, class.passed_students, class.pass_percentage
        );
        let _ = writeln!(
            output,
            "- Average {:.1}, median {:.1}, standard deviation {:.2}",
            dist.average_score, dist.median_score, dist.standard_deviation
        );
        let _ = writeln!(
            output,
            "- Highest {:.1}, lowest {:.1}",
            dist.highest_score, dist.lowest_score
        );
        let _ = writeln!(
            output,
            "- Distribution: A {}, B {}, C {}, D {}, F {}",
            dist.a, dist.b, dist.c, dist.d, dist.f
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::Scale;
    use crate::models::GradeStatus;
    use crate::standing::tests::sample_row;
    use uuid::Uuid;

    #[test]
    fn report_summarizes_counted_grades() {
        let avery = Uuid::new_v4();
        let rows = vec![
            sample_row(avery, "Avery", "CS101", 3.0, 1.0, Scale::Point, GradeStatus::Approved),
            sample_row(avery, "Avery", "CS102", 1.0, 2.0, Scale::Point, GradeStatus::Approved),
            sample_row(avery, "Avery", "CS103", 3.0, 3.5, Scale::Point, GradeStatus::Submitted),
        ];

        let report = build_report(Some("avery-001"), Some("2025-1"), &rows, false).unwrap();
        assert!(report.contains("Generated for avery-001 (2025-1)"));
        assert!(report.contains("- Courses: 2 (2 passed, 0 failed)"));
        assert!(report.contains("- Weighted GPA: 1.25"));
        assert!(report.contains("| avery-001 | 2025-1 | CS103 | CS103 Lecture | 3 | 3.5 | F | 5.00 | Failed | submitted |"));
        assert!(report.contains("## Pending Review"));
        assert!(report.contains("- A: 1"));
        assert!(report.contains("- B: 1"));
    }

    #[test]
    fn pending_grades_fold_in_when_requested() {
        let avery = Uuid::new_v4();
        let rows = vec![
            sample_row(avery, "Avery", "CS101", 3.0, 95.0, Scale::Percentage, GradeStatus::Approved),
            sample_row(avery, "Avery", "CS102", 3.0, 50.0, Scale::Percentage, GradeStatus::UnderReview),
        ];

        let report = build_report(Some("avery-001"), None, &rows, true).unwrap();
        assert!(report.contains("Generated for avery-001 (all semesters)"));
        assert!(report.contains("- Courses: 2 (1 passed, 1 failed)"));
        assert!(report.contains("- Pass rate: 50.0%"));
        assert!(!report.contains("## Pending Review"));
    }

    #[test]
    fn empty_report_is_still_rendered() {
        let report = build_report(None, None, &[], false).unwrap();
        assert!(report.contains("No counted grades for this selection."));
        assert!(report.contains("No grades recorded for this selection."));
    }

    #[test]
    fn mixed_scales_are_rejected() {
        let avery = Uuid::new_v4();
        let rows = vec![
            sample_row(avery, "Avery", "CS101", 3.0, 95.0, Scale::Percentage, GradeStatus::Approved),
            sample_row(avery, "Avery", "CS102", 3.0, 1.5, Scale::Point, GradeStatus::Approved),
        ];
        assert!(matches!(
            build_report(Some("avery-001"), None, &rows, false),
            Err(GradeError::MixedScales { .. })
        ));
    }

    #[test]
    fn all_students_report_summarises_each_student_on_their_own_scale() {
        let rows = vec![
            sample_row(Uuid::new_v4(), "Avery", "CS101", 3.0, 95.0, Scale::Percentage, GradeStatus::Approved),
            sample_row(Uuid::new_v4(), "Jules", "CS101", 3.0, 1.5, Scale::Point, GradeStatus::Approved),
        ];

        let report = build_report(None, Some("2025-1"), &rows, false).unwrap();
        assert!(report.contains("Generated for all students (2025-1)"));
        assert!(report.contains("| avery-001 | Avery | BSCS | 1 | 1 | 3 of 3 | 1.00 | 100.0% |"));
        assert!(report.contains("| jules-001 | Jules | BSCS | 1 | 1 | 3 of 3 | 1.50 | 100.0% |"));
        assert!(!report.contains("Weighted GPA"));
    }

    #[test]
    fn all_students_report_leaves_out_a_student_mixing_scales() {
        let avery = Uuid::new_v4();
        let rows = vec![
            sample_row(avery, "Avery", "CS101", 3.0, 95.0, Scale::Percentage, GradeStatus::Approved),
            sample_row(avery, "Avery", "CS102", 3.0, 1.5, Scale::Point, GradeStatus::Approved),
            sample_row(Uuid::new_v4(), "Jules", "CS101", 3.0, 2.0, Scale::Point, GradeStatus::Approved),
        ];

        let report = build_report(None, None, &rows, false).unwrap();
        assert!(!report.contains("| avery-001 | Avery"));
        assert!(report.contains("| jules-001 | Jules | BSCS | 1 | 1 | 3 of 3 | 2.00 | 100.0% |"));
    }

    #[test]
    fn class_report_lists_course_statistics() {
        let rows = vec![
            sample_row(Uuid::new_v4(), "Avery", "CS101", 3.0, 90.0, Scale::Percentage, GradeStatus::Approved),
            sample_row(Uuid::new_v4(), "Jules", "CS101", 3.0, 70.0, Scale::Percentage, GradeStatus::Approved),
        ];

        let report = build_class_report(Some("CS101"), Some("2025-1"), &rows, false);
        assert!(report.contains("Generated for CS101 (2025-1)"));
        assert!(report.contains("## CS101 CS101 Lecture"));
        assert!(report.contains("- Students: 2 (2 passed, pass rate 100.0%)"));
        assert!(report.contains("- Average 80.0, median 80.0, standard deviation 10.00"));
        assert!(report.contains("- Highest 90.0, lowest 70.0"));
        assert!(report.contains("- Distribution: A 1, B 0, C 1, D 0, F 0"));
    }

    #[test]
    fn empty_class_report_is_still_rendered() {
        let report = build_class_report(None, None, &[], false);
        assert!(report.contains("Generated for all courses (all semesters)"));
        assert!(report.contains("No counted grades for this selection."));
    }
}
