use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GradeError;
use crate::grading::Scale;

/// A raw score on exactly one scale, weighted by its course credits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub raw_score: f64,
    pub credits: f64,
    pub scale: Scale,
}

impl ScoreRecord {
    pub fn new(raw_score: f64, credits: f64, scale: Scale) -> Result<Self, GradeError> {
        if !raw_score.is_finite() {
            return Err(GradeError::NonFiniteScore(raw_score));
        }
        if !credits.is_finite() || credits <= 0.0 {
            return Err(GradeError::InvalidCredits(credits));
        }
        Ok(Self {
            raw_score,
            credits,
            scale,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradePoint {
    pub grade_point: f64,
    pub credits: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GradeStatistics {
    pub total_courses: usize,
    pub passed_courses: usize,
    pub failed_courses: usize,
    pub total_credits: f64,
    pub earned_credits: f64,
    pub weighted_gpa: f64,
    pub pass_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl GradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Only registrar-approved grades enter the official GPA.
    pub fn counts_toward_gpa(self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Submitted | Self::UnderReview)
    }
}

impl fmt::Display for GradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeStatus {
    type Err = GradeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "under_review" | "under-review" => Ok(Self::UnderReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(GradeError::UnknownStatus(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeRow {
    pub grade_id: Uuid,
    pub student_id: Uuid,
    pub student_number: String,
    pub student_name: String,
    pub program: String,
    pub course_code: String,
    pub course_title: String,
    pub units: f64,
    pub raw_score: f64,
    pub scale: Scale,
    pub semester: String,
    pub status: GradeStatus,
    pub encoded_by: String,
    pub recorded_at: NaiveDate,
}

impl GradeRow {
    pub fn score_record(&self) -> Result<ScoreRecord, GradeError> {
        ScoreRecord::new(self.raw_score, self.units, self.scale)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentStanding {
    pub student_number: String,
    pub student_name: String,
    pub program: String,
    pub statistics: GradeStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GradeDistribution {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
    pub f: usize,
    pub average_score: f64,
    pub median_score: f64,
    /// Population standard deviation of the numeric grades.
    pub standard_deviation: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

/// Per-course statistics for a registrar class report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub course_code: String,
    pub course_title: String,
    pub scale: Scale,
    pub total_students: usize,
    pub passed_students: usize,
    pub pass_percentage: f64,
    pub distribution: GradeDistribution,
}

/// A bulk-upload row that was refused before reaching the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadError {
    pub row: usize,
    pub student_number: String,
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: Vec<UploadError>,
}
