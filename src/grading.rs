//! Score to grade conversion and GPA aggregation.
//!
//! Both grading scales are plain ordered band tables walked by one routine.
//! The percentage table is checked with `>=` from the highest bound down, the
//! point table with `<=` from the best (lowest) bound up. The last band of each
//! table is a catch-all.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GradeError;
use crate::models::{GradePoint, GradeStatistics, ScoreRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// 0-100, higher is better.
    Percentage,
    /// 1.00-5.00 Philippine point scale, lower is better.
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    fn admits(self, value: f64, bound: f64) -> bool {
        match self {
            Self::HigherIsBetter => value >= bound,
            Self::LowerIsBetter => value <= bound,
        }
    }
}

impl Scale {
    pub fn bands(self) -> &'static [Band] {
        match self {
            Self::Percentage => &PERCENTAGE_BANDS,
            Self::Point => &POINT_BANDS,
        }
    }

    pub fn domain(self) -> (f64, f64) {
        match self {
            Self::Percentage => (0.0, 100.0),
            Self::Point => (1.0, 5.0),
        }
    }

    /// Grade point assigned to a failing mark on this scale. Anything strictly
    /// below it passes.
    pub fn failing_point(self) -> f64 {
        match self {
            Self::Percentage => 4.0,
            Self::Point => 5.0,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (low, high) = self.domain();
        value.clamp(low, high)
    }

    fn direction(self) -> Direction {
        match self {
            Self::Percentage => Direction::HigherIsBetter,
            Self::Point => Direction::LowerIsBetter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Point => "point",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = GradeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" | "pct" => Ok(Self::Percentage),
            "point" | "points" | "ph" => Ok(Self::Point),
            _ => Err(GradeError::UnknownScale(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    D,
    F,
}

impl LetterGrade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::D => "D",
            Self::F => "F",
        }
    }

    /// The bare letter with any +/- modifier dropped.
    pub fn family(self) -> char {
        match self {
            Self::A | Self::AMinus => 'A',
            Self::BPlus | Self::B | Self::BMinus => 'B',
            Self::CPlus | Self::C | Self::CMinus => 'C',
            Self::D => 'D',
            Self::F => 'F',
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a grading table.
///
/// `bound` is inclusive: a lower bound on the percentage scale, an upper bound
/// on the point scale. `representative` is the numeric grade reported for the
/// band instead of the input itself (point scale only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub bound: f64,
    pub letter: LetterGrade,
    pub grade_point: f64,
    pub representative: Option<f64>,
    pub description: &'static str,
    pub passed: bool,
}

const fn band(
    bound: f64,
    letter: LetterGrade,
    grade_point: f64,
    representative: Option<f64>,
    description: &'static str,
    passed: bool,
) -> Band {
    Band {
        bound,
        letter,
        grade_point,
        representative,
        description,
        passed,
    }
}

pub static PERCENTAGE_BANDS: [Band; 10] = [
    band(90.0, LetterGrade::A, 1.00, None, "Excellent", true),
    band(87.0, LetterGrade::AMinus, 1.25, None, "Very Good", true),
    band(84.0, LetterGrade::BPlus, 1.50, None, "Good", true),
    band(80.0, LetterGrade::B, 1.75, None, "Good", true),
    band(77.0, LetterGrade::BMinus, 2.00, None, "Satisfactory", true),
    band(74.0, LetterGrade::CPlus, 2.25, None, "Fair", true),
    band(70.0, LetterGrade::C, 2.50, None, "Fair", true),
    band(67.0, LetterGrade::CMinus, 2.75, None, "Barely Passing", true),
    band(65.0, LetterGrade::D, 3.00, None, "Passing", true),
    band(f64::NEG_INFINITY, LetterGrade::F, 4.00, None, "Failure", false),
];

pub static POINT_BANDS: [Band; 10] = [
    band(1.00, LetterGrade::A, 1.00, Some(99.0), "Excellent", true),
    band(1.25, LetterGrade::AMinus, 1.25, Some(96.0), "Very Good", true),
    band(1.50, LetterGrade::BPlus, 1.50, Some(93.0), "Good", true),
    band(1.75, LetterGrade::B, 1.75, Some(90.0), "Satisfactory", true),
    band(2.00, LetterGrade::BMinus, 2.00, Some(87.0), "Satisfactory", true),
    band(2.25, LetterGrade::CPlus, 2.25, Some(84.0), "Fair", true),
    band(2.50, LetterGrade::C, 2.50, Some(81.0), "Fair", true),
    band(2.75, LetterGrade::CMinus, 2.75, Some(78.0), "Barely Passing", true),
    band(3.00, LetterGrade::D, 3.00, Some(75.0), "Barely Passing", true),
    band(f64::INFINITY, LetterGrade::F, 5.00, Some(50.0), "Failing", false),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeConversion {
    pub scale: Scale,
    pub numeric_grade: f64,
    pub letter_grade: LetterGrade,
    pub grade_point: f64,
    pub description: &'static str,
    pub remarks: &'static str,
    pub passed: bool,
}

/// First band admitting `value`, falling through to the catch-all.
fn classify(scale: Scale, value: f64) -> &'static Band {
    let bands = scale.bands();
    let direction = scale.direction();
    bands
        .iter()
        .find(|band| direction.admits(value, band.bound))
        .unwrap_or(&bands[bands.len() - 1])
}

/// Clamps `value` into the scale's domain and classifies it.
pub fn convert_score(scale: Scale, value: f64) -> GradeConversion {
    let clamped = scale.clamp(value);
    let band = classify(scale, clamped);
    GradeConversion {
        scale,
        numeric_grade: band.representative.unwrap_or(clamped),
        letter_grade: band.letter,
        grade_point: band.grade_point,
        description: band.description,
        remarks: if band.passed { "Passed" } else { "Failed" },
        passed: band.passed,
    }
}

/// Out-of-range scores are clamped into `[0, 100]`, never rejected.
pub fn convert_percentage_to_grade(score: f64) -> GradeConversion {
    convert_score(Scale::Percentage, score)
}

/// Out-of-range points are clamped into `[1.0, 5.0]`, never rejected.
pub fn convert_point_scale_to_grade(grade_point: f64) -> GradeConversion {
    convert_score(Scale::Point, grade_point)
}

pub fn convert(record: &ScoreRecord) -> GradeConversion {
    match record.scale {
        Scale::Percentage => convert_percentage_to_grade(record.raw_score),
        Scale::Point => convert_point_scale_to_grade(record.raw_score),
    }
}

pub fn letter_grade_from_point(grade_point: f64) -> LetterGrade {
    classify(Scale::Point, grade_point).letter
}

pub fn is_passing(grade_point: f64, scale: Scale) -> bool {
    grade_point < scale.failing_point()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Credit-weighted mean of the grade points, rounded to two decimals.
/// Returns 0 when there are no credits to weight by.
pub fn weighted_gpa(records: &[GradePoint]) -> f64 {
    let total_credits: f64 = records.iter().map(|r| r.credits).sum();
    if total_credits <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = records.iter().map(|r| r.grade_point * r.credits).sum();
    round2(weighted / total_credits)
}

/// `scale` names the table that produced the points; passing is judged
/// against that scale's failing grade point.
pub fn aggregate(records: &[GradePoint], scale: Scale) -> GradeStatistics {
    let total_courses = records.len();
    let passed_courses = records
        .iter()
        .filter(|r| is_passing(r.grade_point, scale))
        .count();
    let total_credits: f64 = records.iter().map(|r| r.credits).sum();
    let earned_credits: f64 = records
        .iter()
        .filter(|r| is_passing(r.grade_point, scale))
        .map(|r| r.credits)
        .sum();
    let pass_percentage = if total_courses == 0 {
        0.0
    } else {
        passed_courses as f64 / total_courses as f64 * 100.0
    };

    GradeStatistics {
        total_courses,
        passed_courses,
        failed_courses: total_courses - passed_courses,
        total_credits,
        earned_credits,
        weighted_gpa: weighted_gpa(records),
        pass_percentage,
    }
}

/// Converts every record on its own scale, then aggregates the grade points.
pub fn summarize(records: &[ScoreRecord]) -> Result<GradeStatistics, GradeError> {
    let Some(first) = records.first() else {
        return Ok(GradeStatistics::default());
    };
    if let Some(other) = records.iter().find(|r| r.scale != first.scale) {
        return Err(GradeError::MixedScales {
            first: first.scale,
            second: other.scale,
        });
    }

    let points: Vec<GradePoint> = records
        .iter()
        .map(|record| GradePoint {
            grade_point: convert(record).grade_point,
            credits: record.credits,
        })
        .collect();
    Ok(aggregate(&points, first.scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gp(grade_point: f64, credits: f64) -> GradePoint {
        GradePoint {
            grade_point,
            credits,
        }
    }

    #[test]
    fn percentage_clamps_out_of_range_scores() {
        assert_eq!(convert_percentage_to_grade(-5.0), convert_percentage_to_grade(0.0));
        assert_eq!(convert_percentage_to_grade(150.0), convert_percentage_to_grade(100.0));
        assert_eq!(convert_percentage_to_grade(150.0).numeric_grade, 100.0);
        assert_eq!(convert_percentage_to_grade(-5.0).numeric_grade, 0.0);
    }

    #[test]
    fn percentage_boundaries_are_inclusive() {
        let a = convert_percentage_to_grade(90.0);
        assert_eq!(a.letter_grade, LetterGrade::A);
        assert_eq!(a.grade_point, 1.00);

        let a_minus = convert_percentage_to_grade(89.999);
        assert_eq!(a_minus.letter_grade, LetterGrade::AMinus);
        assert_eq!(a_minus.grade_point, 1.25);

        assert_eq!(convert_percentage_to_grade(65.0).letter_grade, LetterGrade::D);
        assert_eq!(convert_percentage_to_grade(64.99).letter_grade, LetterGrade::F);
    }

    #[test]
    fn every_percentage_bound_maps_to_its_own_band() {
        for band in PERCENTAGE_BANDS.iter().filter(|b| b.bound.is_finite()) {
            let at = convert_percentage_to_grade(band.bound);
            assert_eq!(at.letter_grade, band.letter);
            assert_eq!(at.grade_point, band.grade_point);
            let below = convert_percentage_to_grade(band.bound - 0.001);
            assert_ne!(below.letter_grade, band.letter);
        }
    }

    #[test]
    fn every_integer_percentage_lands_in_exactly_one_band() {
        for score in 0..=100 {
            let value = score as f64;
            let matching: Vec<&Band> = PERCENTAGE_BANDS
                .iter()
                .enumerate()
                .filter(|(i, band)| {
                    value >= band.bound
                        && (*i == 0 || value < PERCENTAGE_BANDS[i - 1].bound)
                })
                .map(|(_, band)| band)
                .collect();
            assert_eq!(matching.len(), 1, "score {score}");
            assert_eq!(convert_percentage_to_grade(value).letter_grade, matching[0].letter);
        }
    }

    #[test]
    fn percentage_table_descends() {
        for pair in PERCENTAGE_BANDS.windows(2) {
            assert!(pair[0].bound > pair[1].bound);
            assert!(pair[0].grade_point < pair[1].grade_point);
        }
    }

    #[test]
    fn point_scale_boundaries() {
        assert_eq!(convert_point_scale_to_grade(1.75).letter_grade, LetterGrade::B);
        assert_eq!(convert_point_scale_to_grade(1.76).letter_grade, LetterGrade::BMinus);
        assert_eq!(convert_point_scale_to_grade(3.0).letter_grade, LetterGrade::D);
        assert_eq!(convert_point_scale_to_grade(3.01).letter_grade, LetterGrade::F);
    }

    #[test]
    fn point_scale_clamps_and_reports_representatives() {
        assert_eq!(convert_point_scale_to_grade(0.2), convert_point_scale_to_grade(1.0));
        assert_eq!(convert_point_scale_to_grade(9.0), convert_point_scale_to_grade(5.0));

        let best = convert_point_scale_to_grade(1.0);
        assert_eq!(best.numeric_grade, 99.0);
        assert_eq!(best.description, "Excellent");

        let failed = convert_point_scale_to_grade(4.2);
        assert_eq!(failed.letter_grade, LetterGrade::F);
        assert_eq!(failed.grade_point, 5.0);
        assert_eq!(failed.numeric_grade, 50.0);
        assert_eq!(failed.remarks, "Failed");
    }

    #[test]
    fn scales_keep_their_own_descriptions() {
        assert_eq!(convert_percentage_to_grade(82.0).description, "Good");
        assert_eq!(convert_point_scale_to_grade(1.75).description, "Satisfactory");
    }

    #[test]
    fn letter_lookup_agrees_with_both_tables() {
        for band in PERCENTAGE_BANDS.iter().chain(POINT_BANDS.iter()) {
            assert_eq!(
                letter_grade_from_point(band.grade_point),
                convert_point_scale_to_grade(band.grade_point).letter_grade
            );
            assert_eq!(letter_grade_from_point(band.grade_point), band.letter);
        }
    }

    #[test]
    fn passed_only_when_not_failing_letter() {
        for score in 0..=100 {
            let c = convert_percentage_to_grade(score as f64);
            assert_eq!(c.passed, c.letter_grade != LetterGrade::F);
            assert_eq!(c.passed, is_passing(c.grade_point, Scale::Percentage));
        }
        for step in 0..=400 {
            let c = convert_point_scale_to_grade(1.0 + step as f64 * 0.01);
            assert_eq!(c.passed, c.letter_grade != LetterGrade::F);
            assert_eq!(c.passed, is_passing(c.grade_point, Scale::Point));
        }
    }

    #[test]
    fn aggregate_weights_by_credits() {
        let stats = aggregate(&[gp(1.0, 3.0), gp(2.0, 1.0)], Scale::Point);
        assert_eq!(stats.weighted_gpa, 1.25);
        assert_eq!(stats.total_courses, 2);
        assert_eq!(stats.passed_courses, 2);
        assert_eq!(stats.total_credits, 4.0);
        assert_eq!(stats.earned_credits, 4.0);
        assert_eq!(stats.pass_percentage, 100.0);
    }

    #[test]
    fn aggregate_of_nothing_is_zeroed() {
        let stats = aggregate(&[], Scale::Percentage);
        assert_eq!(stats.weighted_gpa, 0.0);
        assert_eq!(stats.pass_percentage, 0.0);
        assert_eq!(stats.total_courses, 0);
    }

    #[test]
    fn zero_credits_do_not_divide() {
        assert_eq!(weighted_gpa(&[gp(2.0, 0.0)]), 0.0);
    }

    #[test]
    fn passing_is_relative_to_scale() {
        let records = [gp(1.5, 3.0), gp(4.0, 3.0)];
        let percentage = aggregate(&records, Scale::Percentage);
        assert_eq!(percentage.failed_courses, 1);
        assert_eq!(percentage.earned_credits, 3.0);
        assert_eq!(percentage.pass_percentage, 50.0);

        let point = aggregate(&records, Scale::Point);
        assert_eq!(point.failed_courses, 0);
    }

    #[test]
    fn weighted_gpa_rounds_to_two_places() {
        let gpa = weighted_gpa(&[gp(1.0, 2.0), gp(2.0, 1.0)]);
        assert_eq!(gpa, 1.33);
    }

    #[test]
    fn summarize_converts_then_aggregates() {
        let records = [
            ScoreRecord::new(95.0, 3.0, Scale::Percentage).unwrap(),
            ScoreRecord::new(60.0, 2.0, Scale::Percentage).unwrap(),
        ];
        let stats = summarize(&records).unwrap();
        assert_eq!(stats.weighted_gpa, 2.2);
        assert_eq!(stats.passed_courses, 1);
        assert_eq!(stats.earned_credits, 3.0);
    }

    #[test]
    fn summarize_rejects_mixed_scales() {
        let records = [
            ScoreRecord::new(95.0, 3.0, Scale::Percentage).unwrap(),
            ScoreRecord::new(1.5, 3.0, Scale::Point).unwrap(),
        ];
        assert_eq!(
            summarize(&records),
            Err(GradeError::MixedScales {
                first: Scale::Percentage,
                second: Scale::Point,
            })
        );
        assert_eq!(summarize(&[]).unwrap(), GradeStatistics::default());
    }

    #[test]
    fn record_conversion_follows_its_scale() {
        let percentage = ScoreRecord::new(88.0, 3.0, Scale::Percentage).unwrap();
        assert_eq!(convert(&percentage), convert_percentage_to_grade(88.0));
        assert_eq!(convert(&percentage).scale, Scale::Percentage);

        let point = ScoreRecord::new(2.1, 3.0, Scale::Point).unwrap();
        assert_eq!(convert(&point), convert_point_scale_to_grade(2.1));
        assert_eq!(convert(&point).letter_grade, LetterGrade::CPlus);
    }

    #[test]
    fn scale_parses_aliases() {
        assert_eq!("Percent".parse::<Scale>().unwrap(), Scale::Percentage);
        assert_eq!("ph".parse::<Scale>().unwrap(), Scale::Point);
        assert!("gpa".parse::<Scale>().is_err());
    }
}
