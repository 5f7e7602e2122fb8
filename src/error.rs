use thiserror::Error;

use crate::grading::Scale;

/// Precondition failures raised before a score ever reaches the conversion tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradeError {
    #[error("score must be a finite number, got {0}")]
    NonFiniteScore(f64),

    #[error("credits must be a positive number, got {0}")]
    InvalidCredits(f64),

    #[error("unknown grading scale `{0}` (expected `percentage` or `point`)")]
    UnknownScale(String),

    #[error("unknown grade status `{0}`")]
    UnknownStatus(String),

    #[error("cannot aggregate {first} and {second} scores together without converting one of them")]
    MixedScales { first: Scale, second: Scale },
}
