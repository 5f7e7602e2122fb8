use std::path::Path;

use anyhow::Context;

use crate::grading::Scale;
use crate::models::ScoreRecord;

#[derive(Debug, serde::Deserialize)]
struct TranscriptLine {
    course_code: String,
    units: f64,
    score: f64,
    scale: Option<String>,
}

/// A course line from an offline transcript file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub course_code: String,
    pub record: ScoreRecord,
}

/// Reads `course_code,units,score[,scale]` lines. Lines without a scale use
/// `default_scale`. Any invalid line fails the whole read.
pub fn read_transcript(path: &Path, default_scale: Scale) -> anyhow::Result<Vec<TranscriptEntry>> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    parse_transcript(reader, default_scale)
}

fn parse_transcript<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    default_scale: Scale,
) -> anyhow::Result<Vec<TranscriptEntry>> {
    let mut entries = Vec::new();

    for (index, result) in reader.deserialize::<TranscriptLine>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("transcript line {line} is malformed"))?;
        let scale = match row.scale.as_deref() {
            None | Some("") => default_scale,
            Some(value) => value
                .parse()
                .with_context(|| format!("transcript line {line}"))?,
        };
        let record = ScoreRecord::new(row.score, row.units, scale)
            .with_context(|| format!("transcript line {line} ({})", row.course_code))?;
        entries.push(TranscriptEntry {
            course_code: row.course_code,
            record,
        });
    }

    Ok(entries)
}
