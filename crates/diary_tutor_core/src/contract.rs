//! Parses and validates the JSON the LLM must return for a correction.

use tracing::error;

use crate::domain::{CorrectionResult, Score};
use crate::ports::{PortError, PortResult};

const SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Parses `text` as a `CorrectionResult`. Malformed output is never repaired.
pub fn parse_correction(text: &str) -> PortResult<CorrectionResult> {
    let result: CorrectionResult = serde_json::from_str(text).map_err(|e| {
        error!("Failed to parse LLM response ({}): {}", e, text);
        PortError::InvalidResponse("Invalid JSON response from LLM".to_string())
    })?;

    validate_score(&result.score)?;
    Ok(result)
}

fn validate_score(score: &Score) -> PortResult<()> {
    for (name, value) in [("fluency", score.fluency), ("accuracy", score.accuracy)] {
        if !SCORE_RANGE.contains(&value) {
            return Err(PortError::InvalidResponse(format!(
                "score.{} out of range: {}",
                name, value
            )));
        }
    }
    Ok(())
}
