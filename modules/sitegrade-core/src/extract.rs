//! Recovers score and evaluation from the model's free-text reply.
//!
//! The reply only loosely follows the template requested in
//! [`crate::prompt`], so this is tolerant pattern matching: a reasoning
//! preamble may precede the answer, the bold markers (around the label or
//! around label and colon) and list bullets are optional, and the
//! suggestions section may be missing.

use std::sync::LazyLock;

use ai_client::ChatResponse;
use regex::Regex;

use crate::types::{EvaluationKind, EvaluationOutcome, ExtractedResult};

/// Closing delimiter emitted by reasoning models after their chain of thought.
pub const THINK_END: &str = "</think>";

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*{0,2}Score\*{0,2}:\*{0,2}\s*([\d.]+)/5").expect("valid score regex")
});

static EVALUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\*{0,2}Evaluation\*{0,2}:\*{0,2}\s*(.*?)(?:\s*(?:[-*]\s+)?\*{0,2}Suggestions\*{0,2}:|\z)",
    )
    .expect("valid evaluation regex")
});

/// Drop everything up to and including the last end-of-thinking marker.
pub fn strip_reasoning(text: &str) -> &str {
    match text.rsplit_once(THINK_END) {
        Some((_, answer)) => answer.trim(),
        None => text,
    }
}

/// Pattern-match the two fields. Each is independently optional; a score
/// that overflows to a non-finite value counts as absent.
pub fn extract_information(text: &str) -> ExtractedResult {
    let score = SCORE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|score| score.is_finite());

    let evaluation = EVALUATION_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    ExtractedResult { score, evaluation }
}

/// Turn a raw gateway reply into an outcome.
///
/// A reply without choices (or without text in the first one) is an upstream
/// failure and no extraction is attempted.
pub fn extract_reply(kind: EvaluationKind, reply: &ChatResponse) -> EvaluationOutcome {
    let Some(text) = reply.first_content() else {
        return EvaluationOutcome::upstream(format!("Unable to analyze the {}.", kind.subject()));
    };

    extract_information(strip_reasoning(text)).into_outcome()
}
