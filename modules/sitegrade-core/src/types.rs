use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::CollectError;

// --- Evaluation kinds ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationKind {
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "SECURITY")]
    Security,
    #[serde(rename = "UX")]
    UserExperience,
}

impl EvaluationKind {
    pub const ALL: [EvaluationKind; 3] = [
        EvaluationKind::Html,
        EvaluationKind::Security,
        EvaluationKind::UserExperience,
    ];

    /// What the model was asked to look at, for user-facing messages.
    pub fn subject(&self) -> &'static str {
        match self {
            EvaluationKind::Html => "HTML",
            EvaluationKind::Security => "security headers",
            EvaluationKind::UserExperience => "user experience",
        }
    }
}

impl fmt::Display for EvaluationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationKind::Html => write!(f, "HTML"),
            EvaluationKind::Security => write!(f, "SECURITY"),
            EvaluationKind::UserExperience => write!(f, "UX"),
        }
    }
}

// --- Screenshot handles ---

/// Opaque handle returned by a capture and required by a UX evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenshotId(Uuid);

impl ScreenshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn file_name(&self) -> String {
        format!("{}.jpeg", self.0)
    }
}

impl Default for ScreenshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScreenshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ScreenshotId {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| CollectError::InvalidScreenshotId(s.to_string()))
    }
}

// --- Requests ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub url: String,
    pub kind: EvaluationKind,
    /// Required for [`EvaluationKind::UserExperience`], ignored otherwise.
    pub screenshot: Option<ScreenshotId>,
}

impl EvaluationRequest {
    pub fn html(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: EvaluationKind::Html,
            screenshot: None,
        }
    }

    pub fn security(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: EvaluationKind::Security,
            screenshot: None,
        }
    }

    pub fn user_experience(url: impl Into<String>, screenshot: ScreenshotId) -> Self {
        Self {
            url: url.into(),
            kind: EvaluationKind::UserExperience,
            screenshot: Some(screenshot),
        }
    }
}

// --- Evidence ---

/// Response headers the security evaluation looks at, in reporting order.
pub const SECURITY_HEADER_NAMES: [&str; 10] = [
    "X-XSS-Protection",
    "X-Frame-Options",
    "Strict-Transport-Security",
    "Content-Security-Policy",
    "X-Content-Type-Options",
    "Referrer-Policy",
    "Permissions-Policy",
    "Cross-Origin-Resource-Policy",
    "Cross-Origin-Embedder-Policy",
    "Cross-Origin-Opener-Policy",
];

/// Allow-listed security headers of one response. Absent headers stay absent
/// and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeaders {
    /// Final URL after redirects.
    pub url: String,
    values: HashMap<&'static str, String>,
}

impl SecurityHeaders {
    /// Build from a case-insensitive header lookup.
    pub fn from_lookup(url: impl Into<String>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = SECURITY_HEADER_NAMES
            .iter()
            .filter_map(|name| lookup(name).map(|v| (*name, v)))
            .collect();
        Self {
            url: url.into(),
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        SECURITY_HEADER_NAMES
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .and_then(|n| self.values.get(n))
            .map(String::as_str)
    }

    /// All allow-listed headers in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        SECURITY_HEADER_NAMES
            .iter()
            .map(|name| (*name, self.values.get(name).map(String::as_str)))
    }

    pub fn present_count(&self) -> usize {
        self.values.len()
    }
}

struct OrderedHeaders<'a>(&'a SecurityHeaders);

impl Serialize for OrderedHeaders<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SECURITY_HEADER_NAMES.len()))?;
        for (name, value) in self.0.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

impl Serialize for SecurityHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SecurityHeaders", 2)?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("headers", &OrderedHeaders(self))?;
        state.end()
    }
}

/// What was gathered about a page before asking the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// Markup with scripts and styling removed.
    Markup(String),
    SecurityHeaders(SecurityHeaders),
    /// A previously captured full-page screenshot, base64-encoded.
    Screenshot {
        url: String,
        id: ScreenshotId,
        base64: String,
    },
}

impl Evidence {
    pub fn kind(&self) -> EvaluationKind {
        match self {
            Evidence::Markup(_) => EvaluationKind::Html,
            Evidence::SecurityHeaders(_) => EvaluationKind::Security,
            Evidence::Screenshot { .. } => EvaluationKind::UserExperience,
        }
    }

    pub fn image_base64(&self) -> Option<&str> {
        match self {
            Evidence::Screenshot { base64, .. } => Some(base64),
            _ => None,
        }
    }
}

// --- Results ---

/// Fields recovered from the model's reply. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedResult {
    pub score: Option<f64>,
    pub evaluation: Option<String>,
}

pub const EXTRACTION_FAILURE_MESSAGE: &str =
    "Unable to extract score or evaluation from the response.";

impl ExtractedResult {
    pub fn into_outcome(self) -> EvaluationOutcome {
        match (self.score, self.evaluation) {
            (Some(score), Some(evaluation)) => EvaluationOutcome::Success { score, evaluation },
            _ => EvaluationOutcome::ExtractionFailure {
                message: EXTRACTION_FAILURE_MESSAGE.to_string(),
            },
        }
    }
}

/// The only value an evaluation flow hands back.
///
/// Serializes as `{"score", "evaluation"}` on success and `{"error"}` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationOutcome {
    Success {
        score: f64,
        evaluation: String,
    },
    ExtractionFailure {
        #[serde(rename = "error")]
        message: String,
    },
    UpstreamFailure {
        #[serde(rename = "error")]
        message: String,
    },
}

impl EvaluationOutcome {
    pub fn upstream(message: impl Into<String>) -> Self {
        EvaluationOutcome::UpstreamFailure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationOutcome::Success { .. })
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            EvaluationOutcome::Success { score, .. } => Some(*score),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            EvaluationOutcome::Success { .. } => None,
            EvaluationOutcome::ExtractionFailure { message }
            | EvaluationOutcome::UpstreamFailure { message } => Some(message),
        }
    }
}
