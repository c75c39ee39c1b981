//! Prompt construction for each evaluation kind.
//!
//! Every prompt is rubric, then the required reply template, then the length
//! bound, then the evidence. The reply template is what [`crate::extract`]
//! parses, so the two must change together.

use crate::types::{EvaluationKind, Evidence};

/// Upper bound on the reply length requested from the model, in words.
pub const WORD_LIMIT: usize = 200;

const HTML_RUBRIC: &str = "\
Analyze the following HTML code and evaluate its quality on a scale of 1 to 5, where 1 is poor and 5 is excellent. Provide a list of selected issues and suggestions for improvement. Focus on:
1. Missing or invalid attributes (e.g., `alt`, `aria-label`, buttons without `type` or `onclick`).
2. Semantic HTML issues (e.g., misuse of `<div>` instead of `<button>`).
3. Coherence and structure of the code (e.g., logical structure, readability).
4. HTML bugs.

After analyzing the HTML, provide **only the following**:
1. A score out of 5 for the overall quality of the HTML.
2. A list of the most critical issues, if any.";

const SECURITY_RUBRIC: &str = "\
Analyze the following security metrics and evaluate the security of the page on a scale of 1 to 5, where 1 is poor and 5 is excellent. Focus on the following key security aspects:
1. **HTTPS Usage**: Is the page served over HTTPS? Score higher if HTTPS is properly implemented.
2. **Security Headers**: Are critical security headers present and correctly configured?
3. **Vulnerability to Common Attacks**: Is the page protected against common vulnerabilities like cross-site scripting, clickjacking, MIME sniffing and cross-origin data leaks?

Provide:
1. A score out of 5 for the overall security quality of the page.
2. A list of the most critical issues, if any.";

const UX_RUBRIC: &str = "\
Analyze the user experience (UX) of this webpage and provide a score out of 5 (1 = poor, 5 = excellent). Evaluate the following aspects:

1. **Visual Design**:
    - Color scheme: Is it appealing and consistent?
    - Typography: Are fonts readable and appropriately sized?
    - Spacing: Is there adequate whitespace and padding?

2. **Layout and Organization**:
    - Clarity: Is the content easy to understand?
    - Hierarchy: Is there a clear visual hierarchy (e.g., headings, subheadings)?
    - Alignment: Are elements properly aligned?

3. **Accessibility**:
    - Contrast: Is there sufficient contrast between text and background?
    - Readability: Is text easy to read?

4. **Style**:
    - Efficiency: Is the design balanced (not too simple or overly complex)?

Provide:
1. A score out of 5 for overall UX quality.
2. A detailed evaluation of strengths and weaknesses.
3. Suggestions for improvement.";

const RESPONSE_FORMAT: &str = "\
Format your response as:
- **Score**: [Score]/5
- **Evaluation**: [Detailed evaluation]
- **Suggestions**: [Suggestions for improvement]";

pub fn rubric(kind: EvaluationKind) -> &'static str {
    match kind {
        EvaluationKind::Html => HTML_RUBRIC,
        EvaluationKind::Security => SECURITY_RUBRIC,
        EvaluationKind::UserExperience => UX_RUBRIC,
    }
}

/// Build the full instruction for `evidence`. Never fails; empty evidence is
/// embedded as-is.
pub fn compose(evidence: &Evidence) -> String {
    let kind = evidence.kind();
    let (label, body) = match evidence {
        Evidence::Markup(markup) => ("HTML Code", markup.clone()),
        Evidence::SecurityHeaders(headers) => (
            "Security metrics",
            serde_json::to_string_pretty(headers).unwrap_or_else(|_| format!("{headers:?}")),
        ),
        Evidence::Screenshot { url, .. } => (
            "Screenshot",
            format!("The attached image is a full-page capture of {url}."),
        ),
    };

    format!(
        "{rubric}\n\n{RESPONSE_FORMAT}\n\n\
         Keep your response concise, in a maximum of {WORD_LIMIT} words, but ensure all aspects are covered.\n\n\
         {label}:\n{body}\n",
        rubric = rubric(kind),
    )
}
