//! Structured UX analysis over an external vision service.
//!
//! Two stateless operations: a single-image UX audit and a two-image
//! production-vs-design comparison. All orchestration state lives in the
//! session registry; this module only shapes requests and normalizes the
//! service's textual payload into the fixed schemas below, so it can be
//! mocked trivially behind [`VisionClient`].

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineResult;

pub use openai::{OpenAiVisionClient, VisionServiceConfig};

/// Strengths/issues pair reported for one audit category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryFindings {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Single-image audit result. Replaced wholesale on each audit, never merged
/// field-by-field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UxAudit {
    #[serde(rename = "UX_score", default)]
    pub ux_score: f64,
    #[serde(default)]
    pub hierarchy: CategoryFindings,
    #[serde(default)]
    pub readability: CategoryFindings,
    #[serde(default)]
    pub spacing: CategoryFindings,
    #[serde(default)]
    pub color: CategoryFindings,
}

/// Two-image diff result: overall narrative plus eight named change-category
/// lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignComparison {
    #[serde(default)]
    pub overall_change: String,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub regressions: Vec<String>,
    #[serde(default)]
    pub spacing_changes: Vec<String>,
    #[serde(default)]
    pub color_changes: Vec<String>,
    #[serde(default)]
    pub typography_changes: Vec<String>,
    #[serde(default)]
    pub layout_changes: Vec<String>,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Seam between the orchestration layer and the external vision service.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Audit a single screenshot (raw PNG bytes).
    async fn audit(&self, png: &[u8]) -> PipelineResult<UxAudit>;

    /// Compare a production screenshot against a design screenshot, both as
    /// base64-encoded payloads.
    async fn compare(&self, prod_b64: &str, design_b64: &str) -> PipelineResult<DesignComparison>;
}

/// Pull the first JSON object out of a model reply that may be wrapped in
/// prose or a code fence.
pub(crate) fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    raw.split('{').nth(1).and_then(|rest| {
        let mut depth = 1i32;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut candidate = String::from("{");
                        candidate.push_str(&rest[..=idx]);
                        return Some(trim_symmetric(&candidate));
                    }
                }
                _ => {}
            }
        }
        None
    })
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}
