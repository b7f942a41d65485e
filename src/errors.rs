//! Pipeline error taxonomy.
//!
//! Three classes cover every failure the orchestration layer can surface:
//! invalid caller input, browser capture failures, and vision-service
//! failures. Handlers never retry; each error is mapped once to an HTTP
//! response carrying a single descriptive `error` string.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Missing or invalid caller input. No side effects were performed.
    #[error("{0}")]
    Validation(String),

    /// Navigation, timeout, or raster-capture failure. Browser resources
    /// are released before this is returned.
    #[error("capture failed: {0}")]
    Capture(String),

    /// Vision-service error or unparsable structured response. The
    /// underlying message is preserved.
    #[error("analysis failed: {0}")]
    Analysis(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    /// HTTP status class for the caller-facing response.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Capture(_) | Self::Analysis(_) => 500,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_client_error() {
        let err = PipelineError::validation("URL is required");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.to_string(), "URL is required");
    }

    #[test]
    fn capture_and_analysis_map_to_server_error() {
        assert_eq!(PipelineError::capture("net::ERR_NAME_NOT_RESOLVED").http_status(), 500);
        assert_eq!(PipelineError::analysis("response missing content").http_status(), 500);
    }

    #[test]
    fn cause_is_preserved_in_display() {
        let err = PipelineError::analysis("openai returned 429: rate limited");
        assert!(err.to_string().contains("rate limited"));
    }
}
