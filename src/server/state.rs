use std::sync::Arc;

use crate::analysis::VisionClient;
use crate::artifacts::ArtifactStore;
use crate::capture::{CaptureEngine, CaptureOptions};
use crate::sessions::SessionStore;

/// Shared handler state. Collaborators sit behind trait objects so tests can
/// inject mocks for the capture engine and the vision service.
#[derive(Clone)]
pub struct ServeState {
    pub sessions: Arc<SessionStore>,
    pub artifacts: Arc<ArtifactStore>,
    pub capture: Arc<dyn CaptureEngine>,
    pub vision: Arc<dyn VisionClient>,
    pub capture_options: CaptureOptions,
}

impl ServeState {
    pub fn new(
        sessions: Arc<SessionStore>,
        artifacts: Arc<ArtifactStore>,
        capture: Arc<dyn CaptureEngine>,
        vision: Arc<dyn VisionClient>,
        capture_options: CaptureOptions,
    ) -> Self {
        Self {
            sessions,
            artifacts,
            capture,
            vision,
            capture_options,
        }
    }
}
