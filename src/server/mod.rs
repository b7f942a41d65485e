//! HTTP orchestration layer: router assembly, shared handler state, and the
//! serve loop with its background eviction sweep.

mod router;
mod state;

pub use router::build_router;
pub use state::ServeState;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use crate::analysis::{OpenAiVisionClient, VisionClient};
use crate::artifacts::ArtifactStore;
use crate::capture::{CaptureEngine, ChromiumCaptureEngine};
use crate::config::{AppConfig, EvictionConfig};
use crate::sessions::SessionStore;

/// Wire up production collaborators and serve until shutdown.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let sessions = Arc::new(SessionStore::new());
    let artifacts = Arc::new(ArtifactStore::open(&config.artifact_dir)?);
    let capture: Arc<dyn CaptureEngine> = Arc::new(ChromiumCaptureEngine::new());
    let vision: Arc<dyn VisionClient> =
        Arc::new(OpenAiVisionClient::new((&config.vision).into())?);

    let state = ServeState::new(
        Arc::clone(&sessions),
        Arc::clone(&artifacts),
        capture,
        vision,
        config.capture.to_options(),
    );

    spawn_eviction_task(sessions, artifacts, config.eviction.clone());

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "pixelprobe listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server terminated")?;
    Ok(())
}

/// Periodic TTL sweep over the session map and the artifact directory. The
/// source system accumulated both without bound; this closes that gap.
fn spawn_eviction_task(
    sessions: Arc<SessionStore>,
    artifacts: Arc<ArtifactStore>,
    config: EvictionConfig,
) {
    let interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let session_ttl = Duration::from_secs(config.session_ttl_secs);
    let artifact_ttl = Duration::from_secs(config.artifact_ttl_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so a fresh process does not
        // sweep an empty store.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = sessions.evict_expired(session_ttl);
            let removed = artifacts.sweep(artifact_ttl).await;
            if evicted > 0 || removed > 0 {
                debug!(sessions = evicted, artifacts = removed, "eviction sweep");
            }
        }
    });
}
