//! Headless-browser screenshot capture.
//!
//! Each capture call launches an isolated, non-persistent Chromium instance,
//! navigates with a bounded timeout, waits a short settle delay for
//! late-rendering UI, grabs a full-page PNG plus page metadata, and tears the
//! browser down on every path. Release-on-all-paths is the correctness
//! property this module guarantees: a failed navigation must never leak a
//! browser process.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, PipelineResult};

/// Collects `document.styleSheets` origins; inline sheets are reported with a
/// sentinel rather than dropped.
const STYLESHEET_JS: &str =
    r#"Array.from(document.styleSheets).map(s => s.href || "inline")"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Readiness signal used before the settle delay.
///
/// `DomReady` resolves on DOM content load so pages with long-polling
/// resources cannot hang the pipeline; `FullLoad` additionally waits for the
/// page's load lifecycle to go idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    DomReady,
    FullLoad,
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub wait_strategy: WaitStrategy,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_millis(1200),
            wait_strategy: WaitStrategy::DomReady,
        }
    }
}

/// Result of a successful capture: full-page raster plus the page metadata
/// extracted in the same browser session.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub html: String,
    pub stylesheets: Vec<String>,
}

/// Seam between the orchestration layer and the browser. Mocked in tests so
/// handlers can be exercised without Chromium.
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    async fn capture(&self, url: &str, options: &CaptureOptions) -> PipelineResult<PageCapture>;
}

/// Production engine backed by chromiumoxide.
#[derive(Debug, Default)]
pub struct ChromiumCaptureEngine;

impl ChromiumCaptureEngine {
    pub fn new() -> Self {
        Self
    }

    async fn navigate_and_capture(
        page: &Page,
        url: &str,
        options: &CaptureOptions,
    ) -> PipelineResult<PageCapture> {
        let navigation = async {
            page.goto(url)
                .await
                .map_err(|err| PipelineError::capture(format!("navigation to {url} failed: {err}")))?;
            if options.wait_strategy == WaitStrategy::FullLoad {
                page.wait_for_navigation()
                    .await
                    .map_err(|err| PipelineError::capture(format!("load wait failed: {err}")))?;
            }
            Ok::<(), PipelineError>(())
        };

        tokio::time::timeout(options.navigation_timeout, navigation)
            .await
            .map_err(|_| {
                PipelineError::capture(format!(
                    "navigation to {url} timed out after {}s",
                    options.navigation_timeout.as_secs()
                ))
            })??;

        // Settle delay for animations and lazy content.
        tokio::time::sleep(options.settle_delay).await;

        let png = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|err| PipelineError::capture(format!("screenshot failed: {err}")))?;

        let html = page
            .content()
            .await
            .map_err(|err| PipelineError::capture(format!("DOM serialization failed: {err}")))?;

        let stylesheets = page
            .evaluate(STYLESHEET_JS)
            .await
            .map_err(|err| PipelineError::capture(format!("stylesheet extraction failed: {err}")))?
            .into_value::<Vec<String>>()
            .map_err(|err| PipelineError::capture(format!("stylesheet list invalid: {err}")))?;

        debug!(
            bytes = png.len(),
            stylesheets = stylesheets.len(),
            "page capture complete"
        );

        Ok(PageCapture {
            png,
            width: options.viewport.width,
            height: options.viewport.height,
            html,
            stylesheets,
        })
    }
}

#[async_trait]
impl CaptureEngine for ChromiumCaptureEngine {
    async fn capture(&self, url: &str, options: &CaptureOptions) -> PipelineResult<PageCapture> {
        info!(%url, width = options.viewport.width, height = options.viewport.height, "launching capture browser");

        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(options.viewport.width, options.viewport.height)
            .build()
            .map_err(PipelineError::Capture)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| PipelineError::capture(format!("browser launch failed: {err}")))?;

        // CDP message pump; runs until the browser connection drops.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = match browser.new_page("about:blank").await {
            Ok(page) => Self::navigate_and_capture(&page, url, options).await,
            Err(err) => Err(PipelineError::capture(format!(
                "page creation failed: {err}"
            ))),
        };

        // Teardown runs on success and failure alike.
        if let Err(err) = browser.close().await {
            warn!(%err, "browser close reported an error");
        }
        if let Err(err) = browser.wait().await {
            warn!(%err, "browser process wait reported an error");
        }
        handler_task.abort();

        result
    }
}
