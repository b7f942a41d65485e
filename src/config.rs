use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureOptions, Viewport, WaitStrategy};

/// Top-level service configuration.
///
/// Defaults mirror the production setup; individual fields are overridden by
/// CLI flags and environment variables at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub artifact_dir: PathBuf,
    pub capture: CaptureConfig,
    pub vision: VisionConfig,
    pub eviction: EvictionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub wait_strategy: WaitStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    pub api_base: String,
    pub model: String,
    /// Resolved lazily; absence surfaces as a failure on first use, not at
    /// startup.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    pub session_ttl_secs: u64,
    pub artifact_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            artifact_dir: PathBuf::from("./tmp"),
            capture: CaptureConfig::default(),
            vision: VisionConfig::default(),
            eviction: EvictionConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 800,
            navigation_timeout_secs: 30,
            settle_delay_ms: 1200,
            wait_strategy: WaitStrategy::DomReady,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
            artifact_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

impl AppConfig {
    /// Apply environment overrides on top of defaults. `PIXELPROBE_PORT`
    /// takes precedence over the conventional `PORT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = Self::port_from_env() {
            config.port = port;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.vision.api_key = Some(key);
            }
        }
        if let Ok(base) = std::env::var("PIXELPROBE_API_BASE") {
            if !base.is_empty() {
                config.vision.api_base = base;
            }
        }
        if let Ok(model) = std::env::var("PIXELPROBE_MODEL") {
            if !model.is_empty() {
                config.vision.model = model;
            }
        }
        config
    }

    fn port_from_env() -> Option<u16> {
        ["PIXELPROBE_PORT", "PORT"]
            .iter()
            .find_map(|name| std::env::var(name).ok().and_then(|value| value.parse().ok()))
    }
}

impl CaptureConfig {
    pub fn to_options(&self) -> CaptureOptions {
        CaptureOptions {
            viewport: Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
            },
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            wait_strategy: self.wait_strategy,
        }
    }
}
