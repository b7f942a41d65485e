//! PixelProbe: screenshot capture and UX analysis pipeline.
//!
//! A caller creates a session, requests a URL capture, and receives a
//! full-page screenshot together with a structured UX audit from an external
//! vision service; a second mode diffs a production screenshot against a
//! design screenshot. See the `server` module for the HTTP surface.

pub mod analysis;
pub mod artifacts;
pub mod capture;
pub mod config;
pub mod errors;
pub mod server;
pub mod sessions;

pub use config::AppConfig;
pub use errors::{PipelineError, PipelineResult};
