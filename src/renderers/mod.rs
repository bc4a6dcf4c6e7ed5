//! Renderers module
//!
//! This module contains export logic for turning score graphs and voice
//! decompositions into playable output formats.

pub mod midi;

// Re-export commonly used types
pub use midi::{render_decomposition, render_score, RenderSettings, RenderedVoices};
