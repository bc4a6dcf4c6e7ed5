//! Choir voices WASM API
//!
//! This module provides the JavaScript-facing API.
//!
//! # Module Structure
//!
//! - `helpers`: Shared utilities for serialization, error handling, timing and logging
//! - `voices`: Voice analysis, per-voice MIDI generation and default configs

pub mod helpers;
pub mod voices;

// Re-export all public functions to keep a flat API
pub use voices::{analyze_musicxml, default_voice_config, generate_voice_midi};
