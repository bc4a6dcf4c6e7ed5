//! Choir Voices WASM Module
//!
//! Classifies the staves of a choral score into soprano, alto, tenor and
//! bass, and decomposes the score into one MIDI file per voice category.

pub mod api;
pub mod converters;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod renderers;
pub mod voices;

// Re-export commonly used types
pub use error::{Result, VoiceError};
pub use models::{Clef, PitchRange, Score, StemPosition, VoiceCategory};
pub use pipeline::{analyze_musicxml, decompose_auto, generate_voice_midi};
pub use renderers::{RenderSettings, RenderedVoices};
pub use voices::{Assignment, Decomposition, ScoreAnalysis, VoiceAnalysis, VoiceConfig};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("logger already initialized: {}", e).into());
    }

    log::info!("Choir voices WASM module initialized");
}
