//! Score-to-MIDI rendering
//!
//! Renders the decomposed voice streams to Standard MIDI Files:
//!
//! ```text
//! Decomposition
//!   ↓ [score_to_midi: measures → absolute ticks, ties merged]
//! MidiScore
//!   ↓ [write_smf: conductor track + one track per part]
//! SMF bytes, one file per category plus "all"
//! ```
//!
//! # Usage
//! ```rust,ignore
//! use crate::renderers::midi::{render_decomposition, RenderSettings};
//!
//! let rendered = render_decomposition(&decomposition, &RenderSettings::default());
//! let soprano: &[u8] = &rendered.files["soprano"];
//! ```

pub mod converter;
pub mod defaults;
mod model;
mod write;

pub use converter::score_to_midi;
pub use defaults::{DEFAULT_TEMPO_BPM, DEFAULT_TPQ, DEFAULT_VELOCITY, DEFAULT_VOICE_PROGRAM};
pub use model::*;
pub use write::write_smf;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Score, VoiceCategory};
use crate::voices::Decomposition;

/// Name of the stream holding the untouched full score
pub const ALL_STREAM: &str = "all";

#[derive(Debug, Error)]
pub enum MxError {
    #[error("invalid midi settings: {0}")]
    Invalid(String),
    #[error("midi write error: {0}")]
    Midi(String),
}

pub type Result<T> = std::result::Result<T, MxError>;

/// MIDI rendering options; every field falls back to its default when
/// missing from a serialized document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Ticks per quarter note
    pub tpq: u16,
    /// Tempo used until the score's first tempo mark
    pub tempo_bpm: f64,
    pub velocity: u8,
    /// Program for streams without a per-category override
    pub program: u8,
    pub programs: BTreeMap<VoiceCategory, u8>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tpq: DEFAULT_TPQ,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            velocity: DEFAULT_VELOCITY,
            program: DEFAULT_VOICE_PROGRAM,
            programs: BTreeMap::new(),
        }
    }
}

impl RenderSettings {
    /// Program for a category stream, `None` meaning the combined stream
    pub fn program_for(&self, category: Option<VoiceCategory>) -> u8 {
        category
            .and_then(|c| self.programs.get(&c).copied())
            .unwrap_or(self.program)
    }
}

/// Render one score to SMF bytes
pub fn render_score(score: &Score, settings: &RenderSettings, program: u8) -> Result<Vec<u8>> {
    let midi = score_to_midi(score, settings, program);
    let mut out = Vec::new();
    write_smf(&midi, &mut out)?;
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStream {
    pub name: String,
    pub reason: String,
}

/// MIDI files by stream name (`soprano`, ..., `all`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedVoices {
    pub files: BTreeMap<String, Vec<u8>>,
    pub skipped: Vec<SkippedStream>,
}

/// Render every category stream plus the combined stream.
///
/// A stream that fails to render is logged and listed in `skipped`; the
/// others are still returned.
pub fn render_decomposition(decomposition: &Decomposition, settings: &RenderSettings) -> RenderedVoices {
    let mut rendered = RenderedVoices::default();

    let streams = decomposition
        .streams
        .iter()
        .map(|(category, score)| (category.as_str(), score, Some(*category)))
        .chain(std::iter::once((ALL_STREAM, decomposition.combined, None)));

    for (name, score, category) in streams {
        match render_score(score, settings, settings.program_for(category)) {
            Ok(bytes) => {
                log::debug!("rendered '{}' stream: {} bytes", name, bytes.len());
                rendered.files.insert(name.to_string(), bytes);
            }
            Err(e) => {
                log::warn!("skipping '{}' stream: {}", name, e);
                rendered.skipped.push(SkippedStream {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    rendered
}
