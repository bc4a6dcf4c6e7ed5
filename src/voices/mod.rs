//! Choral voice analysis
//!
//! # Architecture
//!
//! ```text
//! Score
//!   ↓ [topology::resolve]
//! LogicalVoice list (dense index, part, intra-part voice, stem position)
//!   ↓ [classify::VoiceClassifier]   name > stem > pitch overlap > clef
//! VoiceCategory per index  ←  or an external Assignment
//!   ↓ [extract::VoiceExtractor]
//! One merged Score per category + the untouched source score
//! ```

pub mod analysis;
pub mod classify;
pub mod config;
pub mod extract;
pub mod topology;

pub use analysis::{analyze, validate, Assignment, ScoreAnalysis, VoiceAnalysis};
pub use classify::{classify, Classification, Layer, VoiceClassifier, VoiceTraits};
pub use config::{CategoryRanges, RangeProfile, VoiceConfig, DEFAULT_OVERLAP_THRESHOLD};
pub use extract::{extract_voice, Decomposition, VoiceExtractor};
pub use topology::{resolve, LogicalVoice, StaffLayout};
