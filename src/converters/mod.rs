//! Format converters
//!
//! This module contains converters from music notation interchange formats
//! into the score graph.

pub mod musicxml;

// Re-export for convenience
pub use musicxml::{parse_musicxml_to_score, MusicXmlError};
