//! MusicXML format converters
//!
//! This module contains the converter from MusicXML into the score graph.

pub mod musicxml_to_score;

// Re-export for convenience
pub use musicxml_to_score::{
    parse_musicxml_bytes,
    parse_musicxml_to_score,
    MusicXmlError,
    MusicXmlResult,
};
