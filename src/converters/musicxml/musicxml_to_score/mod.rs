//! MusicXML to score graph converter
//!
//! ```text
//! MusicXML string
//!   ↓ [Parse with roxmltree]
//! XML DOM
//!   ↓ [Extract parts, measures, voices, clefs]
//! Score (Part → Measure → Event)
//! ```
//!
//! Divisions are normalised away: every offset and duration in the
//! resulting graph is an exact fraction of a quarter note.

pub mod parser;

pub use parser::{parse_musicxml_bytes, parse_musicxml_to_score, pitch_to_midi};

use thiserror::Error;

/// Errors that can occur during MusicXML parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MusicXmlError {
    /// XML is malformed (not well-formed)
    #[error("XML parse error: {0}")]
    Xml(String),

    /// Compressed `.mxl` container instead of a plain document
    #[error("compressed MusicXML (.mxl) is not supported, upload the uncompressed .musicxml")]
    CompressedContainer,

    /// MusicXML format not supported (e.g. timewise instead of partwise)
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Required structural element is missing
    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("invalid value '{value}' for element '{element}': {reason}")]
    InvalidValue {
        element: String,
        value: String,
        reason: String,
    },
}

pub type MusicXmlResult<T> = Result<T, MusicXmlError>;
