//! Crate-level error type
//!
//! Parsing and MIDI writing keep their own error enums; this type wraps them
//! together with the validation failures surfaced to callers.

use thiserror::Error;

use crate::converters::musicxml::MusicXmlError;
use crate::renderers::midi::MxError;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("MusicXML parse error: {0}")]
    MusicXml(#[from] MusicXmlError),

    #[error("MIDI error: {0}")]
    Midi(#[from] MxError),

    /// Score with zero parts
    #[error("score contains no parts")]
    EmptyScore,

    /// Score whose parts hold no pitched note or chord
    #[error("score contains no pitched notes")]
    NoPitchedEvents,

    #[error("invalid voice assignment: {0}")]
    InvalidAssignment(String),
}

pub type Result<T> = std::result::Result<T, VoiceError>;
