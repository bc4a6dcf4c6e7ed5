//! Models module for choral voice analysis
//!
//! This module contains the parsed score graph and the voice-level
//! vocabulary shared by the topology resolver, classifier and extractor.

pub mod clef;
pub mod score;
pub mod voice;

// Re-export commonly used types
pub use clef::{Clef, Transposition};
pub use score::*;
pub use voice::*;
