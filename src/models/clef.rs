//! Clef categories and written-to-sounding pitch correction

use serde::{Deserialize, Serialize};
use std::fmt;

use super::voice::PitchRange;

/// Clef category of a staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clef {
    Treble,
    /// Treble clef sounding an octave below written (tenor "vocal" clef)
    TrebleOctaveDown,
    Bass,
    Alto,
    TenorC,
    Unknown,
}

impl Clef {
    /// Map a MusicXML `<clef>` (sign, line, clef-octave-change) to a category.
    ///
    /// The octave-down treble is checked before the plain treble so that a
    /// G clef with `clef-octave-change = -1` never reads as treble.
    pub fn from_musicxml(sign: &str, line: Option<u8>, octave_change: i8) -> Self {
        let sign = sign.trim().to_ascii_uppercase();
        match (sign.as_str(), line, octave_change) {
            ("G", _, -1) => Clef::TrebleOctaveDown,
            ("G", Some(2) | None, 0) => Clef::Treble,
            ("F", Some(4) | None, 0) => Clef::Bass,
            ("C", Some(3), 0) => Clef::Alto,
            ("C", Some(4), 0) => Clef::TenorC,
            _ => Clef::Unknown,
        }
    }

    /// Plain treble only; the octave-down treble is a male-voice clef
    pub fn is_treble_family(&self) -> bool {
        matches!(self, Clef::Treble)
    }

    /// Clefs used for tenor and bass lines
    pub fn is_bass_family(&self) -> bool {
        matches!(self, Clef::Bass | Clef::TrebleOctaveDown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::TrebleOctaveDown => "treble_octave_down",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::TenorC => "tenor_c",
            Clef::Unknown => "unknown",
        }
    }
}

impl Default for Clef {
    fn default() -> Self {
        Clef::Unknown
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit transposition notated on a part (MusicXML `<transpose>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transposition {
    /// Semitones from written to sounding pitch
    pub chromatic: i8,
    /// Additional whole octaves
    pub octave_change: i8,
}

impl Transposition {
    pub fn semitones(&self) -> i16 {
        self.chromatic as i16 + 12 * self.octave_change as i16
    }
}

/// Semitone shift from written to sounding pitch.
///
/// An explicit transposition wins outright; otherwise an octave-down treble
/// clef implies -12.
pub fn sounding_offset(clef: Clef, transpose: Option<Transposition>) -> i16 {
    match transpose {
        Some(t) => t.semitones(),
        None if clef == Clef::TrebleOctaveDown => -12,
        None => 0,
    }
}

/// Convert a written range to the sounding range used for classification
pub fn sounding_range(
    written: PitchRange,
    clef: Clef,
    transpose: Option<Transposition>,
) -> PitchRange {
    written.shifted(sounding_offset(clef, transpose))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octave_down_treble_detected_before_treble() {
        assert_eq!(Clef::from_musicxml("G", Some(2), -1), Clef::TrebleOctaveDown);
        assert_eq!(Clef::from_musicxml("G", Some(2), 0), Clef::Treble);
        assert!(!Clef::TrebleOctaveDown.is_treble_family());
        assert!(Clef::TrebleOctaveDown.is_bass_family());
    }

    #[test]
    fn test_clef_signs() {
        assert_eq!(Clef::from_musicxml("F", Some(4), 0), Clef::Bass);
        assert_eq!(Clef::from_musicxml("c", Some(3), 0), Clef::Alto);
        assert_eq!(Clef::from_musicxml("C", Some(4), 0), Clef::TenorC);
        assert_eq!(Clef::from_musicxml("percussion", None, 0), Clef::Unknown);
        assert_eq!(Clef::from_musicxml("G", Some(2), 1), Clef::Unknown);
    }

    #[test]
    fn test_sounding_range() {
        let written = PitchRange::new(72, 86);
        assert_eq!(
            sounding_range(written, Clef::TrebleOctaveDown, None),
            PitchRange::new(60, 74)
        );
        assert_eq!(sounding_range(written, Clef::Treble, None), written);

        // Explicit transposition takes precedence over the clef
        let explicit = Transposition { chromatic: 0, octave_change: -1 };
        assert_eq!(
            sounding_range(written, Clef::TrebleOctaveDown, Some(explicit)),
            PitchRange::new(60, 74)
        );
        let none = Transposition::default();
        assert_eq!(sounding_range(written, Clef::TrebleOctaveDown, Some(none)), written);
    }
}
