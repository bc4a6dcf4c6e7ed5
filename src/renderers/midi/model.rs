/// Lean event representation for score → MIDI rendering
///
/// Not a music object model: it holds exactly what the SMF writer needs,
/// with every position already converted to absolute ticks.

#[derive(Debug, Clone, PartialEq)]
pub struct MidiScore {
    pub tpq: u16,                 // Ticks per quarter note
    pub tempos: Vec<Tempo>,       // sorted by tick
    pub timesigs: Vec<TimeSig>,   // sorted by tick
    pub parts: Vec<MidiPart>,     // One track per part
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tempo {
    pub tick: u64,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSig {
    pub tick: u64,
    pub num: u8,   // Numerator (e.g., 3 in 3/4)
    pub den: u8,   // Denominator (e.g., 4 in 3/4)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidiPart {
    pub id: String,
    pub name: String,
    pub channel: u8,          // MIDI channel 0-15 (9 = drums, never assigned)
    pub program: Option<u8>,  // MIDI program 0-127 (GM instrument)
    pub notes: Vec<MidiNote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiNote {
    pub start_tick: u64,
    pub dur_tick: u64,
    pub pitch: u8,      // MIDI note number 0-127
    pub vel: u8,        // Velocity 1-127
}

impl MidiNote {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.dur_tick
    }
}

/// Convert a quarter-note position to MIDI ticks, rounding to the nearest tick
///
/// Negative positions clamp to tick 0.
pub fn quarters_to_ticks(quarters: crate::models::Rational, tpq: u16) -> u64 {
    let numer = *quarters.numer() as i64 * tpq as i64;
    let denom = *quarters.denom() as i64;
    if numer <= 0 || denom <= 0 {
        return 0;
    }
    ((numer + denom / 2) / denom) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rational;

    #[test]
    fn test_quarters_to_ticks() {
        // Quarter note = tpq ticks
        assert_eq!(quarters_to_ticks(Rational::from_integer(1), 480), 480);
        assert_eq!(quarters_to_ticks(Rational::new(1, 2), 480), 240);
        assert_eq!(quarters_to_ticks(Rational::new(3, 2), 480), 720);
        assert_eq!(quarters_to_ticks(Rational::from_integer(4), 96), 384);
    }

    #[test]
    fn test_quarters_to_ticks_with_rounding() {
        // Triplet eighth: 480 / 3 = 160 exactly
        assert_eq!(quarters_to_ticks(Rational::new(1, 3), 480), 160);
        // 100 / 3 = 33.3 -> 33, 200 / 3 = 66.7 -> 67
        assert_eq!(quarters_to_ticks(Rational::new(1, 3), 100), 33);
        assert_eq!(quarters_to_ticks(Rational::new(2, 3), 100), 67);
        assert_eq!(quarters_to_ticks(Rational::from_integer(-1), 480), 0);
    }

    #[test]
    fn test_note_end_tick() {
        let note = MidiNote { start_tick: 480, dur_tick: 240, pitch: 60, vel: 64 };
        assert_eq!(note.end_tick(), 720);
    }
}
