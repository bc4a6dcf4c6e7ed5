//! Parsed score graph
//!
//! The graph is created once per request by the MusicXML adapter and read by
//! the topology resolver, the classifier and the extractor. Nothing mutates a
//! parsed `Score` in place: extraction builds new `Part`/`Measure` values.
//!
//! All durations and offsets are exact fractions of a quarter note.

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

use super::clef::{Clef, Transposition};
use super::voice::{PitchRange, VoiceId, VoiceSet};

/// Duration or offset in quarter notes
pub type Rational = Rational32;

/// Length used for a measure whose duration is unknown (4 beats)
pub fn default_measure_duration() -> Rational {
    Rational::from_integer(4)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub title: Option<String>,
    /// Tempo marks, offsets measured from the start of the score
    pub tempos: Vec<Tempo>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub offset: Rational,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub name: Option<String>,
    /// First clef declared by the part
    pub clef: Option<Clef>,
    /// Explicit written-to-sounding transposition, if notated
    pub transpose: Option<Transposition>,
    pub measures: Vec<Measure>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measure {
    pub number: String,
    pub attributes: MeasureAttributes,
    /// Full length of the measure, `None` when it could not be determined
    pub duration: Option<Rational>,
    /// Events ordered by onset; each carries the voices it belongs to
    pub events: Vec<Event>,
}

/// Structural attributes copied unconditionally during extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasureAttributes {
    pub clef: Option<Clef>,
    pub key_fifths: Option<i8>,
    pub time: Option<TimeSignature>,
    pub barline: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl TimeSignature {
    /// Nominal measure length in quarter notes
    pub fn measure_duration(&self) -> Rational {
        Rational::new(self.beats as i32 * 4, self.beat_type.max(1) as i32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Onset relative to the start of the measure
    pub offset: Rational,
    pub duration: Rational,
    pub kind: EventKind,
    pub voices: VoiceSet,
    pub tie: Option<Tie>,
    pub lyric: Option<String>,
    pub articulations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Note(u8),
    Chord(Vec<u8>),
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tie {
    Start,
    Continue,
    Stop,
}

impl Event {
    pub fn rest(offset: Rational, duration: Rational, voices: VoiceSet) -> Self {
        Self {
            offset,
            duration,
            kind: EventKind::Rest,
            voices,
            tie: None,
            lyric: None,
            articulations: Vec::new(),
        }
    }

    pub fn note(offset: Rational, duration: Rational, pitch: u8, voices: VoiceSet) -> Self {
        Self {
            kind: EventKind::Note(pitch),
            ..Self::rest(offset, duration, voices)
        }
    }

    pub fn pitches(&self) -> &[u8] {
        match &self.kind {
            EventKind::Note(pitch) => std::slice::from_ref(pitch),
            EventKind::Chord(pitches) => pitches,
            EventKind::Rest => &[],
        }
    }

    pub fn is_pitched(&self) -> bool {
        !self.pitches().is_empty()
    }

    pub fn end(&self) -> Rational {
        self.offset + self.duration
    }

    /// Add a pitch, turning a note into a chord
    pub fn push_pitch(&mut self, pitch: u8) {
        self.kind = match std::mem::replace(&mut self.kind, EventKind::Rest) {
            EventKind::Note(first) => EventKind::Chord(vec![first, pitch]),
            EventKind::Chord(mut pitches) => {
                pitches.push(pitch);
                EventKind::Chord(pitches)
            }
            EventKind::Rest => EventKind::Note(pitch),
        };
    }
}

impl Measure {
    /// Distinct voice identifiers tagged on this measure's events
    pub fn voice_ids(&self) -> VoiceSet {
        self.events
            .iter()
            .fold(VoiceSet::empty(), |acc, e| acc.union(e.voices))
    }

    /// Events belonging to one intra-part voice
    pub fn events_for(&self, voice: VoiceId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.voices.contains(voice))
    }

    /// Declared duration, falling back to the 4-beat default
    pub fn duration_or_default(&self) -> Rational {
        self.duration.unwrap_or_else(default_measure_duration)
    }
}

impl Part {
    /// Display name, `"Part N"` (1-based) when the part is unnamed
    pub fn display_name(&self, part_index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Part {}", part_index + 1),
        }
    }

    /// First clef declared by the part or any of its measures
    pub fn primary_clef(&self) -> Clef {
        self.clef
            .or_else(|| self.measures.iter().find_map(|m| m.attributes.clef))
            .unwrap_or(Clef::Unknown)
    }

    /// Distinct voice identifiers across every measure
    pub fn voice_ids(&self) -> VoiceSet {
        self.measures
            .iter()
            .fold(VoiceSet::empty(), |acc, m| acc.union(m.voice_ids()))
    }

    pub fn total_duration(&self) -> Rational {
        self.measures.iter().map(Measure::duration_or_default).sum()
    }

    /// Written pitches, optionally restricted to one intra-part voice
    pub fn written_pitches(&self, voice: Option<VoiceId>) -> Vec<u8> {
        self.measures
            .iter()
            .flat_map(|m| m.events.iter())
            .filter(|e| voice.map_or(true, |v| e.voices.contains(v)))
            .flat_map(|e| e.pitches().iter().copied())
            .collect()
    }

    pub fn written_range(&self, voice: Option<VoiceId>) -> Option<PitchRange> {
        PitchRange::from_pitches(self.written_pitches(voice))
    }
}

impl Score {
    pub fn pitched_event_count(&self) -> usize {
        self.parts
            .iter()
            .flat_map(|p| p.measures.iter())
            .flat_map(|m| m.events.iter())
            .filter(|e| e.is_pitched())
            .count()
    }
}
