//! Voice-level vocabulary shared by the resolver, classifier and extractor
//!
//! - `VoiceCategory`: the SATB buckets plus `Other`
//! - `VoiceId` / `VoiceSet`: intra-part voice identifiers and per-event tag sets
//! - `StemPosition`: upper/lower role of a voice on a combined staff
//! - `PitchRange`: inclusive MIDI bounds

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use std::str::FromStr;

/// Choral voice category assigned to a logical voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCategory {
    Soprano,
    Alto,
    Tenor,
    Bass,
    Other,
}

impl VoiceCategory {
    /// The four named categories in iteration (and tie-break) order
    pub const NAMED: [VoiceCategory; 4] = [
        VoiceCategory::Soprano,
        VoiceCategory::Alto,
        VoiceCategory::Tenor,
        VoiceCategory::Bass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soprano => "soprano",
            Self::Alto => "alto",
            Self::Tenor => "tenor",
            Self::Bass => "bass",
            Self::Other => "other",
        }
    }

    pub fn is_named(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for VoiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soprano" => Ok(Self::Soprano),
            "alto" => Ok(Self::Alto),
            "tenor" => Ok(Self::Tenor),
            "bass" => Ok(Self::Bass),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown voice category '{}'", other)),
        }
    }
}

/// Intra-part voice identifier (MusicXML `<voice>` number)
pub type VoiceId = u8;

/// Set of intra-part voice identifiers an event belongs to.
///
/// Bit `n` is set when voice `n` (1..=31) owns the event. A unison note
/// notated with two stems carries two bits; an event from a flat measure
/// carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VoiceSet(u32);

impl VoiceSet {
    pub const MAX_VOICE: VoiceId = 31;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(voice: VoiceId) -> Self {
        let mut set = Self::empty();
        set.insert(voice);
        set
    }

    /// Add a voice; identifiers outside 1..=31 are ignored
    pub fn insert(&mut self, voice: VoiceId) {
        if (1..=Self::MAX_VOICE).contains(&voice) {
            self.0 |= 1 << voice;
        }
    }

    pub fn contains(&self, voice: VoiceId) -> bool {
        (1..=Self::MAX_VOICE).contains(&voice) && self.0 & (1 << voice) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(&self, other: VoiceSet) -> VoiceSet {
        VoiceSet(self.0 | other.0)
    }

    /// Voice identifiers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = VoiceId> + '_ {
        (1..=Self::MAX_VOICE).filter(move |v| self.contains(*v))
    }
}

impl FromIterator<VoiceId> for VoiceSet {
    fn from_iter<I: IntoIterator<Item = VoiceId>>(iter: I) -> Self {
        let mut set = VoiceSet::empty();
        for voice in iter {
            set.insert(voice);
        }
        set
    }
}

/// Notated stem role of a voice sharing a staff.
///
/// Upper voices carry stems up (soprano/tenor role), lower voices stems
/// down (alto/bass role).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum StemPosition {
    Upper = 1,
    Lower = 2,
}

/// Inclusive MIDI pitch bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchRange {
    pub min: u8,
    pub max: u8,
}

impl PitchRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Range spanned by a set of pitches, `None` when there are none
    pub fn from_pitches<I: IntoIterator<Item = u8>>(pitches: I) -> Option<Self> {
        pitches.into_iter().fold(None, |acc: Option<PitchRange>, p| {
            Some(match acc {
                Some(r) => PitchRange::new(r.min.min(p), r.max.max(p)),
                None => PitchRange::new(p, p),
            })
        })
    }

    /// Valid MIDI range with ordered bounds
    pub fn is_valid(&self) -> bool {
        self.min <= self.max && self.max <= 127
    }

    /// Width in semitones between the bounds
    pub fn width(&self) -> u8 {
        self.max.saturating_sub(self.min)
    }

    /// Shift both bounds, clamping to the MIDI range
    pub fn shifted(&self, semitones: i16) -> Self {
        let shift = |p: u8| (p as i16 + semitones).clamp(0, 127) as u8;
        Self::new(shift(self.min), shift(self.max))
    }

    /// Width of the intersection with another range, `None` if disjoint
    pub fn overlap(&self, other: &PitchRange) -> Option<u8> {
        let low = self.min.max(other.min);
        let high = self.max.min(other.max);
        (high >= low).then(|| high - low)
    }
}

impl fmt::Display for PitchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in VoiceCategory::NAMED {
            assert_eq!(category.as_str().parse::<VoiceCategory>(), Ok(category));
        }
        assert_eq!(" Other ".parse::<VoiceCategory>(), Ok(VoiceCategory::Other));
        assert!("mezzo".parse::<VoiceCategory>().is_err());
    }

    #[test]
    fn test_voice_set_membership() {
        let mut set = VoiceSet::single(2);
        set.insert(1);
        set.insert(0); // ignored
        set.insert(40); // ignored

        assert_eq!(set.len(), 2);
        assert!(set.contains(1) && set.contains(2));
        assert!(!set.contains(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_pitch_range_overlap() {
        let soprano = PitchRange::new(60, 81);
        assert_eq!(PitchRange::new(75, 81).overlap(&soprano), Some(6));
        assert_eq!(PitchRange::new(30, 32).overlap(&soprano), None);
        assert_eq!(PitchRange::new(50, 60).overlap(&soprano), Some(0));
    }

    #[test]
    fn test_pitch_range_from_pitches() {
        assert_eq!(PitchRange::from_pitches(vec![64, 60, 72]), Some(PitchRange::new(60, 72)));
        assert_eq!(PitchRange::from_pitches(Vec::<u8>::new()), None);
        assert_eq!(PitchRange::new(72, 86).shifted(-12), PitchRange::new(60, 74));
    }

    #[test]
    fn test_stem_position_serializes_as_number() {
        assert_eq!(serde_json::to_string(&StemPosition::Upper).unwrap(), "1");
        assert_eq!(serde_json::to_string(&StemPosition::Lower).unwrap(), "2");
    }
}
