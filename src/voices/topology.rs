//! Staff topology resolver
//!
//! Decides for every part whether it is open (one logical voice per staff)
//! or combined (several notated voices sharing a staff), and lays the
//! resulting logical voices out in a dense, deterministic linear order.

use serde::{Deserialize, Serialize};

use crate::models::clef::sounding_range;
use crate::models::{Clef, Part, PitchRange, Score, StemPosition, VoiceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffLayout {
    Open,
    Combined,
}

/// One independent musical line of the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalVoice {
    /// Dense external index (0, 1, 2, ...)
    pub index: usize,
    pub part_index: usize,
    /// Intra-part voice, `None` for an open part
    pub voice: Option<VoiceId>,
    pub stem: Option<StemPosition>,
}

/// Enumerate logical voices part by part.
///
/// A part with zero or one distinct voice identifier is open; with two or
/// more it is combined and yields one logical voice per identifier in
/// ascending order. The lowest identifier takes the upper stem, the highest
/// the lower stem; any in between carry no stem position.
pub fn resolve(score: &Score) -> Vec<LogicalVoice> {
    let mut voices = Vec::new();

    for (part_index, part) in score.parts.iter().enumerate() {
        let ids: Vec<VoiceId> = part.voice_ids().iter().collect();

        if ids.len() <= 1 {
            voices.push(LogicalVoice {
                index: voices.len(),
                part_index,
                voice: None,
                stem: None,
            });
            continue;
        }

        let last = ids.len() - 1;
        for (position, &id) in ids.iter().enumerate() {
            let stem = match position {
                0 => Some(StemPosition::Upper),
                p if p == last => Some(StemPosition::Lower),
                _ => None,
            };
            voices.push(LogicalVoice {
                index: voices.len(),
                part_index,
                voice: Some(id),
                stem,
            });
        }
    }

    log::debug!("resolved {} logical voices from {} parts", voices.len(), score.parts.len());
    voices
}

impl LogicalVoice {
    pub fn layout(&self) -> StaffLayout {
        match self.voice {
            Some(_) => StaffLayout::Combined,
            None => StaffLayout::Open,
        }
    }

    pub fn part<'s>(&self, score: &'s Score) -> Option<&'s Part> {
        score.parts.get(self.part_index)
    }

    pub fn clef(&self, score: &Score) -> Clef {
        self.part(score).map(Part::primary_clef).unwrap_or(Clef::Unknown)
    }

    pub fn written_range(&self, score: &Score) -> Option<PitchRange> {
        self.part(score)?.written_range(self.voice)
    }

    /// Range actually heard, after clef or notated transposition
    pub fn sounding_range(&self, score: &Score) -> Option<PitchRange> {
        let part = self.part(score)?;
        let written = part.written_range(self.voice)?;
        Some(sounding_range(written, part.primary_clef(), part.transpose))
    }

    /// Pitched events (a chord counts once) owned by this voice
    pub fn note_count(&self, score: &Score) -> usize {
        let Some(part) = self.part(score) else { return 0 };
        part.measures
            .iter()
            .flat_map(|m| m.events.iter())
            .filter(|e| e.is_pitched())
            .filter(|e| self.voice.map_or(true, |v| e.voices.contains(v)))
            .count()
    }

    /// Display name; a combined part named "Soprano/Alto" (or "S A") gives
    /// each voice its own segment when the segment count matches the voice count
    pub fn display_name(&self, score: &Score) -> String {
        let Some(part) = self.part(score) else {
            return format!("Part {}", self.part_index + 1);
        };
        let full = part.display_name(self.part_index);
        let Some(id) = self.voice else { return full };

        let ids: Vec<VoiceId> = part.voice_ids().iter().collect();
        let Some(position) = ids.iter().position(|&v| v == id) else { return full };

        let mut segments = split_combined_name(&full);
        if segments.len() != ids.len() {
            segments = full.split_whitespace().map(str::to_string).collect();
        }
        if segments.len() == ids.len() {
            segments.swap_remove(position)
        } else {
            full
        }
    }
}

fn split_combined_name(name: &str) -> Vec<String> {
    name.split(|c| matches!(c, '/' | '&' | '+' | ','))
        .flat_map(|segment| segment.split(" and "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Measure, Rational, VoiceSet};

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn measure(events: Vec<Event>) -> Measure {
        Measure {
            number: "1".to_string(),
            duration: Some(q(4)),
            events,
            ..Default::default()
        }
    }

    fn part(name: &str, measures: Vec<Measure>) -> Part {
        Part {
            id: name.to_string(),
            name: Some(name.to_string()),
            clef: Some(Clef::Treble),
            measures,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_and_combined_parts() {
        let score = Score {
            parts: vec![
                part("Soprano", vec![measure(vec![Event::note(q(0), q(4), 72, VoiceSet::single(1))])]),
                part(
                    "Tenor/Bass",
                    vec![measure(vec![
                        Event::note(q(0), q(4), 55, VoiceSet::single(1)),
                        Event::note(q(0), q(4), 43, VoiceSet::single(2)),
                    ])],
                ),
            ],
            ..Default::default()
        };

        let voices = resolve(&score);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0], LogicalVoice { index: 0, part_index: 0, voice: None, stem: None });
        assert_eq!(voices[1].voice, Some(1));
        assert_eq!(voices[1].stem, Some(StemPosition::Upper));
        assert_eq!(voices[2].voice, Some(2));
        assert_eq!(voices[2].stem, Some(StemPosition::Lower));
        assert_eq!(voices[2].layout(), StaffLayout::Combined);

        assert_eq!(voices[1].display_name(&score), "Tenor");
        assert_eq!(voices[2].display_name(&score), "Bass");
        assert_eq!(resolve(&score), voices);
    }

    #[test]
    fn test_voice_ids_collected_across_measures() {
        // Voice 2 only appears in the second measure; the part is still combined
        let score = Score {
            parts: vec![part(
                "Women",
                vec![
                    measure(vec![Event::note(q(0), q(4), 72, VoiceSet::single(1))]),
                    measure(vec![
                        Event::note(q(0), q(4), 72, VoiceSet::single(1)),
                        Event::note(q(0), q(4), 64, VoiceSet::single(2)),
                    ]),
                ],
            )],
            ..Default::default()
        };

        let voices = resolve(&score);
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].display_name(&score), "Women");
        assert_eq!(voices[1].note_count(&score), 1);
    }

    #[test]
    fn test_whitespace_separated_names_split_per_voice() {
        let two_voices = || {
            vec![measure(vec![
                Event::note(q(0), q(4), 72, VoiceSet::single(1)),
                Event::note(q(0), q(4), 64, VoiceSet::single(2)),
            ])]
        };
        let score = Score {
            parts: vec![
                part("S A", two_voices()),
                part("Soprano Alto", two_voices()),
                part("Men's Chorus", vec![measure(vec![
                    Event::note(q(0), q(4), 55, VoiceSet::single(1)),
                    Event::note(q(0), q(4), 48, VoiceSet::single(2)),
                    Event::note(q(0), q(4), 43, VoiceSet::single(3)),
                ])]),
            ],
            ..Default::default()
        };

        let names: Vec<_> = resolve(&score).iter().map(|v| v.display_name(&score)).collect();
        assert_eq!(
            names,
            vec!["S", "A", "Soprano", "Alto", "Men's Chorus", "Men's Chorus", "Men's Chorus"]
        );
    }

    #[test]
    fn test_middle_voices_have_no_stem() {
        let events = (1..=3)
            .map(|v| Event::note(q(0), q(4), 60 + v, VoiceSet::single(v)))
            .collect();
        let score = Score {
            parts: vec![part("Choir", vec![measure(events)])],
            ..Default::default()
        };

        let stems: Vec<_> = resolve(&score).iter().map(|v| v.stem).collect();
        assert_eq!(stems, vec![Some(StemPosition::Upper), None, Some(StemPosition::Lower)]);
    }

    #[test]
    fn test_sounding_range_for_octave_treble() {
        let mut tenor = part("Voice", vec![measure(vec![
            Event::note(q(0), q(2), 72, VoiceSet::empty()),
            Event::note(q(2), q(2), 86, VoiceSet::empty()),
        ])]);
        tenor.clef = Some(Clef::TrebleOctaveDown);
        let score = Score { parts: vec![tenor], ..Default::default() };

        let voice = resolve(&score)[0];
        assert_eq!(voice.written_range(&score), Some(PitchRange::new(72, 86)));
        assert_eq!(voice.sounding_range(&score), Some(PitchRange::new(60, 74)));
    }

    #[test]
    fn test_split_combined_name() {
        assert_eq!(split_combined_name("S, A"), vec!["S", "A"]);
        assert_eq!(split_combined_name("Tenor and Bass"), vec!["Tenor", "Bass"]);
        assert_eq!(split_combined_name("Women"), vec!["Women"]);
    }
}
