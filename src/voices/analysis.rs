//! Classification output and assignment input
//!
//! Results and user overrides are exchanged as plain integer-keyed data:
//! the dense logical voice index is the only identifier leaving the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classify::{Layer, VoiceClassifier, VoiceTraits};
use super::config::VoiceConfig;
use super::topology::{resolve, StaffLayout};
use crate::error::{Result, VoiceError};
use crate::models::{Clef, PitchRange, Score, VoiceCategory, VoiceId};

/// Per-voice classification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceAnalysis {
    pub index: usize,
    pub part_index: usize,
    pub voice_id: Option<VoiceId>,
    pub name: String,
    pub clef: Clef,
    /// Sounding range, `None` when the voice has no pitched notes
    pub pitch_range: Option<PitchRange>,
    pub detected_voice: VoiceCategory,
    pub decided_by: Layer,
    pub note_count: usize,
    pub layout: StaffLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAnalysis {
    pub voices: Vec<VoiceAnalysis>,
    pub total_parts: usize,
    pub total_voices: usize,
}

/// Reject scores the pipeline cannot work with
pub fn validate(score: &Score) -> Result<()> {
    if score.parts.is_empty() {
        return Err(VoiceError::EmptyScore);
    }
    if score.pitched_event_count() == 0 {
        return Err(VoiceError::NoPitchedEvents);
    }
    Ok(())
}

/// Resolve and classify every logical voice of a score
pub fn analyze(score: &Score, config: &VoiceConfig) -> Result<ScoreAnalysis> {
    validate(score)?;

    let classifier = VoiceClassifier::new(config);
    let voices: Vec<VoiceAnalysis> = resolve(score)
        .into_iter()
        .map(|voice| {
            let name = voice.display_name(score);
            let clef = voice.clef(score);
            let pitch_range = voice.sounding_range(score);
            let result = classifier.classify(&VoiceTraits {
                name: &name,
                clef,
                range: pitch_range,
                stem: voice.stem,
            });

            VoiceAnalysis {
                index: voice.index,
                part_index: voice.part_index,
                voice_id: voice.voice,
                clef,
                pitch_range,
                detected_voice: result.category,
                decided_by: result.decided_by,
                note_count: voice.note_count(score),
                layout: voice.layout(),
                name,
            }
        })
        .collect();

    Ok(ScoreAnalysis {
        total_parts: score.parts.len(),
        total_voices: voices.len(),
        voices,
    })
}

/// Dense voice index → category; missing indices read as `other`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Assignment {
    categories: BTreeMap<usize, VoiceCategory>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I: IntoIterator<Item = (usize, VoiceCategory)>>(pairs: I) -> Self {
        Self {
            categories: pairs.into_iter().collect(),
        }
    }

    /// Reuse an analysis' detected categories as an assignment
    pub fn from_analysis(analysis: &ScoreAnalysis) -> Self {
        Self::from_pairs(analysis.voices.iter().map(|v| (v.index, v.detected_voice)))
    }

    /// Parse `{"0": "soprano", "1": "alto"}`.
    ///
    /// Keys that are not indices of a logical voice (`voice_count` of them)
    /// are ignored; unknown category names are rejected.
    pub fn from_json(json: &str, voice_count: usize) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| VoiceError::InvalidAssignment(format!("malformed JSON: {}", e)))?;

        let mut categories = BTreeMap::new();
        for (key, value) in raw {
            let index = match key.trim().parse::<usize>() {
                Ok(i) if i < voice_count => i,
                _ => {
                    log::debug!("ignoring assignment key '{}'", key);
                    continue;
                }
            };
            let category = value
                .parse::<VoiceCategory>()
                .map_err(VoiceError::InvalidAssignment)?;
            categories.insert(index, category);
        }

        Ok(Self { categories })
    }

    pub fn get(&self, index: usize) -> VoiceCategory {
        self.categories.get(&index).copied().unwrap_or(VoiceCategory::Other)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// JSON form accepted by [`Assignment::from_json`]
    pub fn to_json(&self) -> String {
        let raw: BTreeMap<String, &str> = self
            .categories
            .iter()
            .map(|(i, c)| (i.to_string(), c.as_str()))
            .collect();
        serde_json::to_string(&raw).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Measure, Part, Rational, VoiceSet};

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn single_note_part(name: &str, clef: Clef, pitch: u8) -> Part {
        Part {
            id: name.to_string(),
            name: Some(name.to_string()),
            clef: Some(clef),
            measures: vec![Measure {
                number: "1".to_string(),
                duration: Some(q(4)),
                events: vec![Event::note(q(0), q(4), pitch, VoiceSet::single(1))],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_rejects_empty_scores() {
        assert!(matches!(validate(&Score::default()), Err(VoiceError::EmptyScore)));

        let rests_only = Score {
            parts: vec![Part {
                measures: vec![Measure {
                    events: vec![Event::rest(q(0), q(4), VoiceSet::single(1))],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(validate(&rests_only), Err(VoiceError::NoPitchedEvents)));
    }

    #[test]
    fn test_analyze_open_parts() {
        let score = Score {
            parts: vec![
                single_note_part("Soprano", Clef::Treble, 72),
                single_note_part("", Clef::Bass, 45),
            ],
            ..Default::default()
        };

        let analysis = analyze(&score, &VoiceConfig::default()).unwrap();
        assert_eq!(analysis.total_parts, 2);
        assert_eq!(analysis.total_voices, 2);

        let first = &analysis.voices[0];
        assert_eq!(first.detected_voice, VoiceCategory::Soprano);
        assert_eq!(first.decided_by, Layer::Name);
        assert_eq!(first.layout, StaffLayout::Open);
        assert_eq!(first.note_count, 1);

        let second = &analysis.voices[1];
        assert_eq!(second.name, "Part 2");
        assert_eq!(second.pitch_range, Some(PitchRange::new(45, 45)));
        assert_eq!(second.detected_voice, VoiceCategory::Bass);
    }

    #[test]
    fn test_assignment_from_json() {
        let assignment =
            Assignment::from_json(r#"{"0": "soprano", "2": "Bass", "7": "alto", "x": "tenor"}"#, 3)
                .unwrap();

        assert_eq!(assignment.get(0), VoiceCategory::Soprano);
        assert_eq!(assignment.get(1), VoiceCategory::Other);
        assert_eq!(assignment.get(2), VoiceCategory::Bass);
        assert_eq!(assignment.get(7), VoiceCategory::Other);
        assert_eq!(assignment.to_json(), r#"{"0":"soprano","2":"bass"}"#);
    }

    #[test]
    fn test_assignment_rejects_bad_input() {
        assert!(matches!(
            Assignment::from_json("not json", 2),
            Err(VoiceError::InvalidAssignment(_))
        ));
        assert!(matches!(
            Assignment::from_json(r#"{"0": "mezzo"}"#, 2),
            Err(VoiceError::InvalidAssignment(_))
        ));
        assert!(Assignment::from_json("{}", 2).unwrap().is_empty());
    }
}
