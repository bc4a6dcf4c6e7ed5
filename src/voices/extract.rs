//! Voice extractor / decomposer
//!
//! Rebuilds one independent stream per voice category from a score and an
//! index → category assignment. Streams are new `Score` values; the source
//! score is left untouched and doubles as the combined "all voices" stream.

use std::collections::BTreeMap;

use super::analysis::{validate, Assignment};
use super::classify::{VoiceClassifier, VoiceTraits, OBSERVED_LAYERS};
use super::config::VoiceConfig;
use super::topology::{resolve, LogicalVoice};
use crate::error::Result;
use crate::models::{Event, Measure, Part, Rational, Score, VoiceCategory, VoiceId, VoiceSet};

/// Output of a decomposition pass
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition<'s> {
    /// One merged stream per named category that received a voice; each
    /// contributing logical voice keeps its own part
    pub streams: BTreeMap<VoiceCategory, Score>,
    /// The unmodified source score
    pub combined: &'s Score,
    /// Category each logical voice finally went to, by dense index
    pub effective: BTreeMap<usize, VoiceCategory>,
}

pub struct VoiceExtractor<'c> {
    config: &'c VoiceConfig,
}

impl<'c> VoiceExtractor<'c> {
    pub fn new(config: &'c VoiceConfig) -> Self {
        Self { config }
    }

    pub fn extract<'s>(&self, score: &'s Score, assignment: &Assignment) -> Result<Decomposition<'s>> {
        validate(score)?;

        let voices = resolve(score);
        let mut categories: Vec<VoiceCategory> =
            voices.iter().map(|v| assignment.get(v.index)).collect();

        if !categories.iter().any(VoiceCategory::is_named) {
            log::info!(
                "no voice assigned to a named category, auto-detecting {} voices",
                voices.len()
            );
            self.auto_detect(score, &voices, &mut categories);
        }

        let mut streams: BTreeMap<VoiceCategory, Score> = BTreeMap::new();
        for (voice, &category) in voices.iter().zip(&categories) {
            if !category.is_named() {
                continue;
            }
            let Some(part) = extract_voice(score, voice) else { continue };
            streams
                .entry(category)
                .or_insert_with(|| Score {
                    title: score.title.clone(),
                    tempos: score.tempos.clone(),
                    parts: Vec::new(),
                })
                .parts
                .push(part);
        }

        log::debug!(
            "decomposed into {:?}",
            streams.iter().map(|(c, s)| (c.as_str(), s.parts.len())).collect::<Vec<_>>()
        );

        Ok(Decomposition {
            streams,
            combined: score,
            effective: voices.iter().map(|v| v.index).zip(categories).collect(),
        })
    }

    /// Promote `other` voices using only their observed clef and range
    fn auto_detect(&self, score: &Score, voices: &[LogicalVoice], categories: &mut [VoiceCategory]) {
        let classifier = VoiceClassifier::new(self.config);
        for (voice, category) in voices.iter().zip(categories.iter_mut()) {
            if category.is_named() {
                continue;
            }
            let traits = VoiceTraits {
                name: "",
                clef: voice.clef(score),
                range: voice.sounding_range(score),
                stem: None,
            };
            *category = classifier.classify_with(&traits, &OBSERVED_LAYERS).category;
        }
    }
}

/// Stand-alone part for one logical voice
pub fn extract_voice(score: &Score, voice: &LogicalVoice) -> Option<Part> {
    let part = voice.part(score)?;
    match voice.voice {
        None => Some(part.clone()),
        Some(id) => Some(Part {
            id: format!("{}-v{}", part.id, id),
            name: Some(voice.display_name(score)),
            clef: part.clef,
            transpose: part.transpose,
            measures: part.measures.iter().map(|m| extract_measure(m, id)).collect(),
        }),
    }
}

/// Copy structural attributes and only the events of `voice`; a measure
/// where the voice is silent becomes one full-length rest.
fn extract_measure(measure: &Measure, voice: VoiceId) -> Measure {
    let tag = VoiceSet::single(voice);
    let mut events: Vec<Event> = measure
        .events_for(voice)
        .cloned()
        .map(|mut e| {
            e.voices = tag;
            e
        })
        .collect();

    if events.is_empty() {
        events.push(Event::rest(Rational::from_integer(0), measure.duration_or_default(), tag));
    }

    Measure {
        number: measure.number.clone(),
        attributes: measure.attributes.clone(),
        duration: measure.duration,
        events,
    }
}
