//! Voice classifier
//!
//! A logical voice is classified by an ordered chain of independent rules.
//! Each rule returns a confident category or no opinion; the first opinion
//! commits and later rules are never consulted:
//!
//! 1. part-name keywords
//! 2. stem position on a combined staff
//! 3. pitch-range overlap with the configured category ranges
//! 4. clef default

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::config::VoiceConfig;
use crate::models::{Clef, PitchRange, StemPosition, VoiceCategory};

/// What the classifier knows about one logical voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceTraits<'a> {
    pub name: &'a str,
    pub clef: Clef,
    /// Sounding range, `None` for a voice with no pitched notes
    pub range: Option<PitchRange>,
    /// Present only for voices taken from a combined staff
    pub stem: Option<StemPosition>,
}

/// Rule of the chain that committed to a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Name,
    StemPosition,
    PitchRange,
    Clef,
    /// No rule had an opinion
    Undecided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: VoiceCategory,
    pub decided_by: Layer,
}

type Rule = fn(&VoiceTraits<'_>, &VoiceConfig) -> Option<VoiceCategory>;

/// The full chain in commit order
pub const ALL_LAYERS: [Layer; 4] = [Layer::Name, Layer::StemPosition, Layer::PitchRange, Layer::Clef];

/// Layers usable without a name or stem hint (auto-detection fallback)
pub const OBSERVED_LAYERS: [Layer; 2] = [Layer::PitchRange, Layer::Clef];

fn rule_for(layer: Layer) -> Option<Rule> {
    match layer {
        Layer::Name => Some(by_name),
        Layer::StemPosition => Some(by_stem_position),
        Layer::PitchRange => Some(by_pitch_range),
        Layer::Clef => Some(by_clef),
        Layer::Undecided => None,
    }
}

pub struct VoiceClassifier<'c> {
    config: &'c VoiceConfig,
}

impl<'c> VoiceClassifier<'c> {
    pub fn new(config: &'c VoiceConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, traits: &VoiceTraits<'_>) -> Classification {
        self.classify_with(traits, &ALL_LAYERS)
    }

    /// Run only the given layers, in the order given
    pub fn classify_with(&self, traits: &VoiceTraits<'_>, layers: &[Layer]) -> Classification {
        for &layer in layers {
            let Some(rule) = rule_for(layer) else { continue };
            if let Some(category) = rule(traits, self.config) {
                log::debug!("'{}' classified {} by {:?}", traits.name, category, layer);
                return Classification { category, decided_by: layer };
            }
        }
        Classification {
            category: VoiceCategory::Other,
            decided_by: Layer::Undecided,
        }
    }
}

/// Convenience wrapper over [`VoiceClassifier::classify`]
pub fn classify(
    name: &str,
    clef: Clef,
    range: Option<PitchRange>,
    stem: Option<StemPosition>,
    config: &VoiceConfig,
) -> VoiceCategory {
    VoiceClassifier::new(config)
        .classify(&VoiceTraits { name, clef, range, stem })
        .category
}

// Keyword alternations match at the start of a word only, so "a" inside
// "Piano" or "bar" inside "crowbar" never trigger.
lazy_static! {
    static ref NAME_PATTERNS: Vec<(VoiceCategory, Regex)> = {
        let patterns = [
            (VoiceCategory::Soprano, r"(?i)\b(?:soprano|sopr|sop)|^s(?:[[:punct:]\d\s]|$)"),
            (VoiceCategory::Alto, r"(?i)\b(?:alto|alt|contr|counter)|^a(?:[[:punct:]\d\s]|$)"),
            (VoiceCategory::Tenor, r"(?i)\b(?:tenor|ten)|^t(?:[[:punct:]\d\s]|$)"),
            (VoiceCategory::Bass, r"(?i)\b(?:bass|bas|baritone|bari|bar)|^b(?:[[:punct:]\d\s]|$)"),
        ];
        patterns
            .into_iter()
            .filter_map(|(category, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((category, re)),
                Err(e) => {
                    log::error!("invalid {} name pattern: {}", category, e);
                    None
                }
            })
            .collect()
    };
}

fn by_name(traits: &VoiceTraits<'_>, _config: &VoiceConfig) -> Option<VoiceCategory> {
    let name = traits.name.trim();
    NAME_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map(|(category, _)| *category)
}

fn by_stem_position(traits: &VoiceTraits<'_>, _config: &VoiceConfig) -> Option<VoiceCategory> {
    let stem = traits.stem?;
    match (traits.clef, stem) {
        (Clef::TenorC, _) => Some(VoiceCategory::Tenor),
        (clef, StemPosition::Upper) if clef.is_treble_family() => Some(VoiceCategory::Soprano),
        (clef, StemPosition::Lower) if clef.is_treble_family() => Some(VoiceCategory::Alto),
        (clef, StemPosition::Upper) if clef.is_bass_family() => Some(VoiceCategory::Tenor),
        (clef, StemPosition::Lower) if clef.is_bass_family() => Some(VoiceCategory::Bass),
        _ => None,
    }
}

/// Overlap score of every named category, in iteration order.
///
/// score = overlap width / (observed width + 1)
pub fn overlap_scores(range: &PitchRange, config: &VoiceConfig) -> Vec<(VoiceCategory, f64)> {
    let observed = range.width() as f64 + 1.0;
    VoiceCategory::NAMED
        .iter()
        .filter_map(|&category| {
            let overlap = range.overlap(&config.range(category)?)?;
            Some((category, overlap as f64 / observed))
        })
        .collect()
}

fn by_pitch_range(traits: &VoiceTraits<'_>, config: &VoiceConfig) -> Option<VoiceCategory> {
    let range = traits.range?;

    // Strictly greater: ties keep the earlier category
    let (best, score) = overlap_scores(&range, config)
        .into_iter()
        .fold(None, |best: Option<(VoiceCategory, f64)>, (category, score)| match best {
            Some((_, top)) if score <= top => best,
            _ if score > 0.0 => Some((category, score)),
            _ => best,
        })?;

    let threshold = config.overlap_threshold;
    if score > threshold {
        return Some(best);
    }
    if score > threshold / 2.0 && clef_confirms(traits.clef, best) {
        return Some(best);
    }
    None
}

fn clef_confirms(clef: Clef, category: VoiceCategory) -> bool {
    match category {
        VoiceCategory::Soprano | VoiceCategory::Alto => clef.is_treble_family(),
        VoiceCategory::Tenor | VoiceCategory::Bass => {
            clef.is_bass_family() || clef == Clef::TenorC
        }
        VoiceCategory::Other => false,
    }
}

fn by_clef(traits: &VoiceTraits<'_>, _config: &VoiceConfig) -> Option<VoiceCategory> {
    match traits.clef {
        Clef::Treble => Some(VoiceCategory::Soprano),
        Clef::TrebleOctaveDown => Some(VoiceCategory::Tenor),
        Clef::Bass => Some(VoiceCategory::Bass),
        Clef::Alto => Some(VoiceCategory::Alto),
        Clef::TenorC => Some(VoiceCategory::Tenor),
        Clef::Unknown => None,
    }
}
