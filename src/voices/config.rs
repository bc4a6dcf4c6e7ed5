//! Voice classification configuration
//!
//! Pitch-range bounds and the overlap threshold are plain values handed to
//! each component at construction time. Loading is lenient: any malformed
//! value falls back to the profile default with a logged warning.
//!
//! ```yaml
//! profile: strict
//! overlap_threshold: 0.35
//! ranges:
//!   soprano: [60, 81]
//!   alto: "55-74"
//!   bass: { min: 40, max: 60 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::models::{PitchRange, VoiceCategory};

/// Default minimum overlap score accepted without clef confirmation
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

/// Named set of default ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeProfile {
    #[default]
    Standard,
    /// Narrower alto, tenor and bass ceilings
    Strict,
}

/// Inclusive MIDI bounds for each named category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRanges {
    pub soprano: PitchRange,
    pub alto: PitchRange,
    pub tenor: PitchRange,
    pub bass: PitchRange,
}

impl CategoryRanges {
    pub fn for_profile(profile: RangeProfile) -> Self {
        match profile {
            RangeProfile::Standard => Self {
                soprano: PitchRange::new(60, 81), // C4 to A5
                alto: PitchRange::new(55, 76),    // G3 to E5
                tenor: PitchRange::new(48, 69),   // C3 to A4
                bass: PitchRange::new(40, 64),    // E2 to E4
            },
            RangeProfile::Strict => Self {
                soprano: PitchRange::new(60, 81),
                alto: PitchRange::new(55, 74),
                tenor: PitchRange::new(48, 67),
                bass: PitchRange::new(40, 60),
            },
        }
    }

    pub fn get(&self, category: VoiceCategory) -> Option<PitchRange> {
        match category {
            VoiceCategory::Soprano => Some(self.soprano),
            VoiceCategory::Alto => Some(self.alto),
            VoiceCategory::Tenor => Some(self.tenor),
            VoiceCategory::Bass => Some(self.bass),
            VoiceCategory::Other => None,
        }
    }

    fn slot_mut(&mut self, category: VoiceCategory) -> Option<&mut PitchRange> {
        match category {
            VoiceCategory::Soprano => Some(&mut self.soprano),
            VoiceCategory::Alto => Some(&mut self.alto),
            VoiceCategory::Tenor => Some(&mut self.tenor),
            VoiceCategory::Bass => Some(&mut self.bass),
            VoiceCategory::Other => None,
        }
    }
}

impl Default for CategoryRanges {
    fn default() -> Self {
        Self::for_profile(RangeProfile::Standard)
    }
}

/// Tunable parameters of the voice classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub ranges: CategoryRanges,
    /// Overlap score accepted outright; half of it is accepted when the
    /// clef family agrees
    pub overlap_threshold: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl VoiceConfig {
    pub fn standard() -> Self {
        Self::for_profile(RangeProfile::Standard)
    }

    pub fn strict() -> Self {
        Self::for_profile(RangeProfile::Strict)
    }

    pub fn for_profile(profile: RangeProfile) -> Self {
        Self {
            ranges: CategoryRanges::for_profile(profile),
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
        }
    }

    pub fn range(&self, category: VoiceCategory) -> Option<PitchRange> {
        self.ranges.get(category)
    }

    /// Build from a JSON document; never fails
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                log::warn!("voice config is not valid JSON ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Build from a YAML document; never fails
    pub fn from_yaml_str(text: &str) -> Self {
        match serde_yaml::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                log::warn!("voice config is not valid YAML ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Load a `.json`, `.yaml` or `.yml` file; unreadable files give defaults
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("cannot read voice config {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Interpret an already-parsed document
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        let Some(doc) = value.as_object() else {
            log::warn!("voice config must be a mapping, using defaults");
            return Self::default();
        };

        let profile = match doc.get("profile") {
            None => RangeProfile::Standard,
            Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|_| {
                log::warn!("unknown range profile {}, using standard", v);
                RangeProfile::Standard
            }),
        };
        let mut config = Self::for_profile(profile);

        if let Some(v) = doc.get("overlap_threshold") {
            match v.as_f64() {
                Some(t) if t > 0.0 && t <= 1.0 => config.overlap_threshold = t,
                _ => log::warn!(
                    "overlap_threshold {} outside (0, 1], using {}",
                    v,
                    DEFAULT_OVERLAP_THRESHOLD
                ),
            }
        }

        match doc.get("ranges") {
            None => {}
            Some(Value::Object(ranges)) => {
                for (key, raw) in ranges {
                    config.apply_range(key, raw);
                }
            }
            Some(other) => log::warn!("ranges must be a mapping, ignoring {}", other),
        }

        config
    }

    fn apply_range(&mut self, key: &str, raw: &Value) {
        let category = match key.parse::<VoiceCategory>() {
            Ok(c) if c.is_named() => c,
            _ => {
                log::warn!("ignoring range for unknown voice category '{}'", key);
                return;
            }
        };

        match parse_range(raw) {
            Some(range) if range.is_valid() => {
                if let Some(slot) = self.ranges.slot_mut(category) {
                    *slot = range;
                }
            }
            _ => log::warn!(
                "malformed {} range {}, keeping default {}",
                category,
                raw,
                self.range(category).map(|r| r.to_string()).unwrap_or_default()
            ),
        }
    }
}

/// Accepts `[min, max]`, `"min-max"` or `{min, max}`
fn parse_range(raw: &Value) -> Option<PitchRange> {
    let bound = |v: &Value| v.as_u64().and_then(|n| u8::try_from(n).ok());

    match raw {
        Value::Array(items) if items.len() == 2 => {
            Some(PitchRange::new(bound(&items[0])?, bound(&items[1])?))
        }
        Value::String(s) => {
            let (min, max) = s.split_once('-')?;
            Some(PitchRange::new(min.trim().parse().ok()?, max.trim().parse().ok()?))
        }
        Value::Object(map) => Some(PitchRange::new(
            bound(map.get("min")?)?,
            bound(map.get("max")?)?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_profiles() {
        let standard = VoiceConfig::standard();
        assert_eq!(standard.range(VoiceCategory::Alto), Some(PitchRange::new(55, 76)));
        assert_eq!(standard.overlap_threshold, DEFAULT_OVERLAP_THRESHOLD);

        let strict = VoiceConfig::strict();
        assert_eq!(strict.range(VoiceCategory::Alto), Some(PitchRange::new(55, 74)));
        assert_eq!(strict.range(VoiceCategory::Tenor), Some(PitchRange::new(48, 67)));
        assert_eq!(strict.range(VoiceCategory::Bass), Some(PitchRange::new(40, 60)));
        assert_eq!(strict.range(VoiceCategory::Other), None);
    }

    #[test]
    fn test_yaml_overrides_in_every_shape() {
        let config = VoiceConfig::from_yaml_str(
            "profile: strict\noverlap_threshold: 0.4\nranges:\n  soprano: [62, 79]\n  alto: \"56-73\"\n  tenor: { min: 49, max: 66 }\n",
        );

        assert_eq!(config.overlap_threshold, 0.4);
        assert_eq!(config.ranges.soprano, PitchRange::new(62, 79));
        assert_eq!(config.ranges.alto, PitchRange::new(56, 73));
        assert_eq!(config.ranges.tenor, PitchRange::new(49, 66));
        assert_eq!(config.ranges.bass, PitchRange::new(40, 60));
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let config = VoiceConfig::from_json_str(
            r#"{"overlap_threshold": 3.5, "ranges": {"soprano": [81, 60], "alto": "low", "bass": [40, 300], "mezzo": [50, 70]}}"#,
        );

        assert_eq!(config, VoiceConfig::standard());
    }

    #[test]
    fn test_unparseable_document_gives_defaults() {
        assert_eq!(VoiceConfig::from_json_str("{not json"), VoiceConfig::default());
        assert_eq!(VoiceConfig::from_yaml_str("- just\n- a list"), VoiceConfig::default());
        assert_eq!(VoiceConfig::from_yaml_str(""), VoiceConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"ranges": {{"bass": [38, 62]}}}}"#).unwrap();

        let config = VoiceConfig::load(file.path());
        assert_eq!(config.ranges.bass, PitchRange::new(38, 62));

        let missing = VoiceConfig::load(Path::new("/nonexistent/voices.yaml"));
        assert_eq!(missing, VoiceConfig::default());
    }
}
