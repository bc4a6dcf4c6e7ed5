//! End-to-end request pipeline
//!
//! Each call parses its own score, so concurrent requests share nothing.
//!
//! ```text
//! MusicXML ──parse──▶ Score ──analyze──▶ ScoreAnalysis
//!                       │
//!                       └──extract(assignment)──▶ Decomposition ──render──▶ MIDI files
//! ```

use crate::converters::musicxml::parse_musicxml_bytes;
use crate::error::Result;
use crate::models::Score;
use crate::renderers::midi::{render_decomposition, RenderSettings, RenderedVoices};
use crate::voices::{
    analyze, resolve, validate, Assignment, Decomposition, ScoreAnalysis, VoiceClassifier,
    VoiceConfig, VoiceExtractor, VoiceTraits,
};

/// Parse a MusicXML document and classify every logical voice
///
/// Accepts text or raw file bytes; compressed `.mxl` containers are rejected.
pub fn analyze_musicxml(xml: impl AsRef<[u8]>, config: &VoiceConfig) -> Result<ScoreAnalysis> {
    let score = parse_musicxml_bytes(xml.as_ref())?;
    let analysis = analyze(&score, config)?;

    for voice in &analysis.voices {
        log::debug!(
            "voice {} '{}' ({:?}, {}) → {} by {:?}",
            voice.index,
            voice.name,
            voice.layout,
            voice.clef,
            voice.detected_voice,
            voice.decided_by
        );
    }
    log::info!(
        "analyzed {} parts, {} logical voices",
        analysis.total_parts,
        analysis.total_voices
    );

    Ok(analysis)
}

/// Parse a MusicXML document, decompose it by the JSON assignment and render
/// one MIDI file per category plus `"all"`
pub fn generate_voice_midi(
    xml: impl AsRef<[u8]>,
    assignment_json: &str,
    config: &VoiceConfig,
    settings: &RenderSettings,
) -> Result<RenderedVoices> {
    let score = parse_musicxml_bytes(xml.as_ref())?;
    validate(&score)?;

    let assignment = Assignment::from_json(assignment_json, resolve(&score).len())?;
    let decomposition = VoiceExtractor::new(config).extract(&score, &assignment)?;
    let rendered = render_decomposition(&decomposition, settings);

    log::info!(
        "rendered {} streams, skipped {}",
        rendered.files.len(),
        rendered.skipped.len()
    );
    Ok(rendered)
}

/// Decompose using the classifier's own decision for every logical voice
pub fn decompose_auto<'s>(score: &'s Score, config: &VoiceConfig) -> Result<Decomposition<'s>> {
    validate(score)?;

    let classifier = VoiceClassifier::new(config);
    let assignment = Assignment::from_pairs(resolve(score).into_iter().map(|voice| {
        let name = voice.display_name(score);
        let traits = VoiceTraits {
            name: &name,
            clef: voice.clef(score),
            range: voice.sounding_range(score),
            stem: voice.stem,
        };
        (voice.index, classifier.classify(&traits).category)
    }));

    VoiceExtractor::new(config).extract(score, &assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::MusicXmlError;
    use crate::error::VoiceError;
    use crate::models::VoiceCategory;

    const SATB_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Soprano</part-name></score-part>
    <score-part id="P2"><part-name>Bass</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><clef><sign>G</sign><line>2</line></clef></attributes>
      <note><pitch><step>C</step><octave>5</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes><divisions>1</divisions><clef><sign>F</sign><line>4</line></clef></attributes>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
</score-partwise>"#;

    #[test]
    fn test_analyze_musicxml() {
        let analysis = analyze_musicxml(SATB_OPEN, &VoiceConfig::default()).expect("Failed to analyze");
        let detected: Vec<_> = analysis.voices.iter().map(|v| v.detected_voice).collect();
        assert_eq!(detected, vec![VoiceCategory::Soprano, VoiceCategory::Bass]);
    }

    #[test]
    fn test_generate_voice_midi() {
        let rendered = generate_voice_midi(
            SATB_OPEN,
            r#"{"0": "soprano", "1": "bass"}"#,
            &VoiceConfig::default(),
            &RenderSettings::default(),
        )
        .expect("Failed to render");

        assert_eq!(
            rendered.files.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["all", "bass", "soprano"]
        );
        assert!(rendered.skipped.is_empty());
        assert!(rendered.files.values().all(|f| f.starts_with(b"MThd")));
    }

    #[test]
    fn test_bad_assignment_is_reported() {
        let result = generate_voice_midi(
            SATB_OPEN,
            r#"{"0": "mezzo"}"#,
            &VoiceConfig::default(),
            &RenderSettings::default(),
        );
        assert!(matches!(result, Err(VoiceError::InvalidAssignment(_))));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = analyze_musicxml("<score-timewise/>", &VoiceConfig::default());
        assert!(matches!(result, Err(VoiceError::MusicXml(_))));
    }

    #[test]
    fn test_accepts_raw_bytes() {
        let analysis = analyze_musicxml(SATB_OPEN.as_bytes(), &VoiceConfig::default())
            .expect("Failed to analyze");
        assert_eq!(analysis.total_voices, 2);
    }

    #[test]
    fn test_compressed_container_is_rejected() {
        let mut mxl = b"PK\x03\x04".to_vec();
        mxl.extend_from_slice(b"META-INF/container.xml");

        let result = analyze_musicxml(&mxl, &VoiceConfig::default());
        assert!(matches!(
            result,
            Err(VoiceError::MusicXml(MusicXmlError::CompressedContainer))
        ));

        let result = generate_voice_midi(&mxl, "{}", &VoiceConfig::default(), &RenderSettings::default());
        assert!(matches!(
            result,
            Err(VoiceError::MusicXml(MusicXmlError::CompressedContainer))
        ));
    }
}
