//! Voice analysis and per-voice MIDI operations for the WASM API
//!
//! Every call is self-contained: the MusicXML document is parsed on each
//! request and nothing is kept between calls.

use wasm_bindgen::prelude::*;

use crate::api::helpers::{
    deserialize_or_default, now_ms, pipeline_error, serialize, to_uint8_array,
};
use crate::pipeline;
use crate::renderers::midi::RenderSettings;
use crate::voices::VoiceConfig;
use crate::{wasm_error, wasm_info, wasm_log, wasm_warn};

fn config_from(config_json: Option<String>) -> VoiceConfig {
    match config_json.as_deref().map(str::trim) {
        Some(json) if !json.is_empty() => VoiceConfig::from_json_str(json),
        _ => VoiceConfig::default(),
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Classify every logical voice of a MusicXML document
///
/// # Parameters
/// * `xml` - Score-partwise MusicXML file bytes (`.mxl` containers are rejected)
/// * `config_json` - Optional voice config (`{"profile": "strict", ...}`)
///
/// # Returns
/// `{ voices: [...], total_parts, total_voices }`
#[wasm_bindgen(js_name = analyzeMusicXML)]
pub fn analyze_musicxml(xml: &[u8], config_json: Option<String>) -> Result<JsValue, JsValue> {
    wasm_info!("analyzeMusicXML called: {} bytes", xml.len());
    let started = now_ms();

    let config = config_from(config_json);
    let analysis = pipeline::analyze_musicxml(xml, &config)
        .map_err(|e| pipeline_error("Voice analysis error", e))?;

    for voice in &analysis.voices {
        wasm_log!(
            "  Voice {}: '{}' → {} ({} notes)",
            voice.index,
            voice.name,
            voice.detected_voice,
            voice.note_count
        );
    }

    wasm_info!(
        "analyzeMusicXML completed: {} voices in {:.1} ms",
        analysis.total_voices,
        now_ms() - started
    );
    serialize(&analysis, "Failed to serialize analysis")
}

// ============================================================================
// MIDI generation
// ============================================================================

/// Decompose a MusicXML document into per-voice MIDI files
///
/// # Parameters
/// * `xml` - Score-partwise MusicXML file bytes (`.mxl` containers are rejected)
/// * `assignments_json` - `{"0": "soprano", "1": "alto", ...}`; `{}` auto-detects
/// * `config_json` - Optional voice config
/// * `settings` - Optional render settings object (`{ tpq, tempo_bpm, ... }`)
///
/// # Returns
/// `{ soprano: Uint8Array, ..., all: Uint8Array, skipped: [{ name, reason }] }`
#[wasm_bindgen(js_name = generateVoiceMidi)]
pub fn generate_voice_midi(
    xml: &[u8],
    assignments_json: &str,
    config_json: Option<String>,
    settings: JsValue,
) -> Result<js_sys::Object, JsValue> {
    wasm_info!("generateVoiceMidi called: {} bytes, assignments={}", xml.len(), assignments_json);
    let started = now_ms();

    let config = config_from(config_json);
    let settings: RenderSettings = deserialize_or_default(settings, "Invalid render settings")?;

    let rendered = pipeline::generate_voice_midi(xml, assignments_json, &config, &settings)
        .map_err(|e| pipeline_error("MIDI generation error", e))?;

    let result = js_sys::Object::new();
    for (name, bytes) in &rendered.files {
        wasm_log!("  {}: {} bytes", name, bytes.len());
        js_sys::Reflect::set(&result, &JsValue::from_str(name), &to_uint8_array(bytes))
            .map_err(|e| {
                wasm_error!("Failed to attach '{}' stream: {:?}", name, e);
                e
            })?;
    }

    for skipped in &rendered.skipped {
        wasm_warn!("  skipped {}: {}", skipped.name, skipped.reason);
    }
    let skipped = serialize(&rendered.skipped, "Failed to serialize skipped streams")?;
    js_sys::Reflect::set(&result, &JsValue::from_str("skipped"), &skipped)?;

    wasm_info!(
        "generateVoiceMidi completed: {} files in {:.1} ms",
        rendered.files.len(),
        now_ms() - started
    );
    Ok(result)
}

// ============================================================================
// Configuration
// ============================================================================

/// Default voice config for the standard or strict range profile
#[wasm_bindgen(js_name = defaultVoiceConfig)]
pub fn default_voice_config(strict: bool) -> Result<JsValue, JsValue> {
    let config = if strict { VoiceConfig::strict() } else { VoiceConfig::standard() };
    serialize(&config, "Failed to serialize voice config")
}
