//! MusicXML parser implementation
//!
//! Converts a score-partwise document into the score graph using roxmltree.

use std::collections::HashMap;

use roxmltree::{Document as XmlDocument, Node, ParsingOptions};

use super::{MusicXmlError, MusicXmlResult};
use crate::models::{
    Clef, Event, Measure, MeasureAttributes, Part, Rational, Score, Tempo, Tie,
    TimeSignature, Transposition, VoiceId, VoiceSet,
};

/// ZIP local file header, the start of a compressed `.mxl` container
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Parse MusicXML bytes, rejecting compressed containers
pub fn parse_musicxml_bytes(bytes: &[u8]) -> MusicXmlResult<Score> {
    if bytes.starts_with(ZIP_MAGIC) {
        return Err(MusicXmlError::CompressedContainer);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MusicXmlError::Xml(format!("invalid UTF-8: {}", e)))?;
    parse_musicxml_to_score(text)
}

/// Parse a MusicXML string into a [`Score`]
pub fn parse_musicxml_to_score(xml: &str) -> MusicXmlResult<Score> {
    let xml = xml.trim_start_matches('\u{feff}');
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = XmlDocument::parse_with_options(xml, options)
        .map_err(|e| MusicXmlError::Xml(e.to_string()))?;

    let root = doc.root_element();
    match root.tag_name().name() {
        "score-partwise" => parse_score_partwise(root),
        "score-timewise" => Err(MusicXmlError::Unsupported(
            "score-timewise format (use score-partwise instead)".to_string(),
        )),
        other => Err(MusicXmlError::InvalidValue {
            element: "root".to_string(),
            value: other.to_string(),
            reason: "expected <score-partwise>".to_string(),
        }),
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| n.text()).map(str::trim)
}

fn parse_score_partwise(root: Node) -> MusicXmlResult<Score> {
    let part_list = child(root, "part-list")
        .ok_or_else(|| MusicXmlError::MissingElement("part-list".to_string()))?;
    let names = parse_part_list(part_list);

    let title = child(root, "work")
        .and_then(|w| child_text(w, "work-title"))
        .or_else(|| child_text(root, "movement-title"))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut score = Score {
        title,
        tempos: Vec::new(),
        parts: Vec::new(),
    };

    for (part_index, part_node) in root.children().filter(|n| n.has_tag_name("part")).enumerate() {
        let id = part_node
            .attribute("id")
            .ok_or_else(|| MusicXmlError::MissingElement("part id attribute".to_string()))?;
        let name = names.get(id).cloned();

        let parsed = parse_part(part_node, id, name, part_index == 0, &mut score.tempos)?;
        score.parts.extend(parsed);
    }

    Ok(score)
}

/// Part names by id: `part-name`, else `part-abbreviation`
fn parse_part_list(part_list: Node) -> HashMap<String, String> {
    part_list
        .children()
        .filter(|n| n.has_tag_name("score-part"))
        .filter_map(|sp| {
            let id = sp.attribute("id")?;
            let name = child_text(sp, "part-name")
                .filter(|n| !n.is_empty())
                .or_else(|| child_text(sp, "part-abbreviation"))?;
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// Running attribute state across the measures of one part
struct PartState {
    divisions: i32,
    time: Option<TimeSignature>,
    staves: u8,
    /// First clef per staff number
    clefs: HashMap<u8, Clef>,
    transpose: Option<Transposition>,
}

impl Default for PartState {
    fn default() -> Self {
        Self {
            divisions: 1,
            time: None,
            staves: 1,
            clefs: HashMap::new(),
            transpose: None,
        }
    }
}

/// One measure before it is split by staff
struct RawMeasure {
    number: String,
    attributes: MeasureAttributes,
    staff_clefs: HashMap<u8, Clef>,
    duration: Option<Rational>,
    events: Vec<(u8, Event)>,
}

/// Parse a `<part>`; a multi-staff part yields one part per staff
fn parse_part(
    part_node: Node,
    id: &str,
    name: Option<String>,
    record_tempo: bool,
    tempos: &mut Vec<Tempo>,
) -> MusicXmlResult<Vec<Part>> {
    let mut state = PartState::default();
    let mut measures = Vec::new();
    let mut measure_start = Rational::from_integer(0);

    for measure_node in part_node.children().filter(|n| n.has_tag_name("measure")) {
        let (measure, measure_tempos) = parse_measure(measure_node, &mut state)?;
        if record_tempo {
            tempos.extend(measure_tempos.into_iter().map(|(offset, bpm)| Tempo {
                offset: measure_start + offset,
                bpm,
            }));
        }
        measure_start += measure.duration.unwrap_or_else(crate::models::default_measure_duration);
        measures.push(measure);
    }

    if state.staves <= 1 {
        return Ok(vec![build_part(id.to_string(), name, 1, &state, &measures, false)]);
    }

    log::debug!("splitting part {} into {} staves", id, state.staves);
    Ok((1..=state.staves)
        .map(|staff| {
            let staff_name = name.as_ref().map(|n| format!("{} (staff {})", n, staff));
            build_part(format!("{}-s{}", id, staff), staff_name, staff, &state, &measures, true)
        })
        .collect())
}

fn build_part(
    id: String,
    name: Option<String>,
    staff: u8,
    state: &PartState,
    measures: &[RawMeasure],
    split: bool,
) -> Part {
    let measures = measures
        .iter()
        .map(|raw| {
            let mut attributes = raw.attributes.clone();
            attributes.clef = raw.staff_clefs.get(&staff).copied();
            Measure {
                number: raw.number.clone(),
                attributes,
                duration: raw.duration,
                events: raw
                    .events
                    .iter()
                    .filter(|(s, _)| !split || *s == staff)
                    .map(|(_, e)| e.clone())
                    .collect(),
            }
        })
        .collect();

    Part {
        id,
        name,
        clef: state.clefs.get(&staff).copied(),
        transpose: state.transpose,
        measures,
    }
}

fn parse_measure(node: Node, state: &mut PartState) -> MusicXmlResult<(RawMeasure, Vec<(Rational, f64)>)> {
    let mut measure = RawMeasure {
        number: node.attribute("number").unwrap_or_default().to_string(),
        attributes: MeasureAttributes::default(),
        staff_clefs: HashMap::new(),
        duration: None,
        events: Vec::new(),
    };
    let mut tempos = Vec::new();
    let mut cursor = Rational::from_integer(0);
    let mut last_onset = cursor;
    let mut last_event: Option<usize> = None;
    // Furthest point the cursor reached, including trailing forwards
    let mut furthest = cursor;

    for child_node in node.children().filter(|n| n.is_element()) {
        match child_node.tag_name().name() {
            "attributes" => parse_attributes(child_node, state, &mut measure)?,
            // Cue notes are silent but still take up time
            "note" if child(child_node, "cue").is_some() => {
                if child(child_node, "chord").is_none() {
                    cursor += duration_of(child_node, state)?;
                    furthest = furthest.max(cursor);
                }
                last_event = None;
            }
            "note" => {
                let Some(note) = parse_note(child_node, state)? else { continue };

                if note.chord {
                    if let Some(index) = last_event {
                        let (_, prev) = &mut measure.events[index];
                        for pitch in note.event.pitches() {
                            prev.push_pitch(*pitch);
                        }
                        continue;
                    }
                }

                let onset = if note.chord { last_onset } else { cursor };
                let mut event = note.event;
                event.offset = onset;
                if !note.chord {
                    cursor += event.duration;
                    furthest = furthest.max(cursor);
                }
                last_onset = onset;
                last_event = event.is_pitched().then_some(measure.events.len());
                measure.events.push((note.staff, event));
            }
            "backup" => {
                let back = duration_of(child_node, state)?;
                cursor = (cursor - back).max(Rational::from_integer(0));
                last_event = None;
            }
            "forward" => {
                cursor += duration_of(child_node, state)?;
                furthest = furthest.max(cursor);
                last_event = None;
            }
            "direction" => {
                if let Some(bpm) = child(child_node, "sound").and_then(tempo_of) {
                    tempos.push((cursor, bpm));
                }
            }
            "sound" => {
                if let Some(bpm) = tempo_of(child_node) {
                    tempos.push((cursor, bpm));
                }
            }
            "barline" => {
                if let Some(style) = child_text(child_node, "bar-style") {
                    measure.attributes.barline = Some(style.to_string());
                }
            }
            _ => {}
        }
    }

    measure.events.sort_by(|(_, a), (_, b)| a.offset.cmp(&b.offset));
    fold_unisons(&mut measure.events);

    let content_end = measure
        .events
        .iter()
        .map(|(_, e)| e.end())
        .fold(furthest, Rational::max);
    measure.duration = Some(content_end)
        .filter(|end| *end > Rational::from_integer(0))
        .or_else(|| state.time.map(|t| t.measure_duration()));

    Ok((measure, tempos))
}

/// Merge identical notes written once per voice into one multi-voice event
fn fold_unisons(events: &mut Vec<(u8, Event)>) {
    let mut folded: Vec<(u8, Event)> = Vec::with_capacity(events.len());
    for (staff, event) in events.drain(..) {
        let twin = folded.iter_mut().find(|(s, e)| {
            *s == staff
                && e.is_pitched()
                && e.offset == event.offset
                && e.duration == event.duration
                && e.kind == event.kind
                && !e.voices.is_empty()
                && !event.voices.is_empty()
                && e.voices.iter().all(|v| !event.voices.contains(v))
        });
        match twin {
            Some((_, existing)) => existing.voices = existing.voices.union(event.voices),
            None => folded.push((staff, event)),
        }
    }
    *events = folded;
}

fn parse_attributes(node: Node, state: &mut PartState, measure: &mut RawMeasure) -> MusicXmlResult<()> {
    for child_node in node.children().filter(|n| n.is_element()) {
        match child_node.tag_name().name() {
            "divisions" => {
                let text = child_node.text().unwrap_or_default().trim();
                state.divisions = match text.parse::<i32>() {
                    Ok(d) if d > 0 => d,
                    _ => {
                        return Err(MusicXmlError::InvalidValue {
                            element: "divisions".to_string(),
                            value: text.to_string(),
                            reason: "expected positive integer".to_string(),
                        })
                    }
                };
            }
            "key" => {
                measure.attributes.key_fifths =
                    child_text(child_node, "fifths").and_then(|t| t.parse().ok());
            }
            "time" => {
                let beats = child_text(child_node, "beats").and_then(|t| t.parse::<u8>().ok());
                let beat_type = child_text(child_node, "beat-type").and_then(|t| t.parse::<u8>().ok());
                if let (Some(beats), Some(beat_type)) = (beats, beat_type) {
                    let time = TimeSignature { beats, beat_type };
                    state.time = Some(time);
                    measure.attributes.time = Some(time);
                }
            }
            "staves" => {
                state.staves = child_node.text().and_then(|t| t.trim().parse().ok()).unwrap_or(1);
            }
            "clef" => {
                let staff = child_node
                    .attribute("number")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(1);
                let clef = Clef::from_musicxml(
                    child_text(child_node, "sign").unwrap_or_default(),
                    child_text(child_node, "line").and_then(|t| t.parse().ok()),
                    child_text(child_node, "clef-octave-change")
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(0),
                );
                state.clefs.entry(staff).or_insert(clef);
                measure.staff_clefs.insert(staff, clef);
            }
            "transpose" => {
                if state.transpose.is_none() {
                    state.transpose = Some(Transposition {
                        chromatic: child_text(child_node, "chromatic")
                            .and_then(|t| t.parse().ok())
                            .unwrap_or(0),
                        octave_change: child_text(child_node, "octave-change")
                            .and_then(|t| t.parse().ok())
                            .unwrap_or(0),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

struct ParsedNote {
    event: Event,
    chord: bool,
    staff: u8,
}

/// Parse a `<note>`; grace notes occupy no time and are skipped
fn parse_note(node: Node, state: &PartState) -> MusicXmlResult<Option<ParsedNote>> {
    if child(node, "grace").is_some() {
        return Ok(None);
    }

    let duration = duration_of(node, state)?;
    let voice: VoiceId = child_text(node, "voice").and_then(|t| t.parse().ok()).unwrap_or(1);
    let staff = child_text(node, "staff").and_then(|t| t.parse().ok()).unwrap_or(1);
    let voices = VoiceSet::single(voice);
    let zero = Rational::from_integer(0);

    let mut event = match child(node, "pitch") {
        Some(pitch) if child(node, "rest").is_none() => {
            let step = child_text(pitch, "step")
                .ok_or_else(|| MusicXmlError::MissingElement("pitch/step".to_string()))?;
            let alter = child_text(pitch, "alter")
                .and_then(|t| t.parse::<f32>().ok())
                .map(|a| a.round() as i8)
                .unwrap_or(0);
            let octave = child_text(pitch, "octave")
                .and_then(|t| t.parse::<i8>().ok())
                .unwrap_or(4);
            Event::note(zero, duration, pitch_to_midi(step, alter, octave), voices)
        }
        _ => Event::rest(zero, duration, voices),
    };

    let ties: Vec<&str> = node
        .children()
        .filter(|n| n.has_tag_name("tie"))
        .filter_map(|n| n.attribute("type"))
        .collect();
    event.tie = match (ties.contains(&"start"), ties.contains(&"stop")) {
        (true, true) => Some(Tie::Continue),
        (true, false) => Some(Tie::Start),
        (false, true) => Some(Tie::Stop),
        (false, false) => None,
    };

    event.lyric = child(node, "lyric")
        .and_then(|l| child_text(l, "text"))
        .map(str::to_string);

    event.articulations = child(node, "notations")
        .and_then(|n| child(n, "articulations"))
        .map(|a| {
            a.children()
                .filter(|n| n.is_element())
                .map(|n| n.tag_name().name().to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(ParsedNote {
        event,
        chord: child(node, "chord").is_some(),
        staff,
    }))
}

/// `<duration>` of a node in quarter notes
fn duration_of(node: Node, state: &PartState) -> MusicXmlResult<Rational> {
    let Some(text) = child_text(node, "duration") else {
        return Ok(Rational::from_integer(0));
    };
    let divs: i32 = text.parse().map_err(|_| MusicXmlError::InvalidValue {
        element: "duration".to_string(),
        value: text.to_string(),
        reason: "expected non-negative integer".to_string(),
    })?;
    Ok(Rational::new(divs.max(0), state.divisions))
}

fn tempo_of(sound: Node) -> Option<f64> {
    sound
        .attribute("tempo")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|bpm| *bpm > 0.0)
}

/// Convert MusicXML pitch representation to MIDI note number
///
/// # Arguments
/// * `step` - Note letter (C, D, E, F, G, A, B)
/// * `alter` - Semitone alteration (-2 = double flat ... 2 = double sharp)
/// * `octave` - Octave number (C4 = middle C)
pub fn pitch_to_midi(step: &str, alter: i8, octave: i8) -> u8 {
    let base: i16 = match step {
        "C" => 0,
        "D" => 2,
        "E" => 4,
        "F" => 5,
        "G" => 7,
        "A" => 9,
        "B" => 11,
        _ => 0,
    };
    // MIDI note 0 = C-1, so C4 (middle C) = 60
    let semi = base + alter as i16 + (octave as i16 + 1) * 12;
    semi.clamp(0, 127) as u8
}
