//! Score-to-MIDI conversion
//!
//! Flattens the measure grid of a [`Score`] into absolute-tick MIDI notes.
//! Measures are laid end to end using their full duration, so every part of
//! a decomposed stream stays aligned with the others.

use std::collections::HashMap;

use super::defaults::{assign_channel, ACCENT_BOOST};
use super::model::{quarters_to_ticks, MidiNote, MidiPart, MidiScore, Tempo, TimeSig};
use super::RenderSettings;
use crate::models::{Event, Part, Rational, Score, Tie, VoiceSet};

/// Convert a score to a [`MidiScore`]
///
/// # Arguments
/// * `score` - Score or decomposed voice stream
/// * `settings` - Resolution, tempo fallback and velocity
/// * `program` - General MIDI program for every track
pub fn score_to_midi(score: &Score, settings: &RenderSettings, program: u8) -> MidiScore {
    let tpq = settings.tpq;

    let mut tempos: Vec<Tempo> = score
        .tempos
        .iter()
        .map(|t| Tempo {
            tick: quarters_to_ticks(t.offset, tpq),
            bpm: t.bpm,
        })
        .collect();
    tempos.sort_by_key(|t| t.tick);
    if tempos.first().map_or(true, |t| t.tick > 0) {
        tempos.insert(0, Tempo { tick: 0, bpm: settings.tempo_bpm });
    }

    let parts = score
        .parts
        .iter()
        .enumerate()
        .map(|(index, part)| convert_part(part, index, settings, program))
        .collect();

    MidiScore {
        tpq,
        tempos,
        timesigs: score.parts.first().map(|p| time_signatures(p, tpq)).unwrap_or_default(),
        parts,
    }
}

/// Time signature changes of the first part, in ticks
fn time_signatures(part: &Part, tpq: u16) -> Vec<TimeSig> {
    let mut timesigs: Vec<TimeSig> = Vec::new();
    let mut measure_start = Rational::from_integer(0);

    for measure in &part.measures {
        if let Some(time) = measure.attributes.time {
            let changed = timesigs
                .last()
                .map_or(true, |ts| ts.num != time.beats || ts.den != time.beat_type);
            if changed {
                timesigs.push(TimeSig {
                    tick: quarters_to_ticks(measure_start, tpq),
                    num: time.beats,
                    den: time.beat_type,
                });
            }
        }
        measure_start += measure.duration_or_default();
    }

    timesigs
}

/// Convert one part to a MIDI track, merging tied notes
fn convert_part(part: &Part, part_index: usize, settings: &RenderSettings, program: u8) -> MidiPart {
    let tpq = settings.tpq;
    let mut notes: Vec<MidiNote> = Vec::new();
    // Notes whose tie is still open, by (voices, pitch)
    let mut open_ties: HashMap<(VoiceSet, u8), usize> = HashMap::new();
    let mut measure_start = Rational::from_integer(0);

    for measure in &part.measures {
        for event in measure.events.iter().filter(|e| e.is_pitched()) {
            let start = quarters_to_ticks(measure_start + event.offset, tpq);
            let end = quarters_to_ticks(measure_start + event.end(), tpq);
            let continues = matches!(event.tie, Some(Tie::Stop) | Some(Tie::Continue));
            let holds = matches!(event.tie, Some(Tie::Start) | Some(Tie::Continue));

            for &pitch in event.pitches() {
                let key = (event.voices, pitch);

                let tied_to = open_ties
                    .get(&key)
                    .copied()
                    .filter(|&i| continues && notes[i].end_tick() == start);

                let index = match tied_to {
                    Some(i) => {
                        notes[i].dur_tick = end.saturating_sub(notes[i].start_tick);
                        i
                    }
                    None => {
                        notes.push(MidiNote {
                            start_tick: start,
                            dur_tick: end.saturating_sub(start),
                            pitch,
                            vel: velocity_for(event, settings.velocity),
                        });
                        notes.len() - 1
                    }
                };

                if holds {
                    open_ties.insert(key, index);
                } else {
                    open_ties.remove(&key);
                }
            }
        }
        measure_start += measure.duration_or_default();
    }

    notes.retain(|n| n.dur_tick > 0);
    notes.sort_by_key(|n| (n.start_tick, n.pitch));

    MidiPart {
        id: part.id.clone(),
        name: part.display_name(part_index),
        channel: assign_channel(part_index),
        program: Some(program),
        notes,
    }
}

/// Accented notes are played louder; everything else uses the base velocity
fn velocity_for(event: &Event, base: u8) -> u8 {
    let accented = event
        .articulations
        .iter()
        .any(|a| a == "accent" || a == "strong-accent");
    if accented {
        base.saturating_add(ACCENT_BOOST).min(127)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Measure, MeasureAttributes, TimeSignature};

    fn q(n: i32) -> Rational {
        Rational::from_integer(n)
    }

    fn measure(duration: i32, events: Vec<Event>) -> Measure {
        Measure {
            number: "1".to_string(),
            duration: Some(q(duration)),
            events,
            ..Default::default()
        }
    }

    fn part(measures: Vec<Measure>) -> Part {
        Part {
            id: "P1".to_string(),
            name: Some("Alto".to_string()),
            measures,
            ..Default::default()
        }
    }

    fn tied(mut event: Event, tie: Tie) -> Event {
        event.tie = Some(tie);
        event
    }

    #[test]
    fn test_measures_laid_end_to_end() {
        let voice = VoiceSet::single(1);
        let score = Score {
            parts: vec![part(vec![
                measure(3, vec![Event::note(q(0), q(3), 64, voice)]),
                measure(4, vec![Event::rest(q(0), q(2), voice), Event::note(q(2), q(2), 62, voice)]),
            ])],
            ..Default::default()
        };

        let midi = score_to_midi(&score, &RenderSettings::default(), 52);
        let notes = &midi.parts[0].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].start_tick, notes[0].dur_tick), (0, 1440));
        assert_eq!((notes[1].start_tick, notes[1].dur_tick), (2400, 960));
        assert_eq!(midi.parts[0].name, "Alto");
        assert_eq!(midi.parts[0].program, Some(52));
    }

    #[test]
    fn test_tied_notes_merge_across_barline() {
        let voice = VoiceSet::single(1);
        let score = Score {
            parts: vec![part(vec![
                measure(4, vec![
                    Event::note(q(0), q(2), 60, voice),
                    tied(Event::note(q(2), q(2), 67, voice), Tie::Start),
                ]),
                measure(4, vec![
                    tied(Event::note(q(0), q(4), 67, voice), Tie::Continue),
                ]),
                measure(4, vec![
                    tied(Event::note(q(0), q(1), 67, voice), Tie::Stop),
                    Event::note(q(1), q(1), 67, voice),
                ]),
            ])],
            ..Default::default()
        };

        let midi = score_to_midi(&score, &RenderSettings::default(), 52);
        let notes = &midi.parts[0].notes;
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[1], MidiNote { start_tick: 960, dur_tick: 480 * 7, pitch: 67, vel: 64 });
        assert_eq!(notes[2].start_tick, 480 * 9);
    }

    #[test]
    fn test_tie_without_matching_start_sounds_separately() {
        let voice = VoiceSet::single(1);
        let score = Score {
            parts: vec![part(vec![measure(4, vec![
                Event::note(q(0), q(2), 60, voice),
                tied(Event::note(q(2), q(2), 60, voice), Tie::Stop),
            ])])],
            ..Default::default()
        };

        let midi = score_to_midi(&score, &RenderSettings::default(), 52);
        assert_eq!(midi.parts[0].notes.len(), 2);
    }

    #[test]
    fn test_tempo_and_time_signatures() {
        let mut first = measure(3, vec![Event::note(q(0), q(3), 60, VoiceSet::single(1))]);
        first.attributes = MeasureAttributes {
            time: Some(TimeSignature { beats: 3, beat_type: 4 }),
            ..Default::default()
        };
        let mut third = measure(4, vec![]);
        third.attributes.time = Some(TimeSignature { beats: 4, beat_type: 4 });

        let score = Score {
            tempos: vec![crate::models::Tempo { offset: q(6), bpm: 60.0 }],
            parts: vec![part(vec![first.clone(), first, third])],
            ..Default::default()
        };

        let midi = score_to_midi(&score, &RenderSettings::default(), 52);
        assert_eq!(midi.tempos, vec![
            Tempo { tick: 0, bpm: 120.0 },
            Tempo { tick: 2880, bpm: 60.0 },
        ]);
        assert_eq!(midi.timesigs, vec![
            TimeSig { tick: 0, num: 3, den: 4 },
            TimeSig { tick: 2880, num: 4, den: 4 },
        ]);
    }

    #[test]
    fn test_accent_raises_velocity() {
        let mut event = Event::note(q(0), q(1), 60, VoiceSet::single(1));
        assert_eq!(velocity_for(&event, 64), 64);
        event.articulations = vec!["accent".to_string()];
        assert_eq!(velocity_for(&event, 64), 80);
        assert_eq!(velocity_for(&event, 120), 127);
    }
}
