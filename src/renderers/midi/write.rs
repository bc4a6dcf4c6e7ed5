use super::model::*;
use super::{MxError, Result};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

/// Highest resolution expressible in a metrical SMF header (15 bits)
const MAX_TPQ: u16 = 0x7FFF;

/// Write a [`MidiScore`] to Standard MIDI File (SMF) Format 1
pub fn write_smf(score: &MidiScore, out: &mut Vec<u8>) -> Result<()> {
    if score.tpq == 0 || score.tpq > MAX_TPQ {
        return Err(MxError::Invalid(format!("ticks per quarter out of range: {}", score.tpq)));
    }

    let mut tracks = Vec::new();

    // Track 0: Tempo and time signature map
    tracks.push(build_conductor_track(score)?);

    // Tracks 1+: One per part
    for part in &score.parts {
        tracks.push(build_part_track(part)?);
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(score.tpq.into()),
    };

    let smf = Smf {
        header,
        tracks,
    };

    smf.write(out)
        .map_err(|e| MxError::Midi(format!("Failed to write MIDI: {}", e)))?;

    Ok(())
}

/// Absolute tick that still fits a 28-bit delta-time field
fn to_tick(tick: u64) -> Result<u32> {
    const MAX_TICK: u64 = 0x0FFF_FFFF;
    if tick > MAX_TICK {
        return Err(MxError::Midi(format!("tick {} exceeds the SMF time range", tick)));
    }
    Ok(tick as u32)
}

fn build_conductor_track<'a>(score: &MidiScore) -> Result<Track<'a>> {
    let mut events = Vec::new();

    // Add tempo changes
    for tempo in &score.tempos {
        if !(tempo.bpm.is_finite() && tempo.bpm > 0.0) {
            return Err(MxError::Invalid(format!("tempo must be positive, got {}", tempo.bpm)));
        }
        let microseconds_per_quarter = ((60_000_000.0 / tempo.bpm) as u32).min(0x00FF_FFFF);
        events.push(TrackEvent {
            delta: to_tick(tempo.tick)?.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter.into())),
        });
    }

    // Add time signatures
    for ts in &score.timesigs {
        // Calculate denominator as power of 2 (e.g., 4 -> 2, 8 -> 3)
        let denominator_power = (ts.den.max(1) as f32).log2() as u8;
        events.push(TrackEvent {
            delta: to_tick(ts.tick)?.into(),
            kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                ts.num,
                denominator_power,
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per quarter note
            )),
        });
    }

    // Sort by tick and convert to delta times
    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(events)
}

fn build_part_track(part: &MidiPart) -> Result<Track<'_>> {
    let mut events = Vec::new();

    // Track name
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(part.name.as_bytes())),
    });

    // Program change (instrument)
    if let Some(program) = part.program {
        events.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: part.channel.into(),
                message: MidiMessage::ProgramChange {
                    program: program.min(127).into(),
                },
            },
        });
    }

    // Note events
    for note in &part.notes {
        // Note On
        events.push(TrackEvent {
            delta: to_tick(note.start_tick)?.into(),
            kind: TrackEventKind::Midi {
                channel: part.channel.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.min(127).into(),
                    vel: note.vel.clamp(1, 127).into(),
                },
            },
        });

        // Note Off
        events.push(TrackEvent {
            delta: to_tick(note.end_tick())?.into(),
            kind: TrackEventKind::Midi {
                channel: part.channel.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.min(127).into(),
                    vel: 0.into(),
                },
            },
        });
    }

    // Sort by absolute tick time; at equal ticks a note off precedes the
    // next note on so repeated pitches re-articulate
    events.sort_by_key(|e| (e.delta.as_int(), !is_note_off(e)));

    // Convert absolute times to delta times
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(events)
}

fn is_note_off(event: &TrackEvent) -> bool {
    matches!(
        event.kind,
        TrackEventKind::Midi { message: MidiMessage::NoteOff { .. }, .. }
    )
}

/// Convert absolute tick times to delta times (time since previous event)
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        let delta = current_tick.saturating_sub(prev_tick);
        event.delta = delta.into();
        prev_tick = current_tick;
    }
}
