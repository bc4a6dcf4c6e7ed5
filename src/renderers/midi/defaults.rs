//! Default values for MIDI rendering
//!
//! Provides sensible defaults for tempo, velocity, channel assignment, etc.

/// Default tempo in beats per minute, used when the score has no tempo mark
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Default MIDI velocity (1-127, where 64 is "normal")
pub const DEFAULT_VELOCITY: u8 = 64;

/// Default MIDI program (52 = Choir Aahs in General MIDI, 0-based)
pub const DEFAULT_VOICE_PROGRAM: u8 = 52;

/// Default ticks per quarter note (MIDI resolution)
/// 480 is standard and provides good resolution
pub const DEFAULT_TPQ: u16 = 480;

/// Velocity added to accented notes
pub const ACCENT_BOOST: u8 = 16;

/// Assign MIDI channel from part index
/// - Channels 0-15 are available
/// - Channel 9 (10 in 1-indexed) is reserved for drums
/// - Skip channel 9 for melodic instruments
pub fn assign_channel(part_index: usize) -> u8 {
    let channel = part_index % 15;
    if channel >= 9 {
        // Skip channel 9 (drums), map 9→10, 10→11, ..., 14→15
        (channel + 1) as u8
    } else {
        channel as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_channel() {
        assert_eq!(assign_channel(0), 0);
        assert_eq!(assign_channel(1), 1);
        assert_eq!(assign_channel(8), 8);
        assert_eq!(assign_channel(9), 10);  // Skip channel 9
        assert_eq!(assign_channel(10), 11);
        assert_eq!(assign_channel(14), 15);
        assert_eq!(assign_channel(15), 0);  // Wrap around
    }

    #[test]
    fn test_drum_channel_never_assigned() {
        assert!((0..64).all(|i| assign_channel(i) != 9));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_TEMPO_BPM, 120.0);
        assert_eq!(DEFAULT_VELOCITY, 64);
        assert_eq!(DEFAULT_VOICE_PROGRAM, 52);
        assert_eq!(DEFAULT_TPQ, 480);
    }
}
