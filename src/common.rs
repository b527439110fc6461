/// Score and playback time in microseconds.
pub type Time = i64;

/// Beats per minute, as set by a `bpm` directive or the config default.
pub type Bpm = f64;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Default MIDI volume (0..127) a channel starts at before any `bpm`-style
/// voice binding or hairpin touches it. Mirrors `DEFVOLUME`.
pub const DEFAULT_VOLUME: u8 = 100;

/// Default pitch-bend range, in semitones either side of center, set on
/// every channel at startup via the RPN sequence. Mirrors the `+/-2`
/// semitone range `ncd_midi_init` programs.
pub const DEFAULT_PITCH_BEND_SEMITONES: u8 = 2;

/// `SCHED_FIFO` priority requested at startup, mirroring `sp.sched_priority
/// = 98` in the original's `main`.
pub const REALTIME_PRIORITY: i32 = 98;

/// Microseconds per whole note at the given tempo, mirroring the original
/// `BPM2US` conversion (`2.4E8 / bpm`). Duration fractions throughout this
/// crate are expressed relative to a whole note (a quarter note is `1/4`),
/// so this is the scale factor that turns one into microseconds.
pub fn us_per_whole_note(bpm: Bpm) -> Time {
    (240_000_000.0 / bpm).round() as Time
}
