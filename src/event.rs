use crate::common::Time;

/// MIDI status-byte nibbles we actually emit or interpret. Channel is
/// folded into the low nibble at construction time, matching the wire
/// format (`MIDI_CONTROLLER | channel`, etc).
pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROLLER: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const PITCH_WHEEL: u8 = 0xE0;

pub const CC_VOLUME: u8 = 0x07;
pub const CC_EXPRESSION_MSB: u8 = 0x0B;
pub const CC_EXPRESSION_LSB: u8 = 0x2B;
pub const CC_SOUND_BANK_MSB: u8 = 0x00;
pub const CC_SOUND_BANK_LSB: u8 = 0x20;
pub const CC_RPN_MSB: u8 = 0x65;
pub const CC_RPN_LSB: u8 = 0x64;
pub const CC_DATA_ENTRY_MSB: u8 = 0x06;
pub const CC_DATA_ENTRY_LSB: u8 = 0x26;
pub const CC_ALL_NOTES_OFF: u8 = 0x7B;

pub const DRUM_CHANNEL: u8 = 9;
pub const MIDI_CHANNELS: u8 = 16;

/// Internal status value for a tempo change. Never written to the wire:
/// the scheduler consumes it to update its own tempo and drops it.
pub const META_SET_TEMPO: u8 = 0xFF;

/// Internal marker for a hairpin (crescendo/decrescendo), channel folded
/// into the low nibble like a real status byte: `data1` is the
/// percentage, `data2` is the crescendo/decrescendo flag. The scheduler
/// turns this into a run of real expression CC messages; it is never
/// written to the wire as-is.
pub const META_HAIRPIN: u8 = 0xA0;

/// Internal marker for a pitch-wheel slide: `data1` holds the signed
/// semitone offset (two's complement in a `u8`). Like `META_HAIRPIN`, the
/// scheduler expands this into a ramp of real pitch-bend messages.
pub const META_SLIDE: u8 = 0xD0;

/// A single timed MIDI-shaped event living in the timeline. Tracks the
/// original engine's `ncd_event`: a 3-byte wire message plus a tag (used
/// by auto-accompaniment to match live input against a recorded part) and
/// a duration (how long a bucket's events occupy before the next one,
/// used by note-on/note-off pairing and section replay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub tag: Option<char>,
    /// Duration in beats, scaled to microseconds by the scheduler at the
    /// tempo in effect when the bucket plays.
    pub duration_beats: FixedDuration,
}

/// A beat-fraction duration stored as an exact rational (numerator over a
/// power-of-two denominator), since note durations are built from
/// dotted fractions like 1/4, 1/8., 1/16... and float accumulation would
/// eventually misplace buckets relative to `SMALLEST_DURATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FixedDuration {
    numerator: i64,
    denominator: i64,
}

impl FixedDuration {
    pub const ZERO: FixedDuration = FixedDuration { numerator: 0, denominator: 1 };

    pub fn new(numerator: i64, denominator: i64) -> Self {
        let mut d = FixedDuration { numerator, denominator };
        d.reduce();
        d
    }

    fn reduce(&mut self) {
        let g = gcd(self.numerator.abs(), self.denominator.abs()).max(1);
        self.numerator /= g;
        self.denominator /= g;
    }

    pub fn as_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }

    /// Microseconds this duration takes at the given tempo. `conv_unit` is
    /// microseconds per whole note (see [`crate::common::us_per_whole_note`]),
    /// since a duration of `1/4` means a quarter note.
    pub fn to_micros(self, conv_unit: Time) -> Time {
        (self.numerator as i128 * conv_unit as i128 / self.denominator as i128) as Time
    }

    pub fn numerator(self) -> i64 {
        self.numerator
    }

    pub fn denominator(self) -> i64 {
        self.denominator
    }

    pub fn mul_fraction(self, numerator: i64, denominator: i64) -> FixedDuration {
        FixedDuration::new(self.numerator * numerator, self.denominator * denominator)
    }
}

impl std::ops::Add for FixedDuration {
    type Output = FixedDuration;
    fn add(self, rhs: FixedDuration) -> FixedDuration {
        FixedDuration::new(
            self.numerator * rhs.denominator + rhs.numerator * self.denominator,
            self.denominator * rhs.denominator,
        )
    }
}

impl std::ops::Sub for FixedDuration {
    type Output = FixedDuration;
    fn sub(self, rhs: FixedDuration) -> FixedDuration {
        FixedDuration::new(
            self.numerator * rhs.denominator - rhs.numerator * self.denominator,
            self.denominator * rhs.denominator,
        )
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl Event {
    pub fn note_on(channel: u8, note: u8, velocity: u8, tag: Option<char>, duration: FixedDuration) -> Self {
        Event {
            status: NOTE_ON | (channel & 0xF),
            data1: note,
            data2: velocity,
            tag,
            duration_beats: duration,
        }
    }

    pub fn note_off(channel: u8, note: u8, tag: Option<char>) -> Self {
        Event {
            status: NOTE_OFF | (channel & 0xF),
            data1: note,
            data2: 0,
            tag,
            duration_beats: FixedDuration::ZERO,
        }
    }

    pub fn controller(channel: u8, controller: u8, value: u8) -> Self {
        Event {
            status: CONTROLLER | (channel & 0xF),
            data1: controller,
            data2: value,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Event {
            status: PROGRAM_CHANGE | (channel & 0xF),
            data1: program,
            data2: 0,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
    }

    pub fn pitch_wheel(channel: u8, value_14bit: u16) -> Self {
        Event {
            status: PITCH_WHEEL | (channel & 0xF),
            data1: (value_14bit & 0x7F) as u8,
            data2: ((value_14bit >> 7) & 0x7F) as u8,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
    }

    pub fn set_tempo(bpm: u8) -> Self {
        Event {
            status: META_SET_TEMPO,
            data1: 0,
            data2: bpm,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
    }

    /// Queues up a hairpin (crescendo/decrescendo) start marker. Mirrors
    /// `ncd_start_hairpin`'s expression event, minus the bit-packing: the
    /// direction and percentage are kept as separate fields instead of
    /// sharing one data byte.
    pub fn hairpin_start(channel: u8, crescendo: bool, percent: u8) -> Self {
        Event {
            status: META_HAIRPIN | (channel & 0x0F),
            data1: percent & 0x7F,
            data2: crescendo as u8,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
    }

    pub fn hairpin_kind(&self) -> bool {
        (self.status & 0xF0) == META_HAIRPIN
    }

    pub fn hairpin_is_crescendo(&self) -> bool {
        self.data2 != 0
    }

    pub fn hairpin_percent(&self) -> u8 {
        self.data1
    }

    /// Queues up a pitch-wheel slide marker. Mirrors `ncd_slide`.
    pub fn slide(channel: u8, semitones: i8) -> Self {
        Event {
            status: META_SLIDE,
            data1: semitones as u8,
            data2: 0,
            tag: None,
            duration_beats: FixedDuration::ZERO,
        }
        .with_channel(channel)
    }

    pub fn slide_kind(&self) -> bool {
        (self.status & 0xF0) == META_SLIDE
    }

    pub fn slide_semitones(&self) -> i8 {
        self.data1 as i8
    }

    fn with_channel(mut self, channel: u8) -> Self {
        self.status = (self.status & 0xF0) | (channel & 0x0F);
        self
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// True for events that are consumed internally by the scheduler and
    /// never reach `midi_wire::encode`.
    pub fn is_meta(&self) -> bool {
        let kind = self.status & 0xF0;
        self.status == META_SET_TEMPO || kind == META_HAIRPIN || kind == META_SLIDE
    }

    /// Two events refer to the same note for pairing purposes, the way
    /// `ncd_midi_same_event` treats a velocity-0 note-on as a note-off.
    pub fn same_note(&self, other: &Event) -> bool {
        let kind = |s: u8| s & 0xF0;
        let as_off = |e: &Event| {
            kind(e.status) == NOTE_OFF || (kind(e.status) == NOTE_ON && e.data2 == 0)
        };
        self.channel() == other.channel() && self.data1 == other.data1 && as_off(self) == as_off(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_duration_adds_dotted_fractions() {
        let quarter = FixedDuration::new(1, 4);
        let dot = FixedDuration::new(1, 8);
        let dotted_quarter = quarter + dot;
        assert_eq!(dotted_quarter.as_f64(), 0.375);
    }

    #[test]
    fn to_micros_scales_with_tempo() {
        let eighth = FixedDuration::new(1, 8);
        // 120 bpm -> 2_000_000 us per whole note -> 250ms per eighth note
        assert_eq!(eighth.to_micros(2_000_000), 250_000);
    }

    #[test]
    fn velocity_zero_note_on_matches_note_off() {
        let on = Event::note_on(0, 60, 0, None, FixedDuration::ZERO);
        let off = Event::note_off(0, 60, None);
        assert!(on.same_note(&off));
    }

    #[test]
    fn different_channel_does_not_match() {
        let a = Event::note_on(0, 60, 80, None, FixedDuration::ZERO);
        let b = Event::note_on(1, 60, 80, None, FixedDuration::ZERO);
        assert!(!a.same_note(&b));
    }

    proptest::proptest! {
        /// Addition never loses precision to float rounding: summing a
        /// dotted duration back apart by subtracting one term returns the
        /// other exactly, for any pair of power-of-two denominators a
        /// parsed duration could actually produce.
        #[test]
        fn add_then_subtract_recovers_the_other_term(
            a_num in -64i64..64,
            a_shift in 0u32..6,
            b_num in -64i64..64,
            b_shift in 0u32..6,
        ) {
            let a = FixedDuration::new(a_num, 1 << a_shift);
            let b = FixedDuration::new(b_num, 1 << b_shift);
            let sum = a + b;
            proptest::prop_assert_eq!((sum - b).as_f64(), a.as_f64());
        }

        /// `to_micros` scales linearly: doubling the tempo's microseconds-
        /// per-whole-note halves nothing about the duration fraction itself,
        /// it just doubles the resulting microsecond count.
        #[test]
        fn to_micros_scales_linearly_with_tempo(
            num in 1i64..64,
            shift in 0u32..6,
            conv_unit in 1_000i64..10_000_000,
        ) {
            let d = FixedDuration::new(num, 1 << shift);
            let doubled = d.to_micros(conv_unit * 2);
            let single = d.to_micros(conv_unit);
            // integer division can drop up to 1us of precision per halving
            proptest::prop_assert!((doubled - single * 2).abs() <= 1);
        }
    }
}
