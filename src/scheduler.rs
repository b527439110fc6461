use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::{self, Bpm};
use crate::config::Config;
use crate::event::{
    Event, FixedDuration, CC_VOLUME, CONTROLLER, DRUM_CHANNEL, META_SET_TEMPO, MIDI_CHANNELS,
    NOTE_OFF, NOTE_ON,
};
use crate::randomize;
use crate::timeline::Timeline;
use crate::timer::Stopwatch;
use crate::transport::{self, RawMidiOut};

/// Centered pitch-wheel value, matching `NOBENDING`.
const NO_BENDING: f64 = 0x2000 as f64;

/// Per-channel crescendo/decrescendo ramp state, mirroring `ncd_volume`.
#[derive(Debug, Clone, Copy)]
struct Expression {
    /// Nominal volume the last voice binding (or init default) set; the
    /// base a hairpin's percentage is computed against, not the possibly
    /// already-ramped `current` value.
    reference: f64,
    current: f64,
    step: f64,
    left_us: i64,
}

impl Expression {
    fn new(default_volume: u8) -> Self {
        Expression {
            reference: default_volume as f64,
            current: default_volume as f64,
            step: 0.0,
            left_us: 0,
        }
    }
}

/// Per-channel pitch-bend ramp state, mirroring `ncd_pitch`.
#[derive(Debug, Clone, Copy)]
struct PitchWheel {
    current: f64,
    step: f64,
    left_us: i64,
}

impl PitchWheel {
    fn new() -> Self {
        PitchWheel { current: NO_BENDING, step: 0.0, left_us: 0 }
    }
}

/// Real-time playback of a compiled [`Timeline`]. Mirrors `ncd_play`'s
/// drift-corrected scheduling loop, including its expression-hairpin and
/// pitch-wheel-slide tick interpolation.
pub struct Scheduler {
    conv_unit: i64,
    expr_tick_us: i64,
    slide_cap_us: i64,
    transpose_semitones: i8,
    randomize_percent: u8,
    expression: Vec<Expression>,
    pitch: Vec<PitchWheel>,
}

impl Scheduler {
    pub fn new(config: &Config, default_volume: u8, transpose_semitones: i8) -> Self {
        Scheduler {
            conv_unit: common::us_per_whole_note(config.default_bpm),
            expr_tick_us: config.expression_tick_us,
            slide_cap_us: config.pitch_wheel_slide_us,
            transpose_semitones,
            randomize_percent: config.default_randomness_percent,
            expression: vec![Expression::new(default_volume); MIDI_CHANNELS as usize],
            pitch: vec![PitchWheel::new(); MIDI_CHANNELS as usize],
        }
    }

    /// Plays the whole timeline from the start. `interrupt`, if set between
    /// ticks, stops playback early and silences every channel, the way the
    /// original's `SIGINT` handler does.
    pub fn play(&mut self, timeline: &mut Timeline, out: &mut dyn RawMidiOut, interrupt: &AtomicBool) {
        let mut stopwatch = Stopwatch::new();
        timeline.rewind();
        let mut prev_start = FixedDuration::ZERO;

        while let Some(bucket) = timeline.pop_bucket() {
            if interrupt.load(Ordering::Relaxed) {
                transport::all_notes_off(out);
                return;
            }

            let mut gap_us = (bucket.start - prev_start).to_micros(self.conv_unit);

            while gap_us >= self.expr_tick_us {
                if interrupt.load(Ordering::Relaxed) {
                    transport::all_notes_off(out);
                    return;
                }
                stopwatch.sleep_for(self.expr_tick_us);
                gap_us -= self.expr_tick_us;
                self.tick_ramps(out);
            }
            stopwatch.sleep_for(gap_us);

            self.center_bent_channels(out);

            for event in bucket.events.borrow().iter() {
                self.handle(event, out);
            }

            prev_start = bucket.start;
        }
    }

    /// Advances every channel's expression and pitch-wheel ramp by one tick.
    fn tick_ramps(&mut self, out: &mut dyn RawMidiOut) {
        for channel in 0..MIDI_CHANNELS {
            let expr = &mut self.expression[channel as usize];
            if expr.left_us > 0 {
                let new_value = expr.current + expr.step;
                if new_value > 127.0 || new_value < 0.0 {
                    expr.left_us = 0;
                } else {
                    expr.left_us = (expr.left_us - self.expr_tick_us).max(0);
                    if new_value as i32 != expr.current as i32 {
                        transport::emit(out, &Event::controller(channel, CC_VOLUME, new_value as u8));
                    }
                    expr.current = new_value;
                }
            }

            let pitch = &mut self.pitch[channel as usize];
            if pitch.left_us > 0 {
                let new_value = pitch.current + pitch.step;
                if new_value > 0x3FFF as f64 || new_value < 0.0 {
                    pitch.left_us = 0;
                } else {
                    pitch.left_us = (pitch.left_us - self.expr_tick_us).max(0);
                    if new_value as i32 != pitch.current as i32 {
                        transport::emit(out, &Event::pitch_wheel(channel, new_value as u16));
                    }
                    pitch.current = new_value;
                }
            }
        }
    }

    /// Resets every channel whose pitch wheel is still bent back to center,
    /// at the end of a slid note. Mirrors the per-node reset loop in
    /// `ncd_play`.
    fn center_bent_channels(&mut self, out: &mut dyn RawMidiOut) {
        for channel in 0..MIDI_CHANNELS {
            let pitch = &mut self.pitch[channel as usize];
            if pitch.current != NO_BENDING {
                pitch.current = NO_BENDING;
                transport::emit(out, &Event::pitch_wheel(channel, NO_BENDING as u16));
            }
        }
    }

    fn handle(&mut self, event: &Event, out: &mut dyn RawMidiOut) {
        if event.status == META_SET_TEMPO {
            self.conv_unit = common::us_per_whole_note(event.data2 as Bpm);
            return;
        }

        if event.hairpin_kind() {
            self.start_hairpin(event);
            return;
        }

        if event.slide_kind() {
            self.start_slide(event);
            return;
        }

        let channel = event.channel();
        if (event.status & 0xF0) == CONTROLLER && event.data1 == CC_VOLUME {
            self.expression[channel as usize].reference = event.data2 as f64;
            self.expression[channel as usize].current = event.data2 as f64;
        }

        let mut to_send = *event;
        let kind = to_send.status & 0xF0;
        if kind == NOTE_ON {
            to_send.data2 = randomize::randomize(to_send.data2, self.randomize_percent);
        }
        if channel != DRUM_CHANNEL && (kind == NOTE_ON || kind == NOTE_OFF) {
            to_send.data1 = to_send.data1.wrapping_add(self.transpose_semitones as u8);
        }
        transport::emit(out, &to_send);
    }

    /// Sets up a crescendo/decrescendo ramp. Mirrors the `MIDI_EXPRESSION_MSB`
    /// branch of `ncd_play`.
    fn start_hairpin(&mut self, event: &Event) {
        let channel = event.channel();
        let expr = &mut self.expression[channel as usize];
        let curr_volume = expr.current;

        let mut final_volume = if event.hairpin_is_crescendo() {
            expr.reference * (100.0 + event.hairpin_percent() as f64) / 100.0
        } else {
            expr.reference * (100.0 - event.hairpin_percent() as f64) / 100.0
        };

        if final_volume > 127.0 {
            final_volume = 127.0;
            log::warn!(
                "expression hairpin on channel {} increased volume past 127, clipped",
                channel + 1
            );
        } else if final_volume < 0.0 {
            final_volume = 0.0;
            log::warn!(
                "expression hairpin on channel {} decreased volume below 0, clipped",
                channel + 1
            );
        }

        let volume_delta = final_volume - curr_volume;
        if event.hairpin_is_crescendo() && volume_delta < 0.0 {
            log::warn!("current volume is already above the crescendo target; did you mean a decrescendo?");
        } else if !event.hairpin_is_crescendo() && volume_delta > 0.0 {
            log::warn!("current volume is already below the decrescendo target; did you mean a crescendo?");
        }

        let duration_us = event.duration_beats.to_micros(self.conv_unit).max(1);
        let mut step = self.expr_tick_us as f64 * volume_delta / duration_us as f64;
        if step.abs() > volume_delta.abs() {
            step = volume_delta;
            log::warn!("expression hairpin does not apply: note duration too short");
        }

        expr.step = step;
        expr.left_us = duration_us;
    }

    /// Sets up a pitch-bend slide. Mirrors the `MIDI_PITCH_WHEEL` branch of
    /// `ncd_play`.
    fn start_slide(&mut self, event: &Event) {
        let channel = event.channel();
        let mut semitones = event.slide_semitones();
        if semitones.abs() > 2 {
            log::warn!("sliding more than one tone is currently not supported");
            semitones = if semitones > 0 { 2 } else { -2 };
        }

        let pitch = &mut self.pitch[channel as usize];
        pitch.current = NO_BENDING;

        let duration_us = event.duration_beats.to_micros(self.conv_unit).max(1);
        let slope_us = duration_us.min(self.slide_cap_us).max(1);
        pitch.step = self.expr_tick_us as f64 * semitones as f64 * 0x1000 as f64 / slope_us as f64;
        pitch.left_us = slope_us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FixedDuration;
    use crate::transport::RecordingOut;

    fn dur(n: i64, d: i64) -> FixedDuration {
        FixedDuration::new(n, d)
    }

    #[test]
    fn tempo_change_retargets_conv_unit_without_sending_anything() {
        let config = Config::load(None).unwrap();
        let mut scheduler = Scheduler::new(&config, 100, 0);
        let mut out = RecordingOut::new();
        scheduler.handle(&Event::set_tempo(90), &mut out);
        assert!(out.sent.is_empty());
        assert_eq!(scheduler.conv_unit, common::us_per_whole_note(90.0));
    }

    #[test]
    fn plays_a_single_note_through_to_the_sink() {
        let config = Config::load(None).unwrap();
        let mut scheduler = Scheduler::new(&config, 100, 0);
        let mut timeline = Timeline::new();
        timeline.new_group();
        timeline.push_event(Event::note_on(0, 60, 90, None, dur(1, 64)), dur(1, 64), false);
        timeline.new_line();
        timeline.push_event(Event::note_off(0, 60, None), FixedDuration::ZERO, true);

        let mut out = RecordingOut::new();
        let interrupt = AtomicBool::new(false);
        scheduler.play(&mut timeline, &mut out, &interrupt);

        assert_eq!(out.sent.len(), 2);
        assert_eq!(out.sent[0][0], 0x90);
        assert_eq!(out.sent[1][0], 0x80);
    }

    #[test]
    fn interrupt_flag_silences_and_stops_early() {
        let config = Config::load(None).unwrap();
        let mut scheduler = Scheduler::new(&config, 100, 0);
        let mut timeline = Timeline::new();
        timeline.new_group();
        timeline.push_event(Event::note_on(0, 60, 90, None, dur(1, 4)), dur(1, 4), false);

        let mut out = RecordingOut::new();
        let interrupt = AtomicBool::new(true);
        scheduler.play(&mut timeline, &mut out, &interrupt);

        // all-notes-off plus reset-all-controllers on every channel
        assert_eq!(out.sent.len(), 32);
    }
}
