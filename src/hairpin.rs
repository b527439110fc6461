use crate::event::{Event, FixedDuration, MIDI_CHANNELS};
use crate::timeline::{EventRef, Timeline};

/// Tracks, per channel, the hairpin currently open for writing (between a
/// `<percent`/`>percent` token and the matching `=`). Mirrors the
/// `hairpin[MIDI_CHANNELS]` table in the original engine.
pub struct HairpinTracker {
    open: Vec<Option<(EventRef, FixedDuration)>>,
}

impl HairpinTracker {
    pub fn new() -> Self {
        HairpinTracker {
            open: vec![None; MIDI_CHANNELS as usize],
        }
    }

    /// Opens a hairpin on `channel`. If one is already open it is closed
    /// first, the way `ncd_start_hairpin` closes a dangling hairpin
    /// before starting the next one.
    pub fn start(
        &mut self,
        timeline: &mut Timeline,
        channel: u8,
        crescendo: bool,
        percent: u8,
        last_note_duration: FixedDuration,
    ) {
        if self.open[channel as usize].is_some() {
            self.stop(timeline, channel, last_note_duration).ok();
        }
        let event_ref = timeline.push_event(
            Event::hairpin_start(channel, crescendo, percent),
            FixedDuration::ZERO,
            false,
        );
        let start_time = timeline.current_time() + last_note_duration;
        self.open[channel as usize] = Some((event_ref, start_time));
    }

    /// Closes the hairpin on `channel`, patching its duration to the
    /// elapsed time since it opened. Mirrors `ncd_stop_hairpin`.
    pub fn stop(
        &mut self,
        timeline: &mut Timeline,
        channel: u8,
        last_note_duration: FixedDuration,
    ) -> Result<(), String> {
        let (event_ref, start_time) = self.open[channel as usize]
            .take()
            .ok_or_else(|| "no hairpin to close".to_string())?;
        let elapsed = timeline.current_time() + last_note_duration - start_time;
        timeline.set_duration(event_ref, elapsed);
        Ok(())
    }
}

impl Default for HairpinTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dur(n: i64, d: i64) -> FixedDuration {
        FixedDuration::new(n, d)
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let mut timeline = Timeline::new();
        let mut tracker = HairpinTracker::new();
        assert!(tracker.stop(&mut timeline, 0, dur(1, 4)).is_err());
    }

    #[test]
    fn start_then_stop_patches_duration() {
        let mut timeline = Timeline::new();
        timeline.new_group();
        let mut tracker = HairpinTracker::new();
        tracker.start(&mut timeline, 0, true, 50, FixedDuration::ZERO);
        timeline.push_rest(dur(1, 4));
        tracker.stop(&mut timeline, 0, FixedDuration::ZERO).unwrap();
        timeline.rewind();
        let bucket = timeline.pop_bucket().unwrap();
        assert_eq!(bucket.events.borrow()[0].duration_beats, dur(1, 4));
    }
}
