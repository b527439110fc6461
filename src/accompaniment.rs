use std::sync::mpsc::{channel, Receiver, Sender};

use crate::common::{self, Bpm};
use crate::event::{Event, FixedDuration, CONTROLLER, META_SET_TEMPO, NOTE_OFF, NOTE_ON};
use crate::timeline::Timeline;
use crate::timer::Stopwatch;
use crate::transport::{self, RawMidiOut};

/// Identifies which recorded voice a human plays live, matched against the
/// one-character tag that follows the channel number on a score row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag(pub char);

/// Forwards decoded note-on/note-off messages from a `midir` input
/// callback to [`LiveNotes`]. Auto-accompaniment only ever waits on notes,
/// the way `ncd_midi_wait_note` does.
pub struct LiveNoteSender {
    sender: Sender<Event>,
}

pub struct LiveNotes {
    receiver: Receiver<Event>,
}

/// Builds a connected sender/receiver pair for feeding live input into
/// [`play_with_accompaniment`].
pub fn live_note_channel() -> (LiveNoteSender, LiveNotes) {
    let (sender, receiver) = channel();
    (LiveNoteSender { sender }, LiveNotes { receiver })
}

impl LiveNoteSender {
    /// Decodes a raw incoming MIDI message and forwards it if it is a
    /// note-on or note-off; anything else (aftertouch, CC, clock) is
    /// dropped, since accompaniment never looks at it.
    pub fn feed(&self, bytes: &[u8]) {
        if let Some(event) = decode_note(bytes) {
            let _ = self.sender.send(event);
        }
    }
}

fn decode_note(bytes: &[u8]) -> Option<Event> {
    let status = *bytes.first()?;
    let kind = status & 0xF0;
    if kind != NOTE_ON && kind != NOTE_OFF {
        return None;
    }
    let channel = status & 0x0F;
    let data1 = *bytes.get(1)?;
    let data2 = *bytes.get(2).unwrap_or(&0);
    Some(if kind == NOTE_ON {
        Event::note_on(channel, data1, data2, None, FixedDuration::ZERO)
    } else {
        Event::note_off(channel, data1, None)
    })
}

impl LiveNotes {
    /// Blocks until the next live note-on/off arrives. Returns `None` only
    /// if the input connection has been dropped.
    fn wait_note(&mut self) -> Option<Event> {
        self.receiver.recv().ok()
    }
}

/// Plays the score pacing tag-less events against wall-clock time, the way
/// the unattended player does, but holds back every event tagged `tag`
/// until the live player strikes a matching note. Mirrors
/// `ncd_auto_accompaniment`.
///
/// As in the original, hairpins and pitch-wheel slides are not interpreted
/// here: `CONTROLLER`-class and meta expression events are dropped rather
/// than acted on, matching the comment that accompaniment "supports
/// neither dynamics (crescendo/diminuendo) nor slides".
pub fn play_with_accompaniment(
    timeline: &mut Timeline,
    tag: Tag,
    live: &mut LiveNotes,
    default_bpm: Bpm,
    transpose_semitones: i8,
    randomize_percent: u8,
    out: &mut dyn RawMidiOut,
) {
    let mut conv_unit = common::us_per_whole_note(default_bpm);
    let mut stopwatch = Stopwatch::new();
    timeline.rewind();
    let mut prev_start = FixedDuration::ZERO;

    while let Some(bucket) = timeline.pop_bucket() {
        let mut remaining: Vec<Event> = bucket.events.borrow().clone();
        let mut still_waiting = remaining
            .iter()
            .filter(|e| e.tag == Some(tag.0))
            .count();

        if still_waiting == 0 {
            let gap = bucket.start - prev_start;
            if !gap.is_zero() {
                stopwatch.sleep_for(gap.to_micros(conv_unit));
            }
        } else {
            while still_waiting > 0 {
                let Some(played) = live.wait_note() else {
                    break;
                };
                if let Some(pos) = remaining
                    .iter()
                    .position(|e| e.tag == Some(tag.0) && e.same_note(&played))
                {
                    remaining.remove(pos);
                    still_waiting -= 1;
                }
            }
        }

        for event in &remaining {
            if event.status == META_SET_TEMPO {
                conv_unit = common::us_per_whole_note(event.data2 as Bpm);
                continue;
            }
            if (event.status & 0xF0) == CONTROLLER || event.is_meta() {
                continue;
            }

            let mut to_send = *event;
            let kind = to_send.status & 0xF0;
            if kind == NOTE_ON {
                to_send.data2 = crate::randomize::randomize(to_send.data2, randomize_percent);
            }
            if to_send.channel() != crate::event::DRUM_CHANNEL
                && (kind == NOTE_ON || kind == NOTE_OFF)
            {
                to_send.data1 = to_send.data1.wrapping_add(transpose_semitones as u8);
            }
            transport::emit(out, &to_send);
        }

        prev_start = bucket.start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_note_ignores_non_note_messages() {
        assert!(decode_note(&[0xB0, 0x07, 0x40]).is_none());
    }

    #[test]
    fn decode_note_reads_note_on() {
        let event = decode_note(&[0x90, 0x3C, 0x50]).unwrap();
        assert_eq!(event.data1, 0x3C);
        assert_eq!(event.data2, 0x50);
    }
}
