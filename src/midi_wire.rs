use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;

use crate::event::{Event, CONTROLLER, NOTE_OFF, NOTE_ON, PITCH_WHEEL, PROGRAM_CHANGE};

/// Encodes a timeline [`Event`] into the 2-3 raw bytes a MIDI transport
/// sends over the wire. Returns `None` for events that never leave the
/// process (tempo changes): the original engine queues these the same way
/// as wire events but recognizes and swallows them before they would ever
/// reach `NCD_MIDI_EVENT`.
pub fn encode(event: &Event) -> Option<Vec<u8>> {
    let channel: u4 = (event.channel() & 0x0F).into();
    let kind = event.status & 0xF0;
    let message = match kind {
        NOTE_ON => MidiMessage::NoteOn {
            key: u7::from(event.data1 & 0x7F),
            vel: u7::from(event.data2 & 0x7F),
        },
        NOTE_OFF => MidiMessage::NoteOff {
            key: u7::from(event.data1 & 0x7F),
            vel: u7::from(event.data2 & 0x7F),
        },
        CONTROLLER => MidiMessage::Controller {
            controller: u7::from(event.data1 & 0x7F),
            value: u7::from(event.data2 & 0x7F),
        },
        PROGRAM_CHANGE => MidiMessage::ProgramChange {
            program: u7::from(event.data1 & 0x7F),
        },
        PITCH_WHEEL => {
            let value = (event.data1 as u16 & 0x7F) | ((event.data2 as u16 & 0x7F) << 7);
            let signed = value as i32 - 0x2000; // centered on 8192
            MidiMessage::PitchBend {
                bend: midly::PitchBend::from_int(signed as i16),
            }
        }
        _ => return None,
    };
    let live = LiveEvent::Midi { channel, message };
    let mut raw = Vec::with_capacity(3);
    live.write(&mut raw).expect("writing to a Vec cannot fail");
    Some(raw)
}

/// All-notes-off plus reset-all-controllers for every channel, sent when
/// the player starts or is interrupted. Mirrors `ncd_midi_all_notes_off`.
pub fn panic_messages() -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(32);
    for channel in 0u8..16 {
        let off = Event::controller(channel, 0x7B, 0); // all notes off
        let reset = Event::controller(channel, 0x79, 0); // reset all controllers
        out.push(encode(&off).unwrap());
        out.push(encode(&reset).unwrap());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FixedDuration;

    #[test]
    fn note_on_encodes_to_three_bytes() {
        let ev = Event::note_on(3, 60, 100, None, FixedDuration::ZERO);
        let raw = encode(&ev).unwrap();
        assert_eq!(raw, vec![0x90 | 3, 60, 100]);
    }

    #[test]
    fn program_change_encodes_to_two_bytes() {
        let ev = Event::program_change(0, 40);
        let raw = encode(&ev).unwrap();
        assert_eq!(raw, vec![0xC0, 40]);
    }

    #[test]
    fn tempo_change_does_not_encode() {
        let ev = Event::set_tempo(120);
        assert!(encode(&ev).is_none());
    }

    #[test]
    fn pitch_wheel_round_trips_14_bits() {
        let ev = Event::pitch_wheel(0, 0x1FFF);
        let raw = encode(&ev).unwrap();
        assert_eq!(raw[0] & 0xF0, 0xE0);
    }
}
