use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::error::StartupError;
use crate::event::{Event, MIDI_CHANNELS};
use crate::midi_wire;

/// Something that can accept raw MIDI bytes. Abstracts over a real
/// `midir::MidiOutputConnection` so the scheduler and its tests can run
/// against a recording sink instead of hardware.
pub trait RawMidiOut {
    fn send_raw(&mut self, bytes: &[u8]);
}

impl RawMidiOut for MidiOutputConnection {
    fn send_raw(&mut self, bytes: &[u8]) {
        if let Err(e) = self.send(bytes) {
            log::warn!("failed to send MIDI message: {}", e);
        }
    }
}

/// A timeline [`Event`] sent through a [`RawMidiOut`], dropping the events
/// that never reach the wire (tempo changes).
pub fn emit(out: &mut dyn RawMidiOut, event: &Event) {
    if let Some(raw) = midi_wire::encode(event) {
        out.send_raw(&raw);
    }
}

/// Sends all-notes-off and reset-all-controllers on every channel.
/// Mirrors `ncd_midi_all_notes_off`, called on startup and on interrupt.
pub fn all_notes_off(out: &mut dyn RawMidiOut) {
    for bytes in midi_wire::panic_messages() {
        out.send_raw(&bytes);
    }
}

/// Opens the named output port, or the first available one if `name` is
/// `None` or empty. Mirrors the manual port scan in `ncd_midi_init`,
/// generalized from a single hardcoded ALSA device to any `midir` backend.
pub fn open_output(name: Option<&str>) -> Result<MidiOutputConnection, StartupError> {
    let midi_out = MidiOutput::new(crate::common::APP_NAME).map_err(|e| StartupError::Midi {
        context: "cannot initialize MIDI output".to_string(),
        message: e.to_string(),
    })?;

    let ports = midi_out.ports();
    if ports.is_empty() {
        return Err(StartupError::Midi {
            context: "cannot open MIDI output".to_string(),
            message: "no MIDI output ports available".to_string(),
        });
    }

    let chosen = match name.filter(|n| !n.is_empty()) {
        Some(wanted) => ports
            .iter()
            .find(|p| matches_port_name(&midi_out, p, wanted))
            .ok_or_else(|| StartupError::Midi {
                context: "cannot open MIDI output".to_string(),
                message: format!("no output port matching '{}'", wanted),
            })?,
        None => &ports[0],
    };

    let port_name = midi_out
        .port_name(chosen)
        .unwrap_or_else(|_| "<unknown>".to_string());
    log::info!("connecting to MIDI output port '{}'", port_name);

    midi_out
        .connect(chosen, crate::common::APP_NAME)
        .map_err(|e| StartupError::Midi {
            context: "cannot connect to MIDI output port".to_string(),
            message: e.to_string(),
        })
}

/// Opens an input port for auto-accompaniment: an explicit `name`, or a
/// scan for a port whose name contains "keyboard". Mirrors
/// `ncd_midi_detect_keyboard_device`, generalized from an ALSA card/device
/// enumeration to a `midir` port scan.
pub fn open_input<F>(name: Option<&str>, mut on_message: F) -> Result<MidiInputConnection<()>, StartupError>
where
    F: FnMut(&[u8]) + Send + 'static,
{
    let midi_in = MidiInput::new(crate::common::APP_NAME).map_err(|e| StartupError::Midi {
        context: "cannot initialize MIDI input".to_string(),
        message: e.to_string(),
    })?;

    let ports = midi_in.ports();
    let wanted = name.filter(|n| !n.is_empty()).unwrap_or("keyboard");
    let chosen = ports
        .iter()
        .find(|p| matches_port_name(&midi_in, p, wanted))
        .ok_or_else(|| StartupError::Midi {
            context: "cannot open MIDI input".to_string(),
            message: format!("no input port matching '{}'", wanted),
        })?;

    let port_name = midi_in
        .port_name(chosen)
        .unwrap_or_else(|_| "<unknown>".to_string());
    log::info!("connecting to MIDI input port '{}'", port_name);

    midi_in
        .connect(
            chosen,
            crate::common::APP_NAME,
            move |_stamp, message, _| on_message(message),
            (),
        )
        .map_err(|e| StartupError::Midi {
            context: "cannot connect to MIDI input port".to_string(),
            message: e.to_string(),
        })
}

fn matches_port_name<IO: midir::MidiIO>(io: &IO, port: &IO::Port, wanted: &str) -> bool {
    io.port_name(port)
        .map(|n| n.to_lowercase().contains(&wanted.to_lowercase()))
        .unwrap_or(false)
}

/// Initializes per-channel state the way `ncd_midi_init`'s channel loop
/// does: default volume, centered pitch wheel, and a +/- 2 semitone pitch
/// bend range.
pub fn init_channels(out: &mut dyn RawMidiOut, default_volume: u8, pitch_bend_semitones: u8) {
    for channel in 0..MIDI_CHANNELS {
        emit(out, &Event::controller(channel, 0x07, default_volume & 0x7F));
        emit(out, &Event::pitch_wheel(channel, 0x2000));
        start_rpn(out, channel, 0x00, 0x00);
        emit(out, &Event::controller(channel, 0x06, pitch_bend_semitones));
        emit(out, &Event::controller(channel, 0x26, 0x00));
        stop_rpn(out, channel);
    }
}

/// Mirrors `ncd_midi_start_rpn`.
pub fn start_rpn(out: &mut dyn RawMidiOut, channel: u8, rpn_msb: u8, rpn_lsb: u8) {
    emit(out, &Event::controller(channel, 0x65, rpn_msb));
    emit(out, &Event::controller(channel, 0x64, rpn_lsb));
}

/// Mirrors `ncd_midi_stop_rpn`: sets the RPN to the null (0x7F, 0x7F)
/// selection so a stray data-entry message can't retarget it later.
pub fn stop_rpn(out: &mut dyn RawMidiOut, channel: u8) {
    start_rpn(out, channel, 0x7F, 0x7F);
}

/// An in-memory sink for tests (unit and integration): records every raw
/// message instead of reaching a real MIDI port.
pub struct RecordingOut {
    pub sent: Vec<Vec<u8>>,
}

impl RecordingOut {
    pub fn new() -> Self {
        RecordingOut { sent: Vec::new() }
    }
}

impl Default for RecordingOut {
    fn default() -> Self {
        Self::new()
    }
}

impl RawMidiOut for RecordingOut {
    fn send_raw(&mut self, bytes: &[u8]) {
        self.sent.push(bytes.to_vec());
    }
}
