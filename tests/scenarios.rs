use std::io::Write;
use std::sync::atomic::AtomicBool;

use scoreline::config::Config;
use scoreline::dictionary::Dictionary;
use scoreline::event::{CONTROLLER, NOTE_OFF, NOTE_ON};
use scoreline::parser::{self, Compiler};
use scoreline::scheduler::Scheduler;
use scoreline::transport::RecordingOut;

/// A throwaway data directory holding a `voices.txt` (and optionally a drum
/// kit table) for one test, cleaned up on drop.
struct TestDataDir {
    path: std::path::PathBuf,
}

impl TestDataDir {
    fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "ncd_scenario_{}_{}_{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&path).unwrap();
        TestDataDir { path }
    }

    fn write_voices(&self, contents: &str) {
        let mut f = std::fs::File::create(self.path.join("voices.txt")).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn write_drumkit(&self, name: &str, contents: &str) {
        let mut f = std::fs::File::create(self.path.join(format!("{name}.txt"))).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }
}

impl Drop for TestDataDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.path).ok();
    }
}

/// Tempo fast enough that every ramp/sleep in the scheduler collapses to
/// (close to) zero wall-clock time, so playing a whole score out is instant.
const FAST_BPM: f64 = 6_000_000.0;

fn fast_config() -> Config {
    let mut config = Config::load(None).unwrap();
    config.default_bpm = FAST_BPM;
    config.expression_tick_us = 1;
    config
}

/// S1: a single voice line compiles to note-on/note-off pairs, in order, on
/// the bound channel and program.
#[test]
fn single_voice_line_plays_note_on_then_note_off() {
    let data = TestDataDir::new("s1");
    data.write_voices("Piano,0,0,1\n");
    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    let config = fast_config();

    let score = "| piano 1 100\n|0|A|do/4 re/4 mi/4\n";
    let (mut timeline, _sections) = Compiler::new(score, &dictionary, &config).compile().unwrap();

    let mut out = RecordingOut::new();
    let interrupt = AtomicBool::new(false);
    let mut scheduler = Scheduler::new(&config, 100, 0);
    scheduler.play(&mut timeline, &mut out, &interrupt);

    let channel = 0u8;
    let note_ons: Vec<_> = out
        .sent
        .iter()
        .filter(|msg| msg[0] & 0xF0 == NOTE_ON && msg[0] & 0x0F == channel)
        .collect();
    let note_offs: Vec<_> = out
        .sent
        .iter()
        .filter(|msg| (msg[0] & 0xF0 == NOTE_OFF || (msg[0] & 0xF0 == NOTE_ON && msg[2] == 0)) && msg[0] & 0x0F == channel)
        .collect();
    assert_eq!(note_ons.len(), 3, "expected three note-ons, got {:?}", out.sent);
    assert!(!note_offs.is_empty());
}

/// S2: tied notes within the same score row sum their durations into a
/// single sustained note rather than two separate note-on events.
#[test]
fn tied_notes_merge_into_one_sustained_note() {
    let data = TestDataDir::new("s2");
    data.write_voices("Piano,0,0,1\n");
    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    let config = fast_config();

    let score = "| piano 1 100\n|0|A|do/4^do/4\n";
    let (mut timeline, _) = Compiler::new(score, &dictionary, &config).compile().unwrap();
    timeline.rewind();
    let bucket = timeline.pop_bucket().unwrap();
    let events = bucket.events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].duration_beats.as_f64(), 0.5);
}

/// S3: a channel bound with a name that resolves to a loaded drum kit uses
/// `drumkit_binding`'s lazily-discovered kit to look up acronym note numbers.
#[test]
fn drum_channel_binding_loads_its_kit_before_compiling() {
    let data = TestDataDir::new("s3");
    data.write_voices("Standard,0,0,1\n");
    data.write_drumkit("standard", "Bass Drum,bd,36\n");

    let score = "| standard 10 100\n|0|A|do/4\n";
    let kit = parser::drumkit_binding(score);
    assert_eq!(kit, Some("standard".to_string()));

    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    dictionary.load_drumkit(&data.path, &kit.unwrap()).unwrap();
    assert_eq!(dictionary.drum_note("bd"), Some(36));
}

/// S4: an all-rest row is rejected, but a rest mixed with a real note still
/// compiles and produces no event for the rest itself.
#[test]
fn rest_produces_no_event_but_an_all_rest_row_is_rejected() {
    let data = TestDataDir::new("s4");
    data.write_voices("Piano,0,0,1\n");
    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    let config = fast_config();

    let all_rest = "| piano 1 100\n|0|A|4/4\n";
    assert!(Compiler::new(all_rest, &dictionary, &config).compile().is_err());

    let mixed = "| piano 1 100\n|0|A|4/4 do/4\n";
    let (mut timeline, _) = Compiler::new(mixed, &dictionary, &config).compile().unwrap();
    timeline.rewind();
    let bucket = timeline.pop_bucket().unwrap();
    assert_eq!(bucket.events.borrow().len(), 1);
}

/// S5: playback honors a CLI transpose offset, shifting every note's pitch
/// by that many semitones without touching velocity or channel.
#[test]
fn transpose_shifts_every_note_by_the_requested_semitones() {
    let data = TestDataDir::new("s5");
    data.write_voices("Piano,0,0,1\n");
    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    let config = fast_config();

    let score = "| piano 1 100\n|0|A|do/4\n";
    let (mut plain_tl, _) = Compiler::new(score, &dictionary, &config).compile().unwrap();
    let (mut shifted_tl, _) = Compiler::new(score, &dictionary, &config).compile().unwrap();

    let mut plain_out = RecordingOut::new();
    let interrupt = AtomicBool::new(false);
    let mut plain_scheduler = Scheduler::new(&config, 100, 0);
    plain_scheduler.play(&mut plain_tl, &mut plain_out, &interrupt);

    let mut shifted_out = RecordingOut::new();
    let mut shifted_scheduler = Scheduler::new(&config, 100, 5);
    shifted_scheduler.play(&mut shifted_tl, &mut shifted_out, &interrupt);

    let plain_note = plain_out.sent.iter().find(|m| m[0] & 0xF0 == NOTE_ON && m[2] > 0).unwrap();
    let shifted_note = shifted_out.sent.iter().find(|m| m[0] & 0xF0 == NOTE_ON && m[2] > 0).unwrap();
    assert_eq!(shifted_note[1], plain_note[1] + 5);
}

/// S6: the interrupt flag stops playback early and still sends an
/// all-notes-off panic for every channel rather than leaving notes hanging.
#[test]
fn interrupt_flag_stops_playback_and_panics_all_channels() {
    let data = TestDataDir::new("s6");
    data.write_voices("Piano,0,0,1\n");
    let mut dictionary = Dictionary::new();
    dictionary.load_voices(&data.path).unwrap();
    let config = fast_config();

    let score = "| piano 1 100\n|0|A|do/4 re/4 mi/4 fa/4 so/4\n";
    let (mut timeline, _) = Compiler::new(score, &dictionary, &config).compile().unwrap();

    let mut out = RecordingOut::new();
    let interrupt = AtomicBool::new(true);
    let mut scheduler = Scheduler::new(&config, 100, 0);
    scheduler.play(&mut timeline, &mut out, &interrupt);

    let controller_messages = out
        .sent
        .iter()
        .filter(|m| m[0] & 0xF0 == CONTROLLER)
        .count();
    assert!(controller_messages > 0, "expected an all-notes-off panic on interrupt");
}
