use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::Duration;

/// Seconds to wait before/after playback so the external recorder has
/// caught the first and last notes. Mirrors `WAITMIDI`.
const WAIT_MIDI: Duration = Duration::from_secs(1);

/// Standard MIDI file output is delegated to an external capture process
/// (`arecordmidi`) rather than implemented here, per the crate's own
/// non-goals: this just shells out to it and stops it gracefully once
/// playback finishes, the way the original's fork/exec block does.
pub struct RecordingCapture {
    child: Child,
}

impl RecordingCapture {
    /// Spawns `arecordmidi` against the last ALSA sequencer port announced
    /// by `arecordmidi -l`, writing to `path`. Returns `None` (and logs a
    /// warning) if the shell or the recorder binary can't be spawned;
    /// playback proceeds unrecorded rather than failing outright.
    pub fn spawn(path: &Path) -> Option<RecordingCapture> {
        let command = format!(
            "arecordmidi -p \"$(arecordmidi -l | sed -n '$s/ .*//p')\" {:?}",
            path
        );
        match Command::new("sh").arg("-c").arg(&command).spawn() {
            Ok(child) => {
                thread::sleep(WAIT_MIDI);
                Some(RecordingCapture { child })
            }
            Err(e) => {
                log::warn!("cannot start MIDI capture process: {}", e);
                None
            }
        }
    }

    /// Waits out the trailing grace period, then stops the recorder.
    pub fn stop(mut self) {
        thread::sleep(WAIT_MIDI);
        stop_gracefully(&mut self.child);
    }
}

#[cfg(target_os = "linux")]
fn stop_gracefully(child: &mut Child) {
    let pid = child.id() as i32;
    // SAFETY: pid is our own freshly spawned child's, SIGINT is the same
    // graceful stop signal the original sends before reaping it.
    unsafe {
        libc::kill(pid, libc::SIGINT);
    }
    let _ = child.wait();
}

#[cfg(not(target_os = "linux"))]
fn stop_gracefully(child: &mut Child) {
    log::warn!("no graceful stop signal available on this platform; killing MIDI capture process");
    let _ = child.kill();
    let _ = child.wait();
}
