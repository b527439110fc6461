/// Requests `SCHED_FIFO` real-time scheduling at the given priority to
/// reduce playback latency. Mirrors `nocrazydots.c::main`'s
/// `sched_setscheduler` call: failure (usually missing privilege) is a
/// non-fatal warning, never a startup error.
#[cfg(target_os = "linux")]
pub fn request_priority(priority: i32) {
    let param = libc::sched_param { sched_priority: priority };
    let result = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if result == -1 {
        log::warn!("cannot gain realtime privileges. See README.md");
    }
}

#[cfg(not(target_os = "linux"))]
pub fn request_priority(_priority: i32) {
    log::warn!("realtime scheduling is only requested on Linux");
}
