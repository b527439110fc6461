use std::thread;
use std::time::{Duration, Instant};

use crate::common::Time;

/// Sleeps drop below the requested duration are expected (scheduling jitter);
/// only warn once the shortfall is large enough to matter.
pub const LATENCY_WARN_THRESHOLD_US: Time = -10;

/// A drift-correcting stopwatch, replacing the `STOPWATCH_START/STOP/READ`
/// macros: each `sleep_for` call measures how long the *previous* sleep
/// actually took and subtracts the overrun from the next requested sleep, so
/// the scheduler tracks wall-clock tempo instead of accumulating drift.
pub struct Stopwatch {
    last_start: Instant,
    carry_us: Time,
}

impl Stopwatch {
    pub fn new() -> Self {
        Stopwatch {
            last_start: Instant::now(),
            carry_us: 0,
        }
    }

    /// Sleeps for approximately `requested_us`, compensating for drift
    /// accumulated since the last call. Mirrors `CHRONOSLEEP`.
    pub fn sleep_for(&mut self, requested_us: Time) {
        let target_us = requested_us - self.carry_us;
        let start = Instant::now();
        if target_us > 0 {
            thread::sleep(Duration::from_micros(target_us as u64));
        }
        let actual_us = start.elapsed().as_micros() as Time;
        let drift_us = target_us - actual_us;
        if drift_us < LATENCY_WARN_THRESHOLD_US {
            log::warn!(
                "scheduler fell behind by {} microseconds",
                -drift_us
            );
        }
        self.carry_us = -drift_us;
        self.last_start = start;
    }

    pub fn elapsed_since_last_us(&self) -> Time {
        self.last_start.elapsed().as_micros() as Time
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_approximately_the_requested_duration() {
        let mut sw = Stopwatch::new();
        let start = Instant::now();
        sw.sleep_for(5_000);
        let elapsed = start.elapsed().as_micros() as i64;
        assert!(elapsed >= 4_000, "slept too little: {elapsed}us");
    }

    #[test]
    fn zero_or_negative_request_does_not_block() {
        let mut sw = Stopwatch::new();
        sw.carry_us = 1_000_000;
        let start = Instant::now();
        sw.sleep_for(100);
        assert!(start.elapsed().as_millis() < 50);
    }
}
