use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{Event, FixedDuration, NOTE_OFF, NOTE_ON};
use crate::timeline::{BucketId, Timeline};

/// How many section slots the `r`/`s`/`p` directives can address. Mirrors
/// `MAXSEC`.
pub const MAX_SECTIONS: usize = 128;

/// Snapshot of one bucket taken at record time: its start time at the
/// moment it was recorded, plus a shared handle to its events.
struct RecordedBucket {
    start: FixedDuration,
    events: Rc<RefCell<Vec<Event>>>,
}

/// A section that has been stopped and is ready to replay. Mirrors the
/// `section[sec_no]` struct, minus the raw node pointers.
struct RecordedSection {
    start_time: FixedDuration,
    end_rest: FixedDuration,
    buckets: Vec<RecordedBucket>,
}

/// In-progress recording, captured by `start_recording` and consumed by
/// `stop_recording`.
struct Recording {
    start_bucket: Option<BucketId>,
    start_time: FixedDuration,
}

/// Record/replay for the `r`/`s`/`p` score directives. Mirrors
/// `ncd_section_rec`/`ncd_section_stop`/`ncd_section_play`, replacing the
/// `section[MAXSEC]` pointer table with owned snapshots of shared event
/// buffers.
pub struct SectionManager {
    recording: Vec<Option<Recording>>,
    recorded: Vec<Option<RecordedSection>>,
}

impl SectionManager {
    pub fn new() -> Self {
        SectionManager {
            recording: (0..MAX_SECTIONS).map(|_| None).collect(),
            recorded: (0..MAX_SECTIONS).map(|_| None).collect(),
        }
    }

    /// Marks the start of a section. Mirrors `ncd_section_rec`: records the
    /// current tail bucket (possibly none, if nothing has played yet) and
    /// the current time.
    pub fn start_recording(&mut self, section: usize, timeline: &Timeline) {
        self.recording[section] = Some(Recording {
            start_bucket: timeline.tail_id(),
            start_time: timeline.current_time(),
        });
    }

    /// Seals a section for replay. Mirrors `ncd_section_stop`: computes the
    /// trailing rest after the last recorded bucket, and fixes up the
    /// recorded start if nothing had played yet when recording began, or if
    /// a rest preceded the `r` directive (the marked bucket belongs to the
    /// previous section, not this one).
    ///
    /// A `stop` with no matching `start_recording` behaves as though
    /// recording began at the very start of the score, the way the original
    /// section table defaults to all-zero entries.
    pub fn stop_recording(&mut self, section: usize, timeline: &Timeline) {
        let recording = self.recording[section].take().unwrap_or(Recording {
            start_bucket: None,
            start_time: FixedDuration::ZERO,
        });

        let end_bucket = timeline.tail_id();
        let end_rest = match end_bucket {
            Some(id) => timeline.current_time() - timeline.bucket_start(id),
            None => FixedDuration::ZERO,
        };

        let mut start_bucket = recording.start_bucket;
        match start_bucket {
            None => start_bucket = timeline.start_id(),
            Some(id) if recording.start_time > timeline.bucket_start(id) => {
                start_bucket = timeline.bucket_next(id);
            }
            _ => {}
        }

        let mut buckets = Vec::new();
        let mut cursor = start_bucket;
        while let Some(id) = cursor {
            buckets.push(RecordedBucket {
                start: timeline.bucket_start(id),
                events: timeline.bucket_events(id),
            });
            if Some(id) == end_bucket {
                break;
            }
            cursor = timeline.bucket_next(id);
        }

        self.recorded[section] = Some(RecordedSection {
            start_time: recording.start_time,
            end_rest,
            buckets,
        });
    }

    /// Replays a previously stopped section onto the live timeline. Mirrors
    /// `ncd_section_play`: the first recorded bucket merges into the live
    /// tail if it lands at the same time (dropping its note-offs, which
    /// belong to notes struck before the section started), the last
    /// recorded bucket becomes a new tail holding only its note-offs
    /// (its note-ons belong to notes struck after the section), and every
    /// bucket in between is appended sharing its event list with the
    /// original, not copying it.
    pub fn replay(&mut self, section: usize, timeline: &mut Timeline) -> Result<(), String> {
        let recorded = self.recorded[section]
            .as_ref()
            .ok_or_else(|| format!("trying to play section {} not previously recorded", section + 1))?;

        if recorded.buckets.is_empty() {
            return Ok(());
        }

        let last_index = recorded.buckets.len() - 1;
        let mut prev_start = recorded.start_time;

        for (i, bucket) in recorded.buckets.iter().enumerate() {
            let new_time = timeline.current_time() + (bucket.start - prev_start);
            timeline.set_current_time(new_time);

            let coincides_with_tail = timeline
                .tail_id()
                .map(|id| timeline.bucket_start(id) == new_time)
                .unwrap_or(false);

            if coincides_with_tail {
                let filtered: Vec<Event> = bucket
                    .events
                    .borrow()
                    .iter()
                    .filter(|e| (e.status & 0xF0) != NOTE_OFF)
                    .cloned()
                    .collect();
                timeline.append_filtered(new_time, filtered);
            } else if i == last_index {
                let filtered: Vec<Event> = bucket
                    .events
                    .borrow()
                    .iter()
                    .filter(|e| (e.status & 0xF0) != NOTE_ON)
                    .cloned()
                    .collect();
                timeline.append_filtered(new_time, filtered);
                timeline.set_current_time(new_time + recorded.end_rest);
                break;
            } else {
                timeline.append_shared(new_time, Rc::clone(&bucket.events));
            }

            prev_start = bucket.start;
        }

        Ok(())
    }
}

impl Default for SectionManager {
    fn default() -> Self {
        Self::new()
    }
}
