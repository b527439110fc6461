use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{Event, FixedDuration};

/// Per the original engine's `MAXEVENTS`: events sharing a time slot (a
/// chord, or a note plus its accompanying controller messages) are capped
/// so a single bucket cannot grow without bound.
pub const MAX_BUCKET_EVENTS: usize = 64;
/// Mirrors `INITEVENTNO`: how many event slots a freshly created bucket
/// reserves.
pub const INITIAL_BUCKET_CAPACITY: usize = 3;

/// A stable index into [`Timeline::buckets`]. We use an arena instead of
/// the original engine's raw `next` pointers so bucket identity survives
/// `Vec` growth without unsafe code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId(usize);

/// Identifies one event inside the timeline for later reference (used by
/// the scheduler to track an active hairpin or pitch-wheel slide back to
/// the event it should update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRef {
    pub bucket: BucketId,
    pub index: usize,
}

/// All events sharing the same start time. Control events (hairpin
/// expression ticks, pitch-wheel slide ticks, tempo changes) use
/// `EQUALTIMES`-style coincidence with note events the way the original
/// queue does, so a chord and the controller messages that ride with it
/// land in one bucket and play back atomically.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub start: FixedDuration,
    /// Shared so that a section replay can duplicate a bucket's event
    /// list without copying it, the way `dup_node` shares `events` with
    /// its source node.
    pub events: Rc<RefCell<Vec<Event>>>,
    pub next: Option<BucketId>,
}

impl Bucket {
    fn new(start: FixedDuration) -> Self {
        Bucket {
            start,
            events: Rc::new(RefCell::new(Vec::with_capacity(INITIAL_BUCKET_CAPACITY))),
            next: None,
        }
    }
}

fn is_meta_for_timing(event: &Event) -> bool {
    event.is_meta()
}

/// The compiled score: a singly linked chain of time-ordered buckets built
/// by insertion, plus a play cursor. Grounded on the original `ncd_queue`
/// plus its module-level `current_time`/`start_group_time`/`first_group`
/// state, now owned by the struct instead of living in globals.
pub struct Timeline {
    buckets: Vec<Bucket>,
    /// First bucket of the whole score, set once the first group is sealed.
    start: Option<BucketId>,
    /// First bucket of the currently open polyphonic group (a "line").
    head: Option<BucketId>,
    /// Last bucket appended so far.
    tail: Option<BucketId>,
    /// Unconsumed-playback cursor, advanced by `pop_bucket`.
    play_cursor: Option<BucketId>,
    start_group_time: FixedDuration,
    current_time: FixedDuration,
    first_group: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline {
            buckets: Vec::new(),
            start: None,
            head: None,
            tail: None,
            play_cursor: None,
            start_group_time: FixedDuration::ZERO,
            current_time: FixedDuration::ZERO,
            first_group: true,
        }
    }

    pub fn current_time(&self) -> FixedDuration {
        self.current_time
    }

    pub fn set_current_time(&mut self, time: FixedDuration) {
        self.current_time = time;
    }

    /// Last bucket appended so far, the arena equivalent of `queue.tail`.
    pub fn tail_id(&self) -> Option<BucketId> {
        self.tail
    }

    /// First bucket of the whole score, the arena equivalent of `queue.start`.
    pub fn start_id(&self) -> Option<BucketId> {
        self.start
    }

    pub fn bucket_start(&self, id: BucketId) -> FixedDuration {
        self.bucket(id).start
    }

    pub fn bucket_next(&self, id: BucketId) -> Option<BucketId> {
        self.bucket(id).next
    }

    /// Clones the `Rc` (not the events themselves) so a section replay can
    /// share a bucket's event list with its source, mirroring `dup_node`.
    pub fn bucket_events(&self, id: BucketId) -> Rc<RefCell<Vec<Event>>> {
        Rc::clone(&self.bucket(id).events)
    }

    fn bucket(&self, id: BucketId) -> &Bucket {
        &self.buckets[id.0]
    }

    fn bucket_mut(&mut self, id: BucketId) -> &mut Bucket {
        &mut self.buckets[id.0]
    }

    /// Closes the current polyphonic group: later `new_line` calls reset
    /// the cursor back to this point. Mirrors `new_group`.
    pub fn new_group(&mut self) {
        self.start_group_time = self.current_time;
        self.head = self.tail;
        if self.head.is_some() {
            self.first_group = false;
        }
    }

    /// Starts a new voice within the current group, rewinding the time
    /// cursor to the group's start. Mirrors `new_line`.
    pub fn new_line(&mut self) {
        self.current_time = self.start_group_time;
    }

    /// A rest just advances the time cursor without creating a bucket.
    /// Mirrors `ncd_queue_push_rest`.
    pub fn push_rest(&mut self, duration: FixedDuration) {
        self.current_time = self.current_time + duration;
    }

    /// Inserts `event` at the current time (or, for note-offs, at the time
    /// the note ends), merging into an existing bucket within
    /// `SMALLEST_DURATION` of that time or creating a new one in sorted
    /// position. Mirrors `ncd_queue_push_event`.
    ///
    /// Because bucket times are exact rationals rather than floats, no
    /// epsilon tolerance is needed: two events land in the same bucket
    /// only when their start times compare exactly equal.
    pub fn push_event(&mut self, event: Event, duration: FixedDuration, is_note_off: bool) -> EventRef {
        let start_time = if is_note_off {
            self.current_time + duration
        } else {
            self.current_time
        };
        let advances_cursor = !is_meta_for_timing(&event);

        let mut prev: Option<BucketId> = None;
        let mut curr = self.head;
        while let Some(id) = curr {
            let b = self.bucket(id);
            if b.start == start_time {
                let index = {
                    let mut events = b.events.borrow_mut();
                    assert!(
                        events.len() < MAX_BUCKET_EVENTS,
                        "reached the maximum number of simultaneous events ({})",
                        MAX_BUCKET_EVENTS
                    );
                    events.push(event);
                    events.len() - 1
                };
                if advances_cursor {
                    self.current_time = self.current_time + duration;
                }
                return EventRef { bucket: id, index };
            } else if b.start > start_time {
                break;
            }
            prev = curr;
            curr = b.next;
        }

        let mut new_bucket = Bucket::new(start_time);
        new_bucket.events.borrow_mut().push(event);
        new_bucket.next = curr;
        let new_id = BucketId(self.buckets.len());
        self.buckets.push(new_bucket);

        match curr {
            None => self.tail = Some(new_id),
            _ => {}
        }
        match prev {
            Some(p) => self.bucket_mut(p).next = Some(new_id),
            None => {
                self.head = Some(new_id);
                if self.first_group {
                    self.start = self.head;
                }
            }
        }

        if advances_cursor {
            self.current_time = self.current_time + duration;
        }
        EventRef { bucket: new_id, index: 0 }
    }

    /// Patches an already-pushed event's duration in place. Used to close
    /// a hairpin or a section tempo marker once its extent is known,
    /// mirroring the direct `node->events[event_no].duration` write in
    /// `ncd_stop_hairpin`.
    pub fn set_duration(&mut self, event_ref: EventRef, duration: FixedDuration) {
        let bucket = self.bucket(event_ref.bucket);
        bucket.events.borrow_mut()[event_ref.index].duration_beats = duration;
    }

    /// Appends a bucket unconditionally at the tail. Used by section replay,
    /// which only ever moves forward in time, unlike `push_event`'s sorted
    /// insertion.
    fn append_bucket(&mut self, bucket: Bucket) -> BucketId {
        let new_id = BucketId(self.buckets.len());
        self.buckets.push(bucket);
        match self.tail {
            Some(tail_id) => self.bucket_mut(tail_id).next = Some(new_id),
            None => {
                self.head = Some(new_id);
                if self.first_group {
                    self.start = Some(new_id);
                }
            }
        }
        self.tail = Some(new_id);
        new_id
    }

    /// Merges `events` into the tail bucket if it already starts at `start`,
    /// otherwise appends a new bucket owning them. Used by section replay to
    /// graft the filtered first/last recorded buckets onto the live tail,
    /// mirroring the `add_note(queue.tail, *event)` loops in `ncd_section_play`.
    pub fn append_filtered(&mut self, start: FixedDuration, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        if let Some(tail_id) = self.tail {
            if self.bucket(tail_id).start == start {
                self.bucket(tail_id).events.borrow_mut().extend(events);
                return;
            }
        }
        let mut bucket = Bucket::new(start);
        bucket.events.borrow_mut().extend(events);
        self.append_bucket(bucket);
    }

    /// Appends a new bucket sharing `events` with its source, mirroring
    /// `dup_node`'s reuse of the source node's event array.
    pub fn append_shared(&mut self, start: FixedDuration, events: Rc<RefCell<Vec<Event>>>) {
        self.append_bucket(Bucket { start, events, next: None });
    }

    /// Returns the next unconsumed bucket, advancing the play cursor.
    /// Mirrors `ncd_queue_pop_node`.
    pub fn pop_bucket(&mut self) -> Option<Bucket> {
        let id = self.play_cursor?;
        let bucket = self.bucket(id).clone();
        self.play_cursor = bucket.next;
        Some(bucket)
    }

    pub fn peek_bucket(&self) -> Option<&Bucket> {
        self.play_cursor.map(|id| self.bucket(id))
    }

    /// Rewinds playback to the start of the whole timeline, for replaying
    /// a score (or a section) more than once.
    pub fn rewind(&mut self) {
        self.play_cursor = self.start;
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn dur(n: i64, d: i64) -> FixedDuration {
        FixedDuration::new(n, d)
    }

    #[test]
    fn sequential_notes_land_in_separate_buckets_in_order() {
        let mut tl = Timeline::new();
        tl.new_group();
        tl.push_event(Event::note_on(0, 60, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.push_event(Event::note_on(0, 62, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.rewind();
        let first = tl.pop_bucket().unwrap();
        let second = tl.pop_bucket().unwrap();
        assert!(first.start < second.start);
        assert!(tl.pop_bucket().is_none());
    }

    #[test]
    fn chord_notes_share_a_bucket() {
        let mut tl = Timeline::new();
        tl.new_group();
        tl.push_event(Event::note_on(0, 60, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.new_line();
        tl.push_event(Event::note_on(0, 64, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.rewind();
        let bucket = tl.pop_bucket().unwrap();
        assert_eq!(bucket.events.borrow().len(), 2);
    }

    #[test]
    fn rest_advances_cursor_without_a_bucket() {
        let mut tl = Timeline::new();
        tl.new_group();
        tl.push_rest(dur(1, 4));
        tl.push_event(Event::note_on(0, 60, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.rewind();
        let only = tl.pop_bucket().unwrap();
        assert_eq!(only.start, dur(1, 4));
    }

    #[test]
    fn note_off_lands_at_end_of_its_duration() {
        let mut tl = Timeline::new();
        tl.new_group();
        tl.push_event(Event::note_on(0, 60, 80, None, dur(1, 4)), dur(1, 4), false);
        tl.new_line();
        tl.push_event(Event::note_off(0, 60, None), dur(1, 4), true);
        tl.rewind();
        let on_bucket = tl.pop_bucket().unwrap();
        let off_bucket = tl.pop_bucket().unwrap();
        assert_eq!(on_bucket.start, dur(0, 1));
        assert_eq!(off_bucket.start, dur(1, 4));
    }

    proptest::proptest! {
        /// However many notes are pushed one after another (each in its own
        /// group), the timeline replays them back in strictly increasing
        /// start order: a bucket never starts before the one before it.
        #[test]
        fn pushed_groups_replay_in_nondecreasing_start_order(
            beats in proptest::collection::vec(1i64..8, 1..20),
        ) {
            let mut tl = Timeline::new();
            for beat_denominator in &beats {
                tl.new_group();
                tl.push_event(
                    Event::note_on(0, 60, 80, None, dur(1, *beat_denominator)),
                    dur(1, *beat_denominator),
                    false,
                );
            }
            tl.rewind();
            let mut last = FixedDuration::ZERO;
            let mut count = 0;
            while let Some(bucket) = tl.pop_bucket() {
                proptest::prop_assert!(bucket.start >= last);
                last = bucket.start;
                count += 1;
            }
            proptest::prop_assert_eq!(count, beats.len());
        }
    }
}
