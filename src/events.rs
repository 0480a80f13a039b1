//! Event list and player (L1).
//!
//! A contiguous, time-sorted list of `(time_ms, type, subtype, payload)`
//! tuples and a stateless cursor over it, kept sorted by a flat `u32`
//! millisecond key and looked up by binary search.

use itertools::Itertools;

use crate::error::{Result, ShowError};

/// One time-stamped side-channel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowEvent {
    /// Time of the event, in show (warped) milliseconds.
    pub time_ms: u32,
    /// Event type (engine-defined categories, e.g. pyro).
    pub event_type: u8,
    /// Event subtype, meaningful within `event_type`.
    pub subtype: u8,
    /// Opaque payload, interpreted by the event type's consumer.
    pub payload: u32,
}

impl ShowEvent {
    /// Builds an event from its four fields.
    #[must_use]
    pub const fn new(time_ms: u32, event_type: u8, subtype: u8, payload: u32) -> Self {
        Self {
            time_ms,
            event_type,
            subtype,
            payload,
        }
    }
}

/// An ordered list of [`ShowEvent`]s, sorted non-decreasing by `time_ms`.
///
/// Ties are broken by insertion order (`sort` is stable, and `insert`
/// places a new event after every existing event with the same
/// `time_ms`).
#[derive(Debug, Clone, Default)]
pub struct EventList {
    events: Vec<ShowEvent>,
}

impl EventList {
    /// An empty event list.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Builds an event list from an already-sorted vector, without
    /// re-sorting it.
    #[must_use]
    pub const fn from_sorted_vec(events: Vec<ShowEvent>) -> Self {
        Self { events }
    }

    /// The events as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ShowEvent] {
        &self.events
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the list holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Stable-sorts the list by `time_ms`.
    pub fn sort(&mut self) {
        self.events.sort_by_key(|e| e.time_ms);
    }

    /// Whether the list is currently sorted non-decreasing by `time_ms`.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.events
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.time_ms <= b.time_ms)
    }

    /// Appends `event` to the end; requires `event.time_ms >= ` the last
    /// event's time.
    pub fn append(&mut self, event: ShowEvent) -> Result<()> {
        if let Some(last) = self.events.last() {
            if event.time_ms < last.time_ms {
                return Err(ShowError::InvalidArgument(
                    "append requires non-decreasing event time",
                ));
            }
        }
        self.events.push(event);
        Ok(())
    }

    /// Inserts `event` at the position that keeps the list sorted, after
    /// every existing event with the same `time_ms` (preserving insertion
    /// order for ties). Unlike `append`, any time is permitted.
    pub fn insert(&mut self, event: ShowEvent) {
        let idx = self.events.partition_point(|e| e.time_ms <= event.time_ms);
        self.events.insert(idx, event);
    }

    /// Adds `delta` (which may be negative) to the `time_ms` of every
    /// event whose `event_type` matches `event_type`, saturating into
    /// `[0, u32::MAX]`, then re-sorts to restore the sortedness invariant.
    pub fn adjust_by_type(&mut self, event_type: u8, delta: i64) {
        for event in &mut self.events {
            if event.event_type == event_type {
                let adjusted = i64::from(event.time_ms) + delta;
                event.time_ms = adjusted.clamp(0, i64::from(u32::MAX)) as u32;
            }
        }
        self.sort();
    }
}

/// A stateless cursor over an [`EventList`].
#[derive(Debug, Clone)]
pub struct EventPlayer<'a> {
    events: &'a EventList,
    cursor: usize,
}

impl<'a> EventPlayer<'a> {
    /// Builds a player positioned at the start of `events`.
    #[must_use]
    pub const fn new(events: &'a EventList) -> Self {
        Self { events, cursor: 0 }
    }

    /// Returns the next event and advances the cursor, or `None` if the
    /// list is exhausted.
    pub fn next_event(&mut self) -> Option<ShowEvent> {
        let event = self.events.as_slice().get(self.cursor).copied();
        if event.is_some() {
            self.cursor += 1;
        }
        event
    }

    /// Returns the next event if its `time_ms <= t_sec * 1000`, advancing
    /// the cursor; otherwise returns `None` without advancing.
    pub fn next_event_not_later_than(&mut self, t_sec: f32) -> Option<ShowEvent> {
        let deadline_ms = (t_sec * 1000.0).max(0.0) as u32;
        match self.events.as_slice().get(self.cursor) {
            Some(event) if event.time_ms <= deadline_ms => {
                self.cursor += 1;
                Some(*event)
            }
            _ => None,
        }
    }

    /// Moves the cursor to the first event with `time_ms >= t_sec * 1000`
    /// via binary search.
    pub fn seek(&mut self, t_sec: f32) {
        let target_ms = (t_sec * 1000.0).max(0.0) as u32;
        self.cursor = self.events.as_slice().partition_point(|e| e.time_ms < target_ms);
    }

    /// Resets the cursor to the start of the list.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pyro_fixture() -> EventList {
        EventList::from_sorted_vec(vec![
            ShowEvent::new(10_000, 1, 1, 0),
            ShowEvent::new(50_000, 1, 2, 0),
            ShowEvent::new(90_000, 1, 3, 0),
            ShowEvent::new(90_000, 1, 4, 0),
        ])
    }

    #[test]
    fn next_event_not_later_than_drains_in_order_then_reseeks() {
        let events = pyro_fixture();
        let mut player = EventPlayer::new(&events);
        let first = player.next_event_not_later_than(60.0).unwrap();
        assert_eq!(first.subtype, 1);
        let second = player.next_event_not_later_than(60.0).unwrap();
        assert_eq!(second.subtype, 2);
        assert!(player.next_event_not_later_than(60.0).is_none());

        player.seek(40.0);
        let reseen = player.next_event_not_later_than(60.0).unwrap();
        assert_eq!(reseen.subtype, 2);
    }

    #[test]
    fn equal_time_events_keep_insertion_order() {
        let events = pyro_fixture();
        let mut player = EventPlayer::new(&events);
        let _ = player.next_event();
        let _ = player.next_event();
        let third = player.next_event().unwrap();
        let fourth = player.next_event().unwrap();
        assert_eq!(third.subtype, 3);
        assert_eq!(fourth.subtype, 4);
    }

    #[test]
    fn sort_establishes_is_sorted_invariant() {
        let mut events = EventList::from_sorted_vec(vec![
            ShowEvent::new(30, 0, 0, 0),
            ShowEvent::new(10, 0, 0, 0),
            ShowEvent::new(20, 0, 0, 0),
        ]);
        assert!(!events.is_sorted());
        events.sort();
        assert!(events.is_sorted());
    }

    #[test]
    fn append_rejects_out_of_order_time() {
        let mut events = EventList::new();
        events.append(ShowEvent::new(100, 0, 0, 0)).unwrap();
        assert!(matches!(
            events.append(ShowEvent::new(50, 0, 0, 0)),
            Err(ShowError::InvalidArgument(_))
        ));
    }

    #[test]
    fn insert_keeps_list_sorted_regardless_of_order() {
        let mut events = EventList::new();
        events.insert(ShowEvent::new(50, 0, 0, 0));
        events.insert(ShowEvent::new(10, 0, 0, 0));
        events.insert(ShowEvent::new(30, 0, 0, 0));
        assert!(events.is_sorted());
    }

    #[test]
    fn adjust_by_type_saturates_and_resorts() {
        let mut events = EventList::from_sorted_vec(vec![
            ShowEvent::new(5, 7, 0, 0),
            ShowEvent::new(100, 1, 0, 0),
        ]);
        events.adjust_by_type(7, -100);
        assert!(events.is_sorted());
        assert_eq!(events.as_slice()[0].time_ms, 0);
    }
}
