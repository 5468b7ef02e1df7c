//! Groups training sessions into display slots.
//!
//! Several session rows can describe the same class (an admin may split the
//! participants across rows). The schedule shows one card per distinct
//! `(start, end)` pair on a day, listing everybody attending it.

use crate::entities::{child, training_session};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A session together with the children attending it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionWithParticipants {
    #[serde(flatten)]
    pub session: training_session::Model,
    pub end: NaiveDateTime,
    pub participants: Vec<child::Model>,
}

impl SessionWithParticipants {
    #[must_use]
    pub fn new(session: training_session::Model, participants: Vec<child::Model>) -> Self {
        Self {
            end: session.end(),
            session,
            participants,
        }
    }
}

/// One card on the schedule
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Union of all participants, each child once, in first-seen order
    pub participants: Vec<child::Model>,
    /// Sessions merged into this slot, in input order
    pub session_ids: Vec<i64>,
}

/// Slots per calendar day
pub type SlotsByDay = BTreeMap<NaiveDate, Vec<Slot>>;

// slot key -> (position in the day's Vec, participant ids already listed)
type DayIndex = HashMap<(NaiveDateTime, NaiveDateTime), (usize, HashSet<i64>)>;

/// Merges sessions sharing a `(start, end)` pair on the same day.
///
/// Slots within a day keep the order in which their key first appears, so
/// callers pass sessions sorted by start.
#[must_use]
pub fn group_timeslots(sessions: &[SessionWithParticipants]) -> SlotsByDay {
    let mut slots_by_day = SlotsByDay::new();
    let mut index: HashMap<NaiveDate, DayIndex> = HashMap::new();

    for entry in sessions {
        let start = entry.session.start;
        let day = start.date();
        let key = (start, entry.end);

        let day_slots = slots_by_day.entry(day).or_default();
        let day_index = index.entry(day).or_default();

        let (slot_idx, seen) = day_index.entry(key).or_insert_with(|| {
            day_slots.push(Slot {
                start,
                end: entry.end,
                participants: Vec::new(),
                session_ids: Vec::new(),
            });
            (day_slots.len() - 1, HashSet::new())
        });

        let slot = &mut day_slots[*slot_idx];
        slot.session_ids.push(entry.session.id);
        for child in &entry.participants {
            if seen.insert(child.id) {
                slot.participants.push(child.clone());
            }
        }
    }

    slots_by_day
}
