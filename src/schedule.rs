//! Occurrence derivation: what is due on a given date.
//!
//! Pure functions over in-memory collections; no store access. Re-running
//! with the same inputs yields the same output, so callers may derive the
//! due list as often as they like.

use crate::models::{DueItem, ScheduleSlot, Session, SessionStatus};
use chrono::{Datelike, NaiveDate};

/// Weekday index with the store's convention: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Derives the due list for `date` by merging recurring slots with
/// rescheduled-in pending sessions.
///
/// Recurring slots are due when they are active, fall on `date`'s weekday,
/// and no session row already reconciles them for that date (whatever status
/// that row ended up with). Standalone pending sessions dated `date` are due
/// regardless of how they got there.
///
/// Slots come first, ordered by start time; pending sessions follow, ordered
/// by the time they were rescheduled to, with a missing time sorting last.
/// Ties keep input order.
pub fn due_today(date: NaiveDate, slots: &[ScheduleSlot], sessions: &[Session]) -> Vec<DueItem> {
    let weekday = weekday_index(date);

    let todays_sessions: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.session_date == date)
        .collect();

    let mut due_slots: Vec<&ScheduleSlot> = slots
        .iter()
        .filter(|slot| slot.is_active && slot.day_of_week == weekday)
        .filter(|slot| {
            // Already reconciled for this date, in any resulting status.
            !todays_sessions
                .iter()
                .any(|s| s.schedule_slot_id == Some(slot.id))
        })
        .collect();
    due_slots.sort_by_key(|slot| slot.start_time);

    let mut pending: Vec<&Session> = todays_sessions
        .iter()
        .copied()
        .filter(|s| s.status == SessionStatus::Pending && s.schedule_slot_id.is_none())
        .collect();
    pending.sort_by_key(|s| (s.rescheduled_to_time.is_none(), s.rescheduled_to_time));

    due_slots
        .into_iter()
        .map(|slot| DueItem::Slot(slot.clone()))
        .chain(pending.into_iter().map(|s| DueItem::Pending(s.clone())))
        .collect()
}
