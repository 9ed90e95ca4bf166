//! Invoice building: completed sessions for one student in a date range.

use crate::models::{Session, SessionStatus};
use chrono::NaiveDate;
use serde::Serialize;

/// Completed sessions for one student within the requested bounds, plus
/// derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub student_id: i64,
    pub sessions: Vec<Session>,
    pub total_amount: f64,
    pub total_hours: f64,
}

/// Narrows `sessions` to the student's completed sessions with a date inside
/// the inclusive bounds (an absent bound is unbounded on that side), sorted
/// ascending by date. Missed, cancelled, rescheduled, and pending sessions
/// never appear on an invoice.
pub fn build_invoice(
    sessions: &[Session],
    student_id: i64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Invoice {
    let mut lines: Vec<Session> = sessions
        .iter()
        .filter(|s| s.student_id == student_id && s.status == SessionStatus::Completed)
        .filter(|s| start_date.is_none_or(|start| s.session_date >= start))
        .filter(|s| end_date.is_none_or(|end| s.session_date <= end))
        .cloned()
        .collect();
    lines.sort_by_key(|s| s.session_date);

    let total_amount = lines.iter().map(|s| s.price).sum();
    let total_hours = lines.iter().map(|s| s.duration_minutes).sum::<i64>() as f64 / 60.0;

    Invoice {
        student_id,
        sessions: lines,
        total_amount,
        total_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;

    fn session(
        id: i64,
        student_id: i64,
        date: NaiveDate,
        status: SessionStatus,
        price: f64,
        duration_minutes: i64,
    ) -> Session {
        Session {
            id,
            student_id,
            category: Category::Math,
            session_date: date,
            duration_minutes,
            price,
            notes: None,
            status,
            schedule_slot_id: None,
            rescheduled_to_date: None,
            rescheduled_to_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn invoice_keeps_only_completed_for_the_student() {
        let sessions = vec![
            session(1, 1, d(2025, 6, 10), SessionStatus::Completed, 40.0, 60),
            session(2, 1, d(2025, 6, 3), SessionStatus::Completed, 60.0, 90),
            session(3, 1, d(2025, 6, 5), SessionStatus::Missed, 40.0, 60),
            session(4, 1, d(2025, 6, 6), SessionStatus::Rescheduled, 40.0, 60),
            session(5, 2, d(2025, 6, 4), SessionStatus::Completed, 80.0, 60),
        ];
        let invoice = build_invoice(&sessions, 1, None, None);

        let ids: Vec<i64> = invoice.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1], "ascending by date");
        assert_eq!(invoice.total_amount, 100.0);
        assert_eq!(invoice.total_hours, 2.5);
    }

    #[test]
    fn bounds_are_inclusive_and_optional() {
        let sessions = vec![
            session(1, 1, d(2025, 6, 1), SessionStatus::Completed, 10.0, 60),
            session(2, 1, d(2025, 6, 15), SessionStatus::Completed, 20.0, 60),
            session(3, 1, d(2025, 6, 30), SessionStatus::Completed, 30.0, 60),
        ];

        let bounded = build_invoice(&sessions, 1, Some(d(2025, 6, 1)), Some(d(2025, 6, 15)));
        assert_eq!(bounded.sessions.len(), 2);
        assert_eq!(bounded.total_amount, 30.0);

        let open_start = build_invoice(&sessions, 1, None, Some(d(2025, 6, 15)));
        assert_eq!(open_start.sessions.len(), 2);

        let open_end = build_invoice(&sessions, 1, Some(d(2025, 6, 15)), None);
        assert_eq!(open_end.sessions.len(), 2);
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        let invoice = build_invoice(&[], 1, None, None);
        assert!(invoice.sessions.is_empty());
        assert_eq!(invoice.total_amount, 0.0);
        assert_eq!(invoice.total_hours, 0.0);
    }
}
