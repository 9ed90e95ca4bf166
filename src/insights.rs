//! Earnings and attendance aggregation over the session history.
//!
//! Everything here is a pure function over a slice of sessions; "today" is
//! always an explicit parameter so windows are reproducible in tests. The
//! engine passes the local calendar date.

use crate::models::{Category, CategoryStats, MonthlyStats, Session, SessionStatus, StudentStats};
use chrono::{Datelike, Days, NaiveDate};

/// Reporting window for the insights view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Trailing 7 days, inclusive of today.
    Week,
    /// First of the current month through today.
    Month,
    /// January 1 of the current year through today.
    Year,
}

/// First date included in `period` as of `today`.
pub fn period_start(period: Period, today: NaiveDate) -> NaiveDate {
    match period {
        Period::Week => today - Days::new(7),
        Period::Month => first_of_month(today.year(), today.month()),
        Period::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1)
            .unwrap_or(today),
    }
}

/// Sessions whose date falls inside the window, regardless of status.
/// Status filtering happens downstream in [`category_breakdown`].
pub fn filter_by_period(sessions: &[Session], period: Period, today: NaiveDate) -> Vec<&Session> {
    let start = period_start(period, today);
    sessions
        .iter()
        .filter(|s| s.session_date >= start && s.session_date <= today)
        .collect()
}

/// Sum of completed-session prices. Missed, cancelled, and rescheduled
/// sessions never contribute.
pub fn total_earnings<'a, I>(sessions: I) -> f64
where
    I: IntoIterator<Item = &'a Session>,
{
    sessions
        .into_iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .map(|s| s.price)
        .sum()
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    // month is always 1-12 here
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month")
}

/// First of the month `back` months before `today`'s month.
fn month_anchor(today: NaiveDate, back: u32) -> NaiveDate {
    let total = today.year() * 12 + today.month() as i32 - 1 - back as i32;
    first_of_month(total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// Completed earnings for `months` trailing calendar months, anchored to the
/// current month. Months without completed sessions report zero, not absence.
pub fn monthly_series(sessions: &[Session], months: u32, today: NaiveDate) -> Vec<MonthlyStats> {
    (0..months)
        .rev()
        .map(|back| {
            let anchor = month_anchor(today, back);
            let completed: Vec<&Session> = sessions
                .iter()
                .filter(|s| {
                    s.status == SessionStatus::Completed
                        && s.session_date.year() == anchor.year()
                        && s.session_date.month() == anchor.month()
                })
                .collect();
            MonthlyStats {
                month: anchor.format("%Y-%m").to_string(),
                label: anchor.format("%b").to_string(),
                total_sessions: completed.len(),
                total_earnings: completed.iter().map(|s| s.price).sum(),
            }
        })
        .collect()
}

/// Percentage change of the current month's completed earnings against the
/// previous month's. Defined as 0 when the previous month earned nothing --
/// a policy choice to avoid dividing by zero, not a true percentage.
pub fn monthly_growth(sessions: &[Session], today: NaiveDate) -> f64 {
    let series = monthly_series(sessions, 2, today);
    let previous = series[0].total_earnings;
    let current = series[1].total_earnings;
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Per-category figures over an already-windowed set of sessions, sorted by
/// earnings descending.
///
/// Rescheduled rows are in transit and count in neither the completed nor
/// the missed bucket; missed and cancelled share a bucket. Percentages are
/// shares of completed earnings across the window, all 0 when nothing was
/// completed.
pub fn category_breakdown(sessions: &[&Session]) -> Vec<CategoryStats> {
    let window_total = total_earnings(sessions.iter().copied());

    let mut stats: Vec<CategoryStats> = Category::ALL
        .iter()
        .map(|&category| {
            let in_category: Vec<&Session> = sessions
                .iter()
                .copied()
                .filter(|s| s.category == category && s.status != SessionStatus::Rescheduled)
                .collect();
            let completed: Vec<&Session> = in_category
                .iter()
                .copied()
                .filter(|s| s.status == SessionStatus::Completed)
                .collect();
            let missed = in_category
                .iter()
                .filter(|s| {
                    s.status == SessionStatus::Missed || s.status == SessionStatus::Cancelled
                })
                .count();
            let earnings: f64 = completed.iter().map(|s| s.price).sum();

            CategoryStats {
                category,
                total_earnings: earnings,
                total_sessions: completed.len(),
                missed_sessions: missed,
                percentage: if window_total > 0.0 {
                    earnings / window_total * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_earnings
            .partial_cmp(&a.total_earnings)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    stats
}

/// Completed-session count and earnings for one student, over the full
/// history.
pub fn student_stats(sessions: &[Session], student_id: i64) -> StudentStats {
    let completed: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.student_id == student_id && s.status == SessionStatus::Completed)
        .collect();
    StudentStats {
        student_id,
        total_sessions: completed.len(),
        total_earnings: completed.iter().map(|s| s.price).sum(),
    }
}

/// History listing: pending rows are in-transit bookkeeping, not history, so
/// they are excluded; optional category/status filters narrow further.
/// Newest date first.
pub fn session_history<'a>(
    sessions: &'a [Session],
    category: Option<Category>,
    status: Option<SessionStatus>,
) -> Vec<&'a Session> {
    let mut history: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.status != SessionStatus::Pending)
        .filter(|s| category.is_none_or(|c| s.category == c))
        .filter(|s| status.is_none_or(|st| s.status == st))
        .collect();
    history.sort_by(|a, b| b.session_date.cmp(&a.session_date));
    history
}
