use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Closed set of coaching categories. The engine only cares about identity;
/// the display metadata in [`CategoryInfo`] is for rendering collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gym,
    Swimming,
    Math,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Category::Gym, Category::Swimming, Category::Math];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Gym => "gym",
            Category::Swimming => "swimming",
            Category::Math => "math",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "gym" => Some(Category::Gym),
            "swimming" => Some(Category::Swimming),
            "math" => Some(Category::Math),
            _ => None,
        }
    }

    pub fn info(self) -> &'static CategoryInfo {
        match self {
            Category::Gym => &CategoryInfo {
                name: "Gym",
                color: "#F59E0B",
                bg_color: "#FEF3C7",
            },
            Category::Swimming => &CategoryInfo {
                name: "Swimming",
                color: "#3B82F6",
                bg_color: "#DBEAFE",
            },
            Category::Math => &CategoryInfo {
                name: "Math",
                color: "#10B981",
                bg_color: "#D1FAE5",
            },
        }
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Category::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown category '{s}'").into()))
    }
}

/// Display metadata for a category (referenced by rendering collaborators).
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub name: &'static str,
    pub color: &'static str,
    pub bg_color: &'static str,
}

/// Lifecycle status of a [`Session`].
///
/// `Pending` and `Rescheduled` are in-transit states; the other three are
/// terminal outcomes. Only `Completed` sessions count toward earnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Completed,
    Missed,
    Cancelled,
    Rescheduled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Completed => "completed",
            SessionStatus::Missed => "missed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(s: &str) -> Option<SessionStatus> {
        match s {
            "pending" => Some(SessionStatus::Pending),
            "completed" => Some(SessionStatus::Completed),
            "missed" => Some(SessionStatus::Missed),
            "cancelled" => Some(SessionStatus::Cancelled),
            "rescheduled" => Some(SessionStatus::Rescheduled),
            _ => None,
        }
    }
}

impl ToSql for SessionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SessionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        SessionStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown session status '{s}'").into()))
    }
}

/// A coached student. Soft-deleted via `is_active` so historical sessions
/// keep a valid reference; never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub hourly_rate: f64,
    pub category: Category,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recurring weekly template (day, time, duration, price, category).
/// Generates candidate occurrences but is not itself an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: i64,
    pub student_id: i64,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub category: Category,
    /// Independently editable from the student's hourly rate.
    pub price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A concrete, dated, priced record of a coaching event.
///
/// `schedule_slot_id` is set iff the session originated from a recurring
/// slot's occurrence on `session_date`. `rescheduled_to_date`/`_time` are set
/// only on `Rescheduled` rows and point at the pending follow-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub student_id: i64,
    pub category: Category,
    pub session_date: NaiveDate,
    pub duration_minutes: i64,
    pub price: f64,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub schedule_slot_id: Option<i64>,
    pub rescheduled_to_date: Option<NaiveDate>,
    pub rescheduled_to_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Something to resolve on a given date: either a recurring slot's occurrence
/// that has not been reconciled yet, or a previously rescheduled session
/// awaiting disposition on its new date.
#[derive(Debug, Clone)]
pub enum DueItem {
    Slot(ScheduleSlot),
    Pending(Session),
}

impl DueItem {
    pub fn student_id(&self) -> i64 {
        match self {
            DueItem::Slot(slot) => slot.student_id,
            DueItem::Pending(session) => session.student_id,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            DueItem::Slot(slot) => slot.category,
            DueItem::Pending(session) => session.category,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        match self {
            DueItem::Slot(slot) => slot.duration_minutes,
            DueItem::Pending(session) => session.duration_minutes,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            DueItem::Slot(slot) => slot.price,
            DueItem::Pending(session) => session.price,
        }
    }

    /// The time the item is due at: slot start time, or the time the session
    /// was rescheduled to (may be absent on hand-entered rows).
    pub fn due_time(&self) -> Option<NaiveTime> {
        match self {
            DueItem::Slot(slot) => Some(slot.start_time),
            DueItem::Pending(session) => session.rescheduled_to_time,
        }
    }
}

/// One trailing calendar month of completed-session earnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStats {
    /// `YYYY-MM` key.
    pub month: String,
    /// Short month name, e.g. "Jan".
    pub label: String,
    pub total_sessions: usize,
    pub total_earnings: f64,
}

/// Per-category earnings/attendance figures over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: Category,
    pub total_earnings: f64,
    /// Completed sessions only.
    pub total_sessions: usize,
    /// Missed + cancelled. Rescheduled rows are in transit and count in
    /// neither bucket.
    pub missed_sessions: usize,
    /// Share of total completed earnings, 0 when the total is 0.
    pub percentage: f64,
}

/// Per-student completed-session figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub student_id: i64,
    pub total_sessions: usize,
    pub total_earnings: f64,
}
