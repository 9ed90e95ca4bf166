//! The action surface a UI collaborator drives: due-list derivation,
//! lifecycle transitions (complete / miss / reschedule), direct session
//! edits, and the reporting queries.
//!
//! Writes go through the `db` adapter one row at a time; after every write
//! the relevant collection is re-read, so callers always observe their own
//! writes. The only concurrency control is the per-item in-flight guard --
//! the system assumes a single acting user.

use crate::db::{
    self, CreateSessionArgs, DbPool, UpdateSessionArgs,
};
use crate::errors::{Error, Result};
use crate::insights::{self, Period};
use crate::invoices::{self, Invoice};
use crate::models::{
    CategoryStats, DueItem, MonthlyStats, Session, SessionStatus, Student, StudentStats,
};
use crate::schedule;
use chrono::{Local, NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{info, instrument, warn};

/// "Today" as the engine sees it: the local calendar date. No explicit
/// timezone model; single-timezone deployment.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Identity of a due item for the duplicate-action guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DueItemKey {
    Slot(i64),
    Session(i64),
}

impl DueItemKey {
    fn of(item: &DueItem) -> DueItemKey {
        match item {
            DueItem::Slot(slot) => DueItemKey::Slot(slot.id),
            DueItem::Pending(session) => DueItemKey::Session(session.id),
        }
    }
}

/// Result of a reschedule: either the two-row pair created for a slot
/// occurrence, or the single pending row that was moved in place.
#[derive(Debug, Clone)]
pub enum RescheduleOutcome {
    SlotPair {
        /// Today's row, marked `rescheduled`, pointing at the follow-up.
        original: Session,
        /// The `pending` follow-up at the new date.
        follow_up: Session,
    },
    /// A pending session re-rescheduled: the same row, moved forward.
    Moved(Session),
}

pub struct Engine {
    pool: DbPool,
    in_flight: Mutex<HashSet<DueItemKey>>,
}

/// Releases the in-flight slot on drop, on success and failure paths alike.
struct OpGuard<'a> {
    engine: &'a Engine,
    key: DueItemKey,
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.engine.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

impl Engine {
    pub fn new(pool: DbPool) -> Self {
        Engine {
            pool,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn begin_op(&self, key: DueItemKey) -> Result<OpGuard<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| Error::Database("In-flight guard poisoned".to_string()))?;
        if !set.insert(key) {
            warn!("Refusing duplicate operation for {:?}", key);
            return Err(Error::DuplicateOperation);
        }
        Ok(OpGuard { engine: self, key })
    }

    async fn require_student(&self, student_id: i64) -> Result<Student> {
        db::get_student_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| Error::Validation(format!("Unknown student reference: {}", student_id)))
    }

    /// Derives the due list for `date` from fresh reads of the slot and
    /// session collections.
    #[instrument(skip(self))]
    pub async fn list_due_today(&self, date: NaiveDate) -> Result<Vec<DueItem>> {
        let slots = db::get_all_slots(&self.pool).await?;
        let sessions = db::get_all_sessions(&self.pool).await?;
        Ok(schedule::due_today(date, &slots, &sessions))
    }

    /// Resolves a due item as completed. The session starts (or keeps)
    /// contributing to earnings.
    #[instrument(skip(self, item))]
    pub async fn mark_completed(&self, item: &DueItem, date: NaiveDate) -> Result<Session> {
        self.resolve(item, date, SessionStatus::Completed).await
    }

    /// Resolves a due item as missed. The price is recorded but excluded
    /// from earnings.
    #[instrument(skip(self, item))]
    pub async fn mark_missed(&self, item: &DueItem, date: NaiveDate) -> Result<Session> {
        self.resolve(item, date, SessionStatus::Missed).await
    }

    async fn resolve(
        &self,
        item: &DueItem,
        date: NaiveDate,
        status: SessionStatus,
    ) -> Result<Session> {
        let _guard = self.begin_op(DueItemKey::of(item))?;

        match item {
            DueItem::Slot(slot) => {
                self.require_student(slot.student_id).await?;
                let session = db::create_session(
                    &self.pool,
                    &CreateSessionArgs {
                        student_id: slot.student_id,
                        category: slot.category,
                        session_date: date,
                        duration_minutes: slot.duration_minutes,
                        price: slot.price,
                        notes: None,
                        status,
                        schedule_slot_id: Some(slot.id),
                        rescheduled_to_date: None,
                        rescheduled_to_time: None,
                    },
                )
                .await?;
                info!(
                    "Reconciled slot {} on {} as '{}' (session_id {})",
                    slot.id,
                    date,
                    status.as_str(),
                    session.id
                );
                Ok(session)
            }
            DueItem::Pending(pending) => {
                let session =
                    db::update_session_status(&self.pool, pending.id, status).await?;
                info!(
                    "Resolved pending session {} as '{}'",
                    pending.id,
                    status.as_str()
                );
                Ok(session)
            }
        }
    }

    /// Moves a due item to a new date and time.
    ///
    /// For a slot occurrence this writes two rows sequentially (today's
    /// `rescheduled` marker, then the `pending` follow-up) with no
    /// transaction around them; if the second write fails the store is left
    /// inconsistent and [`Error::PartialReschedule`] reports which row needs
    /// manual repair. A pending session is simply moved in place.
    ///
    /// Both `new_date` and `new_time` must be present; validation happens
    /// before any write.
    #[instrument(skip(self, item))]
    pub async fn reschedule(
        &self,
        item: &DueItem,
        date: NaiveDate,
        new_date: Option<NaiveDate>,
        new_time: Option<NaiveTime>,
    ) -> Result<RescheduleOutcome> {
        let new_date = new_date
            .ok_or_else(|| Error::Validation("Reschedule requires a new date".to_string()))?;
        let new_time = new_time
            .ok_or_else(|| Error::Validation("Reschedule requires a new time".to_string()))?;
        if new_date < date {
            // The UI enforces a minimum of the current date; a past target
            // reaching this far is suspicious but not fatal.
            warn!(
                "Reschedule target {} is before the due date {}",
                new_date, date
            );
        }

        let _guard = self.begin_op(DueItemKey::of(item))?;

        match item {
            DueItem::Slot(slot) => {
                self.require_student(slot.student_id).await?;

                let original = db::create_session(
                    &self.pool,
                    &CreateSessionArgs {
                        student_id: slot.student_id,
                        category: slot.category,
                        session_date: date,
                        duration_minutes: slot.duration_minutes,
                        price: slot.price,
                        notes: None,
                        status: SessionStatus::Rescheduled,
                        schedule_slot_id: Some(slot.id),
                        rescheduled_to_date: Some(new_date),
                        rescheduled_to_time: Some(new_time),
                    },
                )
                .await?;

                let follow_up = db::create_session(
                    &self.pool,
                    &CreateSessionArgs {
                        student_id: slot.student_id,
                        category: slot.category,
                        session_date: new_date,
                        duration_minutes: slot.duration_minutes,
                        price: slot.price,
                        notes: None,
                        status: SessionStatus::Pending,
                        schedule_slot_id: None,
                        rescheduled_to_date: None,
                        rescheduled_to_time: Some(new_time),
                    },
                )
                .await
                .map_err(|e| Error::PartialReschedule {
                    original_session_id: original.id,
                    source: Box::new(e),
                })?;

                info!(
                    "Rescheduled slot {} from {} to {} {} (sessions {} -> {})",
                    slot.id, date, new_date, new_time, original.id, follow_up.id
                );
                Ok(RescheduleOutcome::SlotPair {
                    original,
                    follow_up,
                })
            }
            DueItem::Pending(pending) => {
                let moved =
                    db::move_pending_session(&self.pool, pending.id, new_date, new_time).await?;
                info!(
                    "Re-rescheduled pending session {} to {} {}",
                    pending.id, new_date, new_time
                );
                Ok(RescheduleOutcome::Moved(moved))
            }
        }
    }

    /// Free-form edit of a historical session (any field, any status).
    pub async fn update_session(
        &self,
        session_id: i64,
        updates: &UpdateSessionArgs,
    ) -> Result<Session> {
        if let Some(student_id) = updates.student_id {
            self.require_student(student_id).await?;
        }
        db::update_session(&self.pool, session_id, updates).await
    }

    /// Permanently removes a session row. No cascade to sibling rows.
    pub async fn delete_session(&self, session_id: i64) -> Result<()> {
        db::delete_session(&self.pool, session_id).await
    }

    /// Total completed earnings over the full history.
    pub async fn compute_earnings(&self) -> Result<f64> {
        let sessions = db::get_all_sessions(&self.pool).await?;
        Ok(insights::total_earnings(&sessions))
    }

    /// Completed earnings inside `period`, anchored at `today`.
    pub async fn compute_earnings_for(&self, period: Period, today: NaiveDate) -> Result<f64> {
        let sessions = db::get_all_sessions(&self.pool).await?;
        let windowed = insights::filter_by_period(&sessions, period, today);
        Ok(insights::total_earnings(windowed))
    }

    /// Per-category breakdown over `period`, anchored at `today`.
    pub async fn compute_category_breakdown(
        &self,
        period: Period,
        today: NaiveDate,
    ) -> Result<Vec<CategoryStats>> {
        let sessions = db::get_all_sessions(&self.pool).await?;
        let windowed = insights::filter_by_period(&sessions, period, today);
        Ok(insights::category_breakdown(&windowed))
    }

    /// Zero-filled trailing monthly earnings series.
    pub async fn monthly_trend(&self, months: u32, today: NaiveDate) -> Result<Vec<MonthlyStats>> {
        let sessions = db::get_all_sessions(&self.pool).await?;
        Ok(insights::monthly_series(&sessions, months, today))
    }

    /// Current-vs-previous-month growth percentage (0 when the previous
    /// month earned nothing).
    pub async fn monthly_growth(&self, today: NaiveDate) -> Result<f64> {
        let sessions = db::get_all_sessions(&self.pool).await?;
        Ok(insights::monthly_growth(&sessions, today))
    }

    /// Invoice for one student, optionally bounded by an inclusive range.
    pub async fn invoice_for(
        &self,
        student_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Invoice> {
        self.require_student(student_id).await?;
        let sessions = db::get_sessions_for_student(&self.pool, student_id).await?;
        Ok(invoices::build_invoice(
            &sessions, student_id, start_date, end_date,
        ))
    }

    /// Completed-session figures for one student.
    pub async fn student_stats(&self, student_id: i64) -> Result<StudentStats> {
        self.require_student(student_id).await?;
        let sessions = db::get_sessions_for_student(&self.pool, student_id).await?;
        Ok(insights::student_stats(&sessions, student_id))
    }

    /// How many students are currently active (soft-deleted ones excluded).
    pub async fn active_student_count(&self) -> Result<usize> {
        let students = db::get_all_active_students(&self.pool).await?;
        Ok(students.len())
    }
}
