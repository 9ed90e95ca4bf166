use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{Category, Session, SessionStatus};
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info, instrument};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        student_id: row.get(1)?,
        category: row.get(2)?,
        session_date: row.get(3)?,
        duration_minutes: row.get(4)?,
        price: row.get(5)?,
        notes: row.get(6)?,
        status: row.get(7)?,
        schedule_slot_id: row.get(8)?,
        rescheduled_to_date: row.get(9)?,
        rescheduled_to_time: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const SESSION_COLUMNS: &str = "id, student_id, category, session_date, duration_minutes, price, \
     notes, status, schedule_slot_id, rescheduled_to_date, rescheduled_to_time, \
     created_at, updated_at";

pub struct CreateSessionArgs {
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
}

/// Inserts a session row and returns it as stored.
///
/// # Errors
///
/// `Error::Validation` for a non-positive duration; `Error::Database` /
/// `Error::Rusqlite` when the insert fails (including the unique
/// slot-per-date reconciliation index).
#[instrument(skip(pool, args))]
pub async fn create_session(pool: &DbPool, args: &CreateSessionArgs) -> Result<Session> {
    if args.duration_minutes <= 0 {
        return Err(Error::Validation(
            "Session duration must be positive".to_string(),
        ));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO sessions
            (student_id, category, session_date, duration_minutes, price, notes, status,
             schedule_slot_id, rescheduled_to_date, rescheduled_to_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
    )?;
    let id = stmt.insert(params![
        args.student_id,
        args.category,
        args.session_date,
        args.duration_minutes,
        args.price,
        args.notes,
        args.status,
        args.schedule_slot_id,
        args.rescheduled_to_date,
        args.rescheduled_to_time,
        now,
    ])?;
    info!(
        "Created session_id {} for student_id {}: date={}, status={}, slot={:?}",
        id,
        args.student_id,
        args.session_date,
        args.status.as_str(),
        args.schedule_slot_id
    );

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![id], session_from_row)
        .map_err(Error::from)
}

/// Fetches the full session history, newest date first.
#[instrument(skip(pool))]
pub async fn get_all_sessions(pool: &DbPool) -> Result<Vec<Session>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY session_date DESC"
    ))?;
    let sessions = stmt
        .query_map([], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!("Fetched {} sessions.", sessions.len());
    Ok(sessions)
}

/// Fetches one student's sessions, oldest date first (invoice order).
#[instrument(skip(pool))]
pub async fn get_sessions_for_student(pool: &DbPool, student_id: i64) -> Result<Vec<Session>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE student_id = ?1 ORDER BY session_date ASC"
    ))?;
    let sessions = stmt
        .query_map(params![student_id], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(
        "Fetched {} sessions for student_id {}.",
        sessions.len(),
        student_id
    );
    Ok(sessions)
}

#[instrument(skip(pool))]
pub async fn get_session_by_id(pool: &DbPool, session_id: i64) -> Result<Option<Session>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    stmt.query_row(params![session_id], session_from_row)
        .optional()
        .map_err(Error::from)
}

/// Sets a session's status in place (the resolve-a-pending-session path).
#[instrument(skip(pool))]
pub async fn update_session_status(
    pool: &DbPool,
    session_id: i64,
    status: SessionStatus,
) -> Result<Session> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status, now, session_id],
    )?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No session with id {} to update",
            session_id
        )));
    }
    info!(
        "Updated session_id {} status to '{}'",
        session_id,
        status.as_str()
    );

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![session_id], session_from_row)
        .map_err(Error::from)
}

/// Moves a pending session forward to a new date/time in place. The
/// occurrence simply travels; no new row is created.
#[instrument(skip(pool))]
pub async fn move_pending_session(
    pool: &DbPool,
    session_id: i64,
    new_date: NaiveDate,
    new_time: NaiveTime,
) -> Result<Session> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE sessions SET session_date = ?1, rescheduled_to_time = ?2, updated_at = ?3
         WHERE id = ?4",
        params![new_date, new_time, now, session_id],
    )?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No session with id {} to move",
            session_id
        )));
    }
    info!(
        "Moved pending session_id {} to {} {}",
        session_id, new_date, new_time
    );

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![session_id], session_from_row)
        .map_err(Error::from)
}

/// Field-level partial update for a session (the direct-edit flow; any status
/// may be set). `None` fields are left as-is. `notes` is doubly optional so
/// that `Some(None)` clears the column back to NULL.
#[derive(Debug, Default, Clone)]
pub struct UpdateSessionArgs {
    pub student_id: Option<i64>,
    pub category: Option<Category>,
    pub session_date: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub notes: Option<Option<String>>,
    pub status: Option<SessionStatus>,
}

#[instrument(skip(pool, updates))]
pub async fn update_session(
    pool: &DbPool,
    session_id: i64,
    updates: &UpdateSessionArgs,
) -> Result<Session> {
    if let Some(minutes) = updates.duration_minutes {
        if minutes <= 0 {
            return Err(Error::Validation(
                "Session duration must be positive".to_string(),
            ));
        }
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let mut stmt = conn.prepare_cached(
        "UPDATE sessions SET
            student_id = COALESCE(?1, student_id),
            category = COALESCE(?2, category),
            session_date = COALESCE(?3, session_date),
            duration_minutes = COALESCE(?4, duration_minutes),
            price = COALESCE(?5, price),
            notes = CASE WHEN ?6 THEN ?7 ELSE notes END,
            status = COALESCE(?8, status),
            updated_at = ?9
         WHERE id = ?10",
    )?;
    let changed = stmt.execute(params![
        updates.student_id,
        updates.category,
        updates.session_date,
        updates.duration_minutes,
        updates.price,
        updates.notes.is_some(),
        updates.notes.as_ref().and_then(Option::as_deref),
        updates.status,
        now,
        session_id,
    ])?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No session with id {} to update",
            session_id
        )));
    }
    info!("Updated session_id {}", session_id);

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![session_id], session_from_row)
        .map_err(Error::from)
}

/// Hard-deletes a session. No cascade: a sibling row whose
/// `rescheduled_to_date` pointed here is not cleaned up.
#[instrument(skip(pool))]
pub async fn delete_session(pool: &DbPool, session_id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No session with id {} to delete",
            session_id
        )));
    }
    info!("Hard-deleted session_id {}", session_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{direct_insert_student, init_test_tracing, setup_test_db};
    use crate::errors::Result;
    use chrono::NaiveDate;

    fn base_args(student_id: i64, date: NaiveDate, slot_id: Option<i64>) -> CreateSessionArgs {
        CreateSessionArgs {
            student_id,
            category: Category::Gym,
            session_date: date,
            duration_minutes: 60,
            price: 40.0,
            notes: None,
            status: SessionStatus::Completed,
            schedule_slot_id: slot_id,
            rescheduled_to_date: None,
            rescheduled_to_time: None,
        }
    }

    #[tokio::test]
    async fn test_create_session_roundtrip() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "SessionStudent", 40.0, "gym", true)?
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let created = create_session(&db_pool, &base_args(student_id, date, Some(7))).await?;
        assert_eq!(created.session_date, date);
        assert_eq!(created.status, SessionStatus::Completed);
        assert_eq!(created.schedule_slot_id, Some(7));
        assert_eq!(created.price, 40.0);

        let fetched = get_session_by_id(&db_pool, created.id)
            .await?
            .expect("Session not found after creation");
        assert_eq!(fetched.id, created.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_slot_occurrence_unique_per_date() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "DupStudent", 40.0, "gym", true)?
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        create_session(&db_pool, &base_args(student_id, date, Some(3))).await?;
        let duplicate = create_session(&db_pool, &base_args(student_id, date, Some(3))).await;
        assert!(
            duplicate.is_err(),
            "Second reconciliation of the same slot/date must be rejected by the unique index"
        );

        // Same slot on another date is fine.
        let next_week = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        create_session(&db_pool, &base_args(student_id, next_week, Some(3))).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_session_rejects_non_positive_duration() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "ZeroDur", 40.0, "math", true)?
        };
        let mut args = base_args(student_id, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(), None);
        args.duration_minutes = 0;
        let result = create_session(&db_pool, &args).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_update_and_delete() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "EditStudent", 40.0, "swimming", true)?
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let created = create_session(&db_pool, &base_args(student_id, date, None)).await?;

        let updated = update_session(
            &db_pool,
            created.id,
            &UpdateSessionArgs {
                price: Some(55.0),
                status: Some(SessionStatus::Cancelled),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.price, 55.0);
        assert_eq!(updated.status, SessionStatus::Cancelled);
        assert_eq!(updated.duration_minutes, 60, "Untouched fields must survive");

        delete_session(&db_pool, created.id).await?;
        assert!(get_session_by_id(&db_pool, created.id).await?.is_none());
        assert!(matches!(
            delete_session(&db_pool, created.id).await,
            Err(Error::Database(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_can_set_and_clear_notes() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "NoteStudent", 40.0, "gym", true)?
        };
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let created = create_session(&db_pool, &base_args(student_id, date, None)).await?;
        assert_eq!(created.notes, None);

        let with_notes = update_session(
            &db_pool,
            created.id,
            &UpdateSessionArgs {
                notes: Some(Some("brought own racket".to_string())),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(with_notes.notes.as_deref(), Some("brought own racket"));

        // An untouched update leaves notes alone.
        let untouched = update_session(
            &db_pool,
            created.id,
            &UpdateSessionArgs {
                price: Some(45.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(untouched.notes.as_deref(), Some("brought own racket"));

        let cleared = update_session(
            &db_pool,
            created.id,
            &UpdateSessionArgs {
                notes: Some(None),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(cleared.notes, None, "Some(None) must clear notes to NULL");
        Ok(())
    }

    #[tokio::test]
    async fn test_status_has_no_schema_default() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let conn = db_pool.lock().unwrap();
        let student_id = direct_insert_student(&conn, "NoDefault", 40.0, "gym", true)?;

        // Every insert path binds a status explicitly; the column must not
        // silently fall back to one.
        let result = conn.execute(
            "INSERT INTO sessions (student_id, category, session_date, duration_minutes, price)
             VALUES (?1, 'gym', '2025-06-02', 60, 40.0)",
            rusqlite::params![student_id],
        );
        assert!(result.is_err(), "Insert without a status must be rejected");
        Ok(())
    }

    #[tokio::test]
    async fn test_move_pending_session_in_place() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "MoveStudent", 40.0, "gym", true)?
        };
        let mut args = base_args(student_id, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(), None);
        args.status = SessionStatus::Pending;
        args.rescheduled_to_time = chrono::NaiveTime::from_hms_opt(10, 0, 0);
        let created = create_session(&db_pool, &args).await?;

        let new_date = NaiveDate::from_ymd_opt(2025, 6, 6).unwrap();
        let new_time = chrono::NaiveTime::from_hms_opt(14, 30, 0).unwrap();
        let moved = move_pending_session(&db_pool, created.id, new_date, new_time).await?;

        assert_eq!(moved.id, created.id, "Move must not create a new row");
        assert_eq!(moved.session_date, new_date);
        assert_eq!(moved.rescheduled_to_time, Some(new_time));
        assert_eq!(moved.status, SessionStatus::Pending);
        Ok(())
    }
}
