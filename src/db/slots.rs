use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{Category, ScheduleSlot};
use chrono::{NaiveTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info, instrument};

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleSlot> {
    Ok(ScheduleSlot {
        id: row.get(0)?,
        student_id: row.get(1)?,
        day_of_week: row.get(2)?,
        start_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        category: row.get(5)?,
        price: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const SLOT_COLUMNS: &str =
    "id, student_id, day_of_week, start_time, duration_minutes, category, price, is_active, created_at";

pub struct CreateSlotArgs {
    pub student_id: i64,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub category: Category,
    pub price: f64,
}

/// Inserts a recurring weekly slot and returns the stored row.
#[instrument(skip(pool, args))]
pub async fn create_slot(pool: &DbPool, args: &CreateSlotArgs) -> Result<ScheduleSlot> {
    if args.day_of_week > 6 {
        return Err(Error::Validation(format!(
            "day_of_week must be 0-6, got {}",
            args.day_of_week
        )));
    }
    if args.duration_minutes <= 0 {
        return Err(Error::Validation(
            "Slot duration must be positive".to_string(),
        ));
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO schedule_slots
            (student_id, day_of_week, start_time, duration_minutes, category, price, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, TRUE, ?7)",
    )?;
    let id = stmt.insert(params![
        args.student_id,
        args.day_of_week,
        args.start_time,
        args.duration_minutes,
        args.category,
        args.price,
        now,
    ])?;
    info!(
        "Created schedule_slot_id {} for student_id {} (day {}, {})",
        id, args.student_id, args.day_of_week, args.start_time
    );

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![id], slot_from_row)
        .map_err(Error::from)
}

/// Fetches all slots (active and inactive) in week order: day first, then
/// start time. The schedule view and the occurrence deriver both consume this.
#[instrument(skip(pool))]
pub async fn get_all_slots(pool: &DbPool) -> Result<Vec<ScheduleSlot>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SLOT_COLUMNS} FROM schedule_slots ORDER BY day_of_week ASC, start_time ASC"
    ))?;
    let slots = stmt
        .query_map([], slot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!("Fetched {} schedule slots.", slots.len());
    Ok(slots)
}

#[instrument(skip(pool))]
pub async fn get_slot_by_id(pool: &DbPool, slot_id: i64) -> Result<Option<ScheduleSlot>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE id = ?1"
    ))?;
    stmt.query_row(params![slot_id], slot_from_row)
        .optional()
        .map_err(Error::from)
}

/// Field-level partial update for a slot. `None` fields are left as-is.
#[derive(Debug, Default, Clone)]
pub struct UpdateSlotArgs {
    pub student_id: Option<i64>,
    pub day_of_week: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<i64>,
    pub category: Option<Category>,
    pub price: Option<f64>,
    pub is_active: Option<bool>,
}

#[instrument(skip(pool, updates))]
pub async fn update_slot(
    pool: &DbPool,
    slot_id: i64,
    updates: &UpdateSlotArgs,
) -> Result<ScheduleSlot> {
    if let Some(day) = updates.day_of_week {
        if day > 6 {
            return Err(Error::Validation(format!(
                "day_of_week must be 0-6, got {}",
                day
            )));
        }
    }
    if let Some(minutes) = updates.duration_minutes {
        if minutes <= 0 {
            return Err(Error::Validation(
                "Slot duration must be positive".to_string(),
            ));
        }
    }

    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "UPDATE schedule_slots SET
            student_id = COALESCE(?1, student_id),
            day_of_week = COALESCE(?2, day_of_week),
            start_time = COALESCE(?3, start_time),
            duration_minutes = COALESCE(?4, duration_minutes),
            category = COALESCE(?5, category),
            price = COALESCE(?6, price),
            is_active = COALESCE(?7, is_active)
         WHERE id = ?8",
    )?;
    let changed = stmt.execute(params![
        updates.student_id,
        updates.day_of_week,
        updates.start_time,
        updates.duration_minutes,
        updates.category,
        updates.price,
        updates.is_active,
        slot_id,
    ])?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No schedule slot with id {} to update",
            slot_id
        )));
    }
    info!("Updated schedule_slot_id {}", slot_id);

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![slot_id], slot_from_row)
        .map_err(Error::from)
}

/// Hard-deletes a slot. Sessions that reconciled past occurrences keep their
/// `schedule_slot_id` value; the reference is allowed to dangle.
#[instrument(skip(pool))]
pub async fn delete_slot(pool: &DbPool, slot_id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let changed = conn.execute(
        "DELETE FROM schedule_slots WHERE id = ?1",
        params![slot_id],
    )?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No schedule slot with id {} to delete",
            slot_id
        )));
    }
    info!("Hard-deleted schedule_slot_id {}", slot_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{direct_insert_student, init_test_tracing, setup_test_db};
    use crate::errors::Result;
    use chrono::NaiveTime;

    #[tokio::test]
    async fn test_slot_crud_roundtrip() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "SlotStudent", 40.0, "gym", true)?
        };

        let slot = create_slot(
            &db_pool,
            &CreateSlotArgs {
                student_id,
                day_of_week: 1,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                duration_minutes: 60,
                category: Category::Gym,
                price: 40.0,
            },
        )
        .await?;
        assert!(slot.is_active);

        let updated = update_slot(
            &db_pool,
            slot.id,
            &UpdateSlotArgs {
                price: Some(45.0),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.price, 45.0);
        assert_eq!(updated.day_of_week, 1, "Untouched fields must survive");

        delete_slot(&db_pool, slot.id).await?;
        assert!(get_slot_by_id(&db_pool, slot.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_slot_rejects_bad_day_and_duration() -> Result<()> {
        init_test_tracing();
        let db_pool = setup_test_db().await?;
        let student_id = {
            let conn = db_pool.lock().unwrap();
            direct_insert_student(&conn, "BadSlot", 40.0, "math", true)?
        };

        let bad_day = create_slot(
            &db_pool,
            &CreateSlotArgs {
                student_id,
                day_of_week: 7,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                duration_minutes: 60,
                category: Category::Math,
                price: 40.0,
            },
        )
        .await;
        assert!(matches!(bad_day, Err(Error::Validation(_))));

        let bad_duration = create_slot(
            &db_pool,
            &CreateSlotArgs {
                student_id,
                day_of_week: 2,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                duration_minutes: 0,
                category: Category::Math,
                price: 40.0,
            },
        )
        .await;
        assert!(matches!(bad_duration, Err(Error::Validation(_))));
        Ok(())
    }
}
