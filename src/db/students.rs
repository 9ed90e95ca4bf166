use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{Category, Student};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info, instrument};

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        hourly_rate: row.get(2)?,
        category: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const STUDENT_COLUMNS: &str =
    "id, name, hourly_rate, category, is_active, created_at, updated_at";

/// Inserts a new student and returns the stored row.
///
/// # Errors
///
/// Returns `Error::Database` if the lock cannot be acquired or the insert
/// fails.
#[instrument(skip(pool))]
pub async fn create_student(
    pool: &DbPool,
    name: &str,
    hourly_rate: f64,
    category: Category,
) -> Result<Student> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();

    let mut stmt = conn.prepare_cached(
        "INSERT INTO students (name, hourly_rate, category, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, TRUE, ?4, ?4)",
    )?;
    let id = stmt.insert(params![name, hourly_rate, category, now])?;
    info!("Created student_id {} ('{}', {:?})", id, name, category);

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![id], student_from_row)
        .map_err(Error::from)
}

/// Fetches active students, newest first (the roster view order).
#[instrument(skip(pool))]
pub async fn get_all_active_students(pool: &DbPool) -> Result<Vec<Student>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE is_active = TRUE ORDER BY created_at DESC"
    ))?;
    let students = stmt
        .query_map([], student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!("Fetched {} active students.", students.len());
    Ok(students)
}

/// Fetches one student by id, active or not. Deactivated students must stay
/// resolvable because historical sessions keep referencing them.
#[instrument(skip(pool))]
pub async fn get_student_by_id(pool: &DbPool, student_id: i64) -> Result<Option<Student>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
    ))?;
    stmt.query_row(params![student_id], student_from_row)
        .optional()
        .map_err(Error::from)
}

/// Field-level partial update for a student. `None` fields are left as-is.
#[derive(Debug, Default, Clone)]
pub struct UpdateStudentArgs {
    pub name: Option<String>,
    pub hourly_rate: Option<f64>,
    pub category: Option<Category>,
    pub is_active: Option<bool>,
}

#[instrument(skip(pool, updates))]
pub async fn update_student(
    pool: &DbPool,
    student_id: i64,
    updates: &UpdateStudentArgs,
) -> Result<Student> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();

    let mut stmt = conn.prepare_cached(
        "UPDATE students SET
            name = COALESCE(?1, name),
            hourly_rate = COALESCE(?2, hourly_rate),
            category = COALESCE(?3, category),
            is_active = COALESCE(?4, is_active),
            updated_at = ?5
         WHERE id = ?6",
    )?;
    let changed = stmt.execute(params![
        updates.name,
        updates.hourly_rate,
        updates.category,
        updates.is_active,
        now,
        student_id,
    ])?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No student with id {} to update",
            student_id
        )));
    }
    info!("Updated student_id {}", student_id);

    let mut fetch = conn.prepare_cached(&format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
    ))?;
    fetch
        .query_row(params![student_id], student_from_row)
        .map_err(Error::from)
}

/// Soft-deletes a student by clearing `is_active`. The row is preserved so
/// every historical session keeps a valid student reference.
#[instrument(skip(pool))]
pub async fn deactivate_student(pool: &DbPool, student_id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let now = Utc::now();
    let changed = conn.execute(
        "UPDATE students SET is_active = FALSE, updated_at = ?1 WHERE id = ?2",
        params![now, student_id],
    )?;
    if changed == 0 {
        return Err(Error::Database(format!(
            "No student with id {} to deactivate",
            student_id
        )));
    }
    info!("Soft-deleted student_id {}", student_id);
    Ok(())
}
