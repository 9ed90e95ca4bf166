#![allow(dead_code)]
use crate::db::DbPool;
use crate::db::schema;
use crate::errors::{Error, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, params};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory database with the schema applied.
pub(crate) async fn setup_test_db() -> Result<DbPool> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("Test DB: Failed to open in-memory: {}", e)))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn direct_insert_student(
    conn: &Connection,
    name: &str,
    hourly_rate: f64,
    category: &str,
    is_active: bool,
) -> Result<i64> {
    let now = Utc::now();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO students (name, hourly_rate, category, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )?;
    let id = stmt.insert(params![name, hourly_rate, category, is_active, now])?;
    Ok(id)
}

pub(crate) struct DirectSlotArgs<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) student_id: i64,
    pub(crate) day_of_week: u8,
    pub(crate) start_time: NaiveTime,
    pub(crate) duration_minutes: i64,
    pub(crate) category: &'a str,
    pub(crate) price: f64,
    pub(crate) is_active: bool,
}

pub(crate) fn direct_insert_slot(args: &DirectSlotArgs<'_>) -> Result<i64> {
    let now = Utc::now();
    let mut stmt = args.conn.prepare_cached(
        "INSERT INTO schedule_slots
            (student_id, day_of_week, start_time, duration_minutes, category, price, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let id = stmt.insert(params![
        args.student_id,
        args.day_of_week,
        args.start_time,
        args.duration_minutes,
        args.category,
        args.price,
        args.is_active,
        now,
    ])?;
    Ok(id)
}

pub(crate) struct DirectSessionArgs<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) student_id: i64,
    pub(crate) category: &'a str,
    pub(crate) session_date: NaiveDate,
    pub(crate) duration_minutes: i64,
    pub(crate) price: f64,
    pub(crate) status: &'a str,
    pub(crate) schedule_slot_id: Option<i64>,
    pub(crate) rescheduled_to_date: Option<NaiveDate>,
    pub(crate) rescheduled_to_time: Option<NaiveTime>,
}

pub(crate) fn direct_insert_session(args: &DirectSessionArgs<'_>) -> Result<i64> {
    let now = Utc::now();
    let mut stmt = args.conn.prepare_cached(
        "INSERT INTO sessions
            (student_id, category, session_date, duration_minutes, price, status,
             schedule_slot_id, rescheduled_to_date, rescheduled_to_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
    )?;
    let id = stmt.insert(params![
        args.student_id,
        args.category,
        args.session_date,
        args.duration_minutes,
        args.price,
        args.status,
        args.schedule_slot_id,
        args.rescheduled_to_date,
        args.rescheduled_to_time,
        now,
    ])?;
    Ok(id)
}

pub(crate) fn count_sessions(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    Ok(count)
}
