use crate::errors::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info, instrument};

#[instrument(skip(conn))]
pub(crate) fn create_tables(conn: &Connection) -> Result<()> {
    debug!("Executing CREATE TABLE statements if tables do not exist.");
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            hourly_rate REAL NOT NULL,
            category TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE, -- soft delete: never hard-deleted
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS schedule_slots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            day_of_week INTEGER NOT NULL, -- 0=Sunday .. 6=Saturday
            start_time TEXT NOT NULL,     -- HH:MM:SS
            duration_minutes INTEGER NOT NULL,
            category TEXT NOT NULL,
            price REAL NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (student_id) REFERENCES students (id)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            session_date TEXT NOT NULL,   -- YYYY-MM-DD
            duration_minutes INTEGER NOT NULL,
            price REAL NOT NULL,
            notes TEXT,
            status TEXT NOT NULL,
            schedule_slot_id INTEGER,     -- set iff the row reconciles a slot occurrence
            rescheduled_to_date TEXT,
            rescheduled_to_time TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (student_id) REFERENCES students (id)
        );

        -- A slot occurrence is reconciled at most once per date.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_slot_reconciliation
            ON sessions(schedule_slot_id, session_date)
            WHERE schedule_slot_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(session_date);
        CREATE INDEX IF NOT EXISTS idx_slots_day ON schedule_slots(day_of_week);

        COMMIT;",
    )
    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;
    info!("Database tables ensured (unique slot/date reconciliation index in place).");
    Ok(())
}
