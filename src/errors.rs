use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The two-write reschedule path failed after the first write succeeded.
    /// The original session is already marked `rescheduled` but no pending
    /// follow-up row exists; the caller must surface this so the user can
    /// repair it with a direct edit.
    #[error(
        "Reschedule partially applied: session {original_session_id} is marked rescheduled \
         but creating its pending follow-up failed: {source}"
    )]
    PartialReschedule {
        original_session_id: i64,
        source: Box<Error>,
    },

    /// A lifecycle operation for the same due item is already in flight.
    #[error("An operation for this item is already in progress")]
    DuplicateOperation,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
