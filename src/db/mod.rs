pub mod connection;
pub(crate) mod schema;
pub mod sessions;
pub mod slots;
pub mod students;
#[cfg(test)]
pub(crate) mod test_utils;

pub use connection::{DbPool, init_db};
pub use sessions::{
    CreateSessionArgs, UpdateSessionArgs, create_session, delete_session, get_all_sessions,
    get_session_by_id, get_sessions_for_student, move_pending_session, update_session,
    update_session_status,
};
pub use slots::{
    CreateSlotArgs, UpdateSlotArgs, create_slot, delete_slot, get_all_slots, get_slot_by_id,
    update_slot,
};
pub use students::{
    UpdateStudentArgs, create_student, deactivate_student, get_all_active_students,
    get_student_by_id, update_student,
};
