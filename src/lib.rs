//! `coach-ledger` - recurring-schedule reconciliation and earnings tracking
//! for an independent tutor/coach.
//!
//! Recurring weekly commitments ("schedule slots") are reconciled into dated,
//! priced session records with a lifecycle (pending → completed / missed /
//! cancelled / rescheduled), and the session history is aggregated into
//! earnings and attendance figures.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    unsafe_code,
    unsafe_op_in_unsafe_fn,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,
    future_incompatible,
    rust_2018_idioms,
)]
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,        // Will add gradually
    clippy::missing_panics_doc,        // Will add gradually
)]

/// Configuration loading (database path from TOML / environment)
pub mod config;
/// Entity store adapter: students, schedule slots, sessions over SQLite
pub mod db;
/// Lifecycle controller and the action surface a UI collaborator drives
pub mod engine;
/// Unified error types and result handling
pub mod errors;
/// Earnings and attendance aggregation (pure)
pub mod insights;
/// Invoice filtering and totals (pure)
pub mod invoices;
/// Domain types shared across the crate
pub mod models;
/// Occurrence derivation: what is due on a given date (pure)
pub mod schedule;
