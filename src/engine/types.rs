use crate::model::{Month, RequestedCode, WishFreeOrigin, WishFreeStatus};
use crate::storage::StoreError;
use chrono::NaiveDate;
use thiserror::Error;

/// One roster cell, addressed by employee and day-of-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub user_id: i64,
    pub day: u32,
}

impl CellRef {
    pub fn new(user_id: i64, day: u32) -> Self {
        Self { user_id, day }
    }
}

/// Write options for a single-cell edit. Lock override is a caller-side
/// decision; the engine only honors the flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditOptions {
    pub override_day_lock: bool,
}

/// Result of one incremental update: which cells changed conflict or
/// display state, and a non-fatal warning when cache reconciliation
/// degraded (the caller should reload the month).
#[derive(Debug, Default)]
pub struct EditOutcome {
    pub changed: std::collections::BTreeSet<CellRef>,
    pub warning: Option<String>,
}

/// Wish-free context attached to a resolved cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishInfo {
    pub status: WishFreeStatus,
    pub requested: RequestedCode,
    pub origin: WishFreeOrigin,
}

/// A resolved cell token. Color logic must use `plain`; the lock glyph in
/// `token` is decorative only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDisplay {
    pub token: String,
    pub plain: String,
    pub wish: Option<WishInfo>,
}

impl CellDisplay {
    pub fn empty() -> Self {
        Self { token: String::new(), plain: String::new(), wish: None }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no month loaded")]
    NoMonthLoaded,
    #[error("month {0} is locked")]
    LockedMonth(Month),
    #[error("day {date} of employee {user_id} is locked: {reason}")]
    LockedDay { user_id: i64, date: NaiveDate, reason: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unknown employee: {0}")]
    UnknownEmployee(i64),
    #[error("unknown request: {0}")]
    UnknownRequest(i64),
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
