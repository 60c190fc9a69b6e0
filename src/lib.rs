#![forbid(unsafe_code)]
//! Dienstplan — monthly duty-roster engine for a small K9 detail.
//!
//! - File-based JSON store, atomic saves.
//! - One cached month snapshot; every edit updates counts and conflicts
//!   incrementally.
//! - Rest-period and service-dog overlap detection across month borders.
//! - Vacation / wish-free request state machines with `U`/`X`
//!   materialization, tenure-based vacation entitlement.
//! - All dates civil (`YYYY-MM-DD`); times only inside shift types.

pub mod config;
pub mod engine;
pub mod holidays;
pub mod io;
pub mod model;
pub mod notification;
pub mod print;
pub mod shifts;
pub mod storage;
pub mod worker;

pub use engine::{
    CellDisplay, CellRef, DataManager, EditOptions, EditOutcome, EngineError, EngineResult,
    MonthSnapshot, WishInfo,
};
pub use model::{
    DayLock, Employee, Month, RequestedCode, TenureBracket, UserOrder, VacationRequest,
    VacationStatus, WishFreeOrigin, WishFreeRequest, WishFreeStatus,
};
pub use shifts::{ShiftType, ShiftTypeRegistry};
pub use storage::{JsonStore, Store, StoreError};
pub use worker::{CompletionQueue, WorkerPool};
