use crate::model::{
    DayLock, Employee, Month, RequestedCode, UserOrder, VacationRequest, VacationStatus,
    WishFreeOrigin, WishFreeRequest, WishFreeStatus,
};
use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(anyhow::Error),
    #[error("schema missing: {0}")]
    SchemaMissing(&'static str),
    #[error("constraint violation: {0}")]
    Constraint(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One `shift_schedule` row. A missing row means "no assignment".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub user_id: i64,
    pub shift_date: NaiveDate,
    pub shift_abbrev: String,
}

/// Append-only `activity_log` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: NaiveDateTime,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
}

/// Append-only `admin_notifications` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub message: String,
}

/// Persistence contract of the engine, mirroring the relational tables.
/// Every call is blocking; callers that need a responsive UI run them on
/// the worker pool.
pub trait Store {
    // users
    fn list_users(&self) -> StoreResult<Vec<Employee>>;
    fn get_user(&self, id: i64) -> StoreResult<Option<Employee>>;
    fn upsert_user(&mut self, user: Employee) -> StoreResult<()>;
    fn update_user_entitlement(&mut self, id: i64, total: u32, rest: i32) -> StoreResult<()>;

    // user_order
    fn user_order(&self) -> StoreResult<Vec<UserOrder>>;
    fn save_user_order(&mut self, order: Vec<UserOrder>) -> StoreResult<()>;

    // shift_schedule, UNIQUE (user_id, shift_date)
    fn shifts_in_range(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<ScheduleRow>>;
    fn get_shift(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<String>>;
    fn upsert_shift(&mut self, user_id: i64, date: NaiveDate, code: &str) -> StoreResult<()>;
    fn delete_shift(&mut self, user_id: i64, date: NaiveDate) -> StoreResult<()>;

    // vacation_requests
    fn vacations_overlapping(&self, from: NaiveDate, to: NaiveDate)
        -> StoreResult<Vec<VacationRequest>>;
    fn vacation_by_id(&self, id: i64) -> StoreResult<Option<VacationRequest>>;
    fn insert_vacation(
        &mut self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        request_date: NaiveDate,
    ) -> StoreResult<i64>;
    fn set_vacation_status(
        &mut self,
        id: i64,
        status: VacationStatus,
        user_notified: bool,
    ) -> StoreResult<()>;

    // wunschfrei_requests, UNIQUE (user_id, request_date)
    fn wishfree_in_range(&self, from: NaiveDate, to: NaiveDate)
        -> StoreResult<Vec<WishFreeRequest>>;
    fn wishfree_at(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<WishFreeRequest>>;
    fn wishfree_by_id(&self, id: i64) -> StoreResult<Option<WishFreeRequest>>;
    /// Insert, or reset the existing `(user_id, request_date)` row back to
    /// pending; the duplicate case is idempotent.
    fn upsert_wishfree(
        &mut self,
        user_id: i64,
        date: NaiveDate,
        requested: RequestedCode,
        origin: WishFreeOrigin,
    ) -> StoreResult<i64>;
    fn set_wishfree_status(
        &mut self,
        id: i64,
        status: WishFreeStatus,
        rejection_reason: Option<String>,
        notified: bool,
    ) -> StoreResult<()>;
    fn delete_wishfree(&mut self, id: i64) -> StoreResult<()>;

    // locked_months / day_locks
    fn is_month_locked(&self, month: Month) -> StoreResult<bool>;
    fn set_month_lock(&mut self, month: Month, locked: bool) -> StoreResult<()>;
    fn day_locks_in_range(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<DayLock>>;
    fn set_day_lock(&mut self, lock: DayLock) -> StoreResult<()>;
    fn remove_day_lock(&mut self, user_id: i64, date: NaiveDate) -> StoreResult<()>;

    // config_storage
    fn get_config(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_config(&mut self, key: &str, json: &str) -> StoreResult<()>;

    // append-only logs
    fn log_activity(&mut self, user_id: Option<i64>, action: &str, details: &str)
        -> StoreResult<()>;
    fn push_admin_notification(&mut self, message: &str) -> StoreResult<()>;
}

/// On-disk document for [`JsonStore`]. Field names follow the table
/// contract so a relational implementation can share fixtures.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    users: Vec<Employee>,
    #[serde(default)]
    user_order: Vec<UserOrder>,
    #[serde(default)]
    shift_schedule: Vec<ScheduleRow>,
    #[serde(default)]
    vacation_requests: Vec<VacationRequest>,
    #[serde(default)]
    wunschfrei_requests: Vec<WishFreeRequest>,
    #[serde(default)]
    locked_months: Vec<Month>,
    #[serde(default)]
    day_locks: Vec<DayLock>,
    #[serde(default)]
    config_storage: BTreeMap<String, String>,
    #[serde(default)]
    activity_log: Vec<ActivityEntry>,
    #[serde(default)]
    admin_notifications: Vec<AdminNotification>,
}

/// Single-file JSON store with atomic replace on every mutation.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    db: Database,
}

impl JsonStore {
    /// Opens (or initializes) the store file. A missing file starts empty;
    /// an unreadable one surfaces as `Unavailable`, a corrupt one as
    /// `SchemaMissing`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data)
                .map_err(|_| StoreError::SchemaMissing("roster database"))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Database::default(),
            Err(err) => {
                return Err(StoreError::Unavailable(
                    anyhow::Error::new(err).context(format!("reading {}", path.display())),
                ))
            }
        };
        Ok(Self { path, db })
    }

    fn save(&self) -> StoreResult<()> {
        self.try_save()
            .map_err(StoreError::Unavailable)
    }

    fn try_save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(&self.db)?;
        let mut tmp = NamedTempFile::new_in(self.path.parent().unwrap_or_else(|| Path::new(".")))
            .with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn next_id<T>(rows: &[T], id_of: impl Fn(&T) -> i64) -> i64 {
        rows.iter().map(id_of).max().unwrap_or(0) + 1
    }
}

impl Store for JsonStore {
    fn list_users(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.db.users.clone())
    }

    fn get_user(&self, id: i64) -> StoreResult<Option<Employee>> {
        Ok(self.db.users.iter().find(|u| u.id == id).cloned())
    }

    fn upsert_user(&mut self, user: Employee) -> StoreResult<()> {
        match self.db.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => self.db.users.push(user),
        }
        self.save()
    }

    fn update_user_entitlement(&mut self, id: i64, total: u32, rest: i32) -> StoreResult<()> {
        let user = self
            .db
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Constraint("users.id"))?;
        user.urlaub_gesamt = total;
        user.urlaub_rest = rest;
        self.save()
    }

    fn user_order(&self) -> StoreResult<Vec<UserOrder>> {
        Ok(self.db.user_order.clone())
    }

    fn save_user_order(&mut self, order: Vec<UserOrder>) -> StoreResult<()> {
        self.db.user_order = order;
        self.db.user_order.sort_by_key(|o| (o.user_id, o.sort_order));
        self.db.user_order.dedup_by_key(|o| o.user_id);
        self.save()
    }

    fn shifts_in_range(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<ScheduleRow>> {
        Ok(self
            .db
            .shift_schedule
            .iter()
            .filter(|row| from <= row.shift_date && row.shift_date <= to)
            .cloned()
            .collect())
    }

    fn get_shift(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<String>> {
        Ok(self
            .db
            .shift_schedule
            .iter()
            .find(|row| row.user_id == user_id && row.shift_date == date)
            .map(|row| row.shift_abbrev.clone()))
    }

    fn upsert_shift(&mut self, user_id: i64, date: NaiveDate, code: &str) -> StoreResult<()> {
        match self
            .db
            .shift_schedule
            .iter_mut()
            .find(|row| row.user_id == user_id && row.shift_date == date)
        {
            Some(row) => row.shift_abbrev = code.to_owned(),
            None => self.db.shift_schedule.push(ScheduleRow {
                user_id,
                shift_date: date,
                shift_abbrev: code.to_owned(),
            }),
        }
        self.save()
    }

    fn delete_shift(&mut self, user_id: i64, date: NaiveDate) -> StoreResult<()> {
        self.db
            .shift_schedule
            .retain(|row| !(row.user_id == user_id && row.shift_date == date));
        self.save()
    }

    fn vacations_overlapping(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<VacationRequest>> {
        Ok(self
            .db
            .vacation_requests
            .iter()
            .filter(|req| !req.archived && req.start_date <= to && from <= req.end_date)
            .cloned()
            .collect())
    }

    fn vacation_by_id(&self, id: i64) -> StoreResult<Option<VacationRequest>> {
        Ok(self.db.vacation_requests.iter().find(|r| r.id == id).cloned())
    }

    fn insert_vacation(
        &mut self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        request_date: NaiveDate,
    ) -> StoreResult<i64> {
        if self.db.users.iter().all(|u| u.id != user_id) {
            return Err(StoreError::Constraint("vacation_requests.user_id"));
        }
        let id = Self::next_id(&self.db.vacation_requests, |r| r.id);
        self.db.vacation_requests.push(VacationRequest {
            id,
            user_id,
            start_date: start,
            end_date: end,
            status: VacationStatus::Pending,
            request_date,
            archived: false,
            user_notified: false,
        });
        self.save()?;
        Ok(id)
    }

    fn set_vacation_status(
        &mut self,
        id: i64,
        status: VacationStatus,
        user_notified: bool,
    ) -> StoreResult<()> {
        let req = self
            .db
            .vacation_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::Constraint("vacation_requests.id"))?;
        req.status = status;
        req.user_notified = user_notified;
        self.save()
    }

    fn wishfree_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<WishFreeRequest>> {
        Ok(self
            .db
            .wunschfrei_requests
            .iter()
            .filter(|req| from <= req.request_date && req.request_date <= to)
            .cloned()
            .collect())
    }

    fn wishfree_at(&self, user_id: i64, date: NaiveDate) -> StoreResult<Option<WishFreeRequest>> {
        Ok(self
            .db
            .wunschfrei_requests
            .iter()
            .find(|r| r.user_id == user_id && r.request_date == date)
            .cloned())
    }

    fn wishfree_by_id(&self, id: i64) -> StoreResult<Option<WishFreeRequest>> {
        Ok(self.db.wunschfrei_requests.iter().find(|r| r.id == id).cloned())
    }

    fn upsert_wishfree(
        &mut self,
        user_id: i64,
        date: NaiveDate,
        requested: RequestedCode,
        origin: WishFreeOrigin,
    ) -> StoreResult<i64> {
        if self.db.users.iter().all(|u| u.id != user_id) {
            return Err(StoreError::Constraint("wunschfrei_requests.user_id"));
        }
        if let Some(existing) = self
            .db
            .wunschfrei_requests
            .iter_mut()
            .find(|r| r.user_id == user_id && r.request_date == date)
        {
            // resubmission resets the row instead of violating the unique key
            existing.requested_shift = requested;
            existing.requested_by = origin;
            existing.status = WishFreeStatus::Pending;
            existing.rejection_reason = None;
            existing.notified = false;
            let id = existing.id;
            self.save()?;
            return Ok(id);
        }
        let id = Self::next_id(&self.db.wunschfrei_requests, |r| r.id);
        self.db.wunschfrei_requests.push(WishFreeRequest {
            id,
            user_id,
            request_date: date,
            requested_shift: requested,
            status: WishFreeStatus::Pending,
            requested_by: origin,
            notified: false,
            rejection_reason: None,
        });
        self.save()?;
        Ok(id)
    }

    fn set_wishfree_status(
        &mut self,
        id: i64,
        status: WishFreeStatus,
        rejection_reason: Option<String>,
        notified: bool,
    ) -> StoreResult<()> {
        let req = self
            .db
            .wunschfrei_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::Constraint("wunschfrei_requests.id"))?;
        req.status = status;
        req.rejection_reason = rejection_reason;
        req.notified = notified;
        self.save()
    }

    fn delete_wishfree(&mut self, id: i64) -> StoreResult<()> {
        self.db.wunschfrei_requests.retain(|r| r.id != id);
        self.save()
    }

    fn is_month_locked(&self, month: Month) -> StoreResult<bool> {
        Ok(self.db.locked_months.contains(&month))
    }

    fn set_month_lock(&mut self, month: Month, locked: bool) -> StoreResult<()> {
        if locked {
            if !self.db.locked_months.contains(&month) {
                self.db.locked_months.push(month);
            }
        } else {
            self.db.locked_months.retain(|m| *m != month);
        }
        self.save()
    }

    fn day_locks_in_range(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<DayLock>> {
        Ok(self
            .db
            .day_locks
            .iter()
            .filter(|l| from <= l.date && l.date <= to)
            .cloned()
            .collect())
    }

    fn set_day_lock(&mut self, lock: DayLock) -> StoreResult<()> {
        match self
            .db
            .day_locks
            .iter_mut()
            .find(|l| l.user_id == lock.user_id && l.date == lock.date)
        {
            Some(existing) => *existing = lock,
            None => self.db.day_locks.push(lock),
        }
        self.save()
    }

    fn remove_day_lock(&mut self, user_id: i64, date: NaiveDate) -> StoreResult<()> {
        self.db
            .day_locks
            .retain(|l| !(l.user_id == user_id && l.date == date));
        self.save()
    }

    fn get_config(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.db.config_storage.get(key).cloned())
    }

    fn set_config(&mut self, key: &str, json: &str) -> StoreResult<()> {
        self.db.config_storage.insert(key.to_owned(), json.to_owned());
        self.save()
    }

    fn log_activity(
        &mut self,
        user_id: Option<i64>,
        action: &str,
        details: &str,
    ) -> StoreResult<()> {
        self.db.activity_log.push(ActivityEntry {
            timestamp: Self::now(),
            user_id,
            action: action.to_owned(),
            details: details.to_owned(),
        });
        self.save()
    }

    fn push_admin_notification(&mut self, message: &str) -> StoreResult<()> {
        let id = Self::next_id(&self.db.admin_notifications, |n| n.id);
        self.db.admin_notifications.push(AdminNotification {
            id,
            created_at: Self::now(),
            message: message.to_owned(),
        });
        self.save()
    }
}
