use super::display;
use super::types::CellRef;
use super::util::days_inclusive;
use crate::model::{
    DayLock, Employee, Month, VacationRequest, VacationStatus, WishFreeRequest,
};
use crate::shifts::is_counted;
use crate::storage::ScheduleRow;
use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Last day of the previous month, as needed by the carry column and the
/// night-shift hour carryover.
#[derive(Debug, Clone, Default)]
pub struct EdgeDay {
    pub shift: Option<String>,
    pub vacation: Option<VacationStatus>,
    pub wishfree: Option<WishFreeRequest>,
}

/// All caches of one loaded month. Every mutation goes through the
/// engine so the schedule, counts, and violation sets stay in agreement.
#[derive(Debug)]
pub struct MonthSnapshot {
    pub month: Month,
    /// Ordered, filtered employee list for the month.
    pub users: Vec<Employee>,
    pub month_locked: bool,
    schedule: HashMap<i64, BTreeMap<chrono::NaiveDate, String>>,
    vacations: HashMap<i64, BTreeMap<chrono::NaiveDate, VacationStatus>>,
    wishfree: HashMap<i64, BTreeMap<chrono::NaiveDate, WishFreeRequest>>,
    day_locks: HashMap<i64, BTreeMap<chrono::NaiveDate, String>>,
    daily_counts: BTreeMap<chrono::NaiveDate, BTreeMap<String, u32>>,
    pub(super) rest_violations: BTreeSet<CellRef>,
    pub(super) dog_violations: BTreeSet<CellRef>,
    prev_edge: HashMap<i64, EdgeDay>,
    pub(super) hours_cache: HashMap<i64, f64>,
}

pub(super) fn vacation_rank(status: VacationStatus) -> u8 {
    match status {
        VacationStatus::Approved => 3,
        VacationStatus::Pending => 2,
        VacationStatus::Cancelled | VacationStatus::Rejected => 1,
    }
}

impl MonthSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn build(
        month: Month,
        users: Vec<Employee>,
        schedule_rows: Vec<ScheduleRow>,
        vacation_rows: Vec<VacationRequest>,
        wishfree_rows: Vec<WishFreeRequest>,
        lock_rows: Vec<DayLock>,
        month_locked: bool,
        edge_rows: HashMap<i64, EdgeDay>,
    ) -> Self {
        let mut snapshot = Self {
            month,
            users,
            month_locked,
            schedule: HashMap::new(),
            vacations: HashMap::new(),
            wishfree: HashMap::new(),
            day_locks: HashMap::new(),
            daily_counts: BTreeMap::new(),
            rest_violations: BTreeSet::new(),
            dog_violations: BTreeSet::new(),
            prev_edge: edge_rows,
            hours_cache: HashMap::new(),
        };
        for row in schedule_rows {
            if month.contains(row.shift_date) && !row.shift_abbrev.is_empty() {
                snapshot
                    .schedule
                    .entry(row.user_id)
                    .or_default()
                    .insert(row.shift_date, row.shift_abbrev);
            }
        }
        for req in vacation_rows {
            snapshot.merge_vacation(&req);
        }
        for req in wishfree_rows {
            if month.contains(req.request_date) {
                snapshot
                    .wishfree
                    .entry(req.user_id)
                    .or_default()
                    .insert(req.request_date, req);
            }
        }
        for lock in lock_rows {
            if month.contains(lock.date) {
                snapshot
                    .day_locks
                    .entry(lock.user_id)
                    .or_default()
                    .insert(lock.date, lock.reason);
            }
        }
        snapshot.rebuild_counts();
        snapshot
    }

    /// Folds one vacation request into `processed_vacations`, keeping the
    /// most relevant status per day when requests overlap.
    pub(super) fn merge_vacation(&mut self, req: &VacationRequest) {
        let from = req.start_date.max(self.month.first_day());
        let to = req.end_date.min(self.month.last_day());
        let per_user = self.vacations.entry(req.user_id).or_default();
        for date in days_inclusive(from, to) {
            match per_user.get(&date) {
                Some(existing) if vacation_rank(*existing) > vacation_rank(req.status) => {}
                _ => {
                    per_user.insert(date, req.status);
                }
            }
        }
    }

    pub fn user(&self, user_id: i64) -> Option<&Employee> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn days(&self) -> impl Iterator<Item = chrono::NaiveDate> {
        days_inclusive(self.month.first_day(), self.month.last_day())
    }

    pub fn shift(&self, user_id: i64, date: chrono::NaiveDate) -> Option<&str> {
        self.schedule
            .get(&user_id)
            .and_then(|per_day| per_day.get(&date))
            .map(String::as_str)
    }

    pub fn shifts_of(&self, user_id: i64) -> Option<&BTreeMap<chrono::NaiveDate, String>> {
        self.schedule.get(&user_id)
    }

    pub(super) fn set_shift(&mut self, user_id: i64, date: chrono::NaiveDate, code: Option<&str>) {
        let per_day = self.schedule.entry(user_id).or_default();
        match code {
            Some(code) if !code.is_empty() => {
                per_day.insert(date, code.to_owned());
            }
            _ => {
                per_day.remove(&date);
            }
        }
    }

    pub fn vacation_status(&self, user_id: i64, date: chrono::NaiveDate) -> Option<VacationStatus> {
        self.vacations
            .get(&user_id)
            .and_then(|per_day| per_day.get(&date))
            .copied()
    }

    pub(super) fn set_vacation_day(
        &mut self,
        user_id: i64,
        date: chrono::NaiveDate,
        status: Option<VacationStatus>,
    ) {
        match status {
            Some(status) => {
                self.vacations.entry(user_id).or_default().insert(date, status);
            }
            None => {
                if let Some(per_day) = self.vacations.get_mut(&user_id) {
                    per_day.remove(&date);
                }
            }
        }
    }

    pub fn wishfree(&self, user_id: i64, date: chrono::NaiveDate) -> Option<&WishFreeRequest> {
        self.wishfree.get(&user_id).and_then(|per_day| per_day.get(&date))
    }

    pub(super) fn set_wishfree(&mut self, req: WishFreeRequest) {
        if self.month.contains(req.request_date) {
            self.wishfree
                .entry(req.user_id)
                .or_default()
                .insert(req.request_date, req);
        }
    }

    pub(super) fn remove_wishfree(&mut self, user_id: i64, date: chrono::NaiveDate) {
        if let Some(per_day) = self.wishfree.get_mut(&user_id) {
            per_day.remove(&date);
        }
    }

    pub fn lock_reason(&self, user_id: i64, date: chrono::NaiveDate) -> Option<&str> {
        self.day_locks
            .get(&user_id)
            .and_then(|per_day| per_day.get(&date))
            .map(String::as_str)
    }

    pub(super) fn set_day_lock(&mut self, user_id: i64, date: chrono::NaiveDate, reason: String) {
        self.day_locks.entry(user_id).or_default().insert(date, reason);
    }

    pub(super) fn remove_day_lock(&mut self, user_id: i64, date: chrono::NaiveDate) {
        if let Some(per_day) = self.day_locks.get_mut(&user_id) {
            per_day.remove(&date);
        }
    }

    pub fn prev_edge(&self, user_id: i64) -> Option<&EdgeDay> {
        self.prev_edge.get(&user_id)
    }

    /// Zero-free headcount per date and counted code.
    pub fn counts(&self, date: chrono::NaiveDate) -> Option<&BTreeMap<String, u32>> {
        self.daily_counts.get(&date)
    }

    pub fn count(&self, date: chrono::NaiveDate, code: &str) -> u32 {
        self.daily_counts
            .get(&date)
            .and_then(|per_code| per_code.get(code))
            .copied()
            .unwrap_or(0)
    }

    /// Applies a token transition to the counts, dropping zero entries.
    pub(super) fn adjust_count(&mut self, date: chrono::NaiveDate, before: &str, after: &str) {
        if before == after {
            return;
        }
        if is_counted(before) {
            if let Some(per_code) = self.daily_counts.get_mut(&date) {
                if let Some(n) = per_code.get_mut(before) {
                    *n = n.saturating_sub(1);
                    if *n == 0 {
                        per_code.remove(before);
                    }
                }
                if per_code.is_empty() {
                    self.daily_counts.remove(&date);
                }
            }
        }
        if is_counted(after) {
            *self
                .daily_counts
                .entry(date)
                .or_default()
                .entry(after.to_owned())
                .or_insert(0) += 1;
        }
    }

    /// Full recount from the resolved tokens of every cell.
    pub(super) fn rebuild_counts(&mut self) {
        let mut counts: BTreeMap<chrono::NaiveDate, BTreeMap<String, u32>> = BTreeMap::new();
        let user_ids: Vec<i64> = self.users.iter().map(|u| u.id).collect();
        for date in self.days() {
            for &user_id in &user_ids {
                let token = display::resolve(self, user_id, date).plain;
                if is_counted(&token) {
                    *counts.entry(date).or_default().entry(token).or_insert(0) += 1;
                }
            }
        }
        self.daily_counts = counts;
    }

    /// Union of the rest-period and dog-overlap violation sets.
    pub fn violation_cells(&self) -> BTreeSet<CellRef> {
        self.rest_violations
            .union(&self.dog_violations)
            .copied()
            .collect()
    }

    pub fn is_violated(&self, cell: CellRef) -> bool {
        self.rest_violations.contains(&cell) || self.dog_violations.contains(&cell)
    }

    pub(super) fn invalidate_aggregates(&mut self) {
        self.hours_cache.clear();
    }

    pub(super) fn cell(&self, user_id: i64, date: chrono::NaiveDate) -> Option<CellRef> {
        self.month
            .contains(date)
            .then(|| CellRef::new(user_id, date.day()))
    }
}
