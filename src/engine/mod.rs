mod conflicts;
mod display;
mod entitlement;
mod hours;
mod mutate;
mod requests;
mod snapshot;
mod types;
mod util;

pub use display::{resolve as resolve_cell, LOCK_GLYPH};
pub use entitlement::{entitlement_days, tenure_years, EntitlementChange, DEFAULT_RULES};
pub use snapshot::{EdgeDay, MonthSnapshot};
pub use types::{
    CellDisplay, CellRef, EditOptions, EditOutcome, EngineError, EngineResult, WishInfo,
};

use crate::config::ConfigCache;
use crate::holidays::HolidayCalendar;
use crate::model::{
    DayLock, Employee, Month, RequestedCode, TenureBracket, UserOrder, WishFreeOrigin,
};
use crate::shifts::ShiftTypeRegistry;
use crate::storage::Store;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Owner of all per-month caches. Single-threaded by design: the GUI
/// event loop drives it, workers never touch it.
pub struct DataManager {
    store: Box<dyn Store>,
    registry: ShiftTypeRegistry,
    config: ConfigCache,
    holidays: HolidayCalendar,
    snapshot: Option<MonthSnapshot>,
    /// Memoized neighbor-month schedules, keyed per month.
    neighbors: HashMap<Month, HashMap<(i64, NaiveDate), String>>,
    order_cache: Option<Vec<UserOrder>>,
}

impl DataManager {
    pub fn new(store: Box<dyn Store>, registry: ShiftTypeRegistry) -> Self {
        Self {
            store,
            registry,
            config: ConfigCache::new(),
            holidays: HolidayCalendar::new(),
            snapshot: None,
            neighbors: HashMap::new(),
            order_cache: None,
        }
    }

    pub fn registry(&self) -> &ShiftTypeRegistry {
        &self.registry
    }

    /// Swapping the registry invalidates the precomputed interval table,
    /// so conflicts are rebuilt when a month is loaded.
    pub fn set_registry(&mut self, registry: ShiftTypeRegistry) -> EngineResult<()> {
        self.registry = registry;
        if self.snapshot.is_some() {
            conflicts::rebuild(self)?;
        }
        Ok(())
    }

    pub fn store(&self) -> &dyn Store {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn Store {
        &mut *self.store
    }

    pub fn snapshot(&self) -> Option<&MonthSnapshot> {
        self.snapshot.as_ref()
    }

    pub(super) fn snap(&self) -> EngineResult<&MonthSnapshot> {
        self.snapshot.as_ref().ok_or(EngineError::NoMonthLoaded)
    }

    pub(super) fn snap_mut(&mut self) -> EngineResult<&mut MonthSnapshot> {
        self.snapshot.as_mut().ok_or(EngineError::NoMonthLoaded)
    }

    /// Ordered, filtered employee list for a month: persisted sort order
    /// ascending, then family name.
    fn users_for_month(&mut self, month: Month, include_hidden: bool) -> EngineResult<Vec<Employee>> {
        if self.order_cache.is_none() {
            self.order_cache = Some(self.store.user_order()?);
        }
        let order: HashMap<i64, &UserOrder> = self
            .order_cache
            .iter()
            .flatten()
            .map(|o| (o.user_id, o))
            .collect();

        let mut users: Vec<Employee> = self
            .store
            .list_users()?
            .into_iter()
            .filter(|u| u.relevant_for_month(month))
            .filter(|u| include_hidden || order.get(&u.id).map_or(true, |o| o.is_visible))
            .collect();
        users.sort_by(|a, b| {
            let sort_a = order.get(&a.id).map_or(i64::MAX, |o| o.sort_order);
            let sort_b = order.get(&b.id).map_or(i64::MAX, |o| o.sort_order);
            sort_a.cmp(&sort_b).then_with(|| a.name.cmp(&b.name))
        });
        Ok(users)
    }

    /// Loads one month into the snapshot: employees, schedule, requests,
    /// locks, the previous-month edge day, then counts and conflicts.
    pub fn load_month(&mut self, month: Month, include_hidden: bool) -> EngineResult<()> {
        let users = self.users_for_month(month, include_hidden)?;
        let first = month.first_day();
        let last = month.last_day();

        let schedule_rows = self.store.shifts_in_range(first, last)?;
        let vacation_rows = self.store.vacations_overlapping(first, last)?;
        let wishfree_rows = self.store.wishfree_in_range(first, last)?;
        let lock_rows = self.store.day_locks_in_range(first, last)?;
        let month_locked = self.store.is_month_locked(month)?;

        let edge_date = month.prev().last_day();
        let edge_shifts = self.store.shifts_in_range(edge_date, edge_date)?;
        let edge_vacations = self.store.vacations_overlapping(edge_date, edge_date)?;
        let edge_wishes = self.store.wishfree_in_range(edge_date, edge_date)?;
        let mut edges: HashMap<i64, EdgeDay> = HashMap::new();
        for row in edge_shifts {
            edges.entry(row.user_id).or_default().shift = Some(row.shift_abbrev);
        }
        for req in edge_vacations {
            let edge = edges.entry(req.user_id).or_default();
            edge.vacation = match edge.vacation {
                Some(existing) if snapshot::vacation_rank(existing) >= snapshot::vacation_rank(req.status) => {
                    Some(existing)
                }
                _ => Some(req.status),
            };
        }
        for req in edge_wishes {
            let user_id = req.user_id;
            edges.entry(user_id).or_default().wishfree = Some(req);
        }

        self.snapshot = Some(MonthSnapshot::build(
            month,
            users,
            schedule_rows,
            vacation_rows,
            wishfree_rows,
            lock_rows,
            month_locked,
            edges,
        ));
        self.neighbors.clear();
        conflicts::rebuild(self)?;
        tracing::debug!(%month, "month loaded");
        Ok(())
    }

    /// The one lookup primitive for schedule codes. In-month dates come
    /// from the snapshot; anything else goes through a memoized fetch of
    /// that month's schedule. Empty string means no assignment.
    pub fn lookup_shift(&mut self, user_id: i64, date: NaiveDate) -> EngineResult<String> {
        let snapshot = self.snap()?;
        if snapshot.month.contains(date) {
            return Ok(snapshot.shift(user_id, date).unwrap_or("").to_owned());
        }
        let month = Month::of(date);
        if !self.neighbors.contains_key(&month) {
            let rows = self
                .store
                .shifts_in_range(month.first_day(), month.last_day())?;
            let map = rows
                .into_iter()
                .map(|row| ((row.user_id, row.shift_date), row.shift_abbrev))
                .collect();
            self.neighbors.insert(month, map);
        }
        Ok(self.neighbors[&month]
            .get(&(user_id, date))
            .cloned()
            .unwrap_or_default())
    }

    pub(super) fn invalidate_neighbor(&mut self, month: Month) {
        self.neighbors.remove(&month);
    }

    /// Single-cell edit with the full incremental update protocol.
    pub fn apply_edit(
        &mut self,
        user_id: i64,
        date: NaiveDate,
        code: Option<&str>,
        opts: EditOptions,
    ) -> EngineResult<EditOutcome> {
        mutate::apply_edit(self, user_id, date, code, opts, true)
    }

    pub fn rebuild_conflicts(&mut self) -> EngineResult<()> {
        conflicts::rebuild(self)
    }

    pub fn display(&self, user_id: i64, date: NaiveDate) -> EngineResult<CellDisplay> {
        Ok(display::resolve(self.snap()?, user_id, date))
    }

    /// The `Ü` carry column: the last day of the previous month.
    pub fn carry_display(&self, user_id: i64) -> EngineResult<CellDisplay> {
        Ok(display::resolve_edge(self.snap()?.prev_edge(user_id)))
    }

    pub fn month_hours(&mut self, user_id: i64) -> EngineResult<f64> {
        hours::month_hours(self, user_id)
    }

    // ----- vacation requests -----

    pub fn request_vacation(
        &mut self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        request_date: NaiveDate,
    ) -> EngineResult<i64> {
        requests::request_vacation(self, user_id, start, end, request_date)
    }

    pub fn approve_vacation(&mut self, id: i64) -> EngineResult<()> {
        requests::approve_vacation(self, id)
    }

    pub fn reject_vacation(&mut self, id: i64) -> EngineResult<()> {
        requests::reject_vacation(self, id)
    }

    pub fn cancel_vacation(&mut self, id: i64) -> EngineResult<()> {
        requests::cancel_vacation(self, id)
    }

    // ----- wish-free requests -----

    pub fn request_wishfree(
        &mut self,
        user_id: i64,
        date: NaiveDate,
        requested: RequestedCode,
        origin: WishFreeOrigin,
    ) -> EngineResult<i64> {
        requests::request_wishfree(self, user_id, date, requested, origin)
    }

    pub fn decide_wishfree(
        &mut self,
        id: i64,
        accept: bool,
        reason: Option<String>,
    ) -> EngineResult<()> {
        requests::decide_wishfree(self, id, accept, reason)
    }

    pub fn withdraw_wishfree(&mut self, id: i64) -> EngineResult<()> {
        requests::withdraw_wishfree(self, id)
    }

    // ----- entitlement -----

    pub fn vacation_rules(&mut self) -> EngineResult<Vec<TenureBracket>> {
        entitlement::load_rules(self)
    }

    pub fn save_vacation_rules(&mut self, rules: Vec<TenureBracket>) -> EngineResult<()> {
        entitlement::save_rules(self, rules)
    }

    pub fn entitlement_for(&mut self, entry_date: NaiveDate, at: NaiveDate) -> EngineResult<u32> {
        let rules = entitlement::load_rules(self)?;
        Ok(entitlement_days(&rules, tenure_years(entry_date, at), None))
    }

    pub fn update_all_entitlements(&mut self, at: NaiveDate) -> EngineResult<Vec<EntitlementChange>> {
        entitlement::batch_update(self, at)
    }

    // ----- locks -----

    pub fn lock_month(&mut self, month: Month) -> EngineResult<()> {
        self.store.set_month_lock(month, true)?;
        if let Some(snapshot) = self.snapshot.as_mut() {
            if snapshot.month == month {
                snapshot.month_locked = true;
            }
        }
        Ok(())
    }

    pub fn unlock_month(&mut self, month: Month) -> EngineResult<()> {
        self.store.set_month_lock(month, false)?;
        if let Some(snapshot) = self.snapshot.as_mut() {
            if snapshot.month == month {
                snapshot.month_locked = false;
            }
        }
        Ok(())
    }

    pub fn lock_day(&mut self, user_id: i64, date: NaiveDate, reason: &str) -> EngineResult<()> {
        self.store.set_day_lock(DayLock {
            user_id,
            date,
            reason: reason.to_owned(),
        })?;
        if let Some(snapshot) = self.snapshot.as_mut() {
            if snapshot.month.contains(date) {
                snapshot.set_day_lock(user_id, date, reason.to_owned());
            }
        }
        Ok(())
    }

    pub fn unlock_day(&mut self, user_id: i64, date: NaiveDate) -> EngineResult<()> {
        self.store.remove_day_lock(user_id, date)?;
        if let Some(snapshot) = self.snapshot.as_mut() {
            if snapshot.month.contains(date) {
                snapshot.remove_day_lock(user_id, date);
            }
        }
        Ok(())
    }

    // ----- ordering, holidays -----

    pub fn save_user_order(&mut self, order: Vec<UserOrder>) -> EngineResult<()> {
        self.store.save_user_order(order)?;
        self.order_cache = None;
        Ok(())
    }

    pub fn is_holiday(&mut self, date: NaiveDate) -> EngineResult<bool> {
        Ok(self.holidays.is_holiday(&*self.store, &mut self.config, date)?)
    }

    pub fn holiday_name(&mut self, date: NaiveDate) -> EngineResult<Option<String>> {
        Ok(self
            .holidays
            .holiday_name(&*self.store, &mut self.config, date)?)
    }

    pub fn save_holidays_year(
        &mut self,
        year: i32,
        map: BTreeMap<NaiveDate, String>,
    ) -> EngineResult<()> {
        Ok(self
            .holidays
            .save_year(&mut *self.store, &mut self.config, year, map)?)
    }

    pub fn migrate_legacy_holidays<P: AsRef<std::path::Path>>(
        &mut self,
        path: P,
    ) -> EngineResult<bool> {
        Ok(crate::holidays::migrate_legacy_file(
            path,
            &mut *self.store,
            &mut self.config,
            &mut self.holidays,
        )?)
    }
}
