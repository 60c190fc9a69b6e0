use crate::config::{ConfigCache, HOLIDAYS_NEW};
use crate::storage::{Store, StoreError, StoreResult};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

type YearMap = BTreeMap<NaiveDate, String>;

/// Per-year holiday lookup backed by the `HOLIDAYS_NEW` config blob.
#[derive(Debug, Default)]
pub struct HolidayCalendar {
    years: HashMap<i32, YearMap>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(
        &mut self,
        store: &dyn Store,
        config: &mut ConfigCache,
        year: i32,
    ) -> StoreResult<&YearMap> {
        if !self.years.contains_key(&year) {
            let all = load_blob(store, config)?;
            let map = all.get(&year.to_string()).cloned().unwrap_or_default();
            self.years.insert(year, map);
        }
        Ok(&self.years[&year])
    }

    pub fn holiday_name(
        &mut self,
        store: &dyn Store,
        config: &mut ConfigCache,
        date: NaiveDate,
    ) -> StoreResult<Option<String>> {
        use chrono::Datelike;
        Ok(self.year(store, config, date.year())?.get(&date).cloned())
    }

    pub fn is_holiday(
        &mut self,
        store: &dyn Store,
        config: &mut ConfigCache,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        Ok(self.holiday_name(store, config, date)?.is_some())
    }

    /// Replaces one year in the blob and drops the year's cache entry.
    pub fn save_year(
        &mut self,
        store: &mut dyn Store,
        config: &mut ConfigCache,
        year: i32,
        map: YearMap,
    ) -> StoreResult<()> {
        let mut all = load_blob(store, config)?;
        all.insert(year.to_string(), map);
        let json = serde_json::to_string(&all)
            .map_err(|err| StoreError::Unavailable(anyhow::Error::new(err)))?;
        config.set(store, HOLIDAYS_NEW, &json)?;
        self.years.remove(&year);
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.years.clear();
    }
}

fn load_blob(
    store: &dyn Store,
    config: &mut ConfigCache,
) -> StoreResult<HashMap<String, YearMap>> {
    let raw = config.get(store, HOLIDAYS_NEW)?;
    let all = raw
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .unwrap_or_else(|err| {
            tracing::warn!(%err, "holiday blob unreadable, treating as empty");
            None
        })
        .unwrap_or_default();
    Ok(all)
}

/// One-time migration of a legacy `holidays.json` file into config
/// storage. The file is renamed with a `.migrated` suffix afterwards so
/// the migration never runs twice. Returns whether a migration happened.
pub fn migrate_legacy_file<P: AsRef<Path>>(
    path: P,
    store: &mut dyn Store,
    config: &mut ConfigCache,
    calendar: &mut HolidayCalendar,
) -> Result<bool> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(false);
    }
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let legacy: HashMap<String, YearMap> =
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))?;

    let mut all = load_blob(store, config).map_err(anyhow::Error::new)?;
    for (year, map) in legacy {
        all.entry(year).or_insert(map);
    }
    let json = serde_json::to_string(&all)?;
    config
        .set(store, HOLIDAYS_NEW, &json)
        .map_err(anyhow::Error::new)?;
    calendar.invalidate();

    let migrated = path.with_extension("json.migrated");
    fs::rename(path, &migrated)
        .with_context(|| format!("renaming {} to {}", path.display(), migrated.display()))?;
    Ok(true)
}
