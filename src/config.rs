use crate::storage::{Store, StoreResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Config key for the tenure-bracket rule list.
pub const VACATION_TENURE_RULES: &str = "VACATION_TENURE_RULES";
/// Config key for the holiday map, `{year: {iso_date: name}}`.
pub const HOLIDAYS_NEW: &str = "HOLIDAYS_NEW";

/// Per-key cache over `config_storage`. Passed explicitly; there is no
/// process-global state. Writes go through [`ConfigCache::set`] so the
/// cached entry can never go stale.
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: HashMap<String, Option<String>>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, store: &dyn Store, key: &str) -> StoreResult<Option<String>> {
        if let Some(cached) = self.entries.get(key) {
            return Ok(cached.clone());
        }
        let value = store.get_config(key)?;
        self.entries.insert(key.to_owned(), value.clone());
        Ok(value)
    }

    pub fn set(&mut self, store: &mut dyn Store, key: &str, json: &str) -> StoreResult<()> {
        store.set_config(key, json)?;
        self.entries.remove(key);
        Ok(())
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Ordered list of tab names (`tab_order_config.json`).
pub fn load_tab_order<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_tab_order<P: AsRef<Path>>(path: P, tabs: &[String]) -> Result<()> {
    let json = serde_json::to_string_pretty(tabs)?;
    fs::write(path, json)?;
    Ok(())
}

/// Which request kinds are open to users (`request_config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(flatten)]
    pub enabled: BTreeMap<String, bool>,
}

impl RequestConfig {
    /// Missing kinds default to enabled.
    pub fn is_enabled(&self, kind: &str) -> bool {
        self.enabled.get(kind).copied().unwrap_or(true)
    }
}

pub fn load_request_config<P: AsRef<Path>>(path: P) -> Result<RequestConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(RequestConfig { enabled: BTreeMap::new() });
    }
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Single-line `version.txt`.
pub fn read_version<P: AsRef<Path>>(path: P) -> Result<String> {
    let raw = fs::read_to_string(path.as_ref())
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    Ok(raw.trim().to_owned())
}
