use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const NIGHT_SHIFT: &str = "N.";
pub const VACATION_CODE: &str = "U";
pub const WISHFREE_ACCEPTED_CODE: &str = "X";
pub const WISHFREE_CODE: &str = "WF";

/// Early-start codes that violate the rest period after a night shift.
pub const REST_SENSITIVE: &[&str] = &["T.", "6", "QA", "S"];

/// Codes meaning "not working" for conflict purposes.
pub const FREE_INDICATORS: &[&str] = &["U", "X", "EU", "WF", "FREI"];

/// Codes excluded from the per-day headcounts.
pub const NON_COUNTED: &[&str] = &["U", "X", "EU", "WF", "U?", "T./N.?"];

pub fn is_free_indicator(code: &str) -> bool {
    code.is_empty() || FREE_INDICATORS.contains(&code)
}

/// Whether a resolved cell token participates in `daily_counts`.
/// Pending overlays all carry a `?` suffix and never count.
pub fn is_counted(token: &str) -> bool {
    !token.is_empty() && !token.ends_with('?') && !NON_COUNTED.contains(&token)
}

/// One shift-type definition. End ≤ start means the shift crosses midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftType {
    pub code: String,
    pub color: String,
    pub hours: f64,
    #[serde(default, with = "hhmm_opt")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub end_time: Option<NaiveTime>,
}

impl ShiftType {
    pub fn new(code: &str, color: &str, hours: f64, start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            code: code.to_owned(),
            color: color.to_owned(),
            hours,
            start_time: start.and_then(parse_hhmm),
            end_time: end.and_then(parse_hhmm),
        }
    }
}

fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// `HH:MM` (de)serialization for optional times.
mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => ser.serialize_str(&t.format("%H:%M").to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_hhmm(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {s}"))),
        }
    }
}

/// Registry of shift types with the interval table precomputed once per
/// load. Intervals are minutes since the shift day's midnight; an end at
/// or before the start wraps past midnight.
#[derive(Debug, Clone)]
pub struct ShiftTypeRegistry {
    types: HashMap<String, ShiftType>,
    intervals: HashMap<String, (i64, i64)>,
}

impl ShiftTypeRegistry {
    pub fn new(types: Vec<ShiftType>) -> Self {
        let mut by_code = HashMap::new();
        let mut intervals = HashMap::new();
        for st in types {
            match (st.start_time, st.end_time) {
                (Some(start), Some(end)) => {
                    let s = i64::from(start.num_seconds_from_midnight()) / 60;
                    let mut e = i64::from(end.num_seconds_from_midnight()) / 60;
                    if e <= s {
                        e += 24 * 60;
                    }
                    intervals.insert(st.code.clone(), (s, e));
                }
                _ if !is_free_indicator(&st.code) => {
                    // cannot participate in dog-overlap checks
                    tracing::warn!(code = %st.code, "shift type has no times, overlap checks skip it");
                }
                _ => {}
            }
            by_code.insert(st.code.clone(), st);
        }
        if !intervals.contains_key(NIGHT_SHIFT) {
            tracing::warn!("night shift `N.` has no times, post-midnight hours fall back to 6.0");
        }
        Self { types: by_code, intervals }
    }

    /// Built-in registry matching the unit's standard plan.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            ShiftType::new("T.", "#ffe082", 12.0, Some("07:00"), Some("19:00")),
            ShiftType::new("N.", "#90caf9", 12.0, Some("19:00"), Some("06:00")),
            ShiftType::new("6", "#a5d6a7", 6.0, Some("13:00"), Some("19:00")),
            ShiftType::new("24", "#ef9a9a", 24.0, Some("07:00"), Some("07:00")),
            ShiftType::new("QA", "#ce93d8", 8.0, Some("07:00"), Some("15:00")),
            ShiftType::new("S", "#80cbc4", 8.0, Some("06:00"), Some("14:00")),
            ShiftType::new("U", "#fff59d", 0.0, None, None),
            ShiftType::new("X", "#e0e0e0", 0.0, None, None),
            ShiftType::new("EU", "#ffcc80", 0.0, None, None),
            ShiftType::new("WF", "#b0bec5", 0.0, None, None),
            ShiftType::new("FREI", "#cfd8dc", 0.0, None, None),
        ])
    }

    pub fn get(&self, code: &str) -> Option<&ShiftType> {
        self.types.get(code)
    }

    /// Hours credited for a code; unknown codes contribute zero.
    pub fn hours(&self, code: &str) -> f64 {
        self.types.get(code).map_or(0.0, |st| st.hours)
    }

    /// Minute interval for a code, if it has times. Free indicators never
    /// take part in overlap checks.
    pub fn interval(&self, code: &str) -> Option<(i64, i64)> {
        if is_free_indicator(code) {
            return None;
        }
        self.intervals.get(code).copied()
    }

    /// Post-midnight share of the night shift, derived from its end time.
    pub fn night_carry_hours(&self) -> f64 {
        match self.types.get(NIGHT_SHIFT).and_then(|st| st.end_time) {
            Some(end) => f64::from(end.num_seconds_from_midnight()) / 3600.0,
            None => 6.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShiftType> {
        self.types.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
