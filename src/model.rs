use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar month reference (civil, no timezone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range: {month}"));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid month")
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day().pred_opt().expect("valid month")
    }

    pub fn num_days(&self) -> u32 {
        self.last_day().day()
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn day(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Employee (member of the detail). Archival is soft; ordering lives in [`UserOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub vorname: String,
    pub name: String,
    pub entry_date: NaiveDate,
    /// Assigned service dog; `None` or empty means no dog.
    #[serde(default)]
    pub diensthund: Option<String>,
    #[serde(default)]
    pub urlaub_gesamt: u32,
    #[serde(default)]
    pub urlaub_rest: i32,
    #[serde(default = "default_true")]
    pub is_approved: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub archived_date: Option<NaiveDate>,
    #[serde(default)]
    pub activation_date: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.vorname, self.name)
    }

    /// Normalized dog assignment: empty strings count as "no dog".
    pub fn dog(&self) -> Option<&str> {
        self.diensthund.as_deref().filter(|d| !d.trim().is_empty())
    }

    /// Month-relevance filter: approved, not archived before the month
    /// starts, and activated no later than the month ends.
    pub fn relevant_for_month(&self, month: Month) -> bool {
        if !self.is_approved {
            return false;
        }
        if self.is_archived {
            match self.archived_date {
                // archived in the future relative to the month start stays visible
                Some(archived) if archived > month.first_day() => {}
                _ => return false,
            }
        }
        match self.activation_date {
            Some(activation) if activation > month.last_day() => false,
            _ => true,
        }
    }
}

/// Per-user ordering row (`user_order` table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOrder {
    pub user_id: i64,
    pub sort_order: i64,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

/// Vacation request lifecycle. Wire strings are the persisted German values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VacationStatus {
    #[serde(rename = "Ausstehend")]
    Pending,
    #[serde(rename = "Genehmigt")]
    Approved,
    #[serde(rename = "Storniert")]
    Cancelled,
    #[serde(rename = "Abgelehnt")]
    Rejected,
}

impl VacationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Ausstehend",
            Self::Approved => "Genehmigt",
            Self::Cancelled => "Storniert",
            Self::Rejected => "Abgelehnt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRequest {
    pub id: i64,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: VacationStatus,
    pub request_date: NaiveDate,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub user_notified: bool,
}

impl VacationRequest {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn overlaps_month(&self, month: Month) -> bool {
        self.start_date <= month.last_day() && month.first_day() <= self.end_date
    }
}

/// Who opened a wish-free request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WishFreeOrigin {
    #[serde(rename = "Benutzer")]
    User,
    #[serde(rename = "Admin")]
    Admin,
}

/// Wish-free request lifecycle. The legacy alias `Genehmigt` is read as
/// admin acceptance; writes always emit the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WishFreeStatus {
    #[serde(rename = "Ausstehend")]
    Pending,
    #[serde(rename = "Akzeptiert von Admin", alias = "Genehmigt")]
    AcceptedByAdmin,
    #[serde(rename = "Akzeptiert von Benutzer")]
    AcceptedByUser,
    #[serde(rename = "Abgelehnt von Admin")]
    RejectedByAdmin,
    #[serde(rename = "Abgelehnt von Benutzer")]
    RejectedByUser,
}

impl WishFreeStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::AcceptedByAdmin | Self::AcceptedByUser)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::RejectedByAdmin | Self::RejectedByUser)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Ausstehend",
            Self::AcceptedByAdmin => "Akzeptiert von Admin",
            Self::AcceptedByUser => "Akzeptiert von Benutzer",
            Self::RejectedByAdmin => "Abgelehnt von Admin",
            Self::RejectedByUser => "Abgelehnt von Benutzer",
        }
    }
}

/// What a wish-free request asks for: a plain free day (`WF`), the
/// day/night split sentinel (`T./N.`), or a concrete shift code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestedCode {
    WishFree,
    SplitTn,
    Shift(String),
}

impl RequestedCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::WishFree => "WF",
            Self::SplitTn => "T./N.",
            Self::Shift(code) => code,
        }
    }
}

impl From<String> for RequestedCode {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "WF" => Self::WishFree,
            "T./N." | "T/N" => Self::SplitTn,
            _ => Self::Shift(raw),
        }
    }
}

impl From<RequestedCode> for String {
    fn from(code: RequestedCode) -> Self {
        code.as_str().to_owned()
    }
}

/// Wish-free request, unique per `(user_id, request_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishFreeRequest {
    pub id: i64,
    pub user_id: i64,
    pub request_date: NaiveDate,
    pub requested_shift: RequestedCode,
    pub status: WishFreeStatus,
    pub requested_by: WishFreeOrigin,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Administrative write-prevention for a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLock {
    pub user_id: i64,
    pub date: NaiveDate,
    pub reason: String,
}

/// Tenure bracket mapping years of service to yearly vacation days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureBracket {
    pub years_min: u32,
    pub years_max: u32,
    pub days: u32,
}

impl TenureBracket {
    pub fn contains(&self, tenure_years: u32) -> bool {
        self.years_min <= tenure_years && tenure_years <= self.years_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_neighbors_across_year() {
        let jan = Month::new(2024, 1).unwrap();
        assert_eq!(jan.prev(), Month::new(2023, 12).unwrap());
        assert_eq!(Month::new(2023, 12).unwrap().next(), jan);
        assert_eq!(Month::new(2024, 2).unwrap().num_days(), 29);
    }

    #[test]
    fn archived_in_future_stays_relevant() {
        let month = Month::new(2024, 6).unwrap();
        let mut emp = Employee {
            id: 1,
            vorname: "Anna".into(),
            name: "Berg".into(),
            entry_date: date(2020, 1, 1),
            diensthund: None,
            urlaub_gesamt: 30,
            urlaub_rest: 30,
            is_approved: true,
            is_archived: false,
            archived_date: None,
            activation_date: None,
        };
        assert!(emp.relevant_for_month(month));

        emp.is_archived = true;
        emp.archived_date = Some(date(2024, 7, 15));
        assert!(emp.relevant_for_month(month));

        emp.archived_date = Some(date(2024, 5, 31));
        assert!(!emp.relevant_for_month(month));
    }

    #[test]
    fn activation_after_month_end_hides() {
        let month = Month::new(2024, 6).unwrap();
        let emp = Employee {
            id: 2,
            vorname: "Jon".into(),
            name: "Clark".into(),
            entry_date: date(2024, 7, 1),
            diensthund: Some("  ".into()),
            urlaub_gesamt: 30,
            urlaub_rest: 30,
            is_approved: true,
            is_archived: false,
            archived_date: None,
            activation_date: Some(date(2024, 7, 1)),
        };
        assert!(!emp.relevant_for_month(month));
        assert_eq!(emp.dog(), None);
    }

    #[test]
    fn wishfree_status_wire_strings() {
        let json = serde_json::to_string(&WishFreeStatus::AcceptedByAdmin).unwrap();
        assert_eq!(json, "\"Akzeptiert von Admin\"");
        // legacy alias
        let legacy: WishFreeStatus = serde_json::from_str("\"Genehmigt\"").unwrap();
        assert_eq!(legacy, WishFreeStatus::AcceptedByAdmin);
    }

    #[test]
    fn requested_code_roundtrip() {
        let split: RequestedCode = serde_json::from_str("\"T./N.\"").unwrap();
        assert_eq!(split, RequestedCode::SplitTn);
        let concrete: RequestedCode = serde_json::from_str("\"6\"").unwrap();
        assert_eq!(concrete, RequestedCode::Shift("6".into()));
        assert_eq!(serde_json::to_string(&RequestedCode::WishFree).unwrap(), "\"WF\"");
    }
}
