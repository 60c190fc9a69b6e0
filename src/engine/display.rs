use super::snapshot::{EdgeDay, MonthSnapshot};
use super::types::{CellDisplay, WishInfo};
use crate::model::{RequestedCode, VacationStatus, WishFreeOrigin, WishFreeStatus};
use crate::shifts::{NIGHT_SHIFT, VACATION_CODE, WISHFREE_ACCEPTED_CODE};
use chrono::NaiveDate;

pub const LOCK_GLYPH: char = '\u{1F512}';

/// Collapses raw shift, vacation status, wish-free status, and lock state
/// into the single cell token. Precedence: vacation overlay, then
/// wish-free overlay, then the lock glyph prefix.
pub fn resolve(snapshot: &MonthSnapshot, user_id: i64, date: NaiveDate) -> CellDisplay {
    let raw = snapshot.shift(user_id, date).unwrap_or("");
    let vacation = snapshot.vacation_status(user_id, date);
    let wish = snapshot.wishfree(user_id, date);

    let mut display = resolve_parts(raw, vacation, wish.map(|w| (w.status, &w.requested_shift, w.requested_by)));
    if let Some(wish) = wish {
        display.wish = Some(WishInfo {
            status: wish.status,
            requested: wish.requested_shift.clone(),
            origin: wish.requested_by,
        });
    }
    if snapshot.lock_reason(user_id, date).is_some() {
        display.token = format!("{LOCK_GLYPH}{}", display.plain);
    }
    display
}

/// Same rules applied to the previous-month carry column. Day locks do
/// not reach across the month boundary, so no glyph.
pub fn resolve_edge(edge: Option<&EdgeDay>) -> CellDisplay {
    let Some(edge) = edge else {
        return CellDisplay::empty();
    };
    let raw = edge.shift.as_deref().unwrap_or("");
    let wish = edge
        .wishfree
        .as_ref()
        .map(|w| (w.status, &w.requested_shift, w.requested_by));
    let mut display = resolve_parts(raw, edge.vacation, wish);
    if let Some(w) = &edge.wishfree {
        display.wish = Some(WishInfo {
            status: w.status,
            requested: w.requested_shift.clone(),
            origin: w.requested_by,
        });
    }
    display
}

fn resolve_parts(
    raw: &str,
    vacation: Option<VacationStatus>,
    wish: Option<(WishFreeStatus, &RequestedCode, WishFreeOrigin)>,
) -> CellDisplay {
    let plain = match vacation {
        Some(VacationStatus::Approved) => VACATION_CODE.to_owned(),
        Some(VacationStatus::Pending) => format!("{VACATION_CODE}?"),
        _ => match wish {
            Some((WishFreeStatus::Pending, requested, WishFreeOrigin::Admin)) => {
                format!("{} (A)?", requested.as_str())
            }
            Some((WishFreeStatus::Pending, requested, WishFreeOrigin::User)) => match requested {
                RequestedCode::WishFree => requested.as_str().to_owned(),
                RequestedCode::SplitTn => format!("{}?", requested.as_str()),
                RequestedCode::Shift(code) => format!("{code}?"),
            },
            Some((status, RequestedCode::WishFree, _)) if status.is_accepted() && raw.is_empty() => {
                WISHFREE_ACCEPTED_CODE.to_owned()
            }
            _ => raw.to_owned(),
        },
    };
    CellDisplay { token: plain.clone(), plain, wish: None }
}

/// Effective code for the hours calculation: approved vacation counts as
/// `U`, an accepted plain wish-free with no raw code as `X`, anything
/// else as the raw schedule code. Pending overlays do not change hours.
pub fn hours_code(snapshot: &MonthSnapshot, user_id: i64, date: NaiveDate) -> String {
    let raw = snapshot.shift(user_id, date).unwrap_or("");
    if snapshot.vacation_status(user_id, date) == Some(VacationStatus::Approved) {
        return VACATION_CODE.to_owned();
    }
    if raw.is_empty() {
        if let Some(wish) = snapshot.wishfree(user_id, date) {
            if wish.status.is_accepted() && wish.requested_shift == RequestedCode::WishFree {
                return WISHFREE_ACCEPTED_CODE.to_owned();
            }
        }
    }
    raw.to_owned()
}

/// Raw code of the previous-month edge day, for the rest-period seam and
/// the night carryover.
pub fn edge_shift(edge: Option<&EdgeDay>) -> &str {
    edge.and_then(|e| e.shift.as_deref()).unwrap_or("")
}

pub fn edge_is_night(edge: Option<&EdgeDay>) -> bool {
    edge_shift(edge) == NIGHT_SHIFT
}
