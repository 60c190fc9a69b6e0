use super::display;
use super::mutate;
use super::snapshot::vacation_rank;
use super::types::{EditOptions, EngineError, EngineResult};
use super::util::days_inclusive;
use super::DataManager;
use crate::model::{
    Month, RequestedCode, VacationStatus, WishFreeOrigin, WishFreeStatus,
};
use crate::notification::{NoticeRenderer, RequestEvent, TextNotice};
use crate::shifts::{VACATION_CODE, WISHFREE_ACCEPTED_CODE};
use chrono::NaiveDate;

/// Writes a schedule cell wherever it lives: through the incremental
/// protocol when the loaded month covers it, directly to the store (plus
/// neighbor-cache invalidation) otherwise. Request transitions are
/// administrative, so locks are not enforced here.
fn write_shift(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
    code: Option<&str>,
) -> EngineResult<()> {
    let in_month = manager
        .snapshot()
        .map_or(false, |s| s.month.contains(date) && s.user(user_id).is_some());
    if in_month {
        mutate::apply_edit(manager, user_id, date, code, EditOptions::default(), false)?;
    } else {
        match code {
            Some(code) if !code.is_empty() => {
                manager.store_mut().upsert_shift(user_id, date, code)?;
            }
            _ => manager.store_mut().delete_shift(user_id, date)?,
        }
        manager.invalidate_neighbor(Month::of(date));
    }
    Ok(())
}

/// Recomputes `processed_vacations` for one cell from the store and
/// keeps the daily counts in step with the token change.
fn refresh_vacation_day(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
) -> EngineResult<()> {
    let in_month = manager
        .snapshot()
        .map_or(false, |s| s.month.contains(date) && s.user(user_id).is_some());
    if !in_month {
        return Ok(());
    }
    let best = manager
        .store()
        .vacations_overlapping(date, date)?
        .into_iter()
        .filter(|req| req.user_id == user_id && req.covers(date))
        .max_by_key(|req| vacation_rank(req.status))
        .map(|req| req.status);

    let snapshot = manager.snap_mut()?;
    let before = display::resolve(&*snapshot, user_id, date).plain;
    snapshot.set_vacation_day(user_id, date, best);
    let after = display::resolve(&*snapshot, user_id, date).plain;
    snapshot.adjust_count(date, &before, &after);
    // overlays change effective hours even without a schedule write
    snapshot.invalidate_aggregates();
    Ok(())
}

/// Reloads the wish-free cache entry for one cell.
fn refresh_wishfree_cell(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
) -> EngineResult<()> {
    let in_month = manager
        .snapshot()
        .map_or(false, |s| s.month.contains(date) && s.user(user_id).is_some());
    if !in_month {
        return Ok(());
    }
    let row = manager.store().wishfree_at(user_id, date)?;
    let snapshot = manager.snap_mut()?;
    let before = display::resolve(&*snapshot, user_id, date).plain;
    match row {
        Some(req) => snapshot.set_wishfree(req),
        None => snapshot.remove_wishfree(user_id, date),
    }
    let after = display::resolve(&*snapshot, user_id, date).plain;
    snapshot.adjust_count(date, &before, &after);
    snapshot.invalidate_aggregates();
    Ok(())
}

pub(super) fn request_vacation(
    manager: &mut DataManager,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    request_date: NaiveDate,
) -> EngineResult<i64> {
    if end < start {
        return Err(EngineError::Validation(
            "vacation end before start".to_owned(),
        ));
    }
    let user = manager
        .store()
        .get_user(user_id)?
        .ok_or(EngineError::UnknownEmployee(user_id))?;

    let id = manager
        .store_mut()
        .insert_vacation(user_id, start, end, request_date)?;
    for date in days_inclusive(start, end) {
        refresh_vacation_day(manager, user_id, date)?;
    }

    let notice = TextNotice.render(&RequestEvent::VacationRequested {
        user: &user,
        start,
        end,
    });
    manager.store_mut().push_admin_notification(&notice)?;
    manager.store_mut().log_activity(
        Some(user_id),
        "vacation_requested",
        &format!("{start} bis {end}"),
    )?;
    Ok(id)
}

pub(super) fn approve_vacation(manager: &mut DataManager, id: i64) -> EngineResult<()> {
    let req = manager
        .store()
        .vacation_by_id(id)?
        .ok_or(EngineError::UnknownRequest(id))?;
    if req.status != VacationStatus::Pending {
        return Err(EngineError::InvalidTransition {
            from: req.status.as_str(),
            to: VacationStatus::Approved.as_str(),
        });
    }

    manager
        .store_mut()
        .set_vacation_status(id, VacationStatus::Approved, false)?;
    for date in days_inclusive(req.start_date, req.end_date) {
        refresh_vacation_day(manager, req.user_id, date)?;
        // existing concrete codes stay in place (the vacation overlay wins
        // in the resolver); cancellation can then restore them
        let current = manager.store().get_shift(req.user_id, date)?;
        if current.is_none() {
            write_shift(manager, req.user_id, date, Some(VACATION_CODE))?;
        }
    }
    manager.store_mut().log_activity(
        Some(req.user_id),
        "vacation_approved",
        &format!("Antrag {id}: {} bis {}", req.start_date, req.end_date),
    )?;
    Ok(())
}

pub(super) fn reject_vacation(manager: &mut DataManager, id: i64) -> EngineResult<()> {
    let req = manager
        .store()
        .vacation_by_id(id)?
        .ok_or(EngineError::UnknownRequest(id))?;
    if req.status != VacationStatus::Pending {
        return Err(EngineError::InvalidTransition {
            from: req.status.as_str(),
            to: VacationStatus::Rejected.as_str(),
        });
    }
    manager
        .store_mut()
        .set_vacation_status(id, VacationStatus::Rejected, false)?;
    for date in days_inclusive(req.start_date, req.end_date) {
        refresh_vacation_day(manager, req.user_id, date)?;
    }
    manager.store_mut().log_activity(
        Some(req.user_id),
        "vacation_rejected",
        &format!("Antrag {id}"),
    )?;
    Ok(())
}

/// Cancellation is valid from Pending and from Approved; the approved
/// case removes exactly the `U` entries in the range and nothing else.
pub(super) fn cancel_vacation(manager: &mut DataManager, id: i64) -> EngineResult<()> {
    let req = manager
        .store()
        .vacation_by_id(id)?
        .ok_or(EngineError::UnknownRequest(id))?;
    let was_approved = match req.status {
        VacationStatus::Pending => false,
        VacationStatus::Approved => true,
        status => {
            return Err(EngineError::InvalidTransition {
                from: status.as_str(),
                to: VacationStatus::Cancelled.as_str(),
            })
        }
    };

    manager
        .store_mut()
        .set_vacation_status(id, VacationStatus::Cancelled, false)?;
    for date in days_inclusive(req.start_date, req.end_date) {
        refresh_vacation_day(manager, req.user_id, date)?;
        if was_approved {
            let current = manager.store().get_shift(req.user_id, date)?;
            if current.as_deref() == Some(VACATION_CODE) {
                write_shift(manager, req.user_id, date, None)?;
            }
        }
    }
    manager.store_mut().log_activity(
        Some(req.user_id),
        "vacation_cancelled",
        &format!("Antrag {id}"),
    )?;
    Ok(())
}

pub(super) fn request_wishfree(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
    requested: RequestedCode,
    origin: WishFreeOrigin,
) -> EngineResult<i64> {
    let user = manager
        .store()
        .get_user(user_id)?
        .ok_or(EngineError::UnknownEmployee(user_id))?;

    let id = manager
        .store_mut()
        .upsert_wishfree(user_id, date, requested.clone(), origin)?;
    refresh_wishfree_cell(manager, user_id, date)?;

    if origin == WishFreeOrigin::User {
        let notice = TextNotice.render(&RequestEvent::WishFreeRequested {
            user: &user,
            date,
            requested: &requested,
        });
        manager.store_mut().push_admin_notification(&notice)?;
    }
    manager.store_mut().log_activity(
        Some(user_id),
        "wishfree_requested",
        &format!("{date} ({})", requested.as_str()),
    )?;
    Ok(id)
}

/// The deciding side is implied by the origin: user requests are decided
/// by an admin, admin requests by the user.
pub(super) fn decide_wishfree(
    manager: &mut DataManager,
    id: i64,
    accept: bool,
    reason: Option<String>,
) -> EngineResult<()> {
    let req = manager
        .store()
        .wishfree_by_id(id)?
        .ok_or(EngineError::UnknownRequest(id))?;
    if req.status != WishFreeStatus::Pending {
        return Err(EngineError::InvalidTransition {
            from: req.status.as_str(),
            to: if accept { "Akzeptiert" } else { "Abgelehnt" },
        });
    }
    let status = match (req.requested_by, accept) {
        (WishFreeOrigin::User, true) => WishFreeStatus::AcceptedByAdmin,
        (WishFreeOrigin::User, false) => WishFreeStatus::RejectedByAdmin,
        (WishFreeOrigin::Admin, true) => WishFreeStatus::AcceptedByUser,
        (WishFreeOrigin::Admin, false) => WishFreeStatus::RejectedByUser,
    };

    manager
        .store_mut()
        .set_wishfree_status(id, status, reason, false)?;
    refresh_wishfree_cell(manager, req.user_id, req.request_date)?;

    if accept {
        match &req.requested_shift {
            RequestedCode::WishFree => {
                // a free day becomes `X` only where no concrete shift exists
                let current = manager.store().get_shift(req.user_id, req.request_date)?;
                if current.is_none() {
                    write_shift(
                        manager,
                        req.user_id,
                        req.request_date,
                        Some(WISHFREE_ACCEPTED_CODE),
                    )?;
                }
            }
            RequestedCode::Shift(code) => {
                let code = code.clone();
                write_shift(manager, req.user_id, req.request_date, Some(&code))?;
            }
            // the split sentinel leaves the concrete assignment to the admin
            RequestedCode::SplitTn => {}
        }
    }

    if req.requested_by == WishFreeOrigin::Admin {
        if let Some(user) = manager.store().get_user(req.user_id)? {
            let notice = TextNotice.render(&RequestEvent::WishFreeDecidedByUser {
                user: &user,
                date: req.request_date,
                accepted: accept,
            });
            manager.store_mut().push_admin_notification(&notice)?;
        }
    }
    manager.store_mut().log_activity(
        Some(req.user_id),
        "wishfree_decided",
        &format!("Antrag {id}: {}", status.as_str()),
    )?;
    Ok(())
}

/// Withdrawal deletes the row; an already-accepted request also loses
/// its materialized schedule entry.
pub(super) fn withdraw_wishfree(manager: &mut DataManager, id: i64) -> EngineResult<()> {
    let req = manager
        .store()
        .wishfree_by_id(id)?
        .ok_or(EngineError::UnknownRequest(id))?;

    manager.store_mut().delete_wishfree(id)?;
    refresh_wishfree_cell(manager, req.user_id, req.request_date)?;

    if req.status.is_accepted() {
        let to_remove = match &req.requested_shift {
            RequestedCode::WishFree => Some(WISHFREE_ACCEPTED_CODE.to_owned()),
            RequestedCode::Shift(code) => Some(code.clone()),
            RequestedCode::SplitTn => None,
        };
        if let Some(code) = to_remove {
            let current = manager.store().get_shift(req.user_id, req.request_date)?;
            if current.as_deref() == Some(code.as_str()) {
                write_shift(manager, req.user_id, req.request_date, None)?;
            }
        }
    }
    manager.store_mut().log_activity(
        Some(req.user_id),
        "wishfree_withdrawn",
        &format!("Antrag {id}"),
    )?;
    Ok(())
}
