use super::types::{CellRef, EditOptions, EditOutcome, EngineError, EngineResult};
use super::{conflicts, display, DataManager};
use chrono::{Datelike, NaiveDate};

/// Single-cell write, strictly ordered: persist, schedule cache,
/// aggregate invalidation, daily counts, incremental conflicts. A
/// persist failure aborts; any later failure degrades to a warning that
/// recommends reloading the month.
pub(super) fn apply_edit(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
    code: Option<&str>,
    opts: EditOptions,
    enforce_locks: bool,
) -> EngineResult<EditOutcome> {
    let new_code = code.map(str::trim).filter(|c| !c.is_empty());

    let (old_code, token_before) = {
        let snapshot = manager.snap()?;
        if !snapshot.month.contains(date) {
            return Err(EngineError::Validation(format!(
                "date {date} outside loaded month {}",
                snapshot.month
            )));
        }
        if snapshot.user(user_id).is_none() {
            return Err(EngineError::UnknownEmployee(user_id));
        }
        if let Some(code) = new_code {
            if manager.registry().get(code).is_none() {
                return Err(EngineError::Validation(format!("unknown shift code: {code}")));
            }
        }
        if enforce_locks {
            if snapshot.month_locked {
                return Err(EngineError::LockedMonth(snapshot.month));
            }
            if let Some(reason) = snapshot.lock_reason(user_id, date) {
                if !opts.override_day_lock {
                    return Err(EngineError::LockedDay {
                        user_id,
                        date,
                        reason: reason.to_owned(),
                    });
                }
            }
        }
        (
            snapshot.shift(user_id, date).unwrap_or("").to_owned(),
            display::resolve(snapshot, user_id, date).plain,
        )
    };

    // 1. persist; failure leaves every cache untouched
    match new_code {
        Some(code) => manager.store_mut().upsert_shift(user_id, date, code)?,
        None => manager.store_mut().delete_shift(user_id, date)?,
    }

    let mut outcome = EditOutcome::default();
    outcome.changed.insert(CellRef::new(user_id, date.day()));

    // 2.-4. schedule cache, aggregates, counts
    {
        let snapshot = manager.snap_mut()?;
        snapshot.set_shift(user_id, date, new_code);
        snapshot.invalidate_aggregates();
        let token_after = display::resolve(&*snapshot, user_id, date).plain;
        snapshot.adjust_count(date, &token_before, &token_after);
    }

    // 5. incremental conflicts; a failure here leaves the store correct
    // but the caches possibly stale
    match conflicts::incremental(manager, user_id, date) {
        Ok(cells) => outcome.changed.extend(cells),
        Err(err) => {
            tracing::warn!(user_id, %date, error = %err, "conflict update failed after edit");
            outcome.warning = Some(format!(
                "Konflikte unvollständig aktualisiert ({err}); Monat neu laden"
            ));
        }
    }

    if let Err(err) = manager.store_mut().log_activity(
        Some(user_id),
        "shift_set",
        &format!("{date}: '{old_code}' -> '{}'", new_code.unwrap_or("")),
    ) {
        tracing::warn!(error = %err, "activity log write failed");
    }

    Ok(outcome)
}
