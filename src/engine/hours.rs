use super::display;
use super::types::EngineResult;
use super::DataManager;
use crate::shifts::NIGHT_SHIFT;
use chrono::Datelike;

/// Monthly hours for one employee, with the night-shift carryover: the
/// post-midnight share of a previous-month `N.` is added here, the share
/// of an `N.` on the month's last day belongs to the next month.
pub(super) fn month_hours(manager: &mut DataManager, user_id: i64) -> EngineResult<f64> {
    if let Some(&cached) = manager.snap()?.hours_cache.get(&user_id) {
        return Ok(cached);
    }

    let total = {
        let snapshot = manager.snap()?;
        let registry = manager.registry();
        let carry = registry.night_carry_hours();
        let last_day = snapshot.month.num_days();

        let mut total = if display::edge_is_night(snapshot.prev_edge(user_id)) {
            carry
        } else {
            0.0
        };
        for date in snapshot.days() {
            let code = display::hours_code(snapshot, user_id, date);
            let mut hours = registry.hours(&code);
            if code == NIGHT_SHIFT && date.day() == last_day {
                hours -= carry;
            }
            total += hours;
        }
        (total * 100.0).round() / 100.0
    };

    manager.snap_mut()?.hours_cache.insert(user_id, total);
    Ok(total)
}
