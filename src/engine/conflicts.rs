use super::types::{CellRef, EngineResult};
use super::util::intervals_overlap;
use super::DataManager;
use crate::shifts::{NIGHT_SHIFT, REST_SENSITIVE};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeSet, HashMap};

fn is_rest_pair(first: &str, second: &str) -> bool {
    first == NIGHT_SHIFT && REST_SENSITIVE.contains(&second)
}

/// Whether the cell violates the rest period through either of its two
/// seams. Neighbor-month days are read through `lookup_shift`.
fn cell_rest_violated(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
) -> EngineResult<bool> {
    let code = manager.lookup_shift(user_id, date)?;
    let prev = manager.lookup_shift(user_id, date - Duration::days(1))?;
    let next = manager.lookup_shift(user_id, date + Duration::days(1))?;
    Ok(is_rest_pair(&code, &next) || is_rest_pair(&prev, &code))
}

/// Full rebuild of both violation families over the loaded month.
pub(super) fn rebuild(manager: &mut DataManager) -> EngineResult<()> {
    let (month, user_ids) = {
        let snapshot = manager.snap()?;
        (snapshot.month, snapshot.users.iter().map(|u| u.id).collect::<Vec<_>>())
    };

    let mut rest = BTreeSet::new();
    let first = month.first_day();
    for &user_id in &user_ids {
        // seams from (last of previous month, 1st) to (last, 1st of next)
        for offset in -1..i64::from(month.num_days()) {
            let d0 = first + Duration::days(offset);
            let d1 = d0 + Duration::days(1);
            let c0 = manager.lookup_shift(user_id, d0)?;
            let c1 = manager.lookup_shift(user_id, d1)?;
            if is_rest_pair(&c0, &c1) {
                if month.contains(d0) {
                    rest.insert(CellRef::new(user_id, d0.day()));
                }
                if month.contains(d1) {
                    rest.insert(CellRef::new(user_id, d1.day()));
                }
            }
        }
    }

    let mut dogs = BTreeSet::new();
    let dates: Vec<NaiveDate> = manager.snap()?.days().collect();
    for date in dates {
        dogs.extend(dog_overlaps_on(manager, date)?);
    }

    let snapshot = manager.snap_mut()?;
    snapshot.rest_violations = rest;
    snapshot.dog_violations = dogs;
    Ok(())
}

/// All dog-overlap cells on one date, from the current caches.
fn dog_overlaps_on(manager: &DataManager, date: NaiveDate) -> EngineResult<BTreeSet<CellRef>> {
    let snapshot = manager.snap()?;
    let mut groups: HashMap<&str, Vec<i64>> = HashMap::new();
    for user in &snapshot.users {
        if let Some(dog) = user.dog() {
            groups.entry(dog).or_default().push(user.id);
        }
    }

    let mut out = BTreeSet::new();
    for user_ids in groups.values() {
        if user_ids.len() < 2 {
            continue;
        }
        let assigned: Vec<(i64, (i64, i64))> = user_ids
            .iter()
            .filter_map(|&uid| {
                let code = snapshot.shift(uid, date)?;
                let interval = manager.registry().interval(code)?;
                Some((uid, interval))
            })
            .collect();
        for (idx, &(uid_a, iv_a)) in assigned.iter().enumerate() {
            for &(uid_b, iv_b) in assigned.iter().skip(idx + 1) {
                if intervals_overlap(iv_a, iv_b) {
                    out.insert(CellRef::new(uid_a, date.day()));
                    out.insert(CellRef::new(uid_b, date.day()));
                }
            }
        }
    }
    Ok(out)
}

/// Incremental update after one edit: only the two rest seams around the
/// date and the edited employee's dog on that date can change status.
/// Returns the cells whose violation membership flipped.
pub(super) fn incremental(
    manager: &mut DataManager,
    user_id: i64,
    date: NaiveDate,
) -> EngineResult<BTreeSet<CellRef>> {
    let mut affected = BTreeSet::new();

    for offset in -1..=1i64 {
        let day = date + Duration::days(offset);
        let Some(cell) = manager.snap()?.cell(user_id, day) else {
            continue;
        };
        let violated = cell_rest_violated(manager, user_id, day)?;
        let snapshot = manager.snap_mut()?;
        let changed = if violated {
            snapshot.rest_violations.insert(cell)
        } else {
            snapshot.rest_violations.remove(&cell)
        };
        if changed {
            affected.insert(cell);
        }
    }

    let dog = manager
        .snap()?
        .user(user_id)
        .and_then(|u| u.dog().map(str::to_owned));
    if let Some(dog) = dog {
        let peer_ids: Vec<i64> = manager
            .snap()?
            .users
            .iter()
            .filter(|u| u.dog() == Some(dog.as_str()))
            .map(|u| u.id)
            .collect();

        let fresh: BTreeSet<CellRef> = dog_overlaps_on(manager, date)?
            .into_iter()
            .filter(|cell| peer_ids.contains(&cell.user_id))
            .collect();

        let snapshot = manager.snap_mut()?;
        for &peer in &peer_ids {
            let cell = CellRef::new(peer, date.day());
            let now = fresh.contains(&cell);
            let was = snapshot.dog_violations.contains(&cell);
            if now != was {
                if now {
                    snapshot.dog_violations.insert(cell);
                } else {
                    snapshot.dog_violations.remove(&cell);
                }
                affected.insert(cell);
            }
        }
    }

    Ok(affected)
}
