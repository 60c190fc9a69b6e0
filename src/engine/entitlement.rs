use super::types::EngineResult;
use super::DataManager;
use crate::config::VACATION_TENURE_RULES;
use crate::model::{Month, TenureBracket};
use chrono::{Datelike, NaiveDate};

/// Fallback brackets when no rule set was persisted.
pub const DEFAULT_RULES: [TenureBracket; 4] = [
    TenureBracket { years_min: 0, years_max: 4, days: 30 },
    TenureBracket { years_min: 5, years_max: 9, days: 31 },
    TenureBracket { years_min: 10, years_max: 14, days: 32 },
    TenureBracket { years_min: 15, years_max: 99, days: 33 },
];

/// Whole years of service at `at`, with day-of-year correction: the
/// anniversary itself completes the year.
pub fn tenure_years(entry_date: NaiveDate, at: NaiveDate) -> u32 {
    let mut years = at.year() - entry_date.year();
    if (at.month(), at.day()) < (entry_date.month(), entry_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// First bracket containing the tenure; falls back to the first bracket
/// (or the caller's default) when none matches. Rules must be sorted by
/// `years_min`, which load/save guarantee.
pub fn entitlement_days(rules: &[TenureBracket], tenure: u32, default: Option<u32>) -> u32 {
    rules
        .iter()
        .find(|bracket| bracket.contains(tenure))
        .map(|bracket| bracket.days)
        .or_else(|| rules.first().map(|bracket| bracket.days))
        .or(default)
        .unwrap_or(0)
}

/// One allowance change from a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementChange {
    pub user_id: i64,
    pub old_total: u32,
    pub new_total: u32,
    pub new_rest: i32,
}

pub(super) fn load_rules(manager: &mut DataManager) -> EngineResult<Vec<TenureBracket>> {
    let raw = {
        let DataManager { store, config, .. } = manager;
        config.get(&**store, VACATION_TENURE_RULES)?
    };
    let mut rules: Vec<TenureBracket> = match raw.as_deref() {
        Some(json) => serde_json::from_str(json).unwrap_or_else(|err| {
            tracing::warn!(%err, "tenure rules unreadable, using defaults");
            DEFAULT_RULES.to_vec()
        }),
        None => DEFAULT_RULES.to_vec(),
    };
    rules.sort_by_key(|bracket| bracket.years_min);
    Ok(rules)
}

pub(super) fn save_rules(manager: &mut DataManager, mut rules: Vec<TenureBracket>) -> EngineResult<()> {
    rules.sort_by_key(|bracket| bracket.years_min);
    let json = serde_json::to_string(&rules).map_err(anyhow::Error::new)?;
    let DataManager { store, config, .. } = manager;
    config.set(&mut **store, VACATION_TENURE_RULES, &json)?;
    Ok(())
}

/// Recomputes every active employee's yearly allowance; a changed total
/// shifts the remaining days by the same signed delta, preserving what
/// was already consumed. One audit entry per change.
pub(super) fn batch_update(
    manager: &mut DataManager,
    at: NaiveDate,
) -> EngineResult<Vec<EntitlementChange>> {
    let rules = load_rules(manager)?;
    let month = Month::of(at);
    let users: Vec<_> = manager
        .store()
        .list_users()?
        .into_iter()
        .filter(|u| u.relevant_for_month(month))
        .collect();

    let mut changes = Vec::new();
    for user in users {
        let new_total = entitlement_days(&rules, tenure_years(user.entry_date, at), None);
        if new_total == user.urlaub_gesamt {
            continue;
        }
        let delta = new_total as i32 - user.urlaub_gesamt as i32;
        let new_rest = user.urlaub_rest + delta;
        manager
            .store_mut()
            .update_user_entitlement(user.id, new_total, new_rest)?;
        manager.store_mut().log_activity(
            Some(user.id),
            "entitlement_update",
            &format!(
                "Urlaubsanspruch {} -> {} (Rest {} -> {})",
                user.urlaub_gesamt, new_total, user.urlaub_rest, new_rest
            ),
        )?;
        changes.push(EntitlementChange {
            user_id: user.id,
            old_total: user.urlaub_gesamt,
            new_total,
            new_rest,
        });
    }
    Ok(changes)
}
