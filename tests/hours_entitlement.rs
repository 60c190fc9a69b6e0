#![forbid(unsafe_code)]
use chrono::NaiveDate;
use dienstplan::{
    engine::{DataManager, EditOptions},
    model::{Employee, Month, TenureBracket},
    shifts::ShiftTypeRegistry,
    storage::{JsonStore, Store},
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn emp(id: i64, vorname: &str, name: &str, entry: NaiveDate, total: u32, rest: i32) -> Employee {
    Employee {
        id,
        vorname: vorname.into(),
        name: name.into(),
        entry_date: entry,
        diensthund: None,
        urlaub_gesamt: total,
        urlaub_rest: rest,
        is_approved: true,
        is_archived: false,
        archived_date: None,
        activation_date: None,
    }
}

fn seeded_manager(path: &std::path::Path) -> DataManager {
    let mut store = JsonStore::open(path).unwrap();
    store
        .upsert_user(emp(1, "Anna", "Berg", date(2019, 3, 1), 30, 22))
        .unwrap();
    DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn plain_day_shifts_sum_up() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();

    m.apply_edit(1, date(2024, 6, 3), Some("T."), EditOptions::default()).unwrap();
    m.apply_edit(1, date(2024, 6, 4), Some("6"), EditOptions::default()).unwrap();
    m.apply_edit(1, date(2024, 6, 5), Some("QA"), EditOptions::default()).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 26.0));

    // mid-month night shift contributes fully to its own month
    m.apply_edit(1, date(2024, 6, 10), Some("N."), EditOptions::default()).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 38.0));
}

#[test]
fn night_shift_carryover_moves_hours_across_months() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    let june = Month::new(2024, 6).unwrap();
    m.load_month(june, false).unwrap();

    m.apply_edit(1, date(2024, 6, 30), Some("N."), EditOptions::default()).unwrap();
    // 12h night shift, 6 post-midnight hours belong to July
    assert!(close(m.month_hours(1).unwrap(), 6.0));

    m.load_month(Month::new(2024, 7).unwrap(), false).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 6.0));

    // the carry column shows the previous-month night shift
    assert_eq!(m.carry_display(1).unwrap().plain, "N.");
}

#[test]
fn approved_vacation_and_accepted_wishfree_change_effective_hours() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();

    m.apply_edit(1, date(2024, 6, 3), Some("T."), EditOptions::default()).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 12.0));

    // approved vacation over the worked day: U carries the registry hours (0)
    let id = m
        .request_vacation(1, date(2024, 6, 3), date(2024, 6, 3), date(2024, 6, 1))
        .unwrap();
    m.approve_vacation(id).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 0.0));

    m.cancel_vacation(id).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 12.0));
}

#[test]
fn hours_cache_invalidates_on_edit() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();

    assert!(close(m.month_hours(1).unwrap(), 0.0));
    m.apply_edit(1, date(2024, 6, 3), Some("24"), EditOptions::default()).unwrap();
    assert!(close(m.month_hours(1).unwrap(), 24.0));
}

#[test]
fn s6_batch_update_shifts_remaining_by_delta() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));

    // hired 2019-03-01, evaluated 2024-06-01: tenure 5 -> 31 days
    let changes = m.update_all_entitlements(date(2024, 6, 1)).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old_total, 30);
    assert_eq!(changes[0].new_total, 31);
    assert_eq!(changes[0].new_rest, 23);

    let user = m.store().get_user(1).unwrap().unwrap();
    assert_eq!(user.urlaub_gesamt, 31);
    assert_eq!(user.urlaub_rest, 23);

    // a second run is a no-op
    assert!(m.update_all_entitlements(date(2024, 6, 1)).unwrap().is_empty());
}

#[test]
fn persisted_rules_override_defaults_and_come_back_sorted() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));

    m.save_vacation_rules(vec![
        TenureBracket { years_min: 10, years_max: 99, days: 35 },
        TenureBracket { years_min: 0, years_max: 9, days: 28 },
    ])
    .unwrap();

    let rules = m.vacation_rules().unwrap();
    assert_eq!(rules[0].years_min, 0);
    assert_eq!(rules[1].years_min, 10);

    assert_eq!(m.entitlement_for(date(2019, 3, 1), date(2024, 6, 1)).unwrap(), 28);
    assert_eq!(m.entitlement_for(date(2010, 1, 1), date(2024, 6, 1)).unwrap(), 35);
}
