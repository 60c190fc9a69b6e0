#![forbid(unsafe_code)]
use chrono::NaiveDate;
use dienstplan::{
    engine::{DataManager, EditOptions, EngineError},
    model::{Employee, Month},
    shifts::{is_counted, ShiftTypeRegistry},
    storage::{JsonStore, Store},
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn emp(id: i64, vorname: &str, name: &str, dog: Option<&str>) -> Employee {
    Employee {
        id,
        vorname: vorname.into(),
        name: name.into(),
        entry_date: date(2019, 3, 1),
        diensthund: dog.map(str::to_owned),
        urlaub_gesamt: 30,
        urlaub_rest: 30,
        is_approved: true,
        is_archived: false,
        archived_date: None,
        activation_date: None,
    }
}

fn manager_with_users(dir: &std::path::Path) -> DataManager {
    let mut store = JsonStore::open(dir.join("roster.json")).unwrap();
    store.upsert_user(emp(1, "Anna", "Berg", Some("K9-1"))).unwrap();
    store.upsert_user(emp(2, "Jon", "Clark", Some("K9-1"))).unwrap();
    store.upsert_user(emp(3, "Mia", "Falk", None)).unwrap();
    DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults())
}

#[test]
fn counts_follow_edits_and_stay_zero_free() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();

    let d = date(2024, 6, 3);
    m.apply_edit(1, d, Some("T."), EditOptions::default()).unwrap();
    m.apply_edit(3, d, Some("T."), EditOptions::default()).unwrap();
    m.apply_edit(2, d, Some("6"), EditOptions::default()).unwrap();

    let snapshot = m.snapshot().unwrap();
    assert_eq!(snapshot.count(d, "T."), 2);
    assert_eq!(snapshot.count(d, "6"), 1);

    m.apply_edit(3, d, None, EditOptions::default()).unwrap();
    m.apply_edit(2, d, None, EditOptions::default()).unwrap();
    let snapshot = m.snapshot().unwrap();
    assert_eq!(snapshot.count(d, "T."), 1);
    // zero counts disappear as keys
    assert!(snapshot.counts(d).unwrap().get("6").is_none());
}

#[test]
fn count_coherence_against_resolved_tokens() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();

    m.apply_edit(1, date(2024, 6, 3), Some("T."), EditOptions::default()).unwrap();
    m.apply_edit(2, date(2024, 6, 3), Some("N."), EditOptions::default()).unwrap();
    m.apply_edit(3, date(2024, 6, 4), Some("FREI"), EditOptions::default()).unwrap();
    m.request_vacation(1, date(2024, 6, 10), date(2024, 6, 11), date(2024, 6, 1)).unwrap();
    m.request_wishfree(
        3,
        date(2024, 6, 12),
        dienstplan::model::RequestedCode::WishFree,
        dienstplan::model::WishFreeOrigin::User,
    )
    .unwrap();

    // recompute expected counts from the resolver, token by token
    let user_ids = [1i64, 2, 3];
    for day in 1..=month.num_days() {
        let d = month.day(day).unwrap();
        let mut expected: std::collections::BTreeMap<String, u32> = Default::default();
        for &uid in &user_ids {
            let token = m.display(uid, d).unwrap().plain;
            if is_counted(&token) {
                *expected.entry(token).or_insert(0) += 1;
            }
        }
        let snapshot = m.snapshot().unwrap();
        let actual = snapshot.counts(d).cloned().unwrap_or_default();
        assert_eq!(actual, expected, "counts diverged on {d}");
        assert!(actual.values().all(|&n| n > 0), "zero count kept on {d}");
    }
}

#[test]
fn display_resolution_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    m.apply_edit(1, date(2024, 6, 3), Some("T."), EditOptions::default()).unwrap();
    m.lock_day(1, date(2024, 6, 3), "Probe").unwrap();

    let first = m.display(1, date(2024, 6, 3)).unwrap();
    let second = m.display(1, date(2024, 6, 3)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.plain, "T.");
    assert_ne!(first.token, first.plain, "lock glyph missing");
}

#[test]
fn locked_month_rejects_writes_without_cache_mutation() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();
    let d = date(2024, 6, 3);
    m.apply_edit(1, d, Some("T."), EditOptions::default()).unwrap();

    m.lock_month(month).unwrap();
    let before_counts = m.snapshot().unwrap().counts(d).cloned();
    let before_violations = m.snapshot().unwrap().violation_cells();

    match m.apply_edit(1, d, Some("6"), EditOptions::default()) {
        Err(EngineError::LockedMonth(locked)) => assert_eq!(locked, month),
        other => panic!("expected LockedMonth, got {other:?}"),
    }
    let snapshot = m.snapshot().unwrap();
    assert_eq!(snapshot.shift(1, d), Some("T."));
    assert_eq!(snapshot.counts(d).cloned(), before_counts);
    assert_eq!(snapshot.violation_cells(), before_violations);
    // store untouched as well
    assert_eq!(m.store().get_shift(1, d).unwrap().as_deref(), Some("T."));
}

#[test]
fn day_lock_rejects_unless_overridden() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    let d = date(2024, 6, 5);
    m.lock_day(2, d, "Dienstreise").unwrap();

    match m.apply_edit(2, d, Some("T."), EditOptions::default()) {
        Err(EngineError::LockedDay { user_id, reason, .. }) => {
            assert_eq!(user_id, 2);
            assert_eq!(reason, "Dienstreise");
        }
        other => panic!("expected LockedDay, got {other:?}"),
    }

    m.apply_edit(2, d, Some("T."), EditOptions { override_day_lock: true }).unwrap();
    assert_eq!(m.snapshot().unwrap().shift(2, d), Some("T."));

    m.unlock_day(2, d).unwrap();
    m.apply_edit(2, d, Some("6"), EditOptions::default()).unwrap();
}

#[test]
fn unknown_code_and_foreign_date_are_validation_errors() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();

    assert!(matches!(
        m.apply_edit(1, date(2024, 6, 3), Some("ZZ"), EditOptions::default()),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        m.apply_edit(1, date(2024, 7, 3), Some("T."), EditOptions::default()),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        m.apply_edit(99, date(2024, 6, 3), Some("T."), EditOptions::default()),
        Err(EngineError::UnknownEmployee(99))
    ));
}

#[test]
fn hidden_users_are_filtered_and_order_is_respected() {
    let dir = tempdir().unwrap();
    let mut m = manager_with_users(dir.path());
    m.save_user_order(vec![
        dienstplan::model::UserOrder { user_id: 3, sort_order: 0, is_visible: true },
        dienstplan::model::UserOrder { user_id: 1, sort_order: 1, is_visible: true },
        dienstplan::model::UserOrder { user_id: 2, sort_order: 2, is_visible: false },
    ])
    .unwrap();

    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();
    let ids: Vec<i64> = m.snapshot().unwrap().users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![3, 1]);

    m.load_month(month, true).unwrap();
    let ids: Vec<i64> = m.snapshot().unwrap().users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}
