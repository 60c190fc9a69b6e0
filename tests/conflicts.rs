#![forbid(unsafe_code)]
use chrono::NaiveDate;
use dienstplan::{
    engine::{CellRef, DataManager, EditOptions},
    model::{Employee, Month},
    shifts::ShiftTypeRegistry,
    storage::{JsonStore, Store},
};
use std::collections::BTreeSet;
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

fn open_manager(path: &std::path::Path) -> DataManager {
    let store = JsonStore::open(path).unwrap();
    DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults())
}

fn seeded_manager(path: &std::path::Path) -> DataManager {
    let mut store = JsonStore::open(path).unwrap();
    store.upsert_user(emp(1, "Anna", "Berg", Some("K9-1"))).unwrap();
    store.upsert_user(emp(2, "Jon", "Clark", Some("K9-1"))).unwrap();
    store.upsert_user(emp(3, "Mia", "Falk", None)).unwrap();
    DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults())
}

fn cells(pairs: &[(i64, u32)]) -> BTreeSet<CellRef> {
    pairs.iter().map(|&(uid, day)| CellRef::new(uid, day)).collect()
}

#[test]
fn s1_rest_conflict_appears_incrementally() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();

    m.apply_edit(1, date(2024, 6, 10), Some("N."), EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());

    let outcome = m
        .apply_edit(1, date(2024, 6, 11), Some("T."), EditOptions::default())
        .unwrap();
    let snapshot = m.snapshot().unwrap();
    assert_eq!(snapshot.violation_cells(), cells(&[(1, 10), (1, 11)]));
    assert!(outcome.changed.contains(&CellRef::new(1, 10)));
    assert!(outcome.changed.contains(&CellRef::new(1, 11)));
    assert_eq!(snapshot.count(date(2024, 6, 11), "T."), 1);

    // clearing the early shift dissolves both flags
    m.apply_edit(1, date(2024, 6, 11), None, EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());
}

#[test]
fn s2_rest_conflict_across_month_boundary() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let mut m = seeded_manager(&path);
    // previous-month night shift, written before June is loaded
    m.store_mut().upsert_shift(1, date(2024, 5, 31), "N.").unwrap();

    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());

    m.apply_edit(1, date(2024, 6, 1), Some("6"), EditOptions::default()).unwrap();
    let violations = m.snapshot().unwrap().violation_cells();
    assert!(violations.contains(&CellRef::new(1, 1)));
    // only the cell inside the loaded month is flagged
    assert_eq!(violations.len(), 1);
}

#[test]
fn boundary_conflict_is_found_by_full_rebuild_too() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let mut m = seeded_manager(&path);
    m.store_mut().upsert_shift(1, date(2024, 5, 31), "N.").unwrap();
    m.store_mut().upsert_shift(1, date(2024, 6, 1), "QA").unwrap();

    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    assert_eq!(m.snapshot().unwrap().violation_cells(), cells(&[(1, 1)]));

    // the same seam seen from May flags only day 31
    m.load_month(Month::new(2024, 5).unwrap(), false).unwrap();
    assert_eq!(m.snapshot().unwrap().violation_cells(), cells(&[(1, 31)]));
}

#[test]
fn s3_dog_overlap_flags_both_and_clears() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    let d = date(2024, 6, 5);

    m.apply_edit(1, d, Some("T."), EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());

    m.apply_edit(2, d, Some("6"), EditOptions::default()).unwrap();
    assert_eq!(m.snapshot().unwrap().violation_cells(), cells(&[(1, 5), (2, 5)]));

    let outcome = m.apply_edit(2, d, None, EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());
    assert!(outcome.changed.contains(&CellRef::new(1, 5)));
}

#[test]
fn night_shift_overlaps_via_midnight_wrap() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    let d = date(2024, 6, 5);

    // N. 19:00-06:00 and 6 13:00-19:00 touch at 19:00 only: no overlap
    m.apply_edit(1, d, Some("N."), EditOptions::default()).unwrap();
    m.apply_edit(2, d, Some("6"), EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());

    // 24 07:00-07:00 wraps and covers the whole night
    m.apply_edit(2, d, Some("24"), EditOptions::default()).unwrap();
    assert_eq!(m.snapshot().unwrap().violation_cells(), cells(&[(1, 5), (2, 5)]));
}

#[test]
fn free_indicators_never_collide() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    let d = date(2024, 6, 5);

    m.apply_edit(1, d, Some("T."), EditOptions::default()).unwrap();
    m.apply_edit(2, d, Some("U"), EditOptions::default()).unwrap();
    m.apply_edit(2, d, Some("FREI"), EditOptions::default()).unwrap();
    assert!(m.snapshot().unwrap().violation_cells().is_empty());
}

#[test]
fn incremental_updates_match_full_rebuild() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roster.json");
    let mut m = seeded_manager(&path);
    m.store_mut().upsert_shift(1, date(2024, 5, 31), "N.").unwrap();

    let month = Month::new(2024, 6).unwrap();
    m.load_month(month, false).unwrap();

    let script: &[(i64, u32, Option<&str>)] = &[
        (1, 1, Some("6")),
        (1, 10, Some("N.")),
        (1, 11, Some("T.")),
        (2, 5, Some("6")),
        (1, 5, Some("T.")),
        (1, 11, Some("U")),
        (1, 10, None),
        (2, 5, Some("N.")),
        (2, 6, Some("QA")),
        (1, 1, None),
        (2, 5, None),
    ];
    for &(uid, day, code) in script {
        m.apply_edit(uid, month.day(day).unwrap(), code, EditOptions::default())
            .unwrap();
    }

    // a second manager over the same store does a cold full rebuild
    let mut fresh = open_manager(&path);
    fresh.load_month(month, false).unwrap();

    let incremental = m.snapshot().unwrap();
    let rebuilt = fresh.snapshot().unwrap();
    assert_eq!(incremental.violation_cells(), rebuilt.violation_cells());
    for day in 1..=month.num_days() {
        let d = month.day(day).unwrap();
        assert_eq!(
            incremental.counts(d).cloned(),
            rebuilt.counts(d).cloned(),
            "counts diverged on {d}"
        );
        for uid in [1, 2, 3] {
            assert_eq!(incremental.shift(uid, d), rebuilt.shift(uid, d));
        }
    }
}
