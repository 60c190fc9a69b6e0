#![forbid(unsafe_code)]
use chrono::NaiveDate;
use dienstplan::{
    engine::{DataManager, EditOptions},
    io,
    model::{Employee, Month},
    print,
    shifts::ShiftTypeRegistry,
    storage::{JsonStore, Store},
};
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seeded_manager(path: &std::path::Path) -> DataManager {
    let mut store = JsonStore::open(path).unwrap();
    store
        .upsert_user(Employee {
            id: 1,
            vorname: "Anna".into(),
            name: "Berg".into(),
            entry_date: date(2019, 3, 1),
            diensthund: Some("K9-1".into()),
            urlaub_gesamt: 30,
            urlaub_rest: 30,
            is_approved: true,
            is_archived: false,
            archived_date: None,
            activation_date: None,
        })
        .unwrap();
    DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults())
}

#[test]
fn html_layout_carries_names_colors_and_hours() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.store_mut().upsert_shift(1, date(2024, 5, 31), "N.").unwrap();
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    m.apply_edit(1, date(2024, 6, 3), Some("T."), EditOptions::default()).unwrap();

    let view = print::month_view(&mut m).unwrap();
    assert_eq!(view.days.len(), 30);
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].carry.token, "N.");

    let html = print::render_html(&view);
    assert!(html.contains("Anna Berg"));
    assert!(html.contains("K9-1"));
    assert!(html.contains("<th>Ü</th>"));
    // the T. cell is colored from the registry
    assert!(html.contains("background:#ffe082"));
    // 12h day shift plus 6 carried night hours
    assert!(html.contains("18.00"));
}

#[test]
fn holiday_columns_are_marked() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    let mut holidays = std::collections::BTreeMap::new();
    holidays.insert(date(2024, 6, 20), "Fronleichnam".to_owned());
    m.save_holidays_year(2024, holidays).unwrap();

    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    let view = print::month_view(&mut m).unwrap();
    assert!(view.days[19].holiday);
    assert!(!view.days[18].holiday);
    // 2024-06-01 is a Saturday
    assert!(view.days[0].weekend);
}

#[test]
fn print_file_lands_on_disk() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();

    let view = print::month_view(&mut m).unwrap();
    let path = print::write_print_file(&print::render_html(&view)).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn csv_export_mirrors_the_view() {
    let dir = tempdir().unwrap();
    let mut m = seeded_manager(&dir.path().join("roster.json"));
    m.load_month(Month::new(2024, 6).unwrap(), false).unwrap();
    m.apply_edit(1, date(2024, 6, 3), Some("6"), EditOptions::default()).unwrap();

    let view = print::month_view(&mut m).unwrap();
    let out = dir.path().join("monat.csv");
    io::export_month_csv(&out, &view).unwrap();

    let raw = std::fs::read_to_string(&out).unwrap();
    let mut lines = raw.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("name,hund,carry,1,2,"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Anna Berg,K9-1,"));
    assert!(row.contains(",6,"));
    assert!(row.ends_with("6.00"));
}
