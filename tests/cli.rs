#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("dienstplan-cli").unwrap();
    cmd.current_dir(db.parent().unwrap());
    cmd.arg("--db").arg(db);
    cmd
}

#[test]
fn import_edit_and_check_flow() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("roster.json");
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "vorname,name,entry_date,diensthund\nAnna,Berg,2019-03-01,K9-1\n").unwrap();

    cli(&db)
        .args(["import-people", "--csv"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 Mitarbeiter importiert"));

    cli(&db)
        .args(["set-shift", "--user", "1", "--date", "2024-06-10", "--code", "N."])
        .assert()
        .success();

    cli(&db)
        .args(["check", "--year", "2024", "--month", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keine Konflikte"));

    // the early shift right after the night shift trips the rest rule
    cli(&db)
        .args(["set-shift", "--user", "1", "--date", "2024-06-11", "--code", "T."])
        .assert()
        .success();

    cli(&db)
        .args(["check", "--year", "2024", "--month", "6"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Konflikt"));

    cli(&db)
        .args(["show", "--year", "2024", "--month", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Anna Berg"));
}

#[test]
fn locked_month_surfaces_as_error() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("roster.json");
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "vorname,name,entry_date\nJon,Clark,2021-07-15\n").unwrap();

    cli(&db).args(["import-people", "--csv"]).arg(&csv).assert().success();
    cli(&db)
        .args(["lock-month", "--year", "2024", "--month", "6"])
        .assert()
        .success();

    cli(&db)
        .args(["set-shift", "--user", "1", "--date", "2024-06-10", "--code", "T."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));
}
