#![forbid(unsafe_code)]
use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dienstplan::{
    engine::{DataManager, EditOptions},
    io, print,
    model::{Employee, Month, RequestedCode, UserOrder, WishFreeOrigin},
    shifts::ShiftTypeRegistry,
    storage::{JsonStore, Store},
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Dienstplan-CLI: Monatspläne, Konflikte, Anträge (ohne Datenbank)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Aktiviert Logs (Feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// JSON-Datei des Rosters
    #[arg(long, global = true, default_value = "roster.json")]
    db: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monat anzeigen
    Show {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Auch ausgeblendete Mitarbeiter zeigen
        #[arg(long)]
        all: bool,
    },

    /// Eine Zelle setzen
    SetShift {
        #[arg(long)]
        user: i64,
        /// ISO-Datum (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long)]
        code: String,
        /// Tagessperre übergehen
        #[arg(long)]
        force: bool,
    },

    /// Eine Zelle leeren
    ClearShift {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        date: String,
        #[arg(long)]
        force: bool,
    },

    /// Konflikte prüfen
    Check {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },

    /// Mitarbeiter aus CSV importieren
    ImportPeople {
        #[arg(long)]
        csv: String,
    },

    /// Urlaubsantrag stellen
    RequestVacation {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Urlaubsantrag genehmigen
    ApproveVacation {
        #[arg(long)]
        id: i64,
    },

    /// Urlaubsantrag ablehnen
    RejectVacation {
        #[arg(long)]
        id: i64,
    },

    /// Urlaubsantrag stornieren
    CancelVacation {
        #[arg(long)]
        id: i64,
    },

    /// Wunschfrei beantragen
    RequestWishfree {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        date: String,
        /// Gewünschter Code (WF, T./N. oder konkrete Schicht)
        #[arg(long, default_value = "WF")]
        code: String,
        /// Vorschlag durch den Admin statt durch den Benutzer
        #[arg(long)]
        admin: bool,
    },

    /// Wunschfrei entscheiden
    DecideWishfree {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        accept: bool,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Wunschfrei zurückziehen
    WithdrawWishfree {
        #[arg(long)]
        id: i64,
    },

    /// Monat sperren / entsperren
    LockMonth {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        unlock: bool,
    },

    /// Tag sperren
    LockDay {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "gesperrt")]
        reason: String,
        #[arg(long)]
        unlock: bool,
    },

    /// Sichtbarkeit und Reihenfolge speichern: "user:sort[:hidden],..."
    SetOrder {
        #[arg(long)]
        order: String,
    },

    /// Urlaubsansprüche aller aktiven Mitarbeiter neu berechnen
    UpdateEntitlements {
        /// Stichtag (Standard: heute)
        #[arg(long)]
        at: Option<String>,
    },

    /// Monat als HTML exportieren (Standard: Temp-Datei)
    ExportHtml {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        out: Option<String>,
    },

    /// Monat als CSV exportieren
    ExportCsv {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long)]
        out: String,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("ungültiges Datum: {raw} (erwartet YYYY-MM-DD)"))
}

fn month_arg(year: i32, month: u32) -> Result<Month> {
    Month::new(year, month).map_err(anyhow::Error::msg)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let store = JsonStore::open(&cli.db)?;
    let mut manager = DataManager::new(Box::new(store), ShiftTypeRegistry::with_defaults());
    manager.migrate_legacy_holidays("holidays.json")?;

    let code = match cli.cmd {
        Commands::Show { year, month, all } => {
            let month = month_arg(year, month)?;
            manager.load_month(month, all)?;
            print_month(&mut manager)?;
            0
        }
        Commands::SetShift { user, date, code, force } => {
            let date = parse_date(&date)?;
            manager.load_month(Month::of(date), true)?;
            let outcome = manager.apply_edit(
                user,
                date,
                Some(&code),
                EditOptions { override_day_lock: force },
            )?;
            if let Some(warning) = outcome.warning {
                eprintln!("Warnung: {warning}");
            }
            println!("{} Zelle(n) geändert", outcome.changed.len());
            0
        }
        Commands::ClearShift { user, date, force } => {
            let date = parse_date(&date)?;
            manager.load_month(Month::of(date), true)?;
            let outcome = manager.apply_edit(
                user,
                date,
                None,
                EditOptions { override_day_lock: force },
            )?;
            if let Some(warning) = outcome.warning {
                eprintln!("Warnung: {warning}");
            }
            0
        }
        Commands::Check { year, month } => {
            let month = month_arg(year, month)?;
            manager.load_month(month, true)?;
            let snapshot = manager.snapshot().expect("month just loaded");
            let violations = snapshot.violation_cells();
            if violations.is_empty() {
                println!("OK: keine Konflikte");
                0
            } else {
                eprintln!("{} Konflikt-Zelle(n) gefunden", violations.len());
                for cell in &violations {
                    let name = snapshot
                        .user(cell.user_id)
                        .map(Employee::full_name)
                        .unwrap_or_else(|| cell.user_id.to_string());
                    eprintln!("  {name}: Tag {}", cell.day);
                }
                // Code 2 = Konflikte vorhanden
                2
            }
        }
        Commands::ImportPeople { csv } => {
            let rows = io::import_people_csv(csv)?;
            let mut next_id = manager
                .store()
                .list_users()?
                .iter()
                .map(|u| u.id)
                .max()
                .unwrap_or(0)
                + 1;
            let count = rows.len();
            for row in rows {
                manager.store_mut().upsert_user(Employee {
                    id: next_id,
                    vorname: row.vorname,
                    name: row.name,
                    entry_date: row.entry_date,
                    diensthund: row.diensthund,
                    urlaub_gesamt: 30,
                    urlaub_rest: 30,
                    is_approved: true,
                    is_archived: false,
                    archived_date: None,
                    activation_date: None,
                })?;
                next_id += 1;
            }
            println!("{count} Mitarbeiter importiert");
            0
        }
        Commands::RequestVacation { user, start, end } => {
            let start = parse_date(&start)?;
            let end = parse_date(&end)?;
            let today = chrono::Local::now().date_naive();
            let id = manager.request_vacation(user, start, end, today)?;
            println!("Antrag {id} angelegt");
            0
        }
        Commands::ApproveVacation { id } => {
            manager.approve_vacation(id)?;
            0
        }
        Commands::RejectVacation { id } => {
            manager.reject_vacation(id)?;
            0
        }
        Commands::CancelVacation { id } => {
            manager.cancel_vacation(id)?;
            0
        }
        Commands::RequestWishfree { user, date, code, admin } => {
            let date = parse_date(&date)?;
            let origin = if admin { WishFreeOrigin::Admin } else { WishFreeOrigin::User };
            let id = manager.request_wishfree(user, date, RequestedCode::from(code), origin)?;
            println!("Antrag {id} angelegt");
            0
        }
        Commands::DecideWishfree { id, accept, reason } => {
            manager.decide_wishfree(id, accept, reason)?;
            0
        }
        Commands::WithdrawWishfree { id } => {
            manager.withdraw_wishfree(id)?;
            0
        }
        Commands::LockMonth { year, month, unlock } => {
            let month = month_arg(year, month)?;
            if unlock {
                manager.unlock_month(month)?;
            } else {
                manager.lock_month(month)?;
            }
            0
        }
        Commands::LockDay { user, date, reason, unlock } => {
            let date = parse_date(&date)?;
            if unlock {
                manager.unlock_day(user, date)?;
            } else {
                manager.lock_day(user, date, &reason)?;
            }
            0
        }
        Commands::SetOrder { order } => {
            let mut rows = Vec::new();
            for chunk in order.split(',').filter(|c| !c.trim().is_empty()) {
                let parts: Vec<&str> = chunk.trim().split(':').collect();
                if parts.len() < 2 {
                    bail!("ungültiger Eintrag: {chunk} (erwartet user:sort[:hidden])");
                }
                rows.push(UserOrder {
                    user_id: parts[0].parse()?,
                    sort_order: parts[1].parse()?,
                    is_visible: parts.get(2).map_or(true, |flag| *flag != "hidden"),
                });
            }
            manager.save_user_order(rows)?;
            0
        }
        Commands::UpdateEntitlements { at } => {
            let at = match at {
                Some(raw) => parse_date(&raw)?,
                None => chrono::Local::now().date_naive(),
            };
            let changes = manager.update_all_entitlements(at)?;
            for change in &changes {
                println!(
                    "Mitarbeiter {}: {} -> {} Tage (Rest {})",
                    change.user_id, change.old_total, change.new_total, change.new_rest
                );
            }
            println!("{} Anpassung(en)", changes.len());
            0
        }
        Commands::ExportHtml { year, month, out } => {
            let month = month_arg(year, month)?;
            manager.load_month(month, false)?;
            let view = print::month_view(&mut manager)?;
            let html = print::render_html(&view);
            let path = match out {
                Some(path) => {
                    std::fs::write(&path, html)?;
                    path.into()
                }
                None => print::write_print_file(&html)?,
            };
            println!("{}", path.display());
            0
        }
        Commands::ExportCsv { year, month, out } => {
            let month = month_arg(year, month)?;
            manager.load_month(month, false)?;
            let view = print::month_view(&mut manager)?;
            io::export_month_csv(&out, &view)?;
            0
        }
    };

    std::process::exit(code);
}

fn print_month(manager: &mut DataManager) -> Result<()> {
    let view = print::month_view(manager)?;
    let mut header = String::from("Name | Hund | Ü");
    for day in &view.days {
        header.push_str(&format!(" | {}", day.day));
    }
    header.push_str(" | Std");
    println!("{header}");
    for row in &view.rows {
        let mut line = format!("{} | {} | {}", row.name, row.dog, row.carry.token);
        for cell in &row.cells {
            line.push_str(&format!(" | {}", cell.token));
        }
        line.push_str(&format!(" | {:.2}", row.hours));
        println!("{line}");
    }

    if let Some(snapshot) = manager.snapshot() {
        let violations = snapshot.violation_cells();
        if !violations.is_empty() {
            println!("Achtung: {} Konflikt-Zelle(n)", violations.len());
        }
    }
    Ok(())
}
