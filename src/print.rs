use crate::engine::{DataManager, EngineResult};
use crate::model::Month;
use anyhow::Context;
use chrono::{Datelike, Weekday};
use std::io::Write;
use std::path::PathBuf;

/// One rendered cell: the plain token plus the registry color, if the
/// token maps to a shift type.
#[derive(Debug, Clone)]
pub struct PrintCell {
    pub token: String,
    pub color: Option<String>,
    pub locked: bool,
}

#[derive(Debug, Clone)]
pub struct PrintRow {
    pub name: String,
    pub dog: String,
    pub carry: PrintCell,
    pub cells: Vec<PrintCell>,
    pub hours: f64,
}

#[derive(Debug, Clone)]
pub struct DayHeader {
    pub day: u32,
    pub weekday: &'static str,
    pub weekend: bool,
    pub holiday: bool,
}

/// Everything the print layout needs, resolved once.
#[derive(Debug, Clone)]
pub struct PrintView {
    pub month: Month,
    pub days: Vec<DayHeader>,
    pub rows: Vec<PrintRow>,
}

fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mo",
        Weekday::Tue => "Di",
        Weekday::Wed => "Mi",
        Weekday::Thu => "Do",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
        Weekday::Sun => "So",
    }
}

/// Resolves the loaded month into a [`PrintView`].
pub fn month_view(manager: &mut DataManager) -> EngineResult<PrintView> {
    let (month, users): (Month, Vec<(i64, String, String)>) = {
        let snapshot = manager
            .snapshot()
            .ok_or(crate::engine::EngineError::NoMonthLoaded)?;
        (
            snapshot.month,
            snapshot
                .users
                .iter()
                .map(|u| (u.id, u.full_name(), u.dog().unwrap_or("-").to_owned()))
                .collect(),
        )
    };

    let mut days = Vec::new();
    for day in 1..=month.num_days() {
        let date = month.day(day).ok_or_else(|| {
            crate::engine::EngineError::Validation(format!("invalid day {day} in {month}"))
        })?;
        let weekday = date.weekday();
        days.push(DayHeader {
            day,
            weekday: weekday_abbrev(weekday),
            weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            holiday: manager.is_holiday(date)?,
        });
    }

    let mut rows = Vec::new();
    for (user_id, name, dog) in users {
        let carry_display = manager.carry_display(user_id)?;
        let carry = PrintCell {
            color: cell_color(manager, &carry_display.plain),
            token: carry_display.plain,
            locked: false,
        };
        let mut cells = Vec::new();
        for header in &days {
            let date = month.day(header.day).expect("day validated above");
            let display = manager.display(user_id, date)?;
            cells.push(PrintCell {
                color: cell_color(manager, &display.plain),
                locked: display.token != display.plain,
                token: display.plain,
            });
        }
        let hours = manager.month_hours(user_id)?;
        rows.push(PrintRow { name, dog, carry, cells, hours });
    }

    Ok(PrintView { month, days, rows })
}

fn cell_color(manager: &DataManager, token: &str) -> Option<String> {
    manager.registry().get(token).map(|st| st.color.clone())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Single-table layout: header, name, dog, carry column, day columns
/// colored from the shift-type table, total hours.
pub fn render_html(view: &PrintView) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"de\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Dienstplan {}</title>\n", view.month));
    html.push_str(
        "<style>\n\
         body { font-family: sans-serif; }\n\
         table { border-collapse: collapse; }\n\
         th, td { border: 1px solid #999; padding: 2px 5px; text-align: center; font-size: 12px; }\n\
         th.we { background: #eceff1; }\n\
         th.holiday { background: #ffe0b2; }\n\
         td.name { text-align: left; white-space: nowrap; }\n\
         </style>\n</head>\n<body>\n",
    );
    html.push_str(&format!("<h2>Dienstplan {}</h2>\n<table>\n", view.month));

    html.push_str("<tr><th>Name</th><th>Hund</th><th>Ü</th>");
    for header in &view.days {
        let class = if header.holiday {
            " class=\"holiday\""
        } else if header.weekend {
            " class=\"we\""
        } else {
            ""
        };
        html.push_str(&format!(
            "<th{class}>{}<br>{}</th>",
            header.day, header.weekday
        ));
    }
    html.push_str("<th>Stunden</th></tr>\n");

    for row in &view.rows {
        html.push_str(&format!(
            "<tr><td class=\"name\">{}</td><td>{}</td>{}",
            escape(&row.name),
            escape(&row.dog),
            render_cell(&row.carry)
        ));
        for cell in &row.cells {
            html.push_str(&render_cell(cell));
        }
        html.push_str(&format!("<td>{:.2}</td></tr>\n", row.hours));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn render_cell(cell: &PrintCell) -> String {
    let style = cell
        .color
        .as_deref()
        .map(|color| format!(" style=\"background:{color}\""))
        .unwrap_or_default();
    format!("<td{style}>{}</td>", escape(&cell.token))
}

/// Writes the document to a kept temp file and returns its path; opening
/// the browser is up to the caller.
pub fn write_print_file(html: &str) -> anyhow::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("dienstplan-")
        .suffix(".html")
        .tempfile()
        .with_context(|| "creating print file")?;
    file.write_all(html.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().with_context(|| "keeping print file")?;
    Ok(path)
}
