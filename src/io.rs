use crate::print::PrintView;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;

/// One imported employee row, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub vorname: String,
    pub name: String,
    pub entry_date: NaiveDate,
    pub diensthund: Option<String>,
}

/// Employee import: header `vorname,name,entry_date[,diensthund]`, dates
/// ISO `YYYY-MM-DD`.
pub fn import_people_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<PersonRow>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let vorname = rec.get(0).context("missing vorname")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        let entry = rec.get(2).context("missing entry_date")?.trim();
        if vorname.is_empty() || name.is_empty() {
            bail!("invalid people row (empty name)");
        }
        let entry_date = NaiveDate::parse_from_str(entry, "%Y-%m-%d")
            .with_context(|| format!("invalid entry_date for {vorname} {name}: {entry}"))?;
        let diensthund = rec
            .get(3)
            .map(str::trim)
            .filter(|dog| !dog.is_empty())
            .map(str::to_owned);
        out.push(PersonRow {
            vorname: vorname.to_owned(),
            name: name.to_owned(),
            entry_date,
            diensthund,
        });
    }
    Ok(out)
}

/// Month export: header `name,hund,carry,1..n,stunden`, tokens without
/// the lock glyph.
pub fn export_month_csv<P: AsRef<Path>>(path: P, view: &PrintView) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_path(path)?;
    let mut header = vec!["name".to_owned(), "hund".to_owned(), "carry".to_owned()];
    header.extend(view.days.iter().map(|d| d.day.to_string()));
    header.push("stunden".to_owned());
    w.write_record(&header)?;

    for row in &view.rows {
        let mut record = vec![row.name.clone(), row.dog.clone(), row.carry.token.clone()];
        record.extend(row.cells.iter().map(|cell| cell.token.clone()));
        record.push(format!("{:.2}", row.hours));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}
