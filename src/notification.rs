use crate::model::{Employee, RequestedCode};
use chrono::NaiveDate;

/// Request events that fan out to the admin notification feed.
#[derive(Debug)]
pub enum RequestEvent<'a> {
    VacationRequested {
        user: &'a Employee,
        start: NaiveDate,
        end: NaiveDate,
    },
    WishFreeRequested {
        user: &'a Employee,
        date: NaiveDate,
        requested: &'a RequestedCode,
    },
    WishFreeDecidedByUser {
        user: &'a Employee,
        date: NaiveDate,
        accepted: bool,
    },
}

/// Seam for the message rendering (text today, mail later).
pub trait NoticeRenderer {
    fn render(&self, event: &RequestEvent<'_>) -> String;
}

/// Plain-text notices for the admin feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextNotice;

impl NoticeRenderer for TextNotice {
    fn render(&self, event: &RequestEvent<'_>) -> String {
        match event {
            RequestEvent::VacationRequested { user, start, end } => format!(
                "Urlaubsantrag von {}: {} bis {}",
                user.full_name(),
                start,
                end
            ),
            RequestEvent::WishFreeRequested { user, date, requested } => format!(
                "Wunschfrei-Antrag von {} für den {} ({})",
                user.full_name(),
                date,
                requested.as_str()
            ),
            RequestEvent::WishFreeDecidedByUser { user, date, accepted } => format!(
                "{} hat den Wunschfrei-Vorschlag für den {} {}",
                user.full_name(),
                date,
                if *accepted { "angenommen" } else { "abgelehnt" }
            ),
        }
    }
}
