//! # Feature: Agenda Rendering
//!
//! Pure text rendering of a day's events.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::core::time::{format_clock, format_day};
use crate::features::calendar::{EventStart, NormalizedEvent};

/// Render a day's agenda.
///
/// Events are listed in input order (the calendar adapter already sorts by
/// start). Timed events show the start as a local 12-hour clock; all-day
/// events are labeled `All day`.
pub fn render_agenda(day: NaiveDate, events: &[NormalizedEvent], tz: Tz) -> String {
    if events.is_empty() {
        return format!("No events on {}.", format_day(day));
    }

    let mut lines = vec![format!("Agenda for {}:", format_day(day))];
    for event in events {
        let when = match event.start {
            EventStart::Timed(start) => format_clock(start.with_timezone(&tz)),
            EventStart::AllDay(_) => "All day".to_string(),
        };
        lines.push(format!("• {} — {}", when, event.summary));
    }
    lines.join("\n")
}
