//! Reminder materialization: a day's calendar events become pending rows
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.1.0: Unlinked users now error out before any provider contact
//! - 1.0.0: Initial implementation

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use log::debug;
use uuid::Uuid;

use crate::core::error::AssistantError;
use crate::core::time::{local_day_window, parse_timezone};
use crate::database::{Database, Reminder, UserRecord};
use crate::features::calendar::{CalendarAccess, EventStart, NormalizedEvent};

/// Materialize reminders for the user's current local day.
///
/// Returns the number of rows written. Fails with `NotLinked` before any
/// provider contact when no credential is on file.
pub async fn materialize_today(
    database: &Database,
    calendar: &dyn CalendarAccess,
    identity: &str,
    lead_minutes: i64,
) -> Result<usize> {
    let user = database.get_or_create_user(identity).await?;
    let tz = parse_timezone(&user.timezone)?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    materialize_for_day(database, calendar, &user, today, lead_minutes).await
}

/// Materialize reminders for one local calendar day.
///
/// Every *timed* event in the day window produces one row with
/// `fire_at = start - lead_minutes` and a freshly minted id. All-day events
/// are skipped. Running this twice for an unchanged calendar writes a second
/// set of rows; ids are never derived from the event.
pub async fn materialize_for_day(
    database: &Database,
    calendar: &dyn CalendarAccess,
    user: &UserRecord,
    day: NaiveDate,
    lead_minutes: i64,
) -> Result<usize> {
    let Some(credential) = user.credential.as_deref() else {
        return Err(AssistantError::NotLinked.into());
    };

    let access_token = calendar.refresh_access_token(credential).await?;
    let tz = parse_timezone(&user.timezone)?;
    let (window_start, window_end) = local_day_window(day, tz)?;
    let events = calendar
        .list_events(&access_token, window_start, window_end, &user.timezone)
        .await?;

    let mut created = 0;
    for event in &events {
        let Some(reminder) = reminder_for_event(&user.identity, event, lead_minutes) else {
            continue;
        };
        database.upsert_reminder(&reminder).await?;
        created += 1;
    }

    debug!(
        "Materialized {created} reminder(s) for {} on {day}",
        user.identity
    );
    Ok(created)
}

/// Build the reminder row for one event, or `None` for all-day events.
pub fn reminder_for_event(
    identity: &str,
    event: &NormalizedEvent,
    lead_minutes: i64,
) -> Option<Reminder> {
    let EventStart::Timed(start_utc) = event.start else {
        return None;
    };
    Some(Reminder {
        id: Uuid::new_v4().simple().to_string(),
        identity: identity.to_string(),
        event_id: event.id.clone(),
        summary: event.summary.clone(),
        start_utc,
        fire_at_utc: start_utc - Duration::minutes(lead_minutes),
    })
}
