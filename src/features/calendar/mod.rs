//! # Feature: Calendar Access
//!
//! Google Calendar integration: delegated-authorization link building, code
//! exchange, refresh-token access, and normalized event listing.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod api;
pub mod auth;

pub use api::GoogleCalendarClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::core::error::AssistantError;

/// Substituted when the provider sends an event with no title.
pub const UNTITLED_EVENT: &str = "(no title)";

/// When an event starts: a concrete instant, or a date-only marker for
/// all-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStart {
    Timed(DateTime<Utc>),
    AllDay(NaiveDate),
}

/// A calendar event reduced to what agenda rendering and reminder
/// materialization need. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub id: String,
    pub summary: String,
    pub start: EventStart,
}

impl NormalizedEvent {
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventStart::AllDay(_))
    }
}

/// Seam between command handling / materialization and the provider.
///
/// The production implementation is [`GoogleCalendarClient`]; tests inject
/// fakes so the "not linked" and error-propagation paths can be exercised
/// without a network.
#[async_trait]
pub trait CalendarAccess: Send + Sync {
    /// Exchange the long-lived credential for a short-lived access token.
    ///
    /// `AuthExpired` means the provider rejected the credential; callers
    /// surface "relink required" and never retry automatically.
    async fn refresh_access_token(&self, credential: &str) -> Result<String, AssistantError>;

    /// Events overlapping the UTC window, recurring instances expanded,
    /// ascending by start, first page only.
    async fn list_events(
        &self,
        access_token: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        tzid: &str,
    ) -> Result<Vec<NormalizedEvent>, AssistantError>;
}
