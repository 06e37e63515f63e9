//! Google Calendar API v3 client: token refresh and event listing
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.1.0: Map invalid_grant onto AuthExpired instead of a generic failure
//! - 1.0.0: Initial implementation

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

use super::{CalendarAccess, EventStart, NormalizedEvent, UNTITLED_EVENT};
use crate::core::error::AssistantError;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const EVENTS_ENDPOINT: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// One calendar view query returns at most this many events. There is no
/// pagination beyond the first page.
const MAX_RESULTS: &str = "50";

/// Upstream requests time out after this long and surface as
/// `UpstreamUnavailable`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// Wire types (deserialized from Google Calendar JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ============================================================================
// Client
// ============================================================================

/// Google Calendar client for a single OAuth app.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

/// Result of exchanging an authorization code at the token endpoint.
#[derive(Debug, Clone)]
pub struct CodeGrant {
    pub access_token: String,
    /// Only present when the user granted offline access; absent on
    /// re-consent without the offline prompt.
    pub refresh_token: Option<String>,
}

impl GoogleCalendarClient {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(GoogleCalendarClient {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Exchange an authorization code for tokens (OAuth callback path).
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CodeGrant, AssistantError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(token_endpoint_error(status, &body));
        }

        #[derive(Deserialize)]
        struct ExchangeResponse {
            access_token: String,
            refresh_token: Option<String>,
        }
        let parsed: ExchangeResponse = serde_json::from_str(&body)
            .map_err(|e| AssistantError::UpstreamUnavailable(format!("bad token response: {e}")))?;
        Ok(CodeGrant {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
        })
    }
}

#[async_trait]
impl CalendarAccess for GoogleCalendarClient {
    async fn refresh_access_token(&self, credential: &str) -> Result<String, AssistantError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", credential),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(token_endpoint_error(status, &body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AssistantError::UpstreamUnavailable(format!("bad token response: {e}")))?;
        Ok(parsed.access_token)
    }

    async fn list_events(
        &self,
        access_token: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        tzid: &str,
    ) -> Result<Vec<NormalizedEvent>, AssistantError> {
        let time_min = window_start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = window_end.to_rfc3339_opts(SecondsFormat::Millis, true);

        let response = self
            .http
            .get(EVENTS_ENDPOINT)
            .bearer_auth(access_token)
            .query(&[
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("maxResults", MAX_RESULTS),
                ("timeZone", tzid),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AssistantError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::UpstreamUnavailable(format!(
                "calendar query failed: HTTP {status}: {body}"
            )));
        }

        let parsed: EventsResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::UpstreamUnavailable(format!("bad events response: {e}")))?;

        let events: Vec<NormalizedEvent> =
            parsed.items.into_iter().filter_map(normalize_event).collect();
        debug!("Calendar window {time_min}..{time_max} returned {} event(s)", events.len());
        Ok(events)
    }
}

/// Reduce a raw event to the normalized form. Events with no usable start
/// are dropped.
fn normalize_event(item: EventItem) -> Option<NormalizedEvent> {
    let start = item.start?;
    let start = if let Some(raw) = start.date_time.as_deref() {
        EventStart::Timed(
            DateTime::parse_from_rfc3339(raw)
                .ok()?
                .with_timezone(&Utc),
        )
    } else if let Some(raw) = start.date.as_deref() {
        EventStart::AllDay(NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?)
    } else {
        return None;
    };

    Some(NormalizedEvent {
        id: item.id,
        summary: item.summary.unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        start,
    })
}

fn transport_error(err: reqwest::Error) -> AssistantError {
    AssistantError::UpstreamUnavailable(err.to_string())
}

/// Classify a non-success answer from the token endpoint. A rejected
/// credential (`invalid_grant`) means the user must relink; everything else
/// is treated as the provider being unavailable.
fn token_endpoint_error(status: reqwest::StatusCode, body: &str) -> AssistantError {
    let lowered = body.to_lowercase();
    if (status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED)
        && lowered.contains("invalid_grant")
    {
        return AssistantError::AuthExpired;
    }
    AssistantError::UpstreamUnavailable(format!("token endpoint: HTTP {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_events_response_parses_timed_and_all_day() {
        let json = r#"{
            "items": [
                {
                    "id": "evt-1",
                    "summary": "Standup",
                    "start": {"dateTime": "2024-06-01T14:00:00Z"}
                },
                {
                    "id": "evt-2",
                    "summary": "Company holiday",
                    "start": {"date": "2024-06-01"}
                }
            ]
        }"#;

        let parsed: EventsResponse = serde_json::from_str(json).unwrap();
        let events: Vec<NormalizedEvent> =
            parsed.items.into_iter().filter_map(normalize_event).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].start,
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap())
        );
        assert!(!events[0].is_all_day());
        assert_eq!(
            events[1].start,
            EventStart::AllDay(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        );
        assert!(events[1].is_all_day());
    }

    #[test]
    fn test_normalize_event_handles_offset_datetimes() {
        let json = r#"{
            "id": "evt-1",
            "summary": "Review",
            "start": {"dateTime": "2024-06-01T10:00:00-04:00"}
        }"#;
        let item: EventItem = serde_json::from_str(json).unwrap();
        let event = normalize_event(item).unwrap();
        assert_eq!(
            event.start,
            EventStart::Timed(Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_normalize_event_substitutes_missing_title() {
        let json = r#"{"id": "evt-1", "start": {"dateTime": "2024-06-01T14:00:00Z"}}"#;
        let item: EventItem = serde_json::from_str(json).unwrap();
        assert_eq!(normalize_event(item).unwrap().summary, "(no title)");
    }

    #[test]
    fn test_normalize_event_drops_startless_items() {
        let json = r#"{"id": "evt-1", "summary": "ghost"}"#;
        let item: EventItem = serde_json::from_str(json).unwrap();
        assert!(normalize_event(item).is_none());
    }

    #[test]
    fn test_token_endpoint_error_invalid_grant_is_auth_expired() {
        let err = token_endpoint_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": "invalid_grant", "error_description": "Token has been revoked."}"#,
        );
        assert!(matches!(err, AssistantError::AuthExpired));
    }

    #[test]
    fn test_token_endpoint_error_server_error_is_upstream() {
        let err = token_endpoint_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, AssistantError::UpstreamUnavailable(_)));
    }
}
