//! Delegated-authorization link building and callback state handling
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use anyhow::Result;
use reqwest::Url;
use uuid::Uuid;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// The OAuth redirect landing path, appended to the public base URL.
pub fn redirect_uri(base_url: &str) -> String {
    format!("{base_url}/auth/callback")
}

/// Build the Google consent URL for a user.
///
/// `state` carries a nonce plus the sender's identity so the callback can
/// route the credential back to the right user. `access_type=offline` with a
/// forced consent prompt is what makes Google return a refresh token.
pub fn build_auth_link(client_id: &str, base_url: &str, identity: &str) -> Result<String> {
    let state = format!("{}:{}", Uuid::new_v4().simple(), identity);
    let url = Url::parse_with_params(
        AUTH_ENDPOINT,
        &[
            ("client_id", client_id),
            ("redirect_uri", redirect_uri(base_url).as_str()),
            ("response_type", "code"),
            ("scope", CALENDAR_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state.as_str()),
        ],
    )?;
    Ok(url.into())
}

/// Recover the identity embedded in a callback `state` parameter.
pub fn identity_from_state(state: &str) -> Option<&str> {
    let (_nonce, identity) = state.split_once(':')?;
    if identity.is_empty() {
        return None;
    }
    Some(identity)
}
