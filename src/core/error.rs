//! Error taxonomy for calendar and reminder flows
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial implementation

use thiserror::Error;

/// Failure kinds that command handling must branch on.
///
/// Everything else travels as a plain `anyhow::Error` and is reported to the
/// user as a generic failure. The command boundary downcasts to this type to
/// pick the user-facing wording.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// No credential on file for the user. The calendar provider must not be
    /// contacted when this is raised.
    #[error("calendar is not linked")]
    NotLinked,

    /// The provider rejected the stored credential (revoked or expired).
    /// The credential stays stored; the user is asked to relink.
    #[error("calendar authorization expired or revoked")]
    AuthExpired,

    /// Transient network or provider failure. Never retried within the same
    /// command.
    #[error("calendar provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A stored timezone id that no downstream time library accepts. Raised
    /// at conversion time, not when the timezone is set.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
}
