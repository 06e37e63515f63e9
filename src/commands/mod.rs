//! # Command System
//!
//! Inbound message text parsed into intents, and the shared context command
//! execution runs against.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Keyword intents for the calendar assistant
//! - 1.0.0: Initial command layer

pub mod context;

// Re-export the CommandHandler from the handler module
pub use crate::command_handler::CommandHandler;

// Re-export handler infrastructure
pub use context::CommandContext;

/// Which local day an agenda request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaDay {
    Today,
    Tomorrow,
}

/// A parsed inbound intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Produce a calendar authorization link
    Link,
    /// Summarize a day's events
    Agenda(AgendaDay),
    /// Store a preferred timezone (not validated here)
    SetTimezone(String),
    /// Materialize reminders for today's events
    EnableReminders,
    /// Liveness check / smalltalk
    Greeting,
    /// Anything unrecognized
    Help,
}

/// Parse inbound text into a command.
///
/// Keyword matching is case-insensitive. The timezone argument keeps the
/// sender's casing since IANA ids are case-sensitive downstream.
pub fn parse(text: &str) -> Command {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "link" | "link calendar" | "connect calendar" | "auth" => Command::Link,
        "today" | "agenda" | "meetings" | "today?" => Command::Agenda(AgendaDay::Today),
        "tomorrow" | "tmrw" | "tomorrow?" => Command::Agenda(AgendaDay::Tomorrow),
        "remind" | "remind me" | "enable reminders" => Command::EnableReminders,
        "test" | "hello" | "hi" => Command::Greeting,
        _ => {
            if let Some((keyword, rest)) = trimmed.split_once(char::is_whitespace) {
                if keyword.eq_ignore_ascii_case("timezone") {
                    let tzid = rest.trim();
                    if !tzid.is_empty() {
                        return Command::SetTimezone(tzid.to_string());
                    }
                }
            }
            Command::Help
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_spellings() {
        for text in ["link", "Link Calendar", "connect calendar", "AUTH"] {
            assert_eq!(parse(text), Command::Link, "input: {text}");
        }
    }

    #[test]
    fn test_parse_agenda_spellings() {
        for text in ["today", "agenda", "meetings", "today?"] {
            assert_eq!(parse(text), Command::Agenda(AgendaDay::Today), "input: {text}");
        }
        for text in ["tomorrow", "tmrw", "Tomorrow?"] {
            assert_eq!(parse(text), Command::Agenda(AgendaDay::Tomorrow), "input: {text}");
        }
    }

    #[test]
    fn test_parse_remind_spellings() {
        for text in ["remind", "remind me", "enable reminders"] {
            assert_eq!(parse(text), Command::EnableReminders, "input: {text}");
        }
    }

    #[test]
    fn test_parse_timezone_keeps_argument_casing() {
        assert_eq!(
            parse("timezone America/New_York"),
            Command::SetTimezone("America/New_York".to_string())
        );
        assert_eq!(
            parse("TIMEZONE Europe/Oslo"),
            Command::SetTimezone("Europe/Oslo".to_string())
        );
    }

    #[test]
    fn test_parse_bare_timezone_is_help() {
        assert_eq!(parse("timezone "), Command::Help);
        assert_eq!(parse("timezone"), Command::Help);
    }

    #[test]
    fn test_parse_unknown_is_help() {
        assert_eq!(parse("what's on my plate"), Command::Help);
        assert_eq!(parse(""), Command::Help);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse("  today  "), Command::Agenda(AgendaDay::Today));
    }
}
