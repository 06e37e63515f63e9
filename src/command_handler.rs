//! Intent execution and the command-boundary error policy.
//!
//! Every inbound message ends here: the parsed intent runs against the
//! shared context, and any failure is converted to a user-facing reply.
//! Nothing in this module can take down the webhook handler.

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, warn};
use std::sync::Arc;

use crate::commands::{self, AgendaDay, Command, CommandContext};
use crate::core::error::AssistantError;
use crate::core::time::{local_day_window, parse_timezone};
use crate::features::agenda::render_agenda;
use crate::features::calendar::auth::build_auth_link;
use crate::features::reminders::materialize_today;

pub struct CommandHandler {
    ctx: Arc<CommandContext>,
}

impl CommandHandler {
    pub fn new(ctx: CommandContext) -> Self {
        CommandHandler { ctx: Arc::new(ctx) }
    }

    /// Entry point from the webhook: parse, execute, reply.
    ///
    /// The reply send is best-effort; a failed send is logged and dropped.
    pub async fn handle_text(&self, identity: &str, text: &str) {
        let command = commands::parse(text);
        debug!("Processing message from {identity}: {command:?}");

        let reply = self.execute(identity, command).await;
        if let Err(e) = self.ctx.sender.send(identity, &reply).await {
            error!("Failed to send reply to {identity}: {e}");
        }
    }

    /// Execute one intent and produce the reply text. Total: every failure
    /// maps to a user-facing message.
    pub async fn execute(&self, identity: &str, command: Command) -> String {
        let result = match command {
            Command::Link => self.handle_link(identity).await,
            Command::Agenda(day) => self.handle_agenda(identity, day).await,
            Command::SetTimezone(tzid) => self.handle_set_timezone(identity, &tzid).await,
            Command::EnableReminders => self.handle_enable_reminders(identity).await,
            Command::Greeting => Ok(self.greeting_text()),
            Command::Help => Ok(self.help_text()),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => self.user_message_for(&e),
        }
    }

    /// Called by the authorization callback once Google hands back a
    /// refresh token. Stores it and pings the user.
    pub async fn on_credential_obtained(&self, identity: &str, credential: &str) -> Result<()> {
        self.ctx.database.set_credential(identity, credential).await?;
        let welcome = format!(
            "✅ Calendar linked! Send 'today' to see your agenda, or 'remind' to get pings {}m before each meeting.",
            self.ctx.config.reminder_lead_minutes
        );
        if let Err(e) = self.ctx.sender.send(identity, &welcome).await {
            error!("Failed to send welcome to {identity}: {e}");
        }
        Ok(())
    }

    async fn handle_link(&self, identity: &str) -> Result<String> {
        let url = build_auth_link(
            &self.ctx.config.google_client_id,
            &self.ctx.config.base_url,
            identity,
        )?;
        Ok(format!(
            "To link your Google Calendar, tap this:\n{url}\n\n(If asked, allow 'Calendar read-only')"
        ))
    }

    async fn handle_agenda(&self, identity: &str, day: AgendaDay) -> Result<String> {
        let user = self.ctx.database.get_or_create_user(identity).await?;
        let Some(credential) = user.credential.as_deref() else {
            return Err(AssistantError::NotLinked.into());
        };

        let access_token = self.ctx.calendar.refresh_access_token(credential).await?;
        let tz = parse_timezone(&user.timezone)?;
        let mut date = Utc::now().with_timezone(&tz).date_naive();
        if day == AgendaDay::Tomorrow {
            date = date + chrono::Duration::days(1);
        }

        let (window_start, window_end) = local_day_window(date, tz)?;
        let events = self
            .ctx
            .calendar
            .list_events(&access_token, window_start, window_end, &user.timezone)
            .await?;

        Ok(render_agenda(date, &events, tz))
    }

    async fn handle_set_timezone(&self, identity: &str, tzid: &str) -> Result<String> {
        // Stored as-is; a bad id surfaces later as a conversion failure.
        self.ctx.database.set_timezone(identity, tzid).await?;
        Ok(format!("Timezone set to {tzid}."))
    }

    async fn handle_enable_reminders(&self, identity: &str) -> Result<String> {
        let lead = self.ctx.config.reminder_lead_minutes;
        let created =
            materialize_today(&self.ctx.database, self.ctx.calendar.as_ref(), identity, lead)
                .await?;
        Ok(format!(
            "Got it. I'll remind you {lead} minutes before {created} meeting(s) today."
        ))
    }

    fn greeting_text(&self) -> String {
        format!(
            "Hi there! 👋 I'm Donna, your calendar assistant.\n\n{}",
            self.command_list()
        )
    }

    fn help_text(&self) -> String {
        format!(
            "Donna here 💚\n{}\n\nSend 'test' to verify I'm working!",
            self.command_list()
        )
    }

    fn command_list(&self) -> String {
        format!(
            "Commands:\n- link calendar\n- today / tomorrow\n- remind ({}m before)\n- timezone America/New_York",
            self.ctx.config.reminder_lead_minutes
        )
    }

    /// Pick user-facing wording by failure kind; fall back to a generic
    /// apology. Never bubbles out.
    fn user_message_for(&self, err: &anyhow::Error) -> String {
        match err.downcast_ref::<AssistantError>() {
            Some(AssistantError::NotLinked) => {
                "Your calendar isn't linked yet. Send 'link calendar' to connect.".to_string()
            }
            Some(AssistantError::AuthExpired) => {
                "Your calendar link has expired or was revoked. Send 'link calendar' to reconnect."
                    .to_string()
            }
            Some(AssistantError::InvalidTimezone(tzid)) => format!(
                "I couldn't use the timezone '{tzid}'. Try an IANA name like America/New_York."
            ),
            Some(AssistantError::UpstreamUnavailable(detail)) => {
                warn!("Calendar provider unavailable: {detail}");
                "Sorry, I couldn't reach your calendar right now. Please try again in a bit."
                    .to_string()
            }
            None => {
                error!("Command failed: {err:#}");
                "Sorry, something went wrong on my end. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::database::Database;
    use crate::features::calendar::{CalendarAccess, NormalizedEvent};
    use crate::features::whatsapp::OutboundSender;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeCalendar {
        reject_credential: bool,
        contacts: AtomicUsize,
    }

    #[async_trait]
    impl CalendarAccess for FakeCalendar {
        async fn refresh_access_token(&self, _credential: &str) -> Result<String, AssistantError> {
            self.contacts.fetch_add(1, Ordering::SeqCst);
            if self.reject_credential {
                return Err(AssistantError::AuthExpired);
            }
            Ok("access-token".to_string())
        }

        async fn list_events(
            &self,
            _access_token: &str,
            _window_start: DateTime<Utc>,
            _window_end: DateTime<Utc>,
            _tzid: &str,
        ) -> Result<Vec<NormalizedEvent>, AssistantError> {
            self.contacts.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct NullSender;

    #[async_trait]
    impl OutboundSender for NullSender {
        async fn send(&self, _identity: &str, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            verify_token: "verify".to_string(),
            meta_access_token: "meta-token".to_string(),
            phone_number_id: "109876".to_string(),
            base_url: "https://donna.example.com".to_string(),
            google_client_id: "client-123".to_string(),
            google_client_secret: "secret".to_string(),
            database_path: ":memory:".to_string(),
            bind_addr: "127.0.0.1:8001".to_string(),
            default_timezone: "America/New_York".to_string(),
            reminder_lead_minutes: 10,
            reminder_poll_seconds: 30,
            log_level: "info".to_string(),
        }
    }

    async fn handler_with(
        reject_credential: bool,
    ) -> (CommandHandler, Database, Arc<FakeCalendar>) {
        let db = Database::new(":memory:", "America/New_York").await.unwrap();
        let calendar = Arc::new(FakeCalendar {
            reject_credential,
            contacts: AtomicUsize::new(0),
        });
        let ctx = CommandContext::new(
            db.clone(),
            calendar.clone(),
            Arc::new(NullSender),
            test_config(),
        );
        (CommandHandler::new(ctx), db, calendar)
    }

    #[tokio::test]
    async fn test_agenda_for_unlinked_user_reports_not_linked() {
        let (handler, _db, calendar) = handler_with(false).await;
        let reply = handler
            .execute("15551234567", Command::Agenda(AgendaDay::Today))
            .await;
        assert_eq!(
            reply,
            "Your calendar isn't linked yet. Send 'link calendar' to connect."
        );
        // The provider was never contacted.
        assert_eq!(calendar.contacts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remind_for_unlinked_user_reports_not_linked() {
        let (handler, _db, calendar) = handler_with(false).await;
        let reply = handler.execute("15551234567", Command::EnableReminders).await;
        assert_eq!(
            reply,
            "Your calendar isn't linked yet. Send 'link calendar' to connect."
        );
        assert_eq!(calendar.contacts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_prompts_relink_and_stays_stored() {
        let (handler, db, _calendar) = handler_with(true).await;
        db.set_credential("15551234567", "refresh-token").await.unwrap();

        let reply = handler
            .execute("15551234567", Command::Agenda(AgendaDay::Today))
            .await;
        assert_eq!(
            reply,
            "Your calendar link has expired or was revoked. Send 'link calendar' to reconnect."
        );

        let user = db.get_or_create_user("15551234567").await.unwrap();
        assert_eq!(user.credential.as_deref(), Some("refresh-token"));
    }

    #[tokio::test]
    async fn test_set_timezone_accepts_anything() {
        let (handler, db, _calendar) = handler_with(false).await;
        let reply = handler
            .execute(
                "15551234567",
                Command::SetTimezone("Europe/Oslo".to_string()),
            )
            .await;
        assert_eq!(reply, "Timezone set to Europe/Oslo.");

        let user = db.get_or_create_user("15551234567").await.unwrap();
        assert_eq!(user.timezone, "Europe/Oslo");

        // Even nonsense is stored; it fails later, at conversion time.
        let reply = handler
            .execute("15551234567", Command::SetTimezone("Nowhere/X".to_string()))
            .await;
        assert_eq!(reply, "Timezone set to Nowhere/X.");
    }

    #[tokio::test]
    async fn test_link_reply_contains_consent_url() {
        let (handler, _db, _calendar) = handler_with(false).await;
        let reply = handler.execute("15551234567", Command::Link).await;
        assert!(reply.starts_with("To link your Google Calendar, tap this:\n"));
        assert!(reply.contains("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(reply.contains("client_id=client-123"));
    }

    #[tokio::test]
    async fn test_help_and_greeting_list_commands() {
        let (handler, _db, _calendar) = handler_with(false).await;
        let help = handler.execute("15551234567", Command::Help).await;
        assert!(help.contains("- link calendar"));
        assert!(help.contains("remind (10m before)"));

        let greeting = handler.execute("15551234567", Command::Greeting).await;
        assert!(greeting.contains("I'm Donna"));
    }

    #[tokio::test]
    async fn test_on_credential_obtained_stores_token() {
        let (handler, db, _calendar) = handler_with(false).await;
        handler
            .on_credential_obtained("15551234567", "fresh-refresh-token")
            .await
            .unwrap();

        let user = db.get_or_create_user("15551234567").await.unwrap();
        assert_eq!(user.credential.as_deref(), Some("fresh-refresh-token"));
    }
}
