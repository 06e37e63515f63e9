//! Reminder dispatch loop
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Single-flight tick guard, per-row failure isolation
//! - 1.0.0: Initial polling loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::core::time::{format_clock, parse_timezone};
use crate::database::{Database, Reminder};
use crate::features::whatsapp::OutboundSender;

/// Polls the reminder store and delivers due reminders.
///
/// One tick drains the entire due set, so dispatch latency is bounded by the
/// poll interval. Rows are deleted after the delivery attempt whether or not
/// the send succeeded; there is no retry state.
pub struct ReminderScheduler {
    database: Database,
    sender: Arc<dyn OutboundSender>,
    poll_interval: Duration,
    /// Held for the duration of one tick. A tick that finds it taken is
    /// skipped, so overlapping invocations can never double-dispatch a row.
    tick_guard: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(
        database: Database,
        sender: Arc<dyn OutboundSender>,
        poll_interval: Duration,
    ) -> Self {
        ReminderScheduler {
            database,
            sender,
            poll_interval,
            tick_guard: Mutex::new(()),
        }
    }

    /// Run the polling loop forever. A failed tick is logged and the loop
    /// keeps scheduling; nothing in here is fatal to the process.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "⏰ Reminder scheduler running (polling every {}s)",
            self.poll_interval.as_secs()
        );

        loop {
            interval.tick().await;
            match self.tick(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!("Dispatched {count} reminder(s)"),
                Err(e) => error!("Reminder tick failed: {e}"),
            }
        }
    }

    /// One dispatch pass: fetch everything due at `now`, deliver, delete.
    ///
    /// Returns the number of rows removed. A failure on one row never stops
    /// the rest of the batch. Returns 0 without touching the store when
    /// another tick is still in flight.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("Previous reminder tick still running; skipping this one");
            return Ok(0);
        };

        let due = self.database.due_reminders(now).await?;
        let mut dispatched = 0;

        for reminder in due {
            if let Err(e) = self.deliver(&reminder).await {
                error!(
                    "Failed to deliver reminder {} to {}: {e}",
                    reminder.id, reminder.identity
                );
            }
            // Fire-and-forget: the row goes away whether or not the send
            // went through.
            if let Err(e) = self.database.delete_reminder(&reminder.id).await {
                error!("Failed to delete reminder {}: {e}", reminder.id);
                continue;
            }
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn deliver(&self, reminder: &Reminder) -> Result<()> {
        let user = self.database.get_or_create_user(&reminder.identity).await?;
        let tz = parse_timezone(&user.timezone)?;
        let local_start = reminder.start_utc.with_timezone(&tz);
        let message = format!(
            "⏰ Reminder: '{}' at {}.",
            reminder.summary,
            format_clock(local_start)
        );
        self.sender.send(&reminder.identity, &message).await
    }
}
