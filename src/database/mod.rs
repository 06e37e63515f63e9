//! # Database Module
//!
//! SQLite persistence for user records and pending reminders.
//!
//! The handle is cheap to clone and safe to share between the webhook
//! executor and the reminder scheduler: every operation takes the connection
//! mutex, runs its statements, and releases it before awaiting anything else,
//! so individual row operations are atomic with respect to each other. There
//! is no cross-row transactional coupling anywhere in the system.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Users + reminders schema for the calendar assistant
//! - 1.0.0: Initial async wrapper around a thread-safe connection

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use sqlite::{Connection, ConnectionThreadSafe, State};
use tokio::sync::Mutex;

use crate::core::time::{encode_instant, parse_instant};

/// A chat user, keyed by the channel-assigned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub identity: String,
    /// Long-lived Google refresh token; `None` until the account is linked.
    pub credential: Option<String>,
    /// IANA timezone id. Never validated here; bad values surface as
    /// conversion failures downstream.
    pub timezone: String,
}

/// A pending reminder row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Fresh id minted at materialization time, not derived from the event.
    pub id: String,
    pub identity: String,
    pub event_id: String,
    pub summary: String,
    pub start_utc: DateTime<Utc>,
    pub fire_at_utc: DateTime<Utc>,
}

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<ConnectionThreadSafe>>,
    default_timezone: String,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// Users created lazily on first contact get `default_timezone`.
    pub async fn new(path: &str, default_timezone: &str) -> Result<Self> {
        let conn = Connection::open_thread_safe(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                identity   TEXT PRIMARY KEY,
                credential TEXT,
                timezone   TEXT NOT NULL
            )",
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reminders (
                id          TEXT PRIMARY KEY,
                identity    TEXT NOT NULL,
                event_id    TEXT NOT NULL,
                summary     TEXT NOT NULL,
                start_utc   TEXT NOT NULL,
                fire_at_utc TEXT NOT NULL
            )",
        )?;

        debug!("Database ready at {path}");

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
            default_timezone: default_timezone.to_string(),
        })
    }

    /// Fetch a user record, creating it with the default timezone and no
    /// credential if it does not exist yet. One atomic operation, so two
    /// concurrent first contacts cannot race into duplicate rows.
    pub async fn get_or_create_user(&self, identity: &str) -> Result<UserRecord> {
        let conn = self.conn.lock().await;

        let mut insert =
            conn.prepare("INSERT OR IGNORE INTO users (identity, timezone) VALUES (?, ?)")?;
        insert.bind((1, identity))?;
        insert.bind((2, self.default_timezone.as_str()))?;
        while insert.next()? != State::Done {}

        let mut select =
            conn.prepare("SELECT credential, timezone FROM users WHERE identity = ?")?;
        select.bind((1, identity))?;
        match select.next()? {
            State::Row => Ok(UserRecord {
                identity: identity.to_string(),
                credential: select.read::<Option<String>, _>("credential")?,
                timezone: select.read::<String, _>("timezone")?,
            }),
            State::Done => anyhow::bail!("user row vanished after upsert: {identity}"),
        }
    }

    /// Store (or replace) the user's long-lived credential, creating the
    /// record if needed. The stored timezone is left untouched.
    pub async fn set_credential(&self, identity: &str, credential: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO users (identity, credential, timezone) VALUES (?, ?, ?)
             ON CONFLICT(identity) DO UPDATE SET credential = excluded.credential",
        )?;
        stmt.bind((1, identity))?;
        stmt.bind((2, credential))?;
        stmt.bind((3, self.default_timezone.as_str()))?;
        while stmt.next()? != State::Done {}
        Ok(())
    }

    /// Store the user's preferred timezone, creating the record if needed.
    /// No validation happens here.
    pub async fn set_timezone(&self, identity: &str, tzid: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO users (identity, timezone) VALUES (?, ?)
             ON CONFLICT(identity) DO UPDATE SET timezone = excluded.timezone",
        )?;
        stmt.bind((1, identity))?;
        stmt.bind((2, tzid))?;
        while stmt.next()? != State::Done {}
        Ok(())
    }

    /// Insert or replace a reminder row by id.
    pub async fn upsert_reminder(&self, reminder: &Reminder) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO reminders
             (id, identity, event_id, summary, start_utc, fire_at_utc)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        stmt.bind((1, reminder.id.as_str()))?;
        stmt.bind((2, reminder.identity.as_str()))?;
        stmt.bind((3, reminder.event_id.as_str()))?;
        stmt.bind((4, reminder.summary.as_str()))?;
        stmt.bind((5, encode_instant(reminder.start_utc).as_str()))?;
        stmt.bind((6, encode_instant(reminder.fire_at_utc).as_str()))?;
        while stmt.next()? != State::Done {}
        Ok(())
    }

    /// All reminders with a fire instant at or before `now`, ordered by fire
    /// instant so repeated polls see a stable sequence.
    pub async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, identity, event_id, summary, start_utc, fire_at_utc
             FROM reminders WHERE fire_at_utc <= ? ORDER BY fire_at_utc, id",
        )?;
        stmt.bind((1, encode_instant(now).as_str()))?;

        let mut due = Vec::new();
        while stmt.next()? == State::Row {
            let start_raw = stmt.read::<String, _>("start_utc")?;
            let fire_raw = stmt.read::<String, _>("fire_at_utc")?;
            let (Some(start_utc), Some(fire_at_utc)) =
                (parse_instant(&start_raw), parse_instant(&fire_raw))
            else {
                anyhow::bail!("unreadable instant on reminder row: {start_raw} / {fire_raw}");
            };
            due.push(Reminder {
                id: stmt.read::<String, _>("id")?,
                identity: stmt.read::<String, _>("identity")?,
                event_id: stmt.read::<String, _>("event_id")?,
                summary: stmt.read::<String, _>("summary")?,
                start_utc,
                fire_at_utc,
            });
        }
        Ok(due)
    }

    /// Remove a reminder by id. Removing an already-deleted id is a no-op.
    pub async fn delete_reminder(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
        stmt.bind((1, id))?;
        while stmt.next()? != State::Done {}
        Ok(())
    }
}
