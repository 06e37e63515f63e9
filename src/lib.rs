// Core layer - shared types, configuration, errors
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;
pub mod webhook;

// Re-export core config for convenience
pub use crate::core::{AssistantError, Config};

// Re-export feature items
pub use features::{
    // Agenda
    render_agenda,
    // Calendar
    CalendarAccess, EventStart, GoogleCalendarClient, NormalizedEvent,
    // Reminders
    ReminderScheduler,
    // WhatsApp
    OutboundSender, WhatsAppSender,
};

// Re-export storage types
pub use database::{Database, Reminder, UserRecord};
