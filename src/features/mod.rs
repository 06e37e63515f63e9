//! # Features Module
//!
//! Feature modules for the Donna assistant.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Calendar, agenda, and WhatsApp features for the assistant
//! - 1.0.0: Initial feature layout

pub mod agenda;
pub mod calendar;
pub mod reminders;
pub mod whatsapp;

// Re-export commonly used items
pub use agenda::render_agenda;
pub use calendar::{CalendarAccess, EventStart, GoogleCalendarClient, NormalizedEvent};
pub use reminders::ReminderScheduler;
pub use whatsapp::{OutboundSender, WhatsAppSender};
