//! # Feature: Reminders
//!
//! The reminder lifecycle: materialization of calendar events into pending
//! rows, and the scheduler loop that dispatches them when due.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Calendar-driven materialization, single-flight dispatch ticks
//! - 1.0.0: Initial scheduler loop

pub mod materializer;
pub mod scheduler;

pub use materializer::{materialize_for_day, materialize_today};
pub use scheduler::ReminderScheduler;
