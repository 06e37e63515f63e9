//! # Core Module
//!
//! Core domain types, configuration, and error handling for the Donna
//! assistant.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add time module with zone-aware window and clock helpers
//! - 1.0.0: Initial creation with config and error modules

pub mod config;
pub mod error;
pub mod time;

// Re-export commonly used items
pub use config::Config;
pub use error::AssistantError;
pub use time::{encode_instant, format_clock, format_day, local_day_window, parse_timezone};
