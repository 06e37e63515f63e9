//! Shared context for command handling
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Calendar access and outbound sender seams for the assistant
//! - 1.0.0: Initial implementation with core shared state

use std::sync::Arc;

use crate::core::Config;
use crate::database::Database;
use crate::features::calendar::CalendarAccess;
use crate::features::whatsapp::OutboundSender;

/// Services shared by all command handling
///
/// Calendar access and the outbound sender sit behind traits so tests can
/// exercise command flows without a network.
#[derive(Clone)]
pub struct CommandContext {
    pub database: Database,
    pub calendar: Arc<dyn CalendarAccess>,
    pub sender: Arc<dyn OutboundSender>,
    pub config: Config,
}

impl CommandContext {
    /// Create a new CommandContext with the given services
    pub fn new(
        database: Database,
        calendar: Arc<dyn CalendarAccess>,
        sender: Arc<dyn OutboundSender>,
        config: Config,
    ) -> Self {
        Self {
            database,
            calendar,
            sender,
            config,
        }
    }
}
