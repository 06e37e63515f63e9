use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use donna::command_handler::CommandHandler;
use donna::commands::CommandContext;
use donna::core::Config;
use donna::database::Database;
use donna::features::calendar::GoogleCalendarClient;
use donna::features::reminders::ReminderScheduler;
use donna::features::whatsapp::WhatsAppSender;
use donna::webhook::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables; tokens.env first, then a plain .env.
    dotenvy::from_filename("tokens.env").ok();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Donna calendar assistant...");

    let database = Database::new(&config.database_path, &config.default_timezone).await?;
    let sender = Arc::new(WhatsAppSender::new(
        &config.meta_access_token,
        &config.phone_number_id,
    )?);
    let google = GoogleCalendarClient::new(
        &config.google_client_id,
        &config.google_client_secret,
    )?;

    let ctx = CommandContext::new(
        database.clone(),
        Arc::new(google.clone()),
        sender.clone(),
        config.clone(),
    );
    let handler = CommandHandler::new(ctx);

    // Start the reminder scheduler
    let scheduler = ReminderScheduler::new(
        database,
        sender.clone(),
        Duration::from_secs(config.reminder_poll_seconds),
    );
    tokio::spawn(async move {
        scheduler.run().await;
    });

    let state = Arc::new(AppState {
        handler,
        google,
        sender,
        verify_token: config.verify_token.clone(),
        base_url: config.base_url.clone(),
    });
    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("📡 Webhook server listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
