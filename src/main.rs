use std::collections::HashMap;
use std::env;
use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use brewbot::bot::{self, TelegramNotifier};
use brewbot::charts::PlottersRenderer;
use brewbot::config::Settings;
use brewbot::domain::{Ledger, Role, User};
use brewbot::executor::AppContext;
use brewbot::storage::{JsonFileRepository, Repository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    let settings = Settings::from_env();

    // Log to stdout and to the log file, which `get log` serves back
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .with_context(|| format!("Failed to open log file {}", settings.log_file.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();

    info!("Starting Brewbot");

    let bot_token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");

    // Load the persisted ledger, or seed it with the default admin
    let repository: Arc<dyn Repository> =
        Arc::new(JsonFileRepository::new(settings.state_file.clone()));
    let ledger: Ledger = match repository.load_all().await? {
        Some(ledger) => {
            info!(users = ledger.len(), "loaded existing state snapshot");
            ledger
        }
        None => {
            let admin_id = settings
                .default_admin_id
                .clone()
                .context("DEFAULT_ADMIN_ID must be set when no state snapshot exists")?;
            info!(admin_id = %admin_id, "no snapshot found, seeding default admin");
            HashMap::from([(
                admin_id,
                User::new(settings.default_admin_name.clone(), Role::Admin),
            )])
        }
    };

    let bot = Bot::new(bot_token);
    let ctx = Arc::new(AppContext {
        notifier: Arc::new(TelegramNotifier::new(bot.clone())),
        renderer: Arc::new(PlottersRenderer::new()),
        repository,
        settings,
    });
    let state = Arc::new(Mutex::new(ledger));

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let ctx = Arc::clone(&ctx);
        let state = Arc::clone(&state);
        move |msg: Message| {
            let ctx = Arc::clone(&ctx);
            let state = Arc::clone(&state);
            async move { bot::message_handler(msg, ctx, state).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
