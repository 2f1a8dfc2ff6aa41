use std::env;
use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;

use crate::commands::Command;
use crate::handlers::{callback_handler, command_handler, start_scheduler, text_handler};
use crate::location::OpenStreetMapResolver;
use crate::state::BotState;
use crate::store::Store;

mod api;
mod commands;
mod error;
mod flow;
mod handlers;
mod keyboard;
mod locale;
mod location;
mod praytime;
mod state;
mod store;
mod types;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting azan reminder bot...");

    // Telegram token comes from TELOXIDE_TOKEN.
    let bot = Bot::from_env();

    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "azan_bot.db".to_string());
    let store = Store::open(&db_path).await?;
    log::info!("Opened database at {}", db_path);

    let http = reqwest::Client::builder().user_agent("azan-reminder-bot").build()?;
    let resolver = Arc::new(OpenStreetMapResolver::new(
        http,
        env::var("TIMEZONEDB_API_KEY").ok(),
    ));

    let state = Arc::new(BotState::new(store.clone(), resolver));

    // Per-minute notification sweep.
    let scheduler_bot = bot.clone();
    let scheduler_state = state.clone();
    tokio::spawn(async move {
        start_scheduler(scheduler_bot, scheduler_state).await;
    });

    // Dashboard API.
    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(4008);
    let api_state = api::ApiState::from_env(store);
    tokio::spawn(async move {
        if let Err(error) = api::serve(api_state, port).await {
            log::error!("dashboard api failed: {}", error);
        }
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().filter_command::<Command>().endpoint(
            |bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>| async move {
                command_handler(bot, msg, cmd, state).await
            },
        ))
        .branch(callback_handler(state.clone()))
        .branch(Update::filter_message().endpoint(
            |bot: Bot, msg: Message, state: Arc<BotState>| async move {
                text_handler(bot, msg, state).await
            },
        ));

    log::info!("Starting command dispatching...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
