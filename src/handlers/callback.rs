use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use teloxide::dispatching::DpHandlerDescription;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::{ApiError, RequestError};

use crate::flow;
use crate::handlers::send_replies;
use crate::locale;
use crate::state::BotState;
use crate::types::ChatIdentity;

pub fn callback_handler(
    state: Arc<BotState>,
) -> dptree::Handler<
    'static,
    DependencyMap,
    Result<(), Box<dyn Error + Send + Sync>>,
    DpHandlerDescription,
> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let state = state.clone();
        async move { handle_callback_query(bot, q, state).await }
    })
}

pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    state: Arc<BotState>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(data) = query.data.clone() else {
        bot.answer_callback_query(query.id.clone()).await.ok();
        return Ok(());
    };

    let identity = ChatIdentity {
        telegram_id: query.from.id.0 as i64,
        first_name: query.from.first_name.clone(),
        last_name: query.from.last_name.clone(),
        username: query.from.username.clone(),
    };
    let chat_id = match &query.message {
        Some(message) => message.chat.id,
        None => ChatId(identity.telegram_id),
    };

    // One conversation step at a time per user; a double-tap waits here
    // instead of racing the session row.
    let lock = state.user_lock(identity.telegram_id).await;
    let _guard = lock.lock().await;

    if let Err(error) = run_action(&bot, chat_id, &state, &identity, &data).await {
        if is_stale_callback(error.as_ref()) {
            // The originating event expired at the gateway; nothing useful
            // can be said to the user anymore.
            log::info!("stale callback in {}: {}", action_name(&data), error);
        } else {
            log::error!("error in {}: {}", action_name(&data), error);
            if let Err(send_error) = bot.send_message(chat_id, locale::generic_error()).await {
                log::error!("failed to send error reply: {}", send_error);
            }
        }
    }

    // Always acknowledge so the button stops spinning; a stale query may
    // reject even this, which is fine.
    if let Err(error) = bot.answer_callback_query(query.id.clone()).await {
        if !is_stale_callback(&error) {
            log::warn!("failed to answer callback query: {}", error);
        }
    }
    Ok(())
}

async fn run_action(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    identity: &ChatIdentity,
    data: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let replies = if let Some(code) = data.strip_prefix("lang_") {
        flow::select_language(state, identity, code).await?
    } else if let Some(prayer_id) = data.strip_prefix("prayer_") {
        flow::select_prayer(state, identity, prayer_id).await?
    } else if let Some(minutes) = data.strip_prefix("minutes_") {
        let Ok(minutes) = minutes.parse::<i64>() else {
            log::warn!("unparseable minute button {:?} from {}", data, identity.telegram_id);
            return Ok(());
        };
        flow::select_minutes(state, identity, minutes).await?
    } else {
        match data {
            "change_lang" => flow::toggle_language(state, identity).await?,
            "change_city" => flow::request_city_change(state, identity).await?,
            "confirm_location" => flow::confirm_location(state, identity).await?,
            "reject_location" => flow::reject_location(state, identity).await?,
            "finish" => flow::finish(state, identity).await?,
            "delete_all" => flow::delete_all(state, identity).await?,
            "show_times" => flow::show_times(state, identity, Utc::now()).await?,
            other => {
                log::warn!("unknown callback {:?} from {}", other, identity.telegram_id);
                return Ok(());
            }
        }
    };

    send_replies(bot, chat_id, replies).await?;
    Ok(())
}

fn action_name(data: &str) -> &str {
    data.split('_').next().unwrap_or(data)
}

/// The callback query expired or was already consumed at the gateway.
fn is_stale_callback(error: &(dyn Error + 'static)) -> bool {
    let Some(request_error) = error.downcast_ref::<RequestError>() else {
        return false;
    };
    match request_error {
        RequestError::Api(ApiError::InvalidQueryId) => true,
        RequestError::Api(ApiError::Unknown(text)) => {
            text.contains("query is too old") || text.contains("query ID is invalid")
        }
        _ => false,
    }
}
