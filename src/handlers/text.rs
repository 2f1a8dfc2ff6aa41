use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;

use crate::flow;
use crate::handlers::send_replies;
use crate::locale;
use crate::state::BotState;
use crate::types::ChatIdentity;

/// Plain-text messages: city names and typed minute offsets, disambiguated
/// by the session step inside `flow::handle_text`.
pub async fn text_handler(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(from) = msg.from() else {
        return Ok(());
    };

    let identity = ChatIdentity {
        telegram_id: from.id.0 as i64,
        first_name: from.first_name.clone(),
        last_name: from.last_name.clone(),
        username: from.username.clone(),
    };

    let lock = state.user_lock(identity.telegram_id).await;
    let _guard = lock.lock().await;

    match flow::handle_text(&state, &identity, text).await {
        Ok(replies) => send_replies(&bot, msg.chat.id, replies).await?,
        Err(error) => {
            log::error!("error in text handler: {}", error);
            bot.send_message(msg.chat.id, locale::generic_error()).await?;
        }
    }
    Ok(())
}
