use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::RequestError;

use crate::flow::Reply;

mod callback;
mod command;
mod scheduler;
mod text;

pub use callback::callback_handler;
pub use command::command_handler;
pub use scheduler::{due_notifications, start_scheduler, Notification};
pub use text::text_handler;

/// Deliver the flow's replies in order.
pub(crate) async fn send_replies(
    bot: &Bot,
    chat_id: ChatId,
    replies: Vec<Reply>,
) -> Result<(), RequestError> {
    for reply in replies {
        let mut request = bot.send_message(chat_id, reply.text);
        if let Some(keyboard) = reply.keyboard {
            request = request.reply_markup(keyboard);
        }
        if reply.markdown {
            request = request.parse_mode(ParseMode::Markdown);
        }
        request.await?;
    }
    Ok(())
}
