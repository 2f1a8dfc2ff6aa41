use std::error::Error;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::commands::Command;
use crate::flow;
use crate::handlers::send_replies;
use crate::state::BotState;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    _state: Arc<BotState>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start => {
            send_replies(&bot, msg.chat.id, flow::start()).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
    }
    Ok(())
}
