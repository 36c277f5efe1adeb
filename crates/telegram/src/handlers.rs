use {
    teloxide::{
        prelude::*,
        types::{CallbackQuery, User},
    },
    tracing::{debug, warn},
};

use subgate_gate::{
    ChatRef, EntryTrigger, InteractionId, MessageRef, RecheckTrigger, UserId,
    controller::RECHECK_CALLBACK,
};

use crate::{error::Result, state::BotState};

/// Command that opens the gate.
pub const ENTRY_COMMAND: &str = "start";

/// Handle a single inbound Telegram message.
pub async fn handle_message_direct(msg: Message, state: &BotState) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let Some(command) = parse_command(text, state.bot_username.as_deref()) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-command message");
        return Ok(());
    };
    if command != ENTRY_COMMAND {
        debug!(chat_id = msg.chat.id.0, command, "ignoring unknown command");
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        warn!(chat_id = msg.chat.id.0, "start command without sender");
        return Ok(());
    };

    let trigger = EntryTrigger {
        user: UserId(user.id.0),
        user_name: display_name(user),
        chat: ChatRef(msg.chat.id.0),
    };
    state.controller.handle_entry(&trigger).await?;
    Ok(())
}

/// Handle an inline button press.
pub async fn handle_callback_query(query: CallbackQuery, state: &BotState) -> Result<()> {
    if query.data.as_deref() != Some(RECHECK_CALLBACK) {
        debug!(callback_data = ?query.data, "ignoring unknown callback");
        if let Err(e) = state.bot.answer_callback_query(query.id.clone()).await {
            warn!(user_id = query.from.id.0, "failed to answer callback query: {e}");
        }
        return Ok(());
    }

    // Private chats share the user's id, which covers prompts too old for
    // Telegram to return.
    let (chat, message) = match query.message {
        Some(ref m) => (ChatRef(m.chat().id.0), Some(MessageRef(m.id().0))),
        None => (ChatRef(query.from.id.0 as i64), None),
    };

    let trigger = RecheckTrigger {
        user: UserId(query.from.id.0),
        user_name: display_name(&query.from),
        chat,
        message,
        interaction: InteractionId(query.id.clone()),
    };
    state.controller.handle_recheck(&trigger).await?;
    Ok(())
}

/// Extract the command name from `/cmd`, `/cmd@bot` or `/cmd payload`.
///
/// Commands addressed to a different bot yield `None`.
fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<&'a str> {
    let head = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
    let (command, target) = match head.split_once('@') {
        Some((command, target)) => (command, Some(target)),
        None => (head, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me)
    {
        return None;
    }
    (!command.is_empty()).then_some(command)
}

fn display_name(user: &User) -> String {
    let first = user.first_name.trim();
    if !first.is_empty() {
        return first.to_string();
    }
    user.username.clone().unwrap_or_else(|| "there".to_string())
}
