use std::sync::Arc;

use {subgate_gate::GateController, tokio_util::sync::CancellationToken};

/// Shared bot state handed to every update task.
pub type SharedState = Arc<BotState>;

/// Runtime state of the running bot.
pub struct BotState {
    pub bot: teloxide::Bot,
    /// Username of the bot, used to tell `/start@this_bot` from commands
    /// addressed to other bots.
    pub bot_username: Option<String>,
    pub controller: Arc<GateController>,
    pub cancel: CancellationToken,
}
