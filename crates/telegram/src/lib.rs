//! Telegram transport for the subscription gate.
//!
//! Looks up channel membership with `getChatMember`, delivers prompts and
//! greetings, and runs the long-polling loop that feeds `/start` commands
//! and re-check button presses into the gate controller.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod source;
pub mod state;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod testing;

pub use {
    bot::{build_controller, start_polling},
    config::TelegramGateConfig,
    error::{Error, Result},
};
