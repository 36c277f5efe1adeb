use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use subgate_gate::{
    GateController, GateDelivery, MembershipOracle, MembershipSource, VerificationCache,
};

use crate::{
    config::TelegramGateConfig,
    error::{Error, Result},
    handlers,
    outbound::TelegramDelivery,
    source::TelegramMemberSource,
    state::{BotState, SharedState},
};

/// Wire the gate controller to a Telegram bot.
///
/// Membership is looked up by channel handle first, then by numeric id.
pub fn build_controller(
    bot: &Bot,
    config: &TelegramGateConfig,
    cache: Arc<VerificationCache>,
) -> GateController {
    let sources = config
        .membership_channels()
        .into_iter()
        .map(|channel| {
            Arc::new(TelegramMemberSource::new(bot.clone(), channel)) as Arc<dyn MembershipSource>
        })
        .collect();
    let oracle = MembershipOracle::new(sources).with_attempt_timeout(config.lookup_timeout());

    let channels: Vec<String> = oracle.channels().map(ToString::to_string).collect();
    if channels.is_empty() {
        warn!("no channel configured, every user will be denied");
    } else {
        info!(?channels, "membership lookup order");
    }

    let delivery: Arc<dyn GateDelivery> = Arc::new(TelegramDelivery::new(bot.clone()));

    GateController::new(Arc::new(oracle), cache, delivery, config.channel())
        .with_banner(config.banner())
}

/// Start polling for updates.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(config: TelegramGateConfig) -> Result<CancellationToken> {
    config.validate()?;

    // Build bot with a client timeout longer than the long-polling timeout
    // so the HTTP client doesn't abort the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(
            u64::from(config.poll_timeout_secs) + 15,
        ))
        .build()
        .map_err(|e| Error::external("build http client", e))?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    connect(bot, &config).await
}

async fn connect(bot: Bot, config: &TelegramGateConfig) -> Result<CancellationToken> {
    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Updates queued while the bot was down are discarded, not replayed.
    bot.delete_webhook().drop_pending_updates(true).send().await?;

    let commands = vec![BotCommand::new(
        handlers::ENTRY_COMMAND,
        "Check channel subscription",
    )];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(
        username = ?bot_username,
        "telegram bot connected (webhook cleared, pending updates dropped)"
    );

    let cancel = CancellationToken::new();
    let controller = build_controller(&bot, config, Arc::new(VerificationCache::new()));
    let state: SharedState = Arc::new(BotState {
        bot,
        bot_username,
        controller: Arc::new(controller),
        cancel: cancel.clone(),
    });

    tokio::spawn(poll_updates(state, config.poll_timeout_secs));

    Ok(cancel)
}

async fn poll_updates(state: SharedState, poll_timeout: u32) {
    info!("starting telegram polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = state
            .bot
            .get_updates()
            .offset(offset)
            .timeout(poll_timeout)
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

        let result = tokio::select! {
            () = state.cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    tokio::spawn(dispatch_update(Arc::clone(&state), update.kind));
                }
            },
            Err(e) => {
                // Another bot instance is running with the same token.
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!(
                        "telegram bot disabled: another instance is already running with this token"
                    );
                    state.cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = state.cancel.cancelled() => break,
                    () = tokio::time::sleep(std::time::Duration::from_secs(5)) => {},
                }
            },
        }
    }
}

/// Process one update. Errors are logged here and never stop the loop.
async fn dispatch_update(state: SharedState, kind: UpdateKind) {
    match kind {
        UpdateKind::Message(msg) => {
            let chat_id = msg.chat.id.0;
            let user_id = msg.from.as_ref().map(|u| u.id.0);
            debug!(chat_id, ?user_id, "received telegram message");
            if let Err(e) = handlers::handle_message_direct(msg, &state).await {
                error!(
                    chat_id,
                    ?user_id,
                    stage = "entry",
                    error = %e,
                    "error handling telegram message"
                );
            }
        },
        UpdateKind::CallbackQuery(query) => {
            let user_id = query.from.id.0;
            debug!(user_id, callback_data = ?query.data, "received telegram callback query");
            if let Err(e) = handlers::handle_callback_query(query, &state).await {
                error!(
                    user_id,
                    stage = "recheck",
                    error = %e,
                    "error handling telegram callback query"
                );
            }
        },
        other => {
            debug!("ignoring unsupported update: {other:?}");
        },
    }
}
