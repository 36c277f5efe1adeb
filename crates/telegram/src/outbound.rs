use std::{future::Future, path::Path, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::{EditMessageTextSetters, SendMessageSetters, SendPhotoSetters},
        prelude::*,
        types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode},
    },
    tracing::{debug, warn},
};

use subgate_gate::{
    ChatRef, DeliveryError, GateDelivery, GateKeyboard, GateMessage, InteractionId,
    MessageFormat, MessageRef,
};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

const JOIN_BUTTON: &str = "📢 Subscribe";
const RECHECK_BUTTON: &str = "🔁 Check subscription";

/// Outbound message sender for Telegram.
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        chat: ChatRef,
        operation: &'static str,
        mut request: F,
    ) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = %chat,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = %chat,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl GateDelivery for TelegramDelivery {
    async fn send_photo(
        &self,
        chat: ChatRef,
        photo: &Path,
        caption: &GateMessage,
    ) -> Result<MessageRef, DeliveryError> {
        let chat_id = ChatId(chat.0);
        let sent = self
            .run_telegram_request_with_retry(chat, "send photo", || {
                let mut req = self
                    .bot
                    .send_photo(chat_id, InputFile::file(photo.to_path_buf()))
                    .caption(caption.text.as_str());
                if let Some(mode) = parse_mode(caption.format) {
                    req = req.parse_mode(mode);
                }
                async move { req.await }
            })
            .await
            .map_err(|e| delivery_error("send photo", e))?;
        debug!(chat_id = %chat, photo = %photo.display(), "welcome banner sent");
        Ok(MessageRef(sent.id.0))
    }

    async fn send_message(
        &self,
        chat: ChatRef,
        message: &GateMessage,
    ) -> Result<MessageRef, DeliveryError> {
        let chat_id = ChatId(chat.0);
        let markup = message.keyboard.as_ref().map(keyboard_markup);
        let mode = parse_mode(message.format);
        let sent = self
            .run_telegram_request_with_retry(chat, "send message", || {
                let mut req = self.bot.send_message(chat_id, message.text.as_str());
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                if let Some(ref markup) = markup {
                    req = req.reply_markup(markup.clone());
                }
                async move { req.await }
            })
            .await
            .map_err(|e| delivery_error("send message", e))?;
        Ok(MessageRef(sent.id.0))
    }

    async fn edit_message(
        &self,
        chat: ChatRef,
        target: MessageRef,
        message: &GateMessage,
    ) -> Result<(), DeliveryError> {
        let chat_id = ChatId(chat.0);
        let message_id = MessageId(target.0);
        let markup = message.keyboard.as_ref().map(keyboard_markup);
        let mode = parse_mode(message.format);

        match self
            .run_telegram_request_with_retry(chat, "edit message", || {
                let mut req = self
                    .bot
                    .edit_message_text(chat_id, message_id, message.text.as_str());
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                if let Some(ref markup) = markup {
                    req = req.reply_markup(markup.clone());
                }
                async move { req.await }
            })
            .await
        {
            Ok(_) => Ok(()),
            // Re-checking an unchanged verdict produces identical content.
            Err(e) if is_message_not_modified_error(&e) => Ok(()),
            Err(e) => Err(delivery_error("edit message", e)),
        }
    }

    async fn acknowledge(&self, interaction: &InteractionId) -> Result<(), DeliveryError> {
        self.bot
            .answer_callback_query(interaction.0.clone())
            .await
            .map(|_| ())
            .map_err(|e| delivery_error("answer callback query", e))
    }
}

fn parse_mode(format: MessageFormat) -> Option<ParseMode> {
    match format {
        MessageFormat::Plain => None,
        MessageFormat::Html => Some(ParseMode::Html),
    }
}

fn keyboard_markup(keyboard: &GateKeyboard) -> InlineKeyboardMarkup {
    let mut rows = Vec::with_capacity(2);
    if let Some(ref join_url) = keyboard.join_url {
        match reqwest::Url::parse(join_url) {
            Ok(url) => rows.push(vec![InlineKeyboardButton::url(JOIN_BUTTON, url)]),
            Err(e) => warn!(join_url, error = %e, "invalid join link, omitting button"),
        }
    }
    rows.push(vec![InlineKeyboardButton::callback(
        RECHECK_BUTTON,
        keyboard.recheck_data.clone(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

fn delivery_error(operation: &'static str, error: RequestError) -> DeliveryError {
    match error {
        RequestError::Api(api) => DeliveryError::rejected(operation, api.to_string()),
        other => DeliveryError::external(operation, other),
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}
