use std::{path::Path, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{error, info, warn},
};

use crate::{
    cache::VerificationCache,
    error::{DeliveryError, GateError, Result},
    oracle::MembershipOracle,
    source::ChannelRef,
    status::{ChatRef, UserId},
    welcome::{WELCOME_CAPTION, WELCOME_FALLBACK, WelcomeBanner},
};

/// Callback token attached to the re-check button.
pub const RECHECK_CALLBACK: &str = "check_subscription";

const ENTRY_APOLOGY: &str = "⚠️ Something went wrong. Please try again later.";
const RECHECK_APOLOGY: &str = "⚠️ Subscription check failed.";

/// Handle of a pending user interaction that must be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionId(pub String);

/// A message previously delivered to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Plain,
    Html,
}

/// Buttons shown alongside a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateKeyboard {
    /// Link that opens the channel, when it has a public handle.
    pub join_url: Option<String>,
    /// Callback token that triggers a re-check.
    pub recheck_data: String,
}

/// Transport-neutral outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateMessage {
    pub text: String,
    pub format: MessageFormat,
    pub keyboard: Option<GateKeyboard>,
}

impl GateMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Plain,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Html,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: GateKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// A user opened the bot.
#[derive(Debug, Clone)]
pub struct EntryTrigger {
    pub user: UserId,
    pub user_name: String,
    pub chat: ChatRef,
}

/// A user pressed the re-check button.
#[derive(Debug, Clone)]
pub struct RecheckTrigger {
    pub user: UserId,
    pub user_name: String,
    pub chat: ChatRef,
    /// The denial message carrying the button, updated in place.
    pub message: Option<MessageRef>,
    pub interaction: InteractionId,
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Granted,
    Denied,
}

/// Outbound side of the messaging transport.
#[async_trait]
pub trait GateDelivery: Send + Sync {
    async fn send_photo(
        &self,
        chat: ChatRef,
        photo: &Path,
        caption: &GateMessage,
    ) -> std::result::Result<MessageRef, DeliveryError>;

    async fn send_message(
        &self,
        chat: ChatRef,
        message: &GateMessage,
    ) -> std::result::Result<MessageRef, DeliveryError>;

    async fn edit_message(
        &self,
        chat: ChatRef,
        target: MessageRef,
        message: &GateMessage,
    ) -> std::result::Result<(), DeliveryError>;

    /// Dismiss the client-side loading state of an interaction.
    async fn acknowledge(&self, interaction: &InteractionId) -> std::result::Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy)]
enum Flow {
    Entry,
    Recheck,
}

/// Drives the entry and re-check flows.
///
/// Every verdict goes through the cache; the oracle is only reached on a
/// cache miss.
pub struct GateController {
    oracle: Arc<MembershipOracle>,
    cache: Arc<VerificationCache>,
    delivery: Arc<dyn GateDelivery>,
    channel: ChannelRef,
    banner: WelcomeBanner,
}

impl GateController {
    /// `channel` is the channel named in prompts and linked from the join
    /// button.
    pub fn new(
        oracle: Arc<MembershipOracle>,
        cache: Arc<VerificationCache>,
        delivery: Arc<dyn GateDelivery>,
        channel: ChannelRef,
    ) -> Self {
        Self {
            oracle,
            cache,
            delivery,
            channel,
            banner: WelcomeBanner::disabled(),
        }
    }

    #[must_use]
    pub fn with_banner(mut self, banner: WelcomeBanner) -> Self {
        self.banner = banner;
        self
    }

    pub fn cache(&self) -> &Arc<VerificationCache> {
        &self.cache
    }

    /// Evaluate `user` against the cache, querying the oracle on a miss.
    pub async fn evaluate(&self, user: UserId) -> GateOutcome {
        let verdict = self
            .cache
            .get_or_compute(user, || self.oracle.lookup(user))
            .await;
        if verdict.is_member() {
            GateOutcome::Granted
        } else {
            GateOutcome::Denied
        }
    }

    /// Greet the user, then grant access or prompt them to subscribe.
    pub async fn handle_entry(&self, trigger: &EntryTrigger) -> Result<GateOutcome> {
        info!(user_id = %trigger.user, "gate entry");

        let ((), outcome) = tokio::join!(self.send_welcome(trigger), self.evaluate(trigger.user));
        let message = self.outcome_message(outcome, &trigger.user_name, Flow::Entry);

        if let Err(e) = self.delivery.send_message(trigger.chat, &message).await {
            error!(
                user_id = %trigger.user,
                stage = "entry",
                ?outcome,
                error = %e,
                "failed to deliver gate outcome"
            );
            self.delivery
                .send_message(trigger.chat, &GateMessage::plain(ENTRY_APOLOGY))
                .await
                .map_err(|e| GateError::presentation(trigger.user, "entry", e))?;
        }

        info!(user_id = %trigger.user, ?outcome, "gate entry evaluated");
        Ok(outcome)
    }

    /// Drop the cached verdict, re-evaluate and update the prompt in place.
    pub async fn handle_recheck(&self, trigger: &RecheckTrigger) -> Result<GateOutcome> {
        if let Err(e) = self.delivery.acknowledge(&trigger.interaction).await {
            warn!(user_id = %trigger.user, error = %e, "failed to acknowledge re-check");
        }

        self.cache.invalidate(trigger.user);
        let outcome = self.evaluate(trigger.user).await;
        let message = self.outcome_message(outcome, &trigger.user_name, Flow::Recheck);

        let delivered = match trigger.message {
            Some(target) => {
                match self
                    .delivery
                    .edit_message(trigger.chat, target, &message)
                    .await
                {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!(
                            user_id = %trigger.user,
                            error = %e,
                            "failed to edit prompt, sending a new message"
                        );
                        self.delivery
                            .send_message(trigger.chat, &message)
                            .await
                            .map(|_| ())
                    },
                }
            },
            None => self
                .delivery
                .send_message(trigger.chat, &message)
                .await
                .map(|_| ()),
        };

        if let Err(e) = delivered {
            error!(
                user_id = %trigger.user,
                stage = "recheck",
                ?outcome,
                error = %e,
                "failed to deliver gate outcome"
            );
            self.delivery
                .send_message(trigger.chat, &GateMessage::plain(RECHECK_APOLOGY))
                .await
                .map_err(|e| GateError::presentation(trigger.user, "recheck", e))?;
        }

        info!(user_id = %trigger.user, ?outcome, "gate re-check evaluated");
        Ok(outcome)
    }

    async fn send_welcome(&self, trigger: &EntryTrigger) {
        let caption = GateMessage::html(WELCOME_CAPTION);
        let sent = match self.banner.locate() {
            Some(path) => self.delivery.send_photo(trigger.chat, &path, &caption).await,
            None => self.delivery.send_message(trigger.chat, &caption).await,
        };
        let Err(e) = sent else {
            return;
        };

        warn!(
            user_id = %trigger.user,
            error = %e,
            "welcome delivery failed, sending plain fallback"
        );
        if let Err(e) = self
            .delivery
            .send_message(trigger.chat, &GateMessage::plain(WELCOME_FALLBACK))
            .await
        {
            error!(user_id = %trigger.user, stage = "welcome", error = %e, "welcome fallback failed");
        }
    }

    fn outcome_message(&self, outcome: GateOutcome, user_name: &str, flow: Flow) -> GateMessage {
        match (outcome, flow) {
            (GateOutcome::Granted, _) => {
                GateMessage::plain(format!("✅ Hi, {user_name}! Access granted."))
            },
            (GateOutcome::Denied, Flow::Entry) => {
                GateMessage::plain(format!("❌ Subscribe to the channel {}.", self.channel))
                    .with_keyboard(self.keyboard())
            },
            (GateOutcome::Denied, Flow::Recheck) => GateMessage::plain(format!(
                "❌ You are not subscribed to the channel {}!",
                self.channel
            ))
            .with_keyboard(self.keyboard()),
        }
    }

    fn keyboard(&self) -> GateKeyboard {
        GateKeyboard {
            join_url: self.channel.join_url(),
            recheck_data: RECHECK_CALLBACK.to_string(),
        }
    }
}
