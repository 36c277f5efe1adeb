use {
    async_trait::async_trait,
    teloxide::{
        prelude::*,
        types::{ChatId, ChatMemberStatus, Recipient},
    },
};

use subgate_gate::{ChannelRef, LookupError, MembershipSource, MembershipStatus, UserId};

/// Membership lookups through `getChatMember` against one channel reference.
pub struct TelegramMemberSource {
    bot: Bot,
    channel: ChannelRef,
}

impl TelegramMemberSource {
    pub fn new(bot: Bot, channel: ChannelRef) -> Self {
        Self { bot, channel }
    }
}

fn recipient(channel: &ChannelRef) -> Recipient {
    match channel {
        ChannelRef::Handle(name) => Recipient::ChannelUsername(format!("@{name}")),
        ChannelRef::Id(id) => Recipient::Id(ChatId(*id)),
    }
}

/// Map teloxide's member status onto the Bot API status string.
#[allow(unreachable_patterns)]
fn raw_status(status: ChatMemberStatus) -> &'static str {
    match status {
        ChatMemberStatus::Owner => "creator",
        ChatMemberStatus::Administrator => "administrator",
        ChatMemberStatus::Member => "member",
        ChatMemberStatus::Restricted => "restricted",
        ChatMemberStatus::Left => "left",
        ChatMemberStatus::Banned => "kicked",
        _ => "unknown",
    }
}

#[async_trait]
impl MembershipSource for TelegramMemberSource {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn status(&self, user: UserId) -> Result<MembershipStatus, LookupError> {
        let member = self
            .bot
            .get_chat_member(recipient(&self.channel), teloxide::types::UserId(user.0))
            .await
            .map_err(|e| match e {
                teloxide::RequestError::Api(api) => LookupError::api(&self.channel, api.to_string()),
                other => LookupError::transport(&self.channel, other),
            })?;
        Ok(MembershipStatus::from_raw(raw_status(member.kind.status())))
    }
}
