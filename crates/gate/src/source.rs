use async_trait::async_trait;

use crate::{
    error::LookupError,
    status::{MembershipStatus, UserId},
};

/// How a channel is addressed when asking the platform about a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    /// Public handle, stored without the leading `@`.
    Handle(String),
    /// Stable numeric chat id.
    Id(i64),
}

impl ChannelRef {
    /// Build a handle reference, accepting both `name` and `@name`.
    #[must_use]
    pub fn handle(name: &str) -> Self {
        Self::Handle(name.trim().trim_start_matches('@').to_string())
    }

    /// Public join link, available for handle references only.
    #[must_use]
    pub fn join_url(&self) -> Option<String> {
        match self {
            Self::Handle(name) if !name.is_empty() => Some(format!("https://t.me/{name}")),
            Self::Handle(_) | Self::Id(_) => None,
        }
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handle(name) => write!(f, "@{name}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// One way of asking the platform for a user's membership status.
///
/// The oracle holds an ordered list of these and tries them in turn.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// The channel this source queries.
    fn channel(&self) -> &ChannelRef;

    async fn status(&self, user: UserId) -> Result<MembershipStatus, LookupError>;
}
