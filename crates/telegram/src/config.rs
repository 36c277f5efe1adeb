use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    subgate_gate::{ChannelRef, WelcomeBanner},
};

use crate::error::{Error, Result};

/// Channel gated when no handle is configured.
pub const DEFAULT_CHANNEL_HANDLE: &str = "@alekseevdesignwb";

/// Numeric id of [`DEFAULT_CHANNEL_HANDLE`].
pub const DEFAULT_CHANNEL_ID: i64 = -1002408689600;

/// Configuration for the gate bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramGateConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Public handle of the gated channel, with or without the leading `@`.
    /// Used for the join link and as the primary membership lookup. When
    /// empty, membership is looked up by `channel_id` only.
    pub channel_handle: String,

    /// Numeric chat id of the gated channel, queried when the handle lookup
    /// fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<i64>,

    /// Upper bound for a single membership lookup (seconds).
    pub lookup_timeout_secs: u64,

    /// Directory searched for the welcome banner.
    pub banner_dir: PathBuf,

    /// Banner file names, tried in order.
    pub banner_files: Vec<String>,

    /// Long-polling timeout for `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl std::fmt::Debug for TelegramGateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramGateConfig")
            .field("token", &"[REDACTED]")
            .field("channel_handle", &self.channel_handle)
            .field("channel_id", &self.channel_id)
            .field("lookup_timeout_secs", &self.lookup_timeout_secs)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramGateConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            channel_handle: DEFAULT_CHANNEL_HANDLE.into(),
            channel_id: Some(DEFAULT_CHANNEL_ID),
            lookup_timeout_secs: 10,
            banner_dir: PathBuf::from("."),
            banner_files: WelcomeBanner::DEFAULT_FILES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramGateConfig {
    /// Reject configurations the bot cannot start with.
    ///
    /// Only the token is required. A gate without any channel still runs
    /// and denies everyone.
    pub fn validate(&self) -> Result<()> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(Error::config("bot token is not set"));
        }
        Ok(())
    }

    fn handle(&self) -> Option<ChannelRef> {
        let handle = self.channel_handle.trim().trim_start_matches('@');
        (!handle.is_empty()).then(|| ChannelRef::handle(handle))
    }

    /// Channel named in prompts and linked from the join button.
    ///
    /// Falls back to the numeric id, which has no public link.
    pub fn channel(&self) -> ChannelRef {
        self.handle()
            .or(self.channel_id.map(ChannelRef::Id))
            .unwrap_or_else(|| ChannelRef::handle(""))
    }

    /// Channel references queried for membership, in order.
    pub fn membership_channels(&self) -> Vec<ChannelRef> {
        self.handle()
            .into_iter()
            .chain(self.channel_id.map(ChannelRef::Id))
            .collect()
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn banner(&self) -> WelcomeBanner {
        WelcomeBanner::new(&self.banner_dir, self.banner_files.clone())
    }
}
