use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use crate::{
    error::LookupError,
    source::{ChannelRef, MembershipSource},
    status::{MembershipStatus, MembershipVerdict, UserId},
};

/// Resolves a user's membership verdict by trying each configured source in
/// order until one answers.
///
/// Lookup failures never escape: when every source fails the verdict is
/// [`MembershipVerdict::DENIED`].
pub struct MembershipOracle {
    sources: Vec<Arc<dyn MembershipSource>>,
    attempt_timeout: Duration,
}

impl MembershipOracle {
    pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(sources: Vec<Arc<dyn MembershipSource>>) -> Self {
        Self {
            sources,
            attempt_timeout: Self::DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Bound each individual attempt. An attempt that runs past the limit
    /// counts as failed and the next source is tried.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelRef> {
        self.sources.iter().map(|s| s.channel())
    }

    pub async fn lookup(&self, user: UserId) -> MembershipVerdict {
        for (attempt, source) in self.sources.iter().enumerate() {
            match self.attempt(source.as_ref(), user).await {
                Ok(status) => {
                    debug!(
                        user_id = %user,
                        channel = %source.channel(),
                        %status,
                        "membership resolved"
                    );
                    return status.verdict();
                },
                Err(e) => {
                    warn!(
                        user_id = %user,
                        channel = %source.channel(),
                        attempt = attempt + 1,
                        error = %e,
                        "membership lookup failed"
                    );
                },
            }
        }

        error!(
            user_id = %user,
            attempts = self.sources.len(),
            "all membership lookups failed, denying access"
        );
        MembershipVerdict::DENIED
    }

    async fn attempt(
        &self,
        source: &dyn MembershipSource,
        user: UserId,
    ) -> Result<MembershipStatus, LookupError> {
        match tokio::time::timeout(self.attempt_timeout, source.status(user)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout {
                channel: source.channel().to_string(),
                after: self.attempt_timeout,
            }),
        }
    }
}
