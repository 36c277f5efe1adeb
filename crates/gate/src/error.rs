use std::time::Duration;

use thiserror::Error;

use crate::status::UserId;

/// A single membership lookup attempt failed.
///
/// The oracle recovers from these by moving on to the next source, so they
/// never reach the controller.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("membership lookup in {channel} rejected: {message}")]
    Api { channel: String, message: String },

    #[error("membership lookup in {channel} timed out after {after:?}")]
    Timeout { channel: String, after: Duration },

    #[error("membership lookup in {channel} failed: {source}")]
    Transport {
        channel: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LookupError {
    #[must_use]
    pub fn api(channel: impl ToString, message: impl Into<String>) -> Self {
        Self::Api {
            channel: channel.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport(
        channel: impl ToString,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            channel: channel.to_string(),
            source: Box::new(source),
        }
    }
}

/// Delivering something to the user failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{operation} rejected: {message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DeliveryError {
    #[must_use]
    pub fn rejected(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Errors surfaced by the gate controller.
///
/// Only raised when even the plain-text fallback could not be delivered;
/// the gating decision itself has been made by then.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("could not reach user {user_id} during {stage}: {source}")]
    Presentation {
        user_id: UserId,
        stage: &'static str,
        #[source]
        source: DeliveryError,
    },
}

impl GateError {
    #[must_use]
    pub fn presentation(user_id: UserId, stage: &'static str, source: DeliveryError) -> Self {
        Self::Presentation {
            user_id,
            stage,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
