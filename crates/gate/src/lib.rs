//! Channel-subscription gate.
//!
//! Decides whether a user may pass based on their membership in a single
//! channel. The membership lookup is abstracted behind [`MembershipSource`],
//! verdicts are memoized per user in [`VerificationCache`], and
//! [`GateController`] drives the entry and re-check flows against a
//! [`GateDelivery`] implementation provided by the transport.

pub mod cache;
pub mod controller;
pub mod error;
pub mod oracle;
pub mod source;
pub mod status;
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod testing;
pub mod welcome;

pub use {
    cache::VerificationCache,
    controller::{
        EntryTrigger, GateController, GateDelivery, GateKeyboard, GateMessage, GateOutcome,
        InteractionId, MessageFormat, MessageRef, RecheckTrigger,
    },
    error::{DeliveryError, GateError, LookupError, Result},
    oracle::MembershipOracle,
    source::{ChannelRef, MembershipSource},
    status::{ChatRef, MembershipStatus, MembershipVerdict, UserId},
    welcome::WelcomeBanner,
};
