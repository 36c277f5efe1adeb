use std::{future::Future, sync::Arc};

use {dashmap::DashMap, tokio::sync::OnceCell, tracing::debug};

use crate::status::{MembershipVerdict, UserId};

/// Per-user memo of membership verdicts.
///
/// Each user owns at most one slot. A slot is inserted atomically on the
/// first request and resolved exactly once, so concurrent requests for the
/// same user share a single lookup. Slots still being resolved are never
/// reported as verdicts.
///
/// There is no expiry: a verdict lives until [`VerificationCache::invalidate`]
/// drops it.
#[derive(Default)]
pub struct VerificationCache {
    slots: DashMap<UserId, Arc<OnceCell<MembershipVerdict>>>,
}

impl VerificationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached verdict for `user`, running `compute` on a miss.
    pub async fn get_or_compute<F, Fut>(&self, user: UserId, compute: F) -> MembershipVerdict
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MembershipVerdict>,
    {
        let slot = Arc::clone(
            self.slots
                .entry(user)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let mut computed = false;
        let verdict = *slot
            .get_or_init(|| {
                computed = true;
                compute()
            })
            .await;

        debug!(
            user_id = %user,
            member = verdict.is_member(),
            cache_hit = !computed,
            "membership verdict"
        );
        verdict
    }

    /// Drop any verdict held for `user`.
    ///
    /// A lookup already in flight finishes into its detached slot and does
    /// not repopulate the cache.
    pub fn invalidate(&self, user: UserId) {
        if self.slots.remove(&user).is_some() {
            debug!(user_id = %user, "membership verdict invalidated");
        }
    }

    /// Resolved verdict for `user`, if any.
    #[must_use]
    pub fn peek(&self, user: UserId) -> Option<MembershipVerdict> {
        self.slots.get(&user).and_then(|slot| slot.get().copied())
    }

    /// Number of users with a resolved verdict.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().initialized())
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
