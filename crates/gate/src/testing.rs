//! Scripted collaborators shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::LookupError,
    source::{ChannelRef, MembershipSource},
    status::{MembershipStatus, UserId},
};

/// Scripted reply for one lookup attempt.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(&'static str),
    Fail(&'static str),
    Hang,
}

/// Source that replays scripted replies and counts calls.
///
/// Once the script runs out the last reply is repeated.
pub struct ScriptedSource {
    channel: ChannelRef,
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(channel: ChannelRef, script: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let script: VecDeque<Reply> = script.into_iter().collect();
        let last = script.back().cloned().unwrap_or(Reply::Fail("empty script"));
        Arc::new(Self {
            channel,
            script: Mutex::new(script),
            last: Mutex::new(last),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Replace the remaining script, e.g. after the user joins the channel.
    pub fn set_script(&self, script: impl IntoIterator<Item = Reply>) {
        let script: VecDeque<Reply> = script.into_iter().collect();
        if let Some(last) = script.back() {
            *self.last.lock().unwrap() = last.clone();
        }
        *self.script.lock().unwrap() = script;
    }
}

#[async_trait]
impl MembershipSource for ScriptedSource {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn status(&self, _user: UserId) -> Result<MembershipStatus, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = {
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.last.lock().unwrap().clone())
        };
        match reply {
            Reply::Status(raw) => Ok(MembershipStatus::from_raw(raw)),
            Reply::Fail(message) => Err(LookupError::api(&self.channel, message)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LookupError::api(&self.channel, "unreachable"))
            },
        }
    }
}
