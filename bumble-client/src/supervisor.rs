//! Connection supervisor: one session at a time, reconnecting forever.
//!
//! Each attempt gets a fresh [`ClientHandle`](bumble_sdk::ClientHandle),
//! published through [`CurrentSession`] for the duration of the attempt.
//! A [`SessionError::Disconnected`] outcome (and a clean `Ok`) is retried
//! after the policy delay; a [`SessionError::Fatal`] outcome ends the loop.

use std::sync::Arc;
use std::time::Duration;

use bumble_sdk::client::session_channel;
use bumble_sdk::{ClientIdentity, Event, SessionChannels, SessionError, Transport};
use tokio::sync::mpsc;

use crate::state::CurrentSession;

/// Delay between the end of one attempt and the start of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay after every attempt, forever.
    Fixed(Duration),
}

impl ReconnectPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

    /// Delay after attempt number `attempt` (1-based) has ended.
    pub fn delay_for(&self, _attempt: u64) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(Self::DEFAULT_DELAY)
    }
}

/// The error that stopped the supervisor. The process should exit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{cause}")]
pub struct FatalError {
    /// Attempt number that failed.
    pub attempt: u64,
    pub cause: String,
}

pub struct Supervisor<T> {
    transport: T,
    identity: Arc<ClientIdentity>,
    current: Arc<CurrentSession>,
    events: mpsc::Sender<Event>,
    policy: ReconnectPolicy,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(
        transport: T,
        identity: Arc<ClientIdentity>,
        current: Arc<CurrentSession>,
        events: mpsc::Sender<Event>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            identity,
            current,
            events,
            policy,
        }
    }

    /// Connect, serve, wait, repeat. Returns only on a fatal error.
    pub async fn run_forever(&self) -> FatalError {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            tracing::info!(attempt, name = self.identity.name(), "Connecting to router");

            match self.attempt().await {
                Ok(()) => tracing::info!(attempt, "Session ended without error"),
                Err(SessionError::Disconnected(reason)) => {
                    tracing::warn!(attempt, %reason, "Got disconnected");
                }
                Err(SessionError::Fatal(cause)) => {
                    tracing::error!(attempt, %cause, "Fatal session error, giving up");
                    return FatalError { attempt, cause };
                }
            }

            let delay = self.policy.delay_for(attempt);
            tracing::info!(attempt, delay_secs = delay.as_secs_f64(), "Reconnecting after delay");
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self) -> Result<(), SessionError> {
        let (handle, commands) = session_channel(self.identity.name());
        self.current.attach(handle);
        let result = self
            .transport
            .connect_and_serve(
                &self.identity,
                SessionChannels {
                    events: self.events.clone(),
                    commands,
                },
            )
            .await;
        self.current.detach();
        result
    }
}
