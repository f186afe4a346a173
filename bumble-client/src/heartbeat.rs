//! Heartbeat originator: a message to ourselves every tick while authenticated.

use std::sync::Arc;
use std::time::Duration;

use bumble_sdk::{Envelope, Header};
use tokio::time::{Instant, MissedTickBehavior};

use crate::state::{CurrentSession, SessionState};

pub const HEARTBEAT_INFO: &str = "This is a message to myself.";

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not authenticated; nothing sent.
    Idle,
    /// Authenticated but no session attached (between attempts).
    NoSession,
    /// A heartbeat was handed to the session.
    Sent,
    /// The session was closed or not keeping up; nothing queued.
    Dropped,
}

pub struct Heartbeat {
    interval: Duration,
    state: Arc<SessionState>,
    current: Arc<CurrentSession>,
}

impl Heartbeat {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// `interval` must be non-zero.
    pub fn new(interval: Duration, state: Arc<SessionState>, current: Arc<CurrentSession>) -> Self {
        Self {
            interval,
            state,
            current,
        }
    }

    /// Tick forever. The first tick fires one full interval after start.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// Check authentication and, if set, submit one heartbeat.
    ///
    /// Never waits on the session: a heartbeat that cannot be queued right
    /// away is logged and dropped.
    pub fn tick(&self) -> Tick {
        if !self.state.is_authenticated() {
            return Tick::Idle;
        }
        let Some(handle) = self.current.get() else {
            tracing::debug!("Authenticated but no live session, skipping heartbeat");
            return Tick::NoSession;
        };

        let envelope = Envelope::wrap(
            Header::generic()
                .with_to(handle.myself())
                .with_info(HEARTBEAT_INFO),
        );
        match handle.try_originate(envelope) {
            Ok(()) => Tick::Sent,
            Err(e) => {
                tracing::warn!(error = %e, "Heartbeat dropped");
                Tick::Dropped
            }
        }
    }
}
