//! Wires supervisor, dispatcher and heartbeat into one runtime.

use std::sync::Arc;
use std::time::Duration;

use bumble_sdk::{ClientIdentity, Transport};
use tokio::sync::mpsc;

use crate::dispatcher::{DisconnectPolicy, Dispatcher, EventHandler};
use crate::heartbeat::Heartbeat;
use crate::state::{CurrentSession, SessionState};
use crate::supervisor::{FatalError, ReconnectPolicy, Supervisor};

/// Tunables for a [`Runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub reconnect: ReconnectPolicy,
    pub heartbeat_interval: Duration,
    pub disconnect_policy: DisconnectPolicy,
    /// Capacity of the event channel between transport and dispatcher.
    pub event_buffer: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Heartbeat::DEFAULT_INTERVAL,
            disconnect_policy: DisconnectPolicy::default(),
            event_buffer: 1024,
        }
    }
}

pub struct Runtime<T, H> {
    transport: T,
    identity: Arc<ClientIdentity>,
    handler: H,
    settings: RuntimeSettings,
    state: Arc<SessionState>,
    current: Arc<CurrentSession>,
}

impl<T: Transport, H: EventHandler> Runtime<T, H> {
    pub fn new(transport: T, identity: ClientIdentity, handler: H, settings: RuntimeSettings) -> Self {
        Self {
            transport,
            identity: Arc::new(identity),
            handler,
            settings,
            state: Arc::new(SessionState::new()),
            current: Arc::new(CurrentSession::new()),
        }
    }

    pub fn state(&self) -> Arc<SessionState> {
        self.state.clone()
    }

    /// Run until the supervisor hits a fatal error, then stop the other tasks
    /// and hand the error back.
    pub async fn run(self) -> FatalError {
        let (event_tx, event_rx) = mpsc::channel(self.settings.event_buffer);

        let dispatcher = Dispatcher::new(
            self.handler,
            self.state.clone(),
            self.settings.disconnect_policy,
        );
        let dispatch_task = tokio::spawn(dispatcher.run(event_rx));

        let heartbeat = Heartbeat::new(
            self.settings.heartbeat_interval,
            self.state.clone(),
            self.current.clone(),
        );
        let heartbeat_task = tokio::spawn(heartbeat.run());

        let supervisor = Supervisor::new(
            self.transport,
            self.identity,
            self.current,
            event_tx,
            self.settings.reconnect,
        );
        let fatal = supervisor.run_forever().await;

        heartbeat_task.abort();
        // Let the dispatcher report the final Disconnected before it goes.
        drop(supervisor);
        if let Err(e) = dispatch_task.await {
            tracing::warn!(error = %e, "Dispatcher task failed");
        }
        fatal
    }
}
