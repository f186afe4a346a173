//! Event dispatch: session events → authentication state + handler callbacks.

use std::sync::Arc;

use bumble_sdk::{Envelope, Event, Header};
use tokio::sync::mpsc;

use crate::state::SessionState;

/// Callbacks for session lifecycle events.
///
/// Called on the dispatcher task, one event at a time, in the order the
/// transport produced them. Implementations must return quickly.
pub trait EventHandler: Send + Sync + 'static {
    fn on_connect(&self) {}

    fn on_disconnect(&self, _reason: &str) {}

    /// Called after the new value has been stored in [`SessionState`].
    fn on_authentication(&self, _success: bool) {}

    fn on_message(&self, _envelope: &Envelope, _header: &Header) {}
}

impl<H: EventHandler> EventHandler for Arc<H> {
    fn on_connect(&self) {
        (**self).on_connect()
    }

    fn on_disconnect(&self, reason: &str) {
        (**self).on_disconnect(reason)
    }

    fn on_authentication(&self, success: bool) {
        (**self).on_authentication(success)
    }

    fn on_message(&self, envelope: &Envelope, header: &Header) {
        (**self).on_message(envelope, header)
    }
}

/// What a `Disconnected` event does to the authentication flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Clear the flag; the next session starts unauthenticated.
    #[default]
    Reset,
    /// Leave the flag alone until the next authentication event.
    Retain,
}

/// Default handler: one line per event on stdout for the operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

impl EventHandler for LogHandler {
    fn on_connect(&self) {
        tracing::info!("Connected to router");
        println!("We connected.");
    }

    fn on_disconnect(&self, reason: &str) {
        tracing::info!(%reason, "Disconnected from router");
        println!("We disconnected or got disconnected.");
    }

    fn on_authentication(&self, success: bool) {
        tracing::info!(success, "Authentication result");
        println!("Did we authenticate?  {success}");
    }

    fn on_message(&self, envelope: &Envelope, header: &Header) {
        tracing::debug!(from = ?envelope.from, id = %header.id, "Inbound message");
        println!("We got a message: {header}");
    }
}

pub struct Dispatcher<H> {
    handler: H,
    state: Arc<SessionState>,
    policy: DisconnectPolicy,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(handler: H, state: Arc<SessionState>, policy: DisconnectPolicy) -> Self {
        Self {
            handler,
            state,
            policy,
        }
    }

    /// Apply one event.
    pub fn dispatch(&self, event: Event) {
        match event {
            Event::Connected => self.handler.on_connect(),
            Event::Disconnected { reason } => {
                if self.policy == DisconnectPolicy::Reset && self.state.set_authenticated(false) {
                    tracing::debug!("Cleared authentication on disconnect");
                }
                self.handler.on_disconnect(&reason);
            }
            Event::Authenticated { success } => {
                let previous = self.state.set_authenticated(success);
                if previous != success {
                    tracing::debug!(previous, success, "Authentication state changed");
                }
                self.handler.on_authentication(success);
            }
            Event::Message { envelope } => {
                self.handler.on_message(&envelope, &envelope.message);
            }
        }
    }

    /// Drain the event channel until every sender is gone.
    pub async fn run(self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        tracing::debug!("Event channel closed, dispatcher exiting");
    }
}
