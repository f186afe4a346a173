//! Sending side of a live router session.
//!
//! A [`ClientHandle`] is created per connect attempt together with the
//! command receiver the transport drains. Once the transport returns, the
//! receiver is dropped and every send through the old handle fails with
//! [`SendError::SessionClosed`].

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::{Envelope, Header};

/// Commands the consumer can send to a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Originate(Envelope),
    Quit(Option<String>),
}

/// A handle to one live session.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<Command>,
    myself: Arc<str>,
}

/// Commands a session can have queued before sends start waiting.
pub const COMMAND_QUEUE: usize = 256;

/// Create the handle/receiver pair for one session attempt.
pub fn session_channel(myself: &str) -> (ClientHandle, mpsc::Receiver<Command>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let handle = ClientHandle {
        cmd_tx,
        myself: Arc::from(myself),
    };
    (handle, cmd_rx)
}

impl ClientHandle {
    /// Our own identity name, for addressing messages to ourselves.
    pub fn myself(&self) -> &str {
        &self.myself
    }

    /// Whether the session behind this handle has ended.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Hand an envelope to the session for delivery. The sender is stamped
    /// with our own name if unset.
    pub async fn originate(&self, mut envelope: Envelope) -> Result<(), SendError> {
        envelope.stamp_sender(&self.myself);
        self.cmd_tx
            .send(Command::Originate(envelope))
            .await
            .map_err(|_| SendError::SessionClosed)
    }

    /// Like [`originate`](Self::originate), but fails with
    /// [`SendError::Full`] instead of waiting when the session is not
    /// keeping up.
    pub fn try_originate(&self, mut envelope: Envelope) -> Result<(), SendError> {
        envelope.stamp_sender(&self.myself);
        self.cmd_tx
            .try_send(Command::Originate(envelope))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SendError::Full,
                mpsc::error::TrySendError::Closed(_) => SendError::SessionClosed,
            })
    }

    /// Send a generic informational message to `to`.
    pub async fn send_info(&self, to: &str, info: &str) -> Result<(), SendError> {
        self.originate(Envelope::wrap(Header::generic().with_to(to).with_info(info)))
            .await
    }

    /// Ask the session to say goodbye and end cleanly.
    pub async fn quit(&self, reason: Option<&str>) -> Result<(), SendError> {
        self.cmd_tx
            .send(Command::Quit(reason.map(|s| s.to_string())))
            .await
            .map_err(|_| SendError::SessionClosed)
    }
}
