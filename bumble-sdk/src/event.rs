//! Events emitted by a transport for the consumer to dispatch.

use crate::message::{Envelope, Header};

/// Session lifecycle events, delivered in order over a single channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The transport reached the router.
    Connected,

    /// The connection was closed. Always follows a `Connected`.
    Disconnected {
        reason: String,
    },

    /// The router's verdict on our challenge response.
    Authenticated {
        success: bool,
    },

    /// An envelope addressed to us arrived.
    Message {
        envelope: Envelope,
    },
}

impl Event {
    /// The decoded header of a `Message` event.
    pub fn header(&self) -> Option<&Header> {
        match self {
            Self::Message { envelope } => Some(&envelope.message),
            _ => None,
        }
    }
}
