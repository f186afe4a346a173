//! Client SDK for bumble message routers.
//!
//! A router client connects over TCP, proves its identity by signing the
//! router's challenge with its Ed25519 key, and then exchanges JSON
//! [`Envelope`](message::Envelope)s with the router. Session lifecycle is
//! reported as a closed set of [`Event`](event::Event)s over a channel.
//!
//! The SDK does not reconnect on its own. [`Transport::connect_and_serve`]
//! serves exactly one session and returns when it ends; the caller decides
//! what happens next based on the returned [`SessionError`].

pub mod client;
pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod protocol;
pub mod transport;

pub use client::{ClientHandle, Command};
pub use error::{SendError, SessionError};
pub use event::Event;
pub use identity::{ClientIdentity, KeyError, load_private_key};
pub use message::{Code, Envelope, Header};
pub use transport::{SessionChannels, TcpTransport, Transport};
