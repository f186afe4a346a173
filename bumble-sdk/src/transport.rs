//! Transport boundary and the TCP router client.
//!
//! [`Transport::connect_and_serve`] serves exactly one session: it connects,
//! authenticates, pumps events and commands, and returns when the session
//! ends. It never reconnects by itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::client::Command;
use crate::error::SessionError;
use crate::event::Event;
use crate::identity::ClientIdentity;
use crate::protocol::{self, Frame};

/// Channels handed to the transport for one session.
#[derive(Debug)]
pub struct SessionChannels {
    /// Where lifecycle events go. Shared across sessions.
    pub events: mpsc::Sender<Event>,
    /// Outbound commands from this session's [`ClientHandle`](crate::client::ClientHandle).
    pub commands: mpsc::Receiver<Command>,
}

/// A way to reach the router.
pub trait Transport: Send + Sync {
    /// Connect and serve one session, blocking until it ends.
    ///
    /// Implementations emit `Connected` once the router is reached and a
    /// matching `Disconnected` before returning. Returns `Ok(())` when the
    /// session was closed on request, [`SessionError::Disconnected`] when the
    /// connection went away, and [`SessionError::Fatal`] for anything a
    /// reconnect would not fix.
    fn connect_and_serve(
        &self,
        identity: &ClientIdentity,
        channels: SessionChannels,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn connect_and_serve(
        &self,
        identity: &ClientIdentity,
        channels: SessionChannels,
    ) -> impl Future<Output = Result<(), SessionError>> + Send {
        (**self).connect_and_serve(identity, channels)
    }
}

/// Plain TCP connection to a router, speaking the JSON line protocol.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    router_addr: String,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(router_addr: impl Into<String>) -> Self {
        Self {
            router_addr: router_addr.into(),
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn router_addr(&self) -> &str {
        &self.router_addr
    }
}

impl Transport for TcpTransport {
    async fn connect_and_serve(
        &self,
        identity: &ClientIdentity,
        channels: SessionChannels,
    ) -> Result<(), SessionError> {
        let SessionChannels { events, commands } = channels;

        tracing::debug!(router = %self.router_addr, "Connecting");
        let tcp = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(&self.router_addr),
        )
        .await
        {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(e)) => {
                return Err(SessionError::Disconnected(format!(
                    "connect to {} failed: {e}",
                    self.router_addr
                )));
            }
            Err(_) => {
                return Err(SessionError::Disconnected(format!(
                    "connect to {} timed out after {:?}",
                    self.router_addr, self.connect_timeout
                )));
            }
        };
        tracing::info!(router = %self.router_addr, "TCP connected");
        let _ = events.send(Event::Connected).await;

        let (reader, writer) = tcp.into_split();
        let result = serve(BufReader::new(reader), writer, identity, &events, commands).await;

        let reason = match &result {
            Ok(()) => "session closed".to_string(),
            Err(e) if e.is_disconnect() => e.to_string(),
            Err(e) => {
                tracing::error!(router = %self.router_addr, error = %e, "Session failed");
                e.to_string()
            }
        };
        let _ = events.send(Event::Disconnected { reason }).await;
        result
    }
}

/// Run the router protocol over an already-connected stream.
///
/// Sends `hello`, answers challenges, forwards router frames as events and
/// session commands as frames. Does not emit `Connected`/`Disconnected`.
pub async fn serve<R, W>(
    reader: R,
    mut writer: W,
    identity: &ClientIdentity,
    events: &mpsc::Sender<Event>,
    mut commands: mpsc::Receiver<Command>,
) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_frame(
        &mut writer,
        &Frame::Hello {
            name: identity.name().to_string(),
        },
    )
    .await?;

    let mut lines = reader.lines();
    let mut commands_open = true;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line
                    .map_err(|e| SessionError::Disconnected(format!("read failed: {e}")))?;
                let Some(line) = line else {
                    return Err(SessionError::Disconnected("router closed the connection".into()));
                };
                if line.trim().is_empty() {
                    continue;
                }
                let frame = Frame::decode(&line)
                    .map_err(|e| SessionError::Fatal(format!("undecodable frame from router: {e}")))?;
                handle_frame(frame, identity, &mut writer, events).await?;
            }
            cmd = commands.recv(), if commands_open => {
                match cmd {
                    Some(Command::Originate(envelope)) => {
                        tracing::debug!(id = %envelope.message.id, to = ?envelope.to, "Originating");
                        write_frame(&mut writer, &Frame::Envelope(envelope)).await?;
                    }
                    Some(Command::Quit(reason)) => {
                        write_frame(&mut writer, &Frame::Goodbye { reason }).await?;
                        let _ = writer.shutdown().await;
                        return Ok(());
                    }
                    None => commands_open = false,
                }
            }
        }
    }
}

async fn handle_frame<W: AsyncWrite + Unpin>(
    frame: Frame,
    identity: &ClientIdentity,
    writer: &mut W,
    events: &mpsc::Sender<Event>,
) -> Result<(), SessionError> {
    match frame {
        Frame::Challenge { nonce } => {
            let proof = protocol::answer_challenge(identity, &nonce)
                .map_err(|e| SessionError::Fatal(format!("malformed challenge nonce: {e}")))?;
            tracing::debug!("Answering router challenge");
            write_frame(writer, &proof).await?;
        }
        Frame::AuthResult { success, reason } => {
            if success {
                tracing::info!(name = identity.name(), "Authenticated");
            } else {
                tracing::warn!(reason = reason.as_deref().unwrap_or("-"), "Authentication rejected");
            }
            let _ = events.send(Event::Authenticated { success }).await;
        }
        Frame::Envelope(envelope) => {
            let _ = events.send(Event::Message { envelope }).await;
        }
        Frame::Goodbye { reason } => {
            let reason = reason.unwrap_or_else(|| "router said goodbye".to_string());
            return Err(SessionError::Disconnected(reason));
        }
        Frame::Hello { .. } | Frame::Proof { .. } => {
            tracing::warn!("Ignoring client-only frame from router");
        }
    }
    Ok(())
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), SessionError> {
    let line = frame
        .encode()
        .map_err(|e| SessionError::Fatal(format!("cannot encode frame: {e}")))?;
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| SessionError::Disconnected(format!("write failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session_channel;
    use crate::message::{Envelope, Header};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use ed25519_dalek::SigningKey;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn identity() -> ClientIdentity {
        ClientIdentity::new("alice", SigningKey::from_bytes(&[9u8; 32]))
    }

    /// Client on one end of a duplex pipe, test acting as the router on the other.
    struct Harness {
        router_lines: tokio::io::Lines<BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>>,
        router_writer: tokio::io::WriteHalf<tokio::io::DuplexStream>,
        events: mpsc::Receiver<Event>,
        handle: crate::client::ClientHandle,
        session: tokio::task::JoinHandle<Result<(), SessionError>>,
    }

    fn start() -> Harness {
        let (client_side, router_side) = tokio::io::duplex(8192);
        let (event_tx, event_rx) = mpsc::channel(16);
        let (handle, cmd_rx) = session_channel("alice");
        let session = tokio::spawn(async move {
            let (r, w) = tokio::io::split(client_side);
            serve(BufReader::new(r), w, &identity(), &event_tx, cmd_rx).await
        });
        let (rr, rw) = tokio::io::split(router_side);
        Harness {
            router_lines: BufReader::new(rr).lines(),
            router_writer: rw,
            events: event_rx,
            handle,
            session,
        }
    }

    async fn send(h: &mut Harness, frame: Frame) {
        h.router_writer
            .write_all(frame.encode().unwrap().as_bytes())
            .await
            .unwrap();
    }

    async fn recv(h: &mut Harness) -> Frame {
        let line = h.router_lines.next_line().await.unwrap().unwrap();
        Frame::decode(&line).unwrap()
    }

    #[tokio::test]
    async fn test_hello_then_challenge_then_auth() {
        let mut h = start();
        assert_eq!(
            recv(&mut h).await,
            Frame::Hello {
                name: "alice".into()
            }
        );

        send(
            &mut h,
            Frame::Challenge {
                nonce: URL_SAFE_NO_PAD.encode(b"abc"),
            },
        )
        .await;
        assert!(matches!(recv(&mut h).await, Frame::Proof { .. }));

        send(
            &mut h,
            Frame::AuthResult {
                success: true,
                reason: None,
            },
        )
        .await;
        assert_eq!(
            h.events.recv().await,
            Some(Event::Authenticated { success: true })
        );
    }

    #[tokio::test]
    async fn test_inbound_envelope_becomes_event() {
        let mut h = start();
        recv(&mut h).await;
        let env = Envelope::wrap(Header::generic().with_to("alice").with_info("yo"));
        send(&mut h, Frame::Envelope(env.clone())).await;
        assert_eq!(h.events.recv().await, Some(Event::Message { envelope: env }));
    }

    #[tokio::test]
    async fn test_originate_writes_envelope_frame() {
        let mut h = start();
        recv(&mut h).await;
        h.handle.send_info("alice", "to myself").await.unwrap();
        let Frame::Envelope(env) = recv(&mut h).await else {
            panic!("expected envelope frame");
        };
        assert_eq!(env.from.as_deref(), Some("alice"));
        assert_eq!(env.message.info.as_deref(), Some("to myself"));
    }

    #[tokio::test]
    async fn test_router_close_is_disconnect() {
        let mut h = start();
        recv(&mut h).await;
        h.router_writer.shutdown().await.unwrap();
        drop(h.router_writer);
        let result = h.session.await.unwrap();
        assert!(matches!(result, Err(SessionError::Disconnected(_))));
    }

    #[tokio::test]
    async fn test_router_goodbye_is_disconnect() {
        let mut h = start();
        recv(&mut h).await;
        send(
            &mut h,
            Frame::Goodbye {
                reason: Some("session timeout".into()),
            },
        )
        .await;
        let result = h.session.await.unwrap();
        assert_eq!(
            result,
            Err(SessionError::Disconnected("session timeout".into()))
        );
    }

    #[tokio::test]
    async fn test_garbage_is_fatal() {
        let mut h = start();
        recv(&mut h).await;
        h.router_writer.write_all(b"NOTICE * :hello\n").await.unwrap();
        let result = h.session.await.unwrap();
        assert!(matches!(result, Err(SessionError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_bad_nonce_is_fatal() {
        let mut h = start();
        recv(&mut h).await;
        send(
            &mut h,
            Frame::Challenge {
                nonce: "%%%".into(),
            },
        )
        .await;
        let result = h.session.await.unwrap();
        assert!(matches!(result, Err(SessionError::Fatal(_))));
    }

    #[tokio::test]
    async fn test_quit_says_goodbye_and_returns_ok() {
        let mut h = start();
        recv(&mut h).await;
        h.handle.quit(Some("done")).await.unwrap();
        assert_eq!(
            recv(&mut h).await,
            Frame::Goodbye {
                reason: Some("done".into())
            }
        );
        assert_eq!(h.session.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_handle_keeps_session_reading() {
        let Harness {
            mut router_lines,
            mut router_writer,
            mut events,
            handle,
            session,
        } = start();
        router_lines.next_line().await.unwrap();
        drop(handle);

        let frame = Frame::AuthResult {
            success: false,
            reason: Some("unknown key".into()),
        };
        router_writer
            .write_all(frame.encode().unwrap().as_bytes())
            .await
            .unwrap();
        assert_eq!(
            events.recv().await,
            Some(Event::Authenticated { success: false })
        );
        assert!(!session.is_finished());
    }
}
