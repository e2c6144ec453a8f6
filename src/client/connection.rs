//! Connection loop: transport, registration, read loop and reconnects.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use moltchat_proto::{Command, ConnectionState, Inbound, LineCodec};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};

use super::transport::{self, BoxedTransport};
use super::{AgentClient, Link};
use crate::error::ClientError;
use crate::events::Event;
use crate::telemetry::spans;

/// How long a closing session waits for queued lines (QUIT included) to be
/// flushed.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

type LineReader = FramedRead<ReadHalf<BoxedTransport>, LineCodec>;
type LineWriter = FramedWrite<WriteHalf<BoxedTransport>, LineCodec>;

/// How one session ended.
struct SessionOutcome {
    /// The session got as far as `Connected`.
    registered: bool,
}

impl AgentClient {
    /// Connect and keep the connection up until [`AgentClient::quit`].
    ///
    /// Each failed or closed session emits `disconnect`; if auto-reconnect
    /// is enabled the next attempt starts after the configured delay.
    /// Returns once the client is stopped or a session ends with
    /// auto-reconnect disabled.
    pub async fn connect(&self) {
        let server = &self.config().server;
        let span = spans::connection(&server.host, server.port, self.nick());
        self.run().instrument(span).await
    }

    async fn run(&self) {
        let stop = self.inner.stop.clone();
        let policy = self.config().reconnect.clone();
        let mut attempt: u32 = 0;

        loop {
            if stop.is_cancelled() {
                break;
            }

            let outcome = self.run_session().await;
            if outcome.registered {
                attempt = 0;
            }

            if stop.is_cancelled() || !self.auto_reconnect() {
                break;
            }

            let delay = policy.delay_for(attempt);
            attempt = attempt.saturating_add(1);
            info!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.cancelled() => {
                    info!("Reconnect cancelled");
                    break;
                }
            }
        }
        debug!("connection loop finished");
    }

    async fn run_session(&self) -> SessionOutcome {
        let stop = self.inner.stop.clone();
        self.transition(ConnectionState::Connecting);

        let connected = tokio::select! {
            _ = stop.cancelled() => {
                self.transition(ConnectionState::Disconnected);
                return SessionOutcome { registered: false };
            }
            result = transport::connect(&self.config().server) => result,
        };
        let stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Connection failed");
                self.transition(ConnectionState::Disconnected);
                self.dispatch(Event::Disconnect {
                    error: Some(Arc::new(e)),
                });
                return SessionOutcome { registered: false };
            }
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FramedRead::new(read_half, LineCodec::new());
        let writer = FramedWrite::new(write_half, LineCodec::new());

        let (outbound, queue) = mpsc::unbounded_channel();
        let cancel = stop.child_token();
        *self.inner.link.lock() = Some(Link {
            outbound,
            cancel: cancel.clone(),
        });
        let writer_task = tokio::spawn(write_loop(writer, queue, cancel.clone()).in_current_span());

        self.inner.channels.write().clear();
        let registered = self.register();
        if registered {
            self.dispatch(Event::Connect);
        }

        let read_result = self.read_loop(&mut reader, &cancel).await;

        // Dropping the sender lets the writer drain and close.
        self.inner.link.lock().take();
        let write_result = match timeout(WRITER_DRAIN_TIMEOUT, writer_task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "writer task failed");
                Ok(())
            }
            Err(_) => {
                debug!("writer did not drain in time");
                Ok(())
            }
        };

        let error = read_result.err().or(write_result.err());
        let dropped = reader.decoder().dropped();
        match &error {
            Some(e) => warn!(error = %e, code = e.error_code(), dropped_lines = dropped, "Disconnected"),
            None => info!(dropped_lines = dropped, "Disconnected"),
        }
        self.transition(ConnectionState::Disconnected);
        self.dispatch(Event::Disconnect {
            error: error.map(Arc::new),
        });

        SessionOutcome { registered }
    }

    /// Send NICK/USER and, with a soul, the identification lines.
    ///
    /// Authentication is fire-and-forget: the session counts as connected
    /// as soon as the lines are queued.
    fn register(&self) -> bool {
        if !self.transition(ConnectionState::Registering) {
            return false;
        }
        let nick = self.nick().to_string();
        info!(nick = %nick, "Registering");
        self.send_or_drop(Command::Nick(nick.clone()));
        self.send_or_drop(Command::agent_user(&nick));

        if let Some(soul) = self.soul() {
            if !self.transition(ConnectionState::Authenticating) {
                return false;
            }
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs());
            let signature = soul.sign(&format!("AUTH:{nick}:{timestamp}"));
            info!(soul = %soul.short_id(16), "Authenticating soul");
            self.send_or_drop(Command::Soul(soul.id().to_string()));
            self.send_or_drop(Command::Privmsg {
                target: "NickServ".to_string(),
                text: format!("IDENTIFY {} {}", soul.id(), signature),
            });
        }

        if !self.transition(ConnectionState::Connected) {
            return false;
        }
        info!("Connected");
        true
    }

    /// Read lines until the session is cancelled or the transport fails.
    ///
    /// Returns `Ok` only for a requested shutdown.
    async fn read_loop(
        &self,
        reader: &mut LineReader,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let read_timeout = self.config().server.read_timeout();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                next = next_line(reader, read_timeout) => next?,
            };

            let Some(line) = next else {
                return Err(ClientError::Closed);
            };
            trace!(line = %line, "RECV");
            self.handle_line(&line);
        }
    }

    /// Act on one inbound line.
    pub(crate) fn handle_line(&self, line: &str) {
        match Inbound::parse(line) {
            Inbound::Ping { payload } => self.send_or_drop(Command::Pong(payload)),
            Inbound::Privmsg(msg) => self.dispatch(Event::Message(msg)),
            Inbound::Join { channel, nick } => {
                if nick == self.nick() && self.inner.channels.write().insert(channel.clone()) {
                    info!(channel = %channel, "Joined channel");
                }
                self.dispatch(Event::Join { channel, nick });
            }
            Inbound::Part { channel, nick } => {
                if nick == self.nick() && self.inner.channels.write().remove(&channel) {
                    info!(channel = %channel, "Left channel");
                }
                self.dispatch(Event::Part { channel, nick });
            }
            Inbound::Quit { nick } => self.dispatch(Event::Quit { nick }),
            Inbound::Error { reason } => warn!(reason = %reason, "Server error"),
            Inbound::Other { command } => trace!(command = %command, "ignored"),
        }
    }
}

/// Next line from the server, `None` at end of stream.
async fn next_line(
    reader: &mut LineReader,
    read_timeout: Option<Duration>,
) -> Result<Option<String>, ClientError> {
    let next = match read_timeout {
        Some(limit) => timeout(limit, reader.next())
            .await
            .map_err(|_| ClientError::ReadTimeout(limit.as_secs()))?,
        None => reader.next().await,
    };
    next.transpose().map_err(ClientError::from)
}

/// Drain the outbound queue onto the wire.
///
/// Lines the codec refuses are logged and skipped. A write failure cancels
/// the session so the read loop stops too.
async fn write_loop(
    mut writer: LineWriter,
    mut queue: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) -> Result<(), ClientError> {
    let mut result = Ok(());
    while let Some(command) = queue.recv().await {
        let line = command.to_string();
        trace!(line = %line, "SEND");
        match writer.send(line).await {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                warn!(command = %command.name(), error = %e, "Dropping unsendable line");
            }
            Err(e) => {
                cancel.cancel();
                result = Err(e.into());
                break;
            }
        }
    }
    if let Err(e) = writer.close().await {
        debug!(error = %e, "error closing writer");
    }
    result
}
