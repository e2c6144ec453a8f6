//! The agent client.
//!
//! [`AgentClient`] is a cheap handle over shared state. Build one with
//! [`AgentClient::builder`], register handlers and services, then drive it
//! with [`AgentClient::connect`] (or [`AgentClient::spawn`]). Outgoing
//! operations are fire-and-forget: they queue a command for the writer task
//! and return immediately.
//!
//! ```no_run
//! use moltchat::{AgentClient, ClientConfig, Event};
//!
//! # async fn run() {
//! let client = AgentClient::builder(ClientConfig::new("localhost", 6667, "Wilsond"))
//!     .on("connect", |client: AgentClient, _| async move {
//!         client.join("#general");
//!         anyhow::Ok(())
//!     })
//!     .on("message", |client: AgentClient, event| async move {
//!         if let Event::Message(msg) = event
//!             && msg.content.starts_with("!ping")
//!         {
//!             client.say(msg.reply_target(), "pong");
//!         }
//!         anyhow::Ok(())
//!     })
//!     .build();
//!
//! client.connect().await;
//! # }
//! ```

mod connection;
mod transport;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use moltchat_proto::{Command, ConnectionState, Soul, signed_body};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{Dispatcher, Event, EventBus};
use crate::service::ServiceRegistry;

/// Reason sent with `QUIT` when none is given.
pub const DEFAULT_QUIT_REASON: &str = "Bye";

/// Handle to a chat client. Clones share one connection.
#[derive(Clone)]
pub struct AgentClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    soul: Option<Soul>,
    events: Dispatcher<AgentClient>,
    services: ServiceRegistry,
    state: Mutex<ConnectionState>,
    channels: RwLock<HashSet<String>>,
    auto_reconnect: AtomicBool,
    /// Outbound queue of the live session, if any.
    link: Mutex<Option<Link>>,
    /// Cancelled by `quit`; ends the connection loop for good.
    stop: CancellationToken,
}

/// Writer side of one session.
struct Link {
    outbound: mpsc::UnboundedSender<Command>,
    /// Ends the session's read loop.
    cancel: CancellationToken,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("nick", &self.nick())
            .field("state", &self.state())
            .field("soul", &self.inner.soul)
            .field("events", &self.inner.events)
            .field("services", &self.inner.services)
            .finish_non_exhaustive()
    }
}

/// Setup-time configuration of an [`AgentClient`].
///
/// Handlers and services can only be added here; [`ClientBuilder::build`]
/// freezes them.
pub struct ClientBuilder {
    config: ClientConfig,
    soul: Option<Soul>,
    events: EventBus<AgentClient>,
    services: ServiceRegistry,
}

impl ClientBuilder {
    /// Register a handler for `event` (`connect`, `disconnect`, `message`,
    /// `join`, `part`, `quit`). Handlers for one event run in the order they
    /// were added.
    pub fn on<F, Fut>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(AgentClient, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.events.register(event, handler);
        self
    }

    /// Use `soul` for authentication and signing, replacing any soul from
    /// the config.
    pub fn soul(mut self, soul: Soul) -> Self {
        self.soul = Some(soul);
        self
    }

    /// Register a named service.
    pub fn service<F>(mut self, name: impl Into<String>, service: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.services.register(name, service);
        self
    }

    pub fn build(self) -> AgentClient {
        let auto_reconnect = self.config.reconnect.enabled;
        AgentClient {
            inner: Arc::new(Inner {
                config: self.config,
                soul: self.soul,
                events: Dispatcher::new(self.events),
                services: self.services,
                state: Mutex::new(ConnectionState::Disconnected),
                channels: RwLock::new(HashSet::new()),
                auto_reconnect: AtomicBool::new(auto_reconnect),
                link: Mutex::new(None),
                stop: CancellationToken::new(),
            }),
        }
    }
}

impl AgentClient {
    /// Start building a client.
    ///
    /// The soul described by `config.identity.soul` is derived later by the
    /// caller (see [`ClientConfig::soul`]) and passed to
    /// [`ClientBuilder::soul`].
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            soul: None,
            events: EventBus::new(),
            services: ServiceRegistry::default(),
        }
    }

    /// A client with no handlers.
    pub fn new(config: ClientConfig, soul: Option<Soul>) -> Self {
        let builder = Self::builder(config);
        match soul {
            Some(soul) => builder.soul(soul).build(),
            None => builder.build(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Our configured nick.
    pub fn nick(&self) -> &str {
        &self.inner.config.identity.nick
    }

    pub fn soul(&self) -> Option<&Soul> {
        self.inner.soul.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Channels the server has confirmed we are in, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.inner.channels.read().iter().cloned().collect();
        channels.sort();
        channels
    }

    pub fn in_channel(&self, channel: &str) -> bool {
        self.inner.channels.read().contains(channel)
    }

    pub fn auto_reconnect(&self) -> bool {
        self.inner.auto_reconnect.load(Ordering::SeqCst)
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.inner.auto_reconnect.store(enabled, Ordering::SeqCst);
    }

    /// Whether [`AgentClient::quit`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_cancelled()
    }

    pub(crate) fn services(&self) -> &ServiceRegistry {
        &self.inner.services
    }

    /// Run the connection loop on a background task.
    pub fn spawn(&self) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move { client.connect().await })
    }

    /// Queue a command on the live session.
    pub fn send(&self, command: Command) -> Result<(), ClientError> {
        let link = self.inner.link.lock();
        let link = link.as_ref().ok_or(ClientError::NotConnected)?;
        link.outbound
            .send(command)
            .map_err(|_| ClientError::NotConnected)
    }

    fn send_or_drop(&self, command: Command) {
        let name = command.name().to_string();
        if let Err(e) = self.send(command) {
            debug!(command = %name, error = %e, "dropping outgoing command");
        }
    }

    /// Send a message to a channel or nick.
    pub fn say(&self, target: &str, text: &str) {
        self.send_or_drop(Command::Privmsg {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    /// Send a message tagged with our soul id and a signature annotation.
    ///
    /// The signature covers `text` exactly as given. Without a soul the
    /// message goes out unsigned.
    pub fn say_signed(&self, target: &str, text: &str) {
        match self.soul() {
            Some(soul) => {
                let body = signed_body(soul.id(), text, &soul.signature_annotation(text));
                self.say(target, &body);
            }
            None => {
                debug!(target = %target, "no soul; sending unsigned");
                self.say(target, text);
            }
        }
    }

    /// Ask to join `channel`. Membership changes when the server echoes it.
    pub fn join(&self, channel: &str) {
        self.send_or_drop(Command::Join(channel.to_string()));
    }

    /// Ask to leave `channel`.
    pub fn part(&self, channel: &str, reason: Option<&str>) {
        self.send_or_drop(Command::Part {
            channel: channel.to_string(),
            reason: reason.map(str::to_string),
        });
    }

    /// Disconnect for good.
    ///
    /// Disables auto-reconnect, sends `QUIT :<reason>` if a session is live
    /// and closes it after the queue drains. A pending reconnect is
    /// cancelled. A client that has quit stays stopped.
    pub fn quit(&self, reason: Option<&str>) {
        let reason = reason.unwrap_or(DEFAULT_QUIT_REASON);
        self.set_auto_reconnect(false);
        if self.state().is_active() {
            self.transition(ConnectionState::Disconnecting);
        }

        if let Some(link) = self.inner.link.lock().take() {
            if link.outbound.send(Command::Quit(reason.to_string())).is_err() {
                debug!("writer already gone; QUIT not sent");
            }
            link.cancel.cancel();
        }
        self.inner.stop.cancel();
        info!(reason = %reason, "quit requested");
    }

    /// Move to `next` if the lifecycle allows it.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.inner.state.lock();
        if *state == next {
            return true;
        }
        if !state.can_transition_to(next) {
            debug!(from = %*state, to = %next, "ignoring state change");
            return false;
        }
        debug!(from = %*state, to = %next, "state change");
        *state = next;
        true
    }

    fn dispatch(&self, event: Event) {
        self.inner.events.dispatch(self, event);
    }
}
