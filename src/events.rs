//! Event bus.
//!
//! Handlers are registered per event name and invoked in registration
//! order. A [`Dispatcher`] feeds events to them from a single task: every
//! handler of one event is started, in order, before any handler of the next
//! event, and afterwards they run concurrently. The read loop only enqueues,
//! so it never waits for a handler. A handler that returns an error or
//! panics is logged and isolated; the remaining handlers still run.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use moltchat_proto::Message;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error};

use crate::error::ClientError;
use crate::telemetry::spans;

/// Boxed future returned by a handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Event names the client dispatches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    Message,
    Join,
    Part,
    Quit,
}

impl EventKind {
    /// Every kind, in lifecycle order.
    pub const ALL: [EventKind; 6] = [
        EventKind::Connect,
        EventKind::Disconnect,
        EventKind::Message,
        EventKind::Join,
        EventKind::Part,
        EventKind::Quit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
            EventKind::Message => "message",
            EventKind::Join => "join",
            EventKind::Part => "part",
            EventKind::Quit => "quit",
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

/// An event delivered to handlers.
#[derive(Clone, Debug)]
pub enum Event {
    /// Registration (and soul authentication, if any) has been sent.
    Connect,
    /// The session ended. `error` is `None` after a requested quit.
    Disconnect { error: Option<Arc<ClientError>> },
    /// A chat message.
    Message(Message),
    /// `nick` joined `channel`; our own joins included.
    Join { channel: String, nick: String },
    /// `nick` left `channel`; our own parts included.
    Part { channel: String, nick: String },
    /// `nick` left the network.
    Quit { nick: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connect => EventKind::Connect,
            Event::Disconnect { .. } => EventKind::Disconnect,
            Event::Message(_) => EventKind::Message,
            Event::Join { .. } => EventKind::Join,
            Event::Part { .. } => EventKind::Part,
            Event::Quit { .. } => EventKind::Quit,
        }
    }

    /// Name the event is registered under.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// An event handler.
///
/// Implemented for every `Fn(C, Event) -> impl Future<Output = anyhow::Result<()>>`.
pub trait Handler<C>: Send + Sync + 'static {
    fn call(&self, ctx: C, event: Event) -> HandlerFuture;
}

impl<C, F, Fut> Handler<C> for F
where
    F: Fn(C, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, ctx: C, event: Event) -> HandlerFuture {
        Box::pin(self(ctx, event))
    }
}

/// Ordered handler lists keyed by event name.
///
/// `C` is the context handed to every handler (the client handle in
/// practice). Registration needs `&mut self`, so once the bus is shared the
/// handler set is frozen.
pub struct EventBus<C> {
    handlers: HashMap<String, Vec<Arc<dyn Handler<C>>>>,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            handlers: EventKind::ALL
                .into_iter()
                .map(|kind| (kind.as_str().to_string(), Vec::new()))
                .collect(),
        }
    }
}

impl<C> std::fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl<C: Clone + Send + 'static> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event`.
    ///
    /// Unknown names get a list of their own; they are only dispatched if
    /// something dispatches that name.
    pub fn register<F, Fut>(&mut self, event: impl Into<String>, handler: F)
    where
        F: Fn(C, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let event = event.into();
        if !self.handlers.contains_key(&event) {
            debug!(event = %event, "registering handler for unknown event name");
        }
        self.handlers
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Number of handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Call every handler registered for `name`, in order, and return
    /// their futures.
    ///
    /// Building a future runs the synchronous part of the handler. Panics
    /// there are logged and the handler is skipped; the returned futures
    /// log their own errors and panics.
    pub fn start(&self, name: &str, ctx: &C, event: Event) -> Vec<HandlerRun> {
        let Some(handlers) = self.handlers.get(name).filter(|list| !list.is_empty()) else {
            return Vec::new();
        };

        let mut runs = Vec::with_capacity(handlers.len());
        for (index, handler) in handlers.iter().enumerate() {
            let built =
                std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx.clone(), event.clone())));
            let fut = match built {
                Ok(fut) => fut,
                Err(_) => {
                    error!(event = %name, handler = index, "handler panicked");
                    continue;
                }
            };

            let event_name = name.to_string();
            let run = async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!(event = %event_name, handler = index, error = %format!("{e:#}"), "handler failed");
                    }
                    Err(_) => error!(event = %event_name, handler = index, "handler panicked"),
                }
            };
            runs.push(Box::pin(run.instrument(spans::dispatch(name))) as HandlerRun);
        }
        runs
    }
}

/// One handler invocation, with error and panic logging attached.
pub type HandlerRun = Pin<Box<dyn Future<Output = ()> + Send>>;

type Queued<C> = (String, C, Event);

/// Ordered delivery of events to an [`EventBus`].
///
/// The delivery task is spawned on the first dispatch, so the dispatcher can
/// be created outside a Tokio runtime. It exits once the dispatcher is
/// dropped and every queued event has been handled.
pub struct Dispatcher<C> {
    bus: Arc<EventBus<C>>,
    queue: Mutex<Option<mpsc::UnboundedSender<Queued<C>>>>,
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bus", &self.bus)
            .field("running", &self.queue.lock().is_some())
            .finish()
    }
}

impl<C: Clone + Send + 'static> Dispatcher<C> {
    pub fn new(bus: EventBus<C>) -> Self {
        Self {
            bus: Arc::new(bus),
            queue: Mutex::new(None),
        }
    }

    /// Queue `event` under its own name.
    pub fn dispatch(&self, ctx: &C, event: Event) {
        self.dispatch_named(event.name(), ctx, event);
    }

    /// Queue `event` for the handlers registered under `name`.
    ///
    /// Must be called from within a Tokio runtime when any handler is
    /// registered for `name`.
    pub fn dispatch_named(&self, name: &str, ctx: &C, event: Event) {
        if self.bus.handler_count(name) == 0 {
            return;
        }
        let mut queue = self.queue.lock();
        let sender = queue.get_or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(deliver(Arc::clone(&self.bus), rx));
            tx
        });
        if sender.send((name.to_string(), ctx.clone(), event)).is_err() {
            debug!(event = %name, "event delivery stopped; dropping event");
        }
    }
}

async fn deliver<C: Clone + Send + 'static>(
    bus: Arc<EventBus<C>>,
    mut queue: mpsc::UnboundedReceiver<Queued<C>>,
) {
    let mut running = FuturesUnordered::new();
    loop {
        tokio::select! {
            next = queue.recv() => {
                let Some((name, ctx, event)) = next else { break };
                for mut run in bus.start(&name, &ctx, event) {
                    // First poll happens here, before the next event is taken.
                    if futures_util::poll!(&mut run).is_pending() {
                        running.push(run);
                    }
                }
            }
            Some(()) = running.next(), if !running.is_empty() => {}
        }
    }
    while running.next().await.is_some() {}
}
