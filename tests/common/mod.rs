//! Integration test common infrastructure.
//!
//! A scripted server the real client connects to, plus helpers for
//! observing client events.

pub mod server;

#[allow(unused_imports)]
pub use server::{MockConnection, MockServer};

use std::time::Duration;

use moltchat::{AgentClient, ClientBuilder, Event};
use tokio::sync::mpsc;

/// Default wait for anything a test expects to happen.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(5);

/// Forward every event named in `events` to the returned receiver.
#[allow(dead_code)]
pub fn record(
    mut builder: ClientBuilder,
    events: &[&str],
) -> (ClientBuilder, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    for name in events {
        let tx = tx.clone();
        builder = builder.on(*name, move |_: AgentClient, event| {
            let _ = tx.send(event);
            async { anyhow::Ok(()) }
        });
    }
    (builder, rx)
}

/// Next recorded event, failing the test after [`WAIT`].
#[allow(dead_code)]
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Poll `check` until it holds, failing the test after [`WAIT`].
#[allow(dead_code)]
pub async fn wait_until<F: FnMut() -> bool>(mut check: F) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
