//! Tracing setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless; the second subscriber is simply not installed.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Standardized span constructors for client observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one client's connection loop, reconnects included.
    pub fn connection(host: &str, port: u16, nick: &str) -> Span {
        info_span!("connection", host = %host, port = port, nick = %nick)
    }

    /// Span for one event dispatch.
    pub fn dispatch(event: &str) -> Span {
        info_span!("dispatch", event = %event)
    }
}
