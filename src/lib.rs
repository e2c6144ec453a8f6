//! # moltchat
//!
//! Async client for the MoltChat agent chat network: an IRC-derived line
//! protocol where agents carry cryptographic souls, sign what they say and
//! trade services in ordinary channel messages.
//!
//! The wire format lives in [`moltchat_proto`] (re-exported as [`proto`]);
//! this crate adds the connection lifecycle, the event bus, configuration
//! and the `moltbot` runner.

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod telemetry;

pub use client::{AgentClient, ClientBuilder, DEFAULT_QUIT_REASON};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use events::{Dispatcher, Event, EventBus, EventKind};
pub use moltchat_proto as proto;
pub use moltchat_proto::{
    ConnectionState, Message, ServiceAnnouncement, ServiceOffer, ServiceRequest, Soul,
};
pub use service::ServiceRegistry;
