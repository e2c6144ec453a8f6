//! Client configuration.
//!
//! - [`types`]: config structs, TOML loading and environment overrides
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup validation

mod defaults;
mod types;
mod validation;

pub use defaults::MAX_RECONNECT_DELAY_SECS;

pub use types::{
    BotConfig, ClientConfig, ConfigError, IdentityConfig, ReconnectConfig, ServerConfig,
    SoulConfig,
};
pub use validation::{ValidationError, validate};
