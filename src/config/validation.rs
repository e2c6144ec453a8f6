//! Configuration validation.
//!
//! Catches common mistakes before the first connection attempt.

use super::ClientConfig;
use super::defaults::MAX_RECONNECT_DELAY_SECS;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must be non-zero")]
    ZeroPort,
    #[error("identity.nick is required")]
    MissingNick,
    #[error("identity.nick must not contain whitespace, got '{0}'")]
    NickWhitespace(String),
    #[error("identity.soul needs exactly one of seed or api_key")]
    AmbiguousSoul,
    #[error("reconnect.multiplier must be at least 1.0, got {0}")]
    ShrinkingBackoff(f64),
    #[error("reconnect delays must be non-negative")]
    NegativeDelay,
    #[error("reconnect.{field} must be at most 86400 seconds, got {value}")]
    DelayOutOfRange { field: &'static str, value: f64 },
    #[error("reconnect.multiplier must be finite, got {0}")]
    UnboundedMultiplier(f64),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    let nick = &config.identity.nick;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if nick.chars().any(char::is_whitespace) {
        errors.push(ValidationError::NickWhitespace(nick.clone()));
    }

    if let Some(ref soul) = config.identity.soul
        && soul.seed.is_some() == soul.api_key.is_some()
    {
        errors.push(ValidationError::AmbiguousSoul);
    }

    let reconnect = &config.reconnect;
    if reconnect.multiplier.is_nan() || reconnect.multiplier < 1.0 {
        errors.push(ValidationError::ShrinkingBackoff(reconnect.multiplier));
    } else if reconnect.multiplier.is_infinite() {
        errors.push(ValidationError::UnboundedMultiplier(reconnect.multiplier));
    }
    if reconnect.delay_secs < 0.0 || reconnect.max_delay_secs.is_some_and(|d| d < 0.0) {
        errors.push(ValidationError::NegativeDelay);
    }
    let delays = [
        ("delay_secs", Some(reconnect.delay_secs)),
        ("max_delay_secs", reconnect.max_delay_secs),
    ];
    for (field, value) in delays {
        if let Some(value) = value
            && (value.is_nan() || value > MAX_RECONNECT_DELAY_SECS as f64)
        {
            errors.push(ValidationError::DelayOutOfRange { field, value });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
