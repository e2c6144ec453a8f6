//! Core configuration types and loading.

use std::path::Path;
use std::time::Duration;

use moltchat_proto::{DEFAULT_CREDENTIAL_MODE, Soul};
use serde::Deserialize;
use thiserror::Error;

use super::defaults::*;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        ConfigError::Invalid(joined)
    }
}

/// Client configuration.
///
/// Taken by value when the client is built; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Server to connect to.
    #[serde(default)]
    pub server: ServerConfig,
    /// Nick and optional soul.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Settings for the `moltbot` runner.
    #[serde(default)]
    pub bot: BotConfig,
}

impl ClientConfig {
    /// Config for `host:port` with the given nick and all other values at
    /// their defaults.
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.server.host = host.into();
        config.server.port = port;
        config.identity.nick = nick.into();
        config
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply the bot runner environment overrides.
    ///
    /// `IRC_HOST`, `IRC_PORT`, `BOT_NICK` and `SOUL_ID` (a raw seed).
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_vars<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("IRC_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("IRC_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("IRC_PORT is not a port: {port}")))?;
        }
        if let Some(nick) = var("BOT_NICK") {
            self.identity.nick = nick;
        }
        if let Some(seed) = var("SOUL_ID") {
            self.identity.soul = Some(SoulConfig {
                seed: Some(seed),
                agent_name: self.identity.nick.clone(),
                ..SoulConfig::default()
            });
        }
        Ok(())
    }

    /// Validate, returning every problem found as one [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self).map_err(ConfigError::from)
    }

    /// Derive the configured soul, if any.
    pub fn soul(&self) -> Result<Option<Soul>, ConfigError> {
        self.identity
            .soul
            .as_ref()
            .map(SoulConfig::derive)
            .transpose()
    }
}

/// Server connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wrap the connection in TLS (native root certificates).
    #[serde(default)]
    pub tls: bool,
    /// Seconds allowed to establish the transport.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seconds without any inbound line before the link is considered dead.
    /// Zero disables the check.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

/// Who the client is on the network.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Nick to register with.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Optional soul material.
    #[serde(default)]
    pub soul: Option<SoulConfig>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nick: default_nick(),
            soul: None,
        }
    }
}

/// Soul material: exactly one of `seed` or `api_key`.
#[derive(Clone, Default, Deserialize)]
pub struct SoulConfig {
    /// Raw seed.
    #[serde(default)]
    pub seed: Option<String>,
    /// External credential the seed is derived from.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub paradigm: String,
    /// Defaults to empty for a seed, `REAL` for a credential.
    #[serde(default)]
    pub mode: Option<String>,
}

impl std::fmt::Debug for SoulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoulConfig")
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("agent_name", &self.agent_name)
            .field("paradigm", &self.paradigm)
            .field("mode", &self.mode)
            .finish()
    }
}

impl SoulConfig {
    /// Derive the soul this section describes.
    pub fn derive(&self) -> Result<Soul, ConfigError> {
        match (&self.seed, &self.api_key) {
            (Some(seed), None) => Ok(Soul::from_seed(
                seed.as_str(),
                self.agent_name.as_str(),
                self.paradigm.as_str(),
                self.mode.clone().unwrap_or_default(),
            )),
            (None, Some(api_key)) => Ok(Soul::from_credential(
                api_key,
                &self.agent_name,
                &self.paradigm,
                self.mode.as_deref().unwrap_or(DEFAULT_CREDENTIAL_MODE),
            )),
            _ => Err(ConfigError::Invalid(
                "identity.soul needs exactly one of seed or api_key".to_string(),
            )),
        }
    }
}

/// Reconnect policy.
///
/// The delay before attempt `n` (counting from zero) is
/// `min(delay_secs * multiplier^n, max_delay_secs)`. With the defaults that
/// is a fixed five seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect after an unexpected disconnect.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base delay in seconds. Fractions are allowed.
    #[serde(default = "default_reconnect_delay_f64")]
    pub delay_secs: f64,
    /// Cap on the delay; defaults to `delay_secs`.
    #[serde(default)]
    pub max_delay_secs: Option<f64>,
    /// Growth factor per consecutive failure; 1.0 keeps the delay fixed.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_reconnect_delay_f64() -> f64 {
    default_reconnect_delay() as f64
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: default_reconnect_delay_f64(),
            max_delay_secs: None,
            multiplier: default_multiplier(),
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt `attempt` (zero-based).
    ///
    /// Never exceeds [`MAX_RECONNECT_DELAY_SECS`], even for values that
    /// skipped validation.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = MAX_RECONNECT_DELAY_SECS as f64;
        let base = self.delay_secs.max(0.0).min(ceiling);
        let cap = self.max_delay_secs.unwrap_or(base).max(base).min(ceiling);
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = (base * self.multiplier.max(1.0).powi(exp)).min(cap);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::from_secs(MAX_RECONNECT_DELAY_SECS))
    }
}

/// Settings for the `moltbot` runner.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Channels joined on connect.
    #[serde(default = "default_bot_channels")]
    pub channels: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channels: default_bot_channels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 6667);
        assert!(!config.server.tls);
        assert_eq!(config.server.read_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.identity.nick, "Agent");
        assert!(config.identity.soul.is_none());
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.delay_for(0), Duration::from_secs(5));
        assert_eq!(config.reconnect.delay_for(10), Duration::from_secs(5));
        assert_eq!(config.bot.channels, vec!["#general", "#help", "#souls"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_toml() {
        let config = ClientConfig::from_toml_str(
            r##"
[server]
host = "irc.moltchat.net"
port = 6697
tls = true
read_timeout_secs = 0

[identity]
nick = "Wilsond"

[identity.soul]
api_key = "img_test_key_12345"
agent_name = "Wilsond"
paradigm = "existentialist"

[reconnect]
delay_secs = 1
max_delay_secs = 8
multiplier = 2.0

[bot]
channels = ["#coding"]
"##,
        )
        .unwrap();

        assert_eq!(config.server.host, "irc.moltchat.net");
        assert!(config.server.tls);
        assert_eq!(config.server.read_timeout(), None);
        let soul = config.soul().unwrap().unwrap();
        assert_eq!(soul.mode(), "REAL");
        assert_eq!(
            soul.id(),
            Soul::from_credential("img_test_key_12345", "Wilsond", "existentialist", "REAL").id()
        );
        assert_eq!(config.bot.channels, vec!["#coding"]);
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let policy = ReconnectConfig {
            enabled: true,
            delay_secs: 1.0,
            max_delay_secs: Some(8.0),
            multiplier: 2.0,
        };
        let delays: Vec<_> = (0..6).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_with_unbounded_values_stays_finite() {
        let ceiling = Duration::from_secs(MAX_RECONNECT_DELAY_SECS);

        let config = ClientConfig::from_toml_str(
            "[reconnect]\ndelay_secs = 1\nmax_delay_secs = inf\nmultiplier = 2.0",
        )
        .unwrap();
        assert_eq!(config.reconnect.delay_for(0), Duration::from_secs(1));
        assert_eq!(config.reconnect.delay_for(2000), ceiling);

        let config = ClientConfig::from_toml_str("[reconnect]\ndelay_secs = 1e30").unwrap();
        assert_eq!(config.reconnect.delay_for(0), ceiling);

        let policy = ReconnectConfig {
            enabled: true,
            delay_secs: f64::NAN,
            max_delay_secs: Some(f64::NAN),
            multiplier: f64::INFINITY,
        };
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("IRC_HOST", "ircd"),
            ("IRC_PORT", "6697"),
            ("BOT_NICK", "MoltBot"),
            ("SOUL_ID", "seed-from-env"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.host, "ircd");
        assert_eq!(config.server.port, 6697);
        assert_eq!(config.identity.nick, "MoltBot");
        let soul = config.soul().unwrap().unwrap();
        assert_eq!(soul.id(), Soul::from_seed("seed-from-env", "", "", "").id());
        assert_eq!(soul.agent_name(), "MoltBot");
    }

    #[test]
    fn test_env_bad_port() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_vars(|k| (k == "IRC_PORT").then(|| "sixty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_soul_debug_is_redacted() {
        let soul = SoulConfig {
            seed: Some("hunter2".into()),
            ..SoulConfig::default()
        };
        assert!(!format!("{soul:?}").contains("hunter2"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("[server]\nport = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
