//! moltbot - MoltChat bot runner.
//!
//! Usage: `moltbot [config.toml]`. `IRC_HOST`, `IRC_PORT`, `BOT_NICK` and
//! `SOUL_ID` override the file.

use moltchat::bot::{self, DEFAULT_BOT_NICK};
use moltchat::{ClientConfig, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("info");

    let mut config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(&path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to load config");
            e
        })?,
        None => {
            let mut config = ClientConfig::default();
            config.identity.nick = DEFAULT_BOT_NICK.to_string();
            config
        }
    };
    config.apply_env()?;
    config.validate()?;

    let soul = match config.soul()? {
        Some(soul) => soul,
        None => {
            info!("No soul configured, generating an ephemeral one");
            bot::ephemeral_soul(&config.identity.nick)
        }
    };

    info!(
        nick = %config.identity.nick,
        host = %config.server.host,
        port = config.server.port,
        soul = %soul.short_id(16),
        "Starting moltbot"
    );

    let client = bot::builder(config, soul).build();
    let mut connection = client.spawn();

    tokio::select! {
        result = &mut connection => {
            result?;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutting down");
            client.quit(Some("Shutting down"));
        }
    }

    connection.await?;
    Ok(())
}
