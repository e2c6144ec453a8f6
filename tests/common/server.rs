//! Scripted test server.
//!
//! Listens on an ephemeral local port and lets a test play the server side
//! of a session line by line.

use std::time::Duration;

use moltchat::ClientConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::WAIT;

/// A listening test server.
pub struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client config pointing at this server, with a short reconnect delay.
    pub fn config(&self, nick: &str) -> ClientConfig {
        let mut config = ClientConfig::new("127.0.0.1", self.port, nick);
        config.reconnect.delay_secs = 0.05;
        config
    }

    /// Accept the next client connection.
    pub async fn accept(&self) -> anyhow::Result<MockConnection> {
        self.accept_within(WAIT).await
    }

    pub async fn accept_within(&self, limit: Duration) -> anyhow::Result<MockConnection> {
        let (stream, _) = timeout(limit, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(MockConnection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

/// Server side of one accepted connection.
pub struct MockConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl MockConnection {
    /// Send one line; CRLF is appended.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send raw bytes as-is, terminator included.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the client without its terminator, `None` at EOF.
    pub async fn recv(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let n = timeout(WAIT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            return Ok(None);
        }
        anyhow::ensure!(line.ends_with("\r\n"), "line not CRLF terminated: {line:?}");
        line.truncate(line.len() - 2);
        Ok(Some(line))
    }

    /// Next line from the client; EOF is an error.
    pub async fn expect_line(&mut self) -> anyhow::Result<String> {
        self.recv()
            .await?
            .ok_or_else(|| anyhow::anyhow!("client closed the connection"))
    }

    /// Read lines until one satisfies `predicate`, returning it.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<String>
    where
        F: FnMut(&str) -> bool,
    {
        loop {
            let line = self.expect_line().await?;
            if predicate(&line) {
                return Ok(line);
            }
        }
    }

    /// Consume the NICK/USER registration pair.
    pub async fn expect_registration(&mut self, nick: &str) -> anyhow::Result<()> {
        assert_eq!(self.expect_line().await?, format!("NICK {nick}"));
        assert_eq!(
            self.expect_line().await?,
            format!("USER {nick} 0 * :{nick} Agent")
        );
        Ok(())
    }
}
