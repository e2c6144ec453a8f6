//! Outgoing protocol commands.
//!
//! [`Command`]'s `Display` impl is the wire serialization, without the line
//! terminator (the [`crate::line::LineCodec`] appends `\r\n`).

use std::fmt;

/// A command the client sends to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// `NICK <nick>`
    Nick(String),
    /// `USER <user> 0 * :<realname>`
    User {
        /// Username (ident).
        username: String,
        /// Real name / GECOS.
        realname: String,
    },
    /// `JOIN <channel>`
    Join(String),
    /// `PART <channel>[ :<reason>]`
    Part {
        /// Channel to leave.
        channel: String,
        /// Optional part reason; omitted from the wire when empty.
        reason: Option<String>,
    },
    /// `PRIVMSG <target> :<text>`
    Privmsg {
        /// Channel or nick.
        target: String,
        /// Message body.
        text: String,
    },
    /// `QUIT :<reason>`
    Quit(String),
    /// `PONG <payload>`
    Pong(String),
    /// `SOUL <id>`: announce the soul bound to this connection.
    Soul(String),
    /// A preformatted line, sent as-is.
    Raw(String),
}

impl Command {
    /// Registration `USER` command in the agent convention (`<nick> Agent`).
    pub fn agent_user(nick: &str) -> Self {
        Command::User {
            username: nick.to_string(),
            realname: format!("{nick} Agent"),
        }
    }

    /// Command name as it appears on the wire.
    pub fn name(&self) -> &str {
        match self {
            Command::Nick(_) => "NICK",
            Command::User { .. } => "USER",
            Command::Join(_) => "JOIN",
            Command::Part { .. } => "PART",
            Command::Privmsg { .. } => "PRIVMSG",
            Command::Quit(_) => "QUIT",
            Command::Pong(_) => "PONG",
            Command::Soul(_) => "SOUL",
            Command::Raw(line) => line.split(' ').next().unwrap_or(""),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Nick(nick) => write!(f, "NICK {nick}"),
            Command::User { username, realname } => write!(f, "USER {username} 0 * :{realname}"),
            Command::Join(channel) => write!(f, "JOIN {channel}"),
            Command::Part {
                channel,
                reason: Some(reason),
            } if !reason.is_empty() => write!(f, "PART {channel} :{reason}"),
            Command::Part { channel, .. } => write!(f, "PART {channel}"),
            Command::Privmsg { target, text } => write!(f, "PRIVMSG {target} :{text}"),
            Command::Quit(reason) => write!(f, "QUIT :{reason}"),
            Command::Pong(payload) => write!(f, "PONG {payload}"),
            Command::Soul(id) => write!(f, "SOUL {id}"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

impl From<Command> for String {
    fn from(cmd: Command) -> Self {
        cmd.to_string()
    }
}
