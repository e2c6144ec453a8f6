//! Inbound line grammar.
//!
//! Turns one received line (terminator already stripped) into an
//! [`Inbound`] event. Only the subset of the protocol an agent client acts
//! on is understood:
//!
//! | Line                              | Result                |
//! |-----------------------------------|-----------------------|
//! | `PING <payload>`                  | [`Inbound::Ping`]     |
//! | `:<nick>!u@h PRIVMSG <t> :<text>` | [`Inbound::Privmsg`]  |
//! | `:<nick>!u@h JOIN <chan>`         | [`Inbound::Join`]     |
//! | `:<nick>!u@h PART <chan> [...]`   | [`Inbound::Part`]     |
//! | `:<nick>!u@h QUIT [...]`          | [`Inbound::Quit`]     |
//! | `ERROR :<reason>`                 | [`Inbound::Error`]    |
//!
//! Everything else, including numerics, becomes [`Inbound::Other`].
//! Parsing never fails.

use crate::message::Message;

/// A parsed inbound line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Server keepalive; must be answered with `PONG <payload>`.
    Ping {
        /// Token to echo back.
        payload: String,
    },
    /// A chat message.
    Privmsg(Message),
    /// `nick` joined `channel`.
    Join {
        /// Channel joined.
        channel: String,
        /// Acting nick.
        nick: String,
    },
    /// `nick` left `channel`.
    Part {
        /// Channel left.
        channel: String,
        /// Acting nick.
        nick: String,
    },
    /// `nick` disconnected from the network.
    Quit {
        /// Acting nick.
        nick: String,
    },
    /// Server is about to close the link.
    Error {
        /// Reason given by the server.
        reason: String,
    },
    /// Anything this client does not act on.
    Other {
        /// Command token, or empty if the line had none.
        command: String,
    },
}

impl Inbound {
    /// Parse one line.
    pub fn parse(line: &str) -> Self {
        if let Some(rest) = line.strip_prefix("PING") {
            let payload = rest.strip_prefix(' ').unwrap_or(rest);
            let payload = payload.strip_prefix(':').unwrap_or(payload);
            return Inbound::Ping {
                payload: payload.to_string(),
            };
        }

        let Some(prefixed) = line.strip_prefix(':') else {
            return Self::parse_unprefixed(line);
        };

        let mut parts = prefixed.splitn(3, ' ');
        let (Some(source), Some(command)) = (parts.next(), parts.next()) else {
            return Inbound::Other {
                command: String::new(),
            };
        };
        let params = parts.next().unwrap_or("");
        let nick = source_nick(source).to_string();

        match command {
            "PRIVMSG" => {
                let Some((target, body)) = split_trailing(params) else {
                    return Inbound::Other {
                        command: command.to_string(),
                    };
                };
                Inbound::Privmsg(Message::from_body(target, nick, body))
            }
            "JOIN" => {
                let raw = match params.rfind(" :") {
                    Some(pos) => &params[pos + 2..],
                    None => first_token(params),
                };
                match channel_name(raw) {
                    Some(channel) => Inbound::Join { channel, nick },
                    None => Inbound::Other {
                        command: command.to_string(),
                    },
                }
            }
            "PART" => match channel_name(first_token(params)) {
                Some(channel) => Inbound::Part { channel, nick },
                None => Inbound::Other {
                    command: command.to_string(),
                },
            },
            "QUIT" => Inbound::Quit { nick },
            other => Inbound::Other {
                command: other.to_string(),
            },
        }
    }

    /// Short name of the event kind, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Inbound::Ping { .. } => "ping",
            Inbound::Privmsg(_) => "message",
            Inbound::Join { .. } => "join",
            Inbound::Part { .. } => "part",
            Inbound::Quit { .. } => "quit",
            Inbound::Error { .. } => "error",
            Inbound::Other { command } => command,
        }
    }

    fn parse_unprefixed(line: &str) -> Self {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        if command == "ERROR" {
            let reason = rest.strip_prefix(':').unwrap_or(rest);
            return Inbound::Error {
                reason: reason.to_string(),
            };
        }
        Inbound::Other {
            command: command.to_string(),
        }
    }
}

/// Nick part of a `nick!user@host` source; the whole source if there is no `!`.
pub fn source_nick(source: &str) -> &str {
    source.split_once('!').map_or(source, |(nick, _)| nick)
}

/// Split PRIVMSG params into target and body.
///
/// Without a ` :` separator the message is treated as empty and addressed
/// to the first token. Returns `None` only when there is no target at all.
fn split_trailing(params: &str) -> Option<(&str, &str)> {
    match params.split_once(" :") {
        Some((target, body)) => Some((target, body)),
        None => {
            let target = first_token(params);
            (!target.is_empty()).then_some((target, ""))
        }
    }
}

fn first_token(params: &str) -> &str {
    params.split_whitespace().next().unwrap_or("")
}

fn channel_name(raw: &str) -> Option<String> {
    let name = raw.strip_prefix(':').unwrap_or(raw).trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_payload() {
        assert_eq!(
            Inbound::parse("PING :abc123"),
            Inbound::Ping {
                payload: "abc123".into()
            }
        );
        assert_eq!(
            Inbound::parse("PING irc.example.com"),
            Inbound::Ping {
                payload: "irc.example.com".into()
            }
        );
        assert_eq!(
            Inbound::parse("PING"),
            Inbound::Ping {
                payload: String::new()
            }
        );
    }

    #[test]
    fn test_privmsg() {
        let Inbound::Privmsg(msg) = Inbound::parse(":Alice!u@h PRIVMSG #general :hello there") else {
            panic!("expected privmsg");
        };
        assert_eq!(msg.channel, "#general");
        assert_eq!(msg.nick, "Alice");
        assert_eq!(msg.content, "hello there");
        assert_eq!(msg.soul_id, None);
    }

    #[test]
    fn test_privmsg_keeps_colons_in_body() {
        let Inbound::Privmsg(msg) = Inbound::parse(":a!b@c PRIVMSG Bot :x :y: z") else {
            panic!("expected privmsg");
        };
        assert_eq!(msg.channel, "Bot");
        assert_eq!(msg.content, "x :y: z");
    }

    #[test]
    fn test_privmsg_without_separator_is_empty() {
        let Inbound::Privmsg(msg) = Inbound::parse(":a!b@c PRIVMSG #chan stray words") else {
            panic!("expected privmsg");
        };
        assert_eq!(msg.channel, "#chan");
        assert_eq!(msg.content, "");
    }

    #[test]
    fn test_privmsg_without_params_is_ignored() {
        assert!(matches!(
            Inbound::parse(":a!b@c PRIVMSG"),
            Inbound::Other { .. }
        ));
    }

    #[test]
    fn test_source_without_user_host() {
        let Inbound::Privmsg(msg) = Inbound::parse(":server PRIVMSG Bot :notice") else {
            panic!("expected privmsg");
        };
        assert_eq!(msg.nick, "server");
    }

    #[test]
    fn test_join_forms() {
        let expected = Inbound::Join {
            channel: "#general".into(),
            nick: "Bot".into(),
        };
        assert_eq!(Inbound::parse(":Bot!u@h JOIN #general"), expected);
        assert_eq!(Inbound::parse(":Bot!u@h JOIN :#general"), expected);
        assert_eq!(Inbound::parse(":Bot!u@h JOIN x :#general"), expected);
        assert!(matches!(
            Inbound::parse(":Bot!u@h JOIN"),
            Inbound::Other { .. }
        ));
    }

    #[test]
    fn test_part_forms() {
        let expected = Inbound::Part {
            channel: "#general".into(),
            nick: "Alice".into(),
        };
        assert_eq!(Inbound::parse(":Alice!u@h PART #general"), expected);
        assert_eq!(Inbound::parse(":Alice!u@h PART #general :bye all"), expected);
    }

    #[test]
    fn test_quit() {
        assert_eq!(
            Inbound::parse(":Alice!u@h QUIT :Ping timeout"),
            Inbound::Quit {
                nick: "Alice".into()
            }
        );
        assert_eq!(
            Inbound::parse(":Alice!u@h QUIT"),
            Inbound::Quit {
                nick: "Alice".into()
            }
        );
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            Inbound::parse("ERROR :Closing Link: flood"),
            Inbound::Error {
                reason: "Closing Link: flood".into()
            }
        );
    }

    #[test]
    fn test_ignored_lines() {
        assert_eq!(
            Inbound::parse(":irc.example.com 001 Bot :Welcome"),
            Inbound::Other {
                command: "001".into()
            }
        );
        assert_eq!(
            Inbound::parse("NOTICE * :hello"),
            Inbound::Other {
                command: "NOTICE".into()
            }
        );
        assert_eq!(
            Inbound::parse(""),
            Inbound::Other {
                command: String::new()
            }
        );
        assert!(matches!(Inbound::parse(":lonely"), Inbound::Other { .. }));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Inbound::parse("PING :x").kind(), "ping");
        assert_eq!(Inbound::parse(":a JOIN #b").kind(), "join");
        assert_eq!(Inbound::parse(":a MODE #b +o a").kind(), "MODE");
    }
}
