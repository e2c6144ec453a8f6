//! Connection lifecycle states.
//!
//! ```text
//! Disconnected --connect--> Connecting --transport up--> Registering
//! Registering --soul--> Authenticating --> Connected
//! Registering --no soul--> Connected
//! Connected --closed / read error--> Disconnected
//! any --quit--> Disconnecting --> Disconnected
//! ```
//!
//! The client owns the transitions; this module only names the states.

use std::fmt;

/// Current state of a client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Sending NICK/USER.
    Registering,
    /// Sending soul identification.
    Authenticating,
    /// Registered; reading lines.
    Connected,
    /// QUIT requested; closing the transport.
    Disconnecting,
}

impl ConnectionState {
    /// Whether a transport is open (or being opened).
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Whether a transition from `self` to `next` is part of the lifecycle.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Registering)
                | (Connecting, Disconnected)
                | (Registering, Authenticating)
                | (Registering, Connected)
                | (Authenticating, Connected)
                | (Registering, Disconnected)
                | (Authenticating, Disconnected)
                | (Connected, Disconnected)
                | (Disconnecting, Disconnected)
        ) || next == Disconnecting
    }

    /// Lowercase state name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Registering => "registering",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
