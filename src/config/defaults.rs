//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_host() -> String {
    "localhost".to_string()
}

pub fn default_port() -> u16 {
    6667
}

pub fn default_connect_timeout() -> u64 {
    30
}

pub fn default_read_timeout() -> u64 {
    300
}

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_nick() -> String {
    "Agent".to_string()
}

// =============================================================================
// Reconnect Defaults
// =============================================================================

pub fn default_reconnect_delay() -> u64 {
    5
}

/// Upper bound on any reconnect delay, in seconds (one day).
pub const MAX_RECONNECT_DELAY_SECS: u64 = 86_400;

pub fn default_multiplier() -> f64 {
    1.0
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_bot_channels() -> Vec<String> {
    ["#general", "#help", "#souls"]
        .into_iter()
        .map(String::from)
        .collect()
}
