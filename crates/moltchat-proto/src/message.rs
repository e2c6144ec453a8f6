//! Received chat messages and soul tag extraction.
//!
//! Signed agent messages carry their identity inline:
//!
//! ```text
//! [Soul:<id>] <body> [Sig:<16 hex digits>...]
//! ```
//!
//! [`SoulTags::extract`] pulls the soul id and the signature annotation out
//! of a message body and returns the body with both removed. Only the
//! surrounding whitespace of the result is trimmed; interior spacing is kept
//! exactly as received.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

fn soul_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[Soul:([^\]]+)\]").expect("soul tag pattern is valid"))
}

fn sig_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[Sig:([^\]\.]*)(?:\.\.\.)?\]").expect("signature pattern is valid")
    })
}

/// Identity annotations found in a message body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoulTags {
    /// Claimed soul id from the first `[Soul:...]` tag.
    pub soul_id: Option<String>,
    /// Signature prefix from the first `[Sig:...]` annotation.
    pub signature: Option<String>,
    /// Body with every soul tag and signature annotation removed.
    pub content: String,
}

impl SoulTags {
    /// Split a raw body into visible content and identity annotations.
    ///
    /// A body without a soul tag is returned untouched (not even trimmed).
    pub fn extract(body: &str) -> Self {
        let Some(caps) = soul_tag_re().captures(body) else {
            return Self {
                soul_id: None,
                signature: None,
                content: body.to_string(),
            };
        };
        let soul_id = caps.get(1).map(|m| m.as_str().to_string());

        let signature = sig_tag_re()
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty());

        let without_soul = soul_tag_re().replace_all(body, "");
        let without_sig = sig_tag_re().replace_all(&without_soul, "");

        Self {
            soul_id,
            signature,
            content: without_sig.trim().to_string(),
        }
    }
}

/// Format a body as a signed agent line.
///
/// `annotation` is the `[Sig:...]` marker produced by
/// [`crate::Soul::signature_annotation`] over the unsigned `body`.
pub fn signed_body(soul_id: &str, body: &str, annotation: &str) -> String {
    format!("[Soul:{soul_id}] {body} {annotation}")
}

/// A chat message received on a channel or in private.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Target of the PRIVMSG: a channel, or our own nick for private messages.
    pub channel: String,
    /// Nick of the sender.
    pub nick: String,
    /// Visible content, identity annotations removed.
    pub content: String,
    /// Soul id claimed by the sender, if tagged.
    pub soul_id: Option<String>,
    /// Signature annotation carried with the message, if any.
    pub signature: Option<String>,
    /// When the line was parsed.
    pub received_at: DateTime<Utc>,
}

impl Message {
    /// Build a message from a raw PRIVMSG body, extracting soul tags.
    pub fn from_body(channel: impl Into<String>, nick: impl Into<String>, body: &str) -> Self {
        let tags = SoulTags::extract(body);
        Self {
            channel: channel.into(),
            nick: nick.into(),
            content: tags.content,
            soul_id: tags.soul_id,
            signature: tags.signature,
            received_at: Utc::now(),
        }
    }

    /// True iff the message carries both a soul id and a signature.
    ///
    /// This only reports that the sender *claims* an identity. The client
    /// holds no registry of soul keys, so it never checks the signature;
    /// receivers that know the claimed soul must do that themselves.
    pub fn is_verified(&self) -> bool {
        self.soul_id.is_some() && self.signature.is_some()
    }

    /// Whether this was sent to a channel rather than directly to us.
    pub fn is_channel(&self) -> bool {
        self.channel.starts_with(['#', '&', '+', '!'])
    }

    /// Where a reply should go: the channel, or the sender for private messages.
    pub fn reply_target(&self) -> &str {
        if self.is_channel() {
            &self.channel
        } else {
            &self.nick
        }
    }
}
