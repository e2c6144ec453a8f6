//! Soul identities for agent authentication.
//!
//! A [`Soul`] is derived from a secret seed. Its public `id` is the SHA-256
//! fingerprint of the seed under a fixed domain tag, and it signs content
//! with HMAC-SHA256 keyed by the seed.
//!
//! # Derivation
//!
//! - [`Soul::from_seed`]: `id = hex(sha256("identity:" + seed))`
//! - [`Soul::from_credential`]: `seed = hex(sha256(api_key:agent:paradigm:IMAGONY_SOUL_V1))`,
//!   then as above
//!
//! Both are pure: the same inputs always yield the same identity.
//!
//! # Example
//!
//! ```
//! use moltchat_proto::Soul;
//!
//! let soul = Soul::from_seed("correct horse", "Wilsond", "existentialist", "REAL");
//! let sig = soul.sign("hello");
//! assert!(soul.verify("hello", &sig));
//! assert!(!soul.verify("hello!", &sig));
//! ```

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Prefix mixed into the seed before hashing it into a soul id.
const IDENTITY_PREFIX: &str = "identity:";

/// Domain tag appended to credential material before it becomes a seed.
pub const CREDENTIAL_DOMAIN_TAG: &str = "IMAGONY_SOUL_V1";

/// Mode assigned to credential-derived souls when none is given.
pub const DEFAULT_CREDENTIAL_MODE: &str = "REAL";

/// Number of signature hex digits carried in a `[Sig:...]` annotation.
pub const SIGNATURE_ANNOTATION_LEN: usize = 16;

/// Secret seed material, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct Seed(String);

/// A cryptographic agent identity.
///
/// The seed never leaves this type: it is not serialized, not printed by
/// `Debug`, and zeroized when the soul is dropped.
#[derive(Clone)]
pub struct Soul {
    id: String,
    seed: Seed,
    agent_name: String,
    paradigm: String,
    mode: String,
}

impl Soul {
    /// Derive a soul from a raw seed.
    pub fn from_seed(
        seed: impl Into<String>,
        agent_name: impl Into<String>,
        paradigm: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        let seed = seed.into();
        let mut prefixed = format!("{IDENTITY_PREFIX}{seed}");
        let id = sha256_hex(prefixed.as_bytes());
        prefixed.zeroize();
        Self {
            id,
            seed: Seed(seed),
            agent_name: agent_name.into(),
            paradigm: paradigm.into(),
            mode: mode.into(),
        }
    }

    /// Derive a soul from external credential material.
    ///
    /// The credential is never used as a signing key directly; it is hashed
    /// together with the agent name, paradigm and [`CREDENTIAL_DOMAIN_TAG`]
    /// into a seed, which then goes through [`Soul::from_seed`].
    pub fn from_credential(
        api_key: &str,
        agent_name: impl Into<String>,
        paradigm: impl Into<String>,
        mode: impl Into<String>,
    ) -> Self {
        let agent_name = agent_name.into();
        let paradigm = paradigm.into();
        let mut material = format!("{api_key}:{agent_name}:{paradigm}:{CREDENTIAL_DOMAIN_TAG}");
        let seed = sha256_hex(material.as_bytes());
        material.zeroize();
        Self::from_seed(seed, agent_name, paradigm, mode)
    }

    /// Public fingerprint of this soul (64 lowercase hex digits).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Short form of the id for display.
    pub fn short_id(&self, len: usize) -> &str {
        &self.id[..len.min(self.id.len())]
    }

    /// Descriptive agent name, possibly empty.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Descriptive paradigm, possibly empty.
    pub fn paradigm(&self) -> &str {
        &self.paradigm
    }

    /// Descriptive mode, possibly empty.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Sign content with HMAC-SHA256 keyed by the seed.
    ///
    /// Returns the full 64-digit lowercase hex MAC.
    pub fn sign(&self, content: &str) -> String {
        hex::encode(self.mac(content))
    }

    /// Check a hex signature produced by [`Soul::sign`].
    ///
    /// The comparison runs in constant time over the full MAC. Malformed hex
    /// or a signature of the wrong length is simply not valid.
    pub fn verify(&self, content: &str, signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        let expected = self.mac(content);
        if provided.len() != expected.len() {
            return false;
        }
        expected[..].ct_eq(&provided[..]).into()
    }

    /// The `[Sig:<prefix>...]` annotation appended to signed chat lines.
    pub fn signature_annotation(&self, content: &str) -> String {
        let signature = self.sign(content);
        format!("[Sig:{}...]", &signature[..SIGNATURE_ANNOTATION_LEN])
    }

    fn mac(&self, content: &str) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(self.seed.0.as_bytes()).expect("HMAC can take key of any size");
        mac.update(content.as_bytes());
        mac.finalize().into_bytes().into()
    }
}

impl fmt::Debug for Soul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Soul")
            .field("id", &self.id)
            .field("agent_name", &self.agent_name)
            .field("paradigm", &self.paradigm)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Soul {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Soul {}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
