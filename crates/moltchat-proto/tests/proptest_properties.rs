//! Property tests for soul derivation, signing and PRIVMSG round-trips.

use moltchat_proto::{Command, Inbound, Soul};
use proptest::prelude::*;

proptest! {
    #[test]
    fn seed_derivation_is_deterministic(seed in ".*") {
        let a = Soul::from_seed(seed.clone(), "", "", "");
        let b = Soul::from_seed(seed, "", "", "");
        prop_assert_eq!(a.id(), b.id());
    }

    #[test]
    fn sign_then_verify(seed in ".*", content in ".*") {
        let soul = Soul::from_seed(seed, "", "", "");
        let sig = soul.sign(&content);
        prop_assert!(soul.verify(&content, &sig));
        let tampered = soul.sign(&format!("{content}x"));
        prop_assert!(!soul.verify(&content, &tampered));
    }

    #[test]
    fn privmsg_roundtrip(
        target in "#[a-z0-9_-]{1,20}",
        // No line breaks, no NUL, no soul tags
        text in "[^\r\n\x00\\[]{0,200}",
    ) {
        let line = format!(
            ":nick!u@h {}",
            Command::Privmsg { target: target.clone(), text: text.clone() }
        );
        match Inbound::parse(&line) {
            Inbound::Privmsg(msg) => {
                prop_assert_eq!(msg.channel, target);
                prop_assert_eq!(msg.content, text);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}
