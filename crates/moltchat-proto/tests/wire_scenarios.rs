//! End-to-end wire scenarios: outbound serialization meets inbound parsing.

use moltchat_proto::{signed_body, Command, Inbound, ServiceAnnouncement, Soul};

fn echo(source: &str, cmd: &Command) -> Inbound {
    Inbound::parse(&format!(":{source} {cmd}"))
}

#[test]
fn test_privmsg_roundtrip() {
    let cmd = Command::Privmsg {
        target: "#general".into(),
        text: "status: all good :)".into(),
    };
    let Inbound::Privmsg(msg) = echo("Alice!u@h", &cmd) else {
        panic!("expected privmsg");
    };
    assert_eq!(msg.channel, "#general");
    assert_eq!(msg.content, "status: all good :)");
    assert_eq!(msg.nick, "Alice");
}

#[test]
fn test_soul_tag_scenario() {
    let Inbound::Privmsg(msg) =
        Inbound::parse(":Alice!u@h PRIVMSG #general :hello [Soul:deadbeef] world")
    else {
        panic!("expected privmsg");
    };
    assert_eq!(msg.channel, "#general");
    assert_eq!(msg.nick, "Alice");
    assert_eq!(msg.content, "hello  world");
    assert_eq!(msg.soul_id.as_deref(), Some("deadbeef"));
    assert!(!msg.is_verified());
}

#[test]
fn test_signed_message_as_seen_by_peer() {
    let soul = Soul::from_seed("peer-seed", "Peer", "stoic", "LIGHT");
    let body = "I can review Rust code";
    let text = signed_body(soul.id(), body, &soul.signature_annotation(body));
    let cmd = Command::Privmsg {
        target: "#hire".into(),
        text,
    };

    let Inbound::Privmsg(msg) = echo("Peer!p@h", &cmd) else {
        panic!("expected privmsg");
    };
    assert_eq!(msg.content, body);
    assert_eq!(msg.soul_id.as_deref(), Some(soul.id()));
    assert!(msg.is_verified());

    // Only the annotation prefix travels, which matches the full MAC's prefix.
    let signature = msg.signature.unwrap();
    assert!(soul.sign(body).starts_with(&signature));
    assert!(!soul.verify(body, &signature));
}

#[test]
fn test_ping_scenario() {
    let Inbound::Ping { payload } = Inbound::parse("PING :abc123") else {
        panic!("expected ping");
    };
    assert_eq!(Command::Pong(payload).to_string(), "PONG abc123");
}

#[test]
fn test_service_offer_over_the_wire() {
    let soul = Soul::from_seed("seller", "", "", "");
    let offer = moltchat_proto::ServiceOffer {
        service: "Code Review".into(),
        price: "5 CLAW tokens".into(),
        provider: "Seller".into(),
        soul_id: soul.id().to_string(),
    };
    let body = offer.to_string();
    let text = signed_body(soul.id(), &body, &soul.signature_annotation(&body));
    let cmd = Command::Privmsg {
        target: "#hire".into(),
        text,
    };

    let Inbound::Privmsg(msg) = echo("Seller!s@h", &cmd) else {
        panic!("expected privmsg");
    };
    assert_eq!(
        ServiceAnnouncement::parse(&msg.content),
        Some(ServiceAnnouncement::Offer(offer))
    );
}

#[test]
fn test_join_part_quit_lines() {
    assert_eq!(
        Inbound::parse(":Bot!u@h JOIN #general"),
        Inbound::Join {
            channel: "#general".into(),
            nick: "Bot".into()
        }
    );
    assert_eq!(
        Inbound::parse(":Bot!u@h PART #general :later"),
        Inbound::Part {
            channel: "#general".into(),
            nick: "Bot".into()
        }
    );
    assert_eq!(
        Inbound::parse(":Bot!u@h QUIT :bye"),
        Inbound::Quit { nick: "Bot".into() }
    );
}
