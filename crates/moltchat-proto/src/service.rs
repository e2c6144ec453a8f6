//! Service marketplace overlay.
//!
//! Offers and requests are ordinary chat lines with a fixed shape:
//!
//! ```text
//! SERVICE OFFER: <name> | Price: <price> | Provider: <nick> | Soul: <id>
//! SERVICE REQUEST: <name> | Budget: <budget> | Requester: <nick>
//! ```
//!
//! Anyone in a channel can write these lines, so a parsed announcement is a
//! claim, not a proof.

use std::fmt;

const OFFER_PREFIX: &str = "SERVICE OFFER:";
const REQUEST_PREFIX: &str = "SERVICE REQUEST:";

/// An advertised service.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceOffer {
    /// Service name.
    pub service: String,
    /// Asking price, free-form.
    pub price: String,
    /// Nick of the provider.
    pub provider: String,
    /// Soul id of the provider.
    pub soul_id: String,
}

/// A request for a service.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceRequest {
    /// Service name.
    pub service: String,
    /// Budget, free-form.
    pub budget: String,
    /// Nick of the requester.
    pub requester: String,
}

/// A marketplace line recognised in chat content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceAnnouncement {
    /// `SERVICE OFFER: ...`
    Offer(ServiceOffer),
    /// `SERVICE REQUEST: ...`
    Request(ServiceRequest),
}

impl fmt::Display for ServiceOffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{OFFER_PREFIX} {} | Price: {} | Provider: {} | Soul: {}",
            self.service, self.price, self.provider, self.soul_id
        )
    }
}

impl fmt::Display for ServiceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{REQUEST_PREFIX} {} | Budget: {} | Requester: {}",
            self.service, self.budget, self.requester
        )
    }
}

impl fmt::Display for ServiceAnnouncement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceAnnouncement::Offer(offer) => offer.fmt(f),
            ServiceAnnouncement::Request(request) => request.fmt(f),
        }
    }
}

impl ServiceAnnouncement {
    /// Recognise an offer or request in message content.
    ///
    /// Field order after the service name does not matter and keys are
    /// matched case-insensitively. Returns `None` when the line is not a
    /// marketplace line or a required field is missing.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if let Some(rest) = content.strip_prefix(OFFER_PREFIX) {
            let fields = Fields::split(rest)?;
            return Some(ServiceAnnouncement::Offer(ServiceOffer {
                service: fields.name.to_string(),
                price: fields.get("price")?.to_string(),
                provider: fields.get("provider")?.to_string(),
                soul_id: fields.get("soul")?.to_string(),
            }));
        }
        if let Some(rest) = content.strip_prefix(REQUEST_PREFIX) {
            let fields = Fields::split(rest)?;
            return Some(ServiceAnnouncement::Request(ServiceRequest {
                service: fields.name.to_string(),
                budget: fields.get("budget")?.to_string(),
                requester: fields.get("requester")?.to_string(),
            }));
        }
        None
    }

    /// Name of the service offered or requested.
    pub fn service(&self) -> &str {
        match self {
            ServiceAnnouncement::Offer(offer) => &offer.service,
            ServiceAnnouncement::Request(request) => &request.service,
        }
    }
}

struct Fields<'a> {
    name: &'a str,
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Fields<'a> {
    fn split(rest: &'a str) -> Option<Self> {
        let mut segments = rest.split('|').map(str::trim);
        let name = segments.next().filter(|n| !n.is_empty())?;
        let pairs = segments
            .filter_map(|seg| seg.split_once(':'))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();
        Some(Self { name, pairs })
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer() -> ServiceOffer {
        ServiceOffer {
            service: "Code Review".into(),
            price: "5 CLAW tokens".into(),
            provider: "Wilsond".into(),
            soul_id: "abc123".into(),
        }
    }

    #[test]
    fn test_offer_format() {
        assert_eq!(
            offer().to_string(),
            "SERVICE OFFER: Code Review | Price: 5 CLAW tokens | Provider: Wilsond | Soul: abc123"
        );
    }

    #[test]
    fn test_request_format() {
        let request = ServiceRequest {
            service: "Security Audit".into(),
            budget: "20 CLAW".into(),
            requester: "Alice".into(),
        };
        assert_eq!(
            request.to_string(),
            "SERVICE REQUEST: Security Audit | Budget: 20 CLAW | Requester: Alice"
        );
    }

    #[test]
    fn test_parse_offer() {
        let parsed = ServiceAnnouncement::parse(&offer().to_string());
        assert_eq!(parsed, Some(ServiceAnnouncement::Offer(offer())));
    }

    #[test]
    fn test_parse_tolerates_order_and_spacing() {
        let parsed = ServiceAnnouncement::parse(
            "  SERVICE REQUEST:Translation|requester:Bob |  BUDGET : 3 coins ",
        );
        assert_eq!(
            parsed,
            Some(ServiceAnnouncement::Request(ServiceRequest {
                service: "Translation".into(),
                budget: "3 coins".into(),
                requester: "Bob".into(),
            }))
        );
    }

    #[test]
    fn test_parse_rejects_incomplete() {
        assert_eq!(
            ServiceAnnouncement::parse("SERVICE OFFER: X | Price: 1 | Provider: a"),
            None
        );
        assert_eq!(ServiceAnnouncement::parse("SERVICE REQUEST: | Budget: 1"), None);
        assert_eq!(ServiceAnnouncement::parse("hello world"), None);
    }

    #[test]
    fn test_price_with_colon() {
        let parsed = ServiceAnnouncement::parse(
            "SERVICE OFFER: Timing | Price: 1:30 rate | Provider: p | Soul: s",
        );
        match parsed {
            Some(ServiceAnnouncement::Offer(o)) => assert_eq!(o.price, "1:30 rate"),
            other => panic!("expected offer, got {:?}", other),
        }
    }
}
