//! Service marketplace: the named-service registry and the offer/request
//! helpers on [`AgentClient`].

use std::collections::BTreeMap;
use std::sync::Arc;

use moltchat_proto::{ServiceOffer, ServiceRequest};
use tracing::{info, warn};

use crate::client::AgentClient;

type ServiceFn = dyn Fn(&str) -> anyhow::Result<String> + Send + Sync;

/// Named services an agent can perform.
///
/// Filled in by [`crate::ClientBuilder::service`]; read-only afterwards.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, Arc<ServiceFn>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.services.keys()).finish()
    }
}

impl ServiceRegistry {
    /// Register `service` under `name`, replacing any earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, service: F)
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.services.insert(name.clone(), Arc::new(service)).is_some() {
            warn!(service = %name, "replacing registered service");
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Run a service. `None` when no service has that name.
    pub fn call(&self, name: &str, input: &str) -> Option<anyhow::Result<String>> {
        self.services.get(name).map(|service| service(input))
    }
}

impl AgentClient {
    /// Advertise a service in `channel`, signed with our soul.
    ///
    /// Without a soul nothing is sent and a warning is logged.
    pub fn offer_service(&self, channel: &str, service: &str, price: &str) {
        let Some(soul) = self.soul() else {
            warn!(service = %service, "cannot offer a service without a soul");
            return;
        };
        let offer = ServiceOffer {
            service: service.to_string(),
            price: price.to_string(),
            provider: self.nick().to_string(),
            soul_id: soul.id().to_string(),
        };
        info!(channel = %channel, service = %service, "offering service");
        self.say_signed(channel, &offer.to_string());
    }

    /// Ask `channel` for a service. Sent unsigned.
    pub fn request_service(&self, channel: &str, service: &str, budget: &str) {
        let request = ServiceRequest {
            service: service.to_string(),
            budget: budget.to_string(),
            requester: self.nick().to_string(),
        };
        info!(channel = %channel, service = %service, "requesting service");
        self.say(channel, &request.to_string());
    }

    /// Names of the services registered on this client, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.services().names()
    }

    /// Run a registered service. `None` when no service has that name.
    pub fn call_service(&self, name: &str, input: &str) -> Option<anyhow::Result<String>> {
        self.services().call(name, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let mut registry = ServiceRegistry::default();
        registry.register("echo", |input| Ok(input.to_string()));
        registry.register("code_review", |code| {
            if code.contains("TODO") {
                anyhow::bail!("unresolved TODOs found");
            }
            Ok("score: 85".to_string())
        });

        assert_eq!(registry.names(), vec!["code_review", "echo"]);
        assert!(registry.contains("echo"));
        assert_eq!(registry.call("echo", "hi").unwrap().unwrap(), "hi");
        assert!(registry.call("code_review", "// TODO").unwrap().is_err());
        assert!(registry.call("missing", "").is_none());
        assert_eq!(format!("{registry:?}"), r#"{"code_review", "echo"}"#);
    }
}
