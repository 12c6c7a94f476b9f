//! Fixtures shared by the integration flows.

use bytes::Bytes;
use shared_bus::{InboundMessage, LoopbackBroker, LoopbackConnection, RequestError, SessionProperties};
use std::sync::Arc;
use std::time::Duration;
use subman_provisioning::{
    codec, Credentials, EntitlementTablePolicy, ProvisioningHandler, RatesCatalog,
    SessionManager, StaticCatalogPolicy, SubscriptionPolicy, SubscriptionRequest,
};

pub const VPN: &str = "default";
pub const NAMESPACE: &str = "ns";
pub const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// A loopback broker with a responder listening on the request pattern.
pub struct Fixture {
    pub broker: LoopbackBroker,
    pub manager: SessionManager,
    pub catalog: RatesCatalog,
}

impl Fixture {
    pub async fn with_static_catalog() -> Self {
        let catalog = RatesCatalog::new(NAMESPACE);
        let policy = StaticCatalogPolicy::new(catalog.clone()).expect("valid namespace");
        Self::with_policy(catalog, Arc::new(policy)).await
    }

    pub async fn with_entitlements(table: &str) -> Self {
        let catalog = RatesCatalog::new(NAMESPACE);
        let policy = EntitlementTablePolicy::parse(catalog.clone(), table).expect("valid table");
        Self::with_policy(catalog, Arc::new(policy)).await
    }

    pub async fn with_policy(catalog: RatesCatalog, policy: Arc<dyn SubscriptionPolicy>) -> Self {
        let broker = LoopbackBroker::new(VPN).with_user("subman", "secret");
        let manager = SessionManager::open(
            &broker,
            Credentials::new("subman", "secret"),
            "localhost:55555",
            VPN,
        )
        .await
        .expect("responder connects");

        let handler = ProvisioningHandler::new(manager.session(), policy);
        manager
            .listen_for_requests(
                &catalog.request_pattern().expect("valid pattern"),
                Arc::new(handler),
            )
            .await
            .expect("responder listens");

        Self {
            broker,
            manager,
            catalog,
        }
    }

    /// Connect another client under `name`.
    pub async fn connect(&self, name: &str) -> LoopbackConnection {
        let properties =
            SessionProperties::new("localhost:55555", "subman", "secret", VPN).with_client_name(name);
        self.broker.open(properties).await.expect("client connects")
    }

    /// Send a raw request payload as `requester` on its request topic.
    pub async fn request_raw(
        &self,
        requester: &LoopbackConnection,
        username: &str,
        payload: Bytes,
    ) -> Result<InboundMessage, RequestError> {
        let topic = self.catalog.request_topic(username).expect("valid topic");
        requester
            .session
            .request(topic.as_str(), payload, REPLY_TIMEOUT)
            .await
    }

    /// Ask for subscriptions for `target` as `username`, returning the granted list.
    pub async fn request_grants(
        &self,
        requester: &LoopbackConnection,
        username: &str,
        target: &str,
    ) -> Result<Vec<String>, RequestError> {
        let payload = codec::encode_request(&SubscriptionRequest::new(username, target))
            .expect("request encodes");
        let reply = self.request_raw(requester, username, payload).await?;
        Ok(codec::decode_response(reply.attachment()).expect("reply decodes"))
    }
}

pub fn topics(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| format!("{NAMESPACE}/rates/v1/{name}/>")).collect()
}
