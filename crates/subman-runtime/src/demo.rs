//! Demo requester
//!
//! Plays the trading UI against the loopback broker: connects as
//! `clientName`, asks the responder for its subscriptions, then publishes one
//! rate update per granted asset class and counts what arrives.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shared_bus::{
    topic_matches, BrokerSession, ConnectionError, InboundMessage, LoopbackBroker, RequestError,
    SendError, TopicError,
};
use std::str::FromStr;
use std::time::Duration;
use subman_provisioning::{codec, ConfigError, DecodeError, RatesCatalog, SubscriptionRequest};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BrokerConfig;

/// `SUBMAN_DEMO_REQUESTER=<username>:<clientName>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoRequester {
    pub username: String,
    pub client_name: String,
}

impl FromStr for DemoRequester {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "SUBMAN_DEMO_REQUESTER".to_string(),
            value: raw.to_string(),
        };
        let (username, client_name) = raw.split_once(':').ok_or_else(invalid)?;
        let (username, client_name) = (username.trim(), client_name.trim());
        if username.is_empty() || client_name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            username: username.to_string(),
            client_name: client_name.to_string(),
        })
    }
}

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("demo client failed to connect: {0}")]
    Connection(#[from] ConnectionError),

    #[error("provisioning request failed: {0}")]
    Request(#[from] RequestError),

    #[error("unreadable provisioning reply: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid demo topic: {0}")]
    Topic(#[from] TopicError),

    #[error("failed to publish rate update: {0}")]
    Publish(#[from] SendError),

    #[error("failed to encode demo payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One security quote as published on `<ns>/rates/v1/<class>/<term>/<cusip>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityInfo {
    pub security_type: String,
    pub security_term: String,
    pub cusip: String,
    pub price: f64,
    #[serde(rename = "yield")]
    pub yield_rate: f64,
}

/// One quote per default asset class.
pub fn sample_securities() -> Vec<SecurityInfo> {
    [
        ("bill", "3M", "912797GK7", 98.74, 5.21),
        ("bond", "30Y", "912810TV0", 96.41, 4.52),
        ("note", "10Y", "91282CJZ5", 99.13, 4.38),
    ]
    .into_iter()
    .map(|(class, term, cusip, price, yield_rate)| SecurityInfo {
        security_type: class.to_string(),
        security_term: term.to_string(),
        cusip: cusip.to_string(),
        price,
        yield_rate,
    })
    .collect()
}

/// What the demo requester observed.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub granted: Vec<String>,
    pub published: usize,
    pub received: Vec<SecurityInfo>,
}

/// Run one request/publish round trip as `requester`.
pub async fn run_demo(
    broker: &LoopbackBroker,
    broker_config: &BrokerConfig,
    catalog: &RatesCatalog,
    requester: &DemoRequester,
    reply_timeout: Duration,
) -> Result<DemoReport, DemoError> {
    let properties = broker_config
        .session_properties()
        .with_client_name(requester.client_name.clone());
    let mut connection = broker.open(properties).await?;
    let session = connection.session.clone();

    let result = async {
        let topic = catalog.request_topic(&requester.username)?;
        let request = SubscriptionRequest::new(
            requester.username.clone(),
            requester.client_name.clone(),
        );
        info!(requester = %requester.username, client = %requester.client_name, topic = %topic, "Demo requester asking for subscriptions");

        let reply = session
            .request(topic.as_str(), codec::encode_request(&request)?, reply_timeout)
            .await?;
        let granted = codec::decode_response(reply.attachment())?;
        info!(requester = %requester.username, granted = ?granted, "Demo requester granted");

        let mut published = 0;
        for security in sample_securities() {
            let tick = catalog.rate_topic(
                &security.security_type,
                &security.security_term,
                &security.cusip,
            )?;
            if !granted.iter().any(|grant| topic_matches(grant, tick.as_str())) {
                continue;
            }
            broker
                .publish(tick.as_str(), Bytes::from(serde_json::to_vec(&security)?))
                .await?;
            published += 1;
        }

        let received = collect_ticks(&mut connection.inbound, published, reply_timeout).await;
        if received.len() < published {
            warn!(expected = published, received = received.len(), "Demo requester missed rate updates");
        }
        info!(client = %requester.client_name, received = received.len(), "Demo requester received rate updates");

        Ok::<_, DemoError>(DemoReport {
            granted,
            published,
            received,
        })
    }
    .await;

    session.disconnect().await;
    result
}

async fn collect_ticks(
    inbound: &mut mpsc::Receiver<InboundMessage>,
    expected: usize,
    wait: Duration,
) -> Vec<SecurityInfo> {
    let mut received = Vec::with_capacity(expected);
    while received.len() < expected {
        match tokio::time::timeout(wait, inbound.recv()).await {
            Ok(Some(message)) => match serde_json::from_slice(message.attachment()) {
                Ok(security) => received.push(security),
                Err(e) => warn!(topic = %message.destination, error = %e, "Unreadable rate update"),
            },
            Ok(None) | Err(_) => break,
        }
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requester() {
        let requester: DemoRequester = "alice:client123".parse().unwrap();
        assert_eq!(requester.username, "alice");
        assert_eq!(requester.client_name, "client123");

        for bad in ["alice", ":client", "alice: ", ""] {
            assert!(bad.parse::<DemoRequester>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_security_wire_shape() {
        let security = &sample_securities()[1];
        let value = serde_json::to_value(security).unwrap();
        assert_eq!(value["securityType"], "bond");
        assert_eq!(value["securityTerm"], "30Y");
        assert_eq!(value["cusip"], "912810TV0");
        assert!(value.get("yield").is_some());
    }

    fn demo_broker_config() -> BrokerConfig {
        BrokerConfig {
            host: "loopback:55555".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            vpn: "default".to_string(),
            client_name: None,
        }
    }

    #[tokio::test]
    async fn test_unreadable_reply_still_disconnects() {
        let broker = LoopbackBroker::new("default");
        let catalog = RatesCatalog::new("bofa");
        let responder = broker
            .open(demo_broker_config().session_properties().with_client_name("responder"))
            .await
            .unwrap();
        responder
            .session
            .subscribe(&catalog.request_pattern().unwrap(), true)
            .await
            .unwrap();
        let replier = responder.session.clone();
        let mut inbound = responder.inbound;
        tokio::spawn(async move {
            while let Some(request) = inbound.recv().await {
                let _ = replier
                    .send_reply(&request, Bytes::from_static(b"not json"))
                    .await;
            }
        });

        let requester: DemoRequester = "alice:client123".parse().unwrap();
        let result = run_demo(
            &broker,
            &demo_broker_config(),
            &catalog,
            &requester,
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(DemoError::Decode(_))));
        let client = shared_bus::ClientIdentity::new("client123").unwrap();
        assert!(!broker.is_connected(&client));
    }

    #[test]
    fn test_every_sample_class_is_in_catalog() {
        let catalog = RatesCatalog::new("bofa");
        let grants = catalog.default_grants().unwrap();
        for security in sample_securities() {
            let tick = catalog
                .rate_topic(&security.security_type, &security.security_term, &security.cusip)
                .unwrap();
            assert!(grants.iter().any(|g| g.matches(tick.as_str())));
        }
    }
}
