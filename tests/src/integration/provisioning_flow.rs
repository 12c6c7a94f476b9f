//! # Provisioning Flow
//!
//! A requester publishes on `ns/rates/v1/subman/request/<user>`, the responder
//! grants topics to the named client and replies on the requester's inbox.
//! The granted client then receives rate updates published on those topics.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use shared_bus::{ClientIdentity, RequestError, Topic};
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::integration::support::{topics, Fixture};

    fn subscriptions(fixture: &Fixture, client: &str) -> Vec<String> {
        fixture
            .broker
            .subscriptions_of(&ClientIdentity::new(client).unwrap())
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_request_grants_catalog_and_replies() {
        let fixture = Fixture::with_static_catalog().await;
        let client = fixture.connect("client123").await;

        let granted = fixture
            .request_grants(&client, "alice", "client123")
            .await
            .unwrap();

        assert_eq!(granted, topics(&["bill", "bond", "note"]));
        assert_eq!(subscriptions(&fixture, "client123"), granted);
    }

    #[tokio::test]
    async fn test_granted_client_receives_rate_updates() {
        let fixture = Fixture::with_static_catalog().await;
        let mut client = fixture.connect("client123").await;
        fixture
            .request_grants(&client, "alice", "client123")
            .await
            .unwrap();

        let delivered = fixture
            .broker
            .publish("ns/rates/v1/bond/10Y/912828YK0", Bytes::from_static(b"{\"price\":99.5}"))
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let tick = timeout(Duration::from_secs(1), client.inbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tick.destination, "ns/rates/v1/bond/10Y/912828YK0");
    }

    #[tokio::test]
    async fn test_control_plane_grants_for_another_client() {
        let fixture = Fixture::with_static_catalog().await;
        let control = fixture.connect("control-plane").await;
        let _trader = fixture.connect("trader-7").await;

        let granted = fixture
            .request_grants(&control, "alice", "trader-7")
            .await
            .unwrap();

        assert_eq!(subscriptions(&fixture, "trader-7"), granted);
        assert!(subscriptions(&fixture, "control-plane").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_requests_get_no_reply_and_no_grants() {
        let fixture = Fixture::with_static_catalog().await;
        let client = fixture.connect("client123").await;

        for payload in [
            Bytes::new(),
            Bytes::from_static(br#"{"username":"alice"}"#),
            Bytes::from_static(b"definitely not json"),
            Bytes::from_static(br#"{"username":"alice","clientName":"  "}"#),
        ] {
            let result = fixture.request_raw(&client, "alice", payload).await;
            assert!(matches!(result, Err(RequestError::Timeout(_))));
        }
        assert!(subscriptions(&fixture, "client123").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_gets_empty_reply() {
        let fixture = Fixture::with_static_catalog().await;
        let client = fixture.connect("client123").await;

        // First grant is refused by the broker, so nothing was applied
        let granted = fixture
            .request_grants(&client, "alice", "not-connected")
            .await
            .unwrap();
        assert!(granted.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_request_lists_each_topic_once() {
        let fixture = Fixture::with_static_catalog().await;
        let client = fixture.connect("client123").await;

        let first = fixture
            .request_grants(&client, "alice", "client123")
            .await
            .unwrap();
        let second = fixture
            .request_grants(&client, "alice", "client123")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(subscriptions(&fixture, "client123").len(), 3);
    }

    #[tokio::test]
    async fn test_entitlements_decide_grants() {
        let fixture = Fixture::with_entitlements("alice:bill|bond;bob:note").await;
        let client = fixture.connect("client123").await;

        let granted = fixture
            .request_grants(&client, "bob", "client123")
            .await
            .unwrap();
        assert_eq!(granted, topics(&["note"]));

        // Unknown requesters are refused silently
        let refused = fixture.request_grants(&client, "mallory", "client123").await;
        assert!(matches!(refused, Err(RequestError::Timeout(_))));
        assert_eq!(subscriptions(&fixture, "client123"), topics(&["note"]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requesters_do_not_interfere() {
        let fixture = Fixture::with_entitlements("alice:bill|bond;bob:note").await;
        let alice = fixture.connect("client-a").await;
        let bob = fixture.connect("client-b").await;

        let (a, b) = tokio::join!(
            fixture.request_grants(&alice, "alice", "client-a"),
            fixture.request_grants(&bob, "bob", "client-b"),
        );

        assert_eq!(a.unwrap(), topics(&["bill", "bond"]));
        assert_eq!(b.unwrap(), topics(&["note"]));
        assert_eq!(subscriptions(&fixture, "client-a"), topics(&["bill", "bond"]));
        assert_eq!(subscriptions(&fixture, "client-b"), topics(&["note"]));
    }

    #[tokio::test]
    async fn test_requests_outside_pattern_are_not_seen() {
        let fixture = Fixture::with_static_catalog().await;
        let client = fixture.connect("client123").await;

        let pattern = fixture.catalog.request_pattern().unwrap();
        assert!(!pattern.matches("ns/rates/v1/subman/request/alice/extra"));

        let payload = Bytes::from_static(br#"{"username":"alice","clientName":"client123"}"#);
        let result = client
            .session
            .request(
                "ns/rates/v1/subman/request/alice/extra",
                payload,
                Duration::from_millis(200),
            )
            .await;
        assert!(matches!(result, Err(RequestError::Timeout(_))));
        assert_eq!(
            fixture.manager.listening_on(),
            Some(Topic::new("ns/rates/v1/subman/request/*").unwrap())
        );
    }
}
