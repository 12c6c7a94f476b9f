//! # Session Events
//!
//! Disconnects and transport errors are recorded and logged; the responder
//! never reconnects on its own and never takes the process down.

#[cfg(test)]
mod tests {
    use shared_bus::{RequestError, SessionEvent, SessionSignal, TransportError};
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::integration::support::Fixture;

    async fn wait_until(condition: impl Fn() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_up_event_recorded_on_open() {
        let fixture = Fixture::with_static_catalog().await;
        let monitor = fixture.manager.monitor();

        let observed = monitor.clone();
        wait_until(move || observed.event_count() >= 1).await;
        assert_eq!(monitor.last_event(), Some(SessionEvent::Up));
        assert!(!monitor.is_down());
    }

    #[tokio::test]
    async fn test_broker_disconnect_is_reported_not_recovered() {
        let fixture = Fixture::with_static_catalog().await;
        let monitor = fixture.manager.monitor();
        let responder = fixture.manager.session().client_name().clone();

        assert!(fixture.broker.force_disconnect(&responder, "broker shutdown"));

        let observed = monitor.clone();
        wait_until(move || observed.is_down()).await;
        assert_eq!(
            monitor.last_event(),
            Some(SessionEvent::Down {
                reason: "broker shutdown".to_string()
            })
        );
        assert!(!fixture.manager.session().is_connected());
        assert!(!fixture.broker.is_connected(&responder));

        // Requests now go unanswered
        let client = fixture.connect("client123").await;
        let result = fixture.request_grants(&client, "alice", "client123").await;
        assert!(matches!(result, Err(RequestError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_fatal() {
        let fixture = Fixture::with_static_catalog().await;
        let monitor = fixture.manager.monitor();
        let responder = fixture.manager.session().client_name().clone();

        assert!(fixture.broker.emit(
            &responder,
            SessionSignal::Error(TransportError::new("keepalive missed"))
        ));
        assert!(fixture.broker.emit(
            &responder,
            SessionSignal::Event(SessionEvent::FlowError {
                reason: "slow consumer".to_string()
            })
        ));

        let observed = monitor.clone();
        wait_until(move || observed.error_count() == 1 && observed.event_count() >= 2).await;
        assert_eq!(
            monitor.last_error(),
            Some(TransportError::new("keepalive missed"))
        );

        // Still serving
        let client = fixture.connect("client123").await;
        let granted = fixture
            .request_grants(&client, "alice", "client123")
            .await
            .unwrap();
        assert_eq!(granted.len(), 3);
    }

    #[tokio::test]
    async fn test_close_removes_responder_from_broker() {
        let fixture = Fixture::with_static_catalog().await;
        let responder = fixture.manager.session().client_name().clone();
        assert!(fixture.broker.is_connected(&responder));

        fixture.manager.close().await;
        assert!(!fixture.broker.is_connected(&responder));
        assert!(fixture.manager.monitor().is_down());

        // Idempotent
        fixture.manager.close().await;
    }
}
