//! Provisioning request and response values

use shared_bus::{ClientIdentity, Topic};

use crate::error::ValidationError;

/// A decoded subscription request.
///
/// `target_client_identity` names the client the grants are added for. It is
/// not the sender of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequest {
    pub requester_username: String,
    pub target_client_identity: String,
}

impl SubscriptionRequest {
    pub fn new(requester_username: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            requester_username: requester_username.into(),
            target_client_identity: target.into(),
        }
    }

    /// Turn the raw target field into a broker client identity.
    pub fn target(&self) -> Result<ClientIdentity, ValidationError> {
        Ok(ClientIdentity::new(self.target_client_identity.clone())?)
    }
}

/// Topics actually granted for one request, in grant order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionResponse {
    granted_topics: Vec<Topic>,
}

impl SubscriptionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a grant the broker confirmed.
    pub fn push(&mut self, topic: Topic) {
        self.granted_topics.push(topic);
    }

    pub fn granted_topics(&self) -> &[Topic] {
        &self.granted_topics
    }

    pub fn len(&self) -> usize {
        self.granted_topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted_topics.is_empty()
    }
}

impl From<Vec<Topic>> for SubscriptionResponse {
    fn from(granted_topics: Vec<Topic>) -> Self {
        Self { granted_topics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::IdentityError;

    #[test]
    fn test_target_identity_is_validated() {
        let request = SubscriptionRequest::new("alice", "client123");
        assert_eq!(request.target().unwrap().as_str(), "client123");

        let blank = SubscriptionRequest::new("alice", "   ");
        assert_eq!(
            blank.target(),
            Err(ValidationError::InvalidTarget(IdentityError::Empty))
        );
    }

    #[test]
    fn test_response_keeps_grant_order() {
        let mut response = SubscriptionResponse::new();
        assert!(response.is_empty());

        response.push(Topic::new("ns/rates/v1/note/>").unwrap());
        response.push(Topic::new("ns/rates/v1/bill/>").unwrap());

        let topics: Vec<&str> = response.granted_topics().iter().map(Topic::as_str).collect();
        assert_eq!(topics, vec!["ns/rates/v1/note/>", "ns/rates/v1/bill/>"]);
        assert_eq!(response.len(), 2);
    }
}
