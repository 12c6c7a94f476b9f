//! # Request Codec
//!
//! JSON wire format of the provisioning protocol.
//!
//! ```text
//! request   {"username":"alice","clientName":"client123"}
//! response  {"subscriptions":["bofa/rates/v1/bill/>","bofa/rates/v1/bond/>"]}
//! ```
//!
//! Requests carrying fields other than `username` and `clientName` are
//! rejected as malformed. No size limit is enforced.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::{SubscriptionRequest, SubscriptionResponse};
use crate::error::DecodeError;

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct WireRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(rename = "clientName", default, skip_serializing_if = "Option::is_none")]
    client_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireResponse<S> {
    subscriptions: Vec<S>,
}

/// Decode a request attachment.
pub fn decode_request(payload: &[u8]) -> Result<SubscriptionRequest, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    let wire: WireRequest =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let username = wire.username.ok_or(DecodeError::MissingField("username"))?;
    let client_name = wire
        .client_name
        .ok_or(DecodeError::MissingField("clientName"))?;

    Ok(SubscriptionRequest::new(username, client_name))
}

/// Encode a response, topics in grant order.
pub fn encode_response(response: &SubscriptionResponse) -> Result<Bytes, serde_json::Error> {
    let wire = WireResponse {
        subscriptions: response
            .granted_topics()
            .iter()
            .map(|topic| topic.as_str())
            .collect(),
    };
    serde_json::to_vec(&wire).map(Bytes::from)
}

/// Encode a request the way a requester sends it.
pub fn encode_request(request: &SubscriptionRequest) -> Result<Bytes, serde_json::Error> {
    let wire = WireRequest {
        username: Some(request.requester_username.clone()),
        client_name: Some(request.target_client_identity.clone()),
    };
    serde_json::to_vec(&wire).map(Bytes::from)
}

/// Decode a reply into the granted topic strings.
pub fn decode_response(payload: &[u8]) -> Result<Vec<String>, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }
    let wire: WireResponse<String> =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Ok(wire.subscriptions)
}
