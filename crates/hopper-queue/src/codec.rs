//! Payload codec
//!
//! Payloads travel as JSON objects keyed by field name, so producers and
//! workers only need to agree on field names, not on field order.

use serde::{de::DeserializeOwned, Serialize};

pub fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(payload)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}
