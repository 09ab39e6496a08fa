//! Delivery transport seam

use async_trait::async_trait;

use crate::error::TransportError;

/// Status and body of a delivery response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one serialized snapshot to the ingestion endpoint.
///
/// Implementations make exactly one request per call; retries belong to the
/// [`Reporter`](crate::Reporter).
#[async_trait]
pub trait IngestTransport: Send + Sync {
    async fn deliver(
        &self,
        body: Vec<u8>,
        idempotency_key: &str,
    ) -> Result<TransportResponse, TransportError>;
}
