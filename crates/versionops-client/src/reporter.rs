//! Snapshot delivery with retry and response classification

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use versionops_api::{IngestResponse, InventorySnapshot, ReportOutcome};

use crate::error::ReportError;
use crate::retry::{RetryPolicy, cancellable_sleep};
use crate::transport::IngestTransport;

const MAX_ERROR_BODY: usize = 512;

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 401/403
    Authentication,
    /// 429 and 5xx
    Retryable,
    /// Every other status
    Rejected,
}

impl StatusClass {
    #[must_use]
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            401 | 403 => StatusClass::Authentication,
            429 | 500..=599 => StatusClass::Retryable,
            _ => StatusClass::Rejected,
        }
    }
}

/// Record of one resolved report attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct ReportAttempt {
    /// Idempotency key of the snapshot sent
    pub snapshot_key: String,
    pub started_at: DateTime<Utc>,
    /// Status of the last response, if any arrived
    pub http_status: Option<u16>,
    /// Requests issued
    pub requests: u32,
    pub retry_count: u32,
    /// Backoff delays actually waited, in order
    pub delays: Vec<Duration>,
    pub outcome: ReportOutcome,
    pub error: Option<ReportError>,
}

impl ReportAttempt {
    fn start(snapshot_key: String) -> Self {
        Self {
            snapshot_key,
            started_at: Utc::now(),
            http_status: None,
            requests: 0,
            retry_count: 0,
            delays: Vec::new(),
            outcome: ReportOutcome::None,
            error: None,
        }
    }

    fn succeed(mut self) -> Self {
        self.outcome = ReportOutcome::Success;
        self
    }

    fn fail(mut self, error: ReportError) -> Self {
        self.outcome = ReportOutcome::Failed;
        self.error = Some(error);
        self
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == ReportOutcome::Success
    }
}

/// Delivers snapshots over an [`IngestTransport`].
///
/// Each call to [`send`](Reporter::send) resolves fully (delivered, rejected,
/// exhausted or cancelled) before returning, so a caller awaiting it never has
/// two reports in flight.
#[derive(Clone)]
pub struct Reporter {
    transport: Arc<dyn IngestTransport>,
    policy: RetryPolicy,
}

impl Reporter {
    pub fn new(transport: Arc<dyn IngestTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver `snapshot`, retrying transient failures with backoff.
    ///
    /// Cancellation is observed only while waiting between retries.
    #[instrument(skip_all, fields(host = %snapshot.host_id(), records = snapshot.len()))]
    pub async fn send(&self, snapshot: &InventorySnapshot, cancel: &CancellationToken) -> ReportAttempt {
        let key = snapshot.idempotency_key();
        let mut attempt = ReportAttempt::start(key.clone());

        let body = match serde_json::to_vec(snapshot) {
            Ok(body) => body,
            Err(e) => return attempt.fail(ReportError::Serialization(e.to_string())),
        };

        let max_attempts = self.policy.max_attempts.max(1);

        loop {
            attempt.requests += 1;

            let last = match self.transport.deliver(body.clone(), &key).await {
                Ok(response) => {
                    let status = response.status;
                    attempt.http_status = Some(status);

                    match StatusClass::of(status) {
                        StatusClass::Success => {
                            match serde_json::from_str::<IngestResponse>(&response.body) {
                                Ok(ack) => info!(
                                    status,
                                    accepted = ?ack.accepted,
                                    requests = attempt.requests,
                                    "inventory delivered"
                                ),
                                Err(e) => warn!(
                                    status,
                                    error = %e,
                                    "inventory delivered, unexpected response body"
                                ),
                            }
                            return attempt.succeed();
                        }
                        StatusClass::Authentication => {
                            warn!(status, "backend rejected credentials, not retrying this cycle");
                            return attempt.fail(ReportError::Authentication { status });
                        }
                        StatusClass::Rejected => {
                            let message = truncate(&response.body, MAX_ERROR_BODY);
                            warn!(status, %message, "backend rejected inventory");
                            return attempt.fail(ReportError::Rejected { status, message });
                        }
                        StatusClass::Retryable => format!("HTTP {status}"),
                    }
                }
                Err(e) => e.to_string(),
            };

            if attempt.requests >= max_attempts {
                let attempts = attempt.requests;
                warn!(requests = attempts, %last, "giving up on report");
                return attempt.fail(ReportError::Exhausted { attempts, last });
            }

            let delay = self.policy.next_delay(attempt.retry_count);
            warn!(
                request = attempt.requests,
                max_attempts,
                ?delay,
                error = %last,
                "report failed, retrying"
            );

            if !cancellable_sleep(delay, cancel).await {
                info!("report cancelled during backoff");
                return attempt.fail(ReportError::Cancelled);
            }
            attempt.delays.push(delay);
            attempt.retry_count += 1;
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
