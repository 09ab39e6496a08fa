//! versionops-client: Backend client and snapshot reporter
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tokio_util::sync::CancellationToken;
//! use versionops_client::{HttpClient, Reporter, RetryPolicy};
//!
//! # async fn example(snapshot: versionops_api::InventorySnapshot) -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new("https://versionops.example.com", "token", Duration::from_secs(30))?;
//! let reporter = Reporter::new(Arc::new(client), RetryPolicy::default());
//!
//! let attempt = reporter.send(&snapshot, &CancellationToken::new()).await;
//! println!("{} after {} requests", attempt.outcome, attempt.requests);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod reporter;
pub mod retry;
pub mod transport;

pub use error::{ClientError, ReportError, Result, TransportError};
pub use http::{HttpClient, user_agent};
pub use reporter::{ReportAttempt, Reporter, StatusClass};
pub use retry::{RetryPolicy, cancellable_sleep};
pub use transport::{IngestTransport, TransportResponse};
