//! HTTP client for the versionops backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use versionops_api::{ApplicationConfig, HostRegistration, RegistrationResponse};

use crate::error::{ClientError, Result, TransportError};
use crate::transport::{IngestTransport, TransportResponse};

/// Ingestion endpoint, relative to the backend URL
pub const INVENTORY_PATH: &str = "api/agent/inventory";
/// Custom plugin definitions, relative to the backend URL
pub const APPLICATION_CONFIGS_PATH: &str = "api/agent/application-configs";
/// Startup registration endpoint, relative to the backend URL
pub const REGISTER_PATH: &str = "api/agent/register";

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// `User-Agent` sent with every request
#[must_use]
pub fn user_agent() -> String {
    format!("versionops-agent/{}", env!("CARGO_PKG_VERSION"))
}

/// Authenticated client for the agent-facing backend API
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"***")
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a client for `base_url` authenticating with `token`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    ///
    /// # Example
    /// ```no_run
    /// use std::time::Duration;
    /// use versionops_client::HttpClient;
    ///
    /// let client = HttpClient::new("https://versionops.example.com", "secret", Duration::from_secs(30))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(
        base_url: impl AsRef<str>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        // One report per interval: keep no idle connection open while sleeping
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent())
            .pool_max_idle_per_host(0)
            .build()?;
        Self::with_client(base_url, token, client)
    }

    /// Create a client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(
        base_url: impl AsRef<str>,
        token: impl Into<String>,
        client: Client,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        // Keep any path prefix when joining relative endpoints
        let path = format!("{}/", base_url.path().trim_end_matches('/'));
        base_url.set_path(&path);

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL from a relative endpoint path
    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(ClientError::Url)
    }

    /// Perform an authenticated GET request and deserialize the response
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Perform an authenticated JSON POST request and deserialize the response
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        Ok(response.json().await?)
    }

    /// Announce this host to the backend
    ///
    /// # Errors
    /// Returns an error if the request fails or the backend rejects the registration.
    #[instrument(
        skip(self, registration),
        fields(backend = %self.base_url, hostname = %registration.hostname)
    )]
    pub async fn register(
        &self,
        registration: &HostRegistration,
    ) -> Result<RegistrationResponse> {
        let response: RegistrationResponse = self.post(REGISTER_PATH, registration).await?;
        debug!(host_id = ?response.host_id, "host registered");
        Ok(response)
    }

    /// Fetch custom plugin definitions published by the backend
    ///
    /// # Errors
    /// Returns an error if the request fails or the backend returns an error.
    #[instrument(skip(self), fields(backend = %self.base_url))]
    pub async fn application_configs(&self) -> Result<Vec<ApplicationConfig>> {
        let configs: Vec<ApplicationConfig> = self.get(APPLICATION_CONFIGS_PATH).await?;
        debug!(count = configs.len(), "fetched application configs");
        Ok(configs)
    }
}

#[async_trait]
impl IngestTransport for HttpClient {
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn deliver(
        &self,
        body: Vec<u8>,
        idempotency_key: &str,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = self
            .url(INVENTORY_PATH)
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .header(IDEMPOTENCY_KEY, idempotency_key)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(status, "ingest response");

        Ok(TransportResponse { status, body })
    }
}
