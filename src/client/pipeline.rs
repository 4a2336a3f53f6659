//! The authenticated request pipeline.
//!
//! Every outbound call flows through [`RequestPipeline::execute`]: the
//! interceptor chain attaches the bearer credential and logs, the
//! transport transmits, and on an authorization-denied status (HTTP 403)
//! the pipeline performs the bounded refresh-and-replay sequence before
//! surfacing the outcome. This is a single linear decision: one
//! conditional branch (retry-eligible vs not), no deeper state.
//!
//! Network-unreachable errors and non-403 HTTP statuses are never retried
//! here; they surface to the caller, who decides user-facing messaging.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::client::auth::{AuthInterceptor, RefreshBudget};
use crate::client::interceptor::{HttpRequest, HttpResponse, InterceptorChain, RequestContext};
use crate::client::logging::LoggingInterceptor;
use crate::client::routes;
use crate::error::{Error, Result};
use crate::session::{keys, persist_grant, SessionStore};
use crate::types::{RefreshRequest, TokenGrant};

/// Connection settings for the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the GetRC backend, e.g. `http://192.168.29.124:8080/`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config for the given base URL with a 30 second timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Transmits one wire-level request and returns the wire-level response.
///
/// Non-2xx statuses are returned as responses, not errors; classifying
/// them is the pipeline's and caller's job. Only transport-level failures
/// (connect, timeout) become [`Error::Network`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and collect the full response body.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Build a transport from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::validation(format!("invalid base URL {}: {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| Error::validation(format!("invalid request path {}: {e}", request.path)))?;

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            // Sets Content-Type: application/json.
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// The authenticated request pipeline.
///
/// Owns the interceptor chain, the transport, the session store, and the
/// refresh budget. The budget is instance state, injected here rather
/// than held in a module global, so tests get a fresh cap per pipeline.
pub struct RequestPipeline {
    transport: Arc<dyn HttpTransport>,
    chain: InterceptorChain,
    store: Arc<dyn SessionStore>,
    budget: RefreshBudget,
}

impl RequestPipeline {
    /// Pipeline with the default chain (bearer injection + redacted
    /// logging) and the default refresh budget.
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_budget(transport, store, RefreshBudget::new())
    }

    /// Pipeline with an explicit refresh budget.
    pub fn with_budget(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn SessionStore>,
        budget: RefreshBudget,
    ) -> Self {
        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(AuthInterceptor::new(store.clone())));
        chain.add(Arc::new(LoggingInterceptor::new()));
        Self {
            transport,
            chain,
            store,
            budget,
        }
    }

    /// The refresh budget, for inspection.
    pub fn budget(&self) -> &RefreshBudget {
        &self.budget
    }

    /// The session store this pipeline reads credentials from.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Execute one request through the pipeline.
    ///
    /// On HTTP 403 with refresh budget remaining: reserve a budget slot,
    /// call the refresh endpoint with the stored refresh token, persist
    /// the new credentials, rewrite the Authorization header, and resubmit
    /// the original request once, returning that outcome as if it were
    /// the first attempt. A refresh failure propagates without a resubmit.
    /// Any other status, or an exhausted budget, surfaces unchanged.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let context = RequestContext::new(request.path.clone(), request.method.to_string());
        let mut request = request;
        self.chain.process_request(&mut request, &context).await?;

        let mut response = self.transport.send(&request).await?;

        if response.status == 403 {
            if self.budget.try_reserve() {
                tracing::info!(
                    path = %context.path,
                    used = self.budget.used(),
                    limit = self.budget.limit(),
                    "access token rejected (403) - refreshing and replaying"
                );
                let grant = self.refresh_session().await?;
                request.set_header("Authorization", format!("Bearer {}", grant.token));
                context.set_metadata("replayed".to_string(), "true".to_string());
                response = self.transport.send(&request).await?;
            } else {
                tracing::warn!(
                    path = %context.path,
                    "refresh budget exhausted - surfacing 403 to caller"
                );
            }
        }

        self.chain.process_response(&mut response, &context).await?;
        Ok(response)
    }

    /// Exchange the stored refresh token for new credentials.
    ///
    /// Issued directly on the transport, outside the auth chain, so the
    /// refresh call itself can never recurse into another refresh.
    async fn refresh_session(&self) -> Result<TokenGrant> {
        let refresh_token = self
            .store
            .get(keys::REFRESH_TOKEN)
            .await?
            .ok_or_else(|| Error::authentication("no refresh token stored"))?;

        let body = serde_json::to_value(RefreshRequest { refresh_token })?;
        let request = HttpRequest::post(routes::REFRESH_TOKEN, body);
        let response = self.transport.send(&request).await?;

        if !response.is_success() {
            return Err(Error::authentication(format!(
                "token refresh failed with status {}",
                response.status
            )));
        }

        let grant: TokenGrant = response.json()?;
        persist_grant(&*self.store, &grant).await?;
        tracing::debug!("token refresh succeeded - new credentials persisted");
        Ok(grant)
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("chain", &self.chain)
            .field("budget", &self.budget)
            .finish()
    }
}
