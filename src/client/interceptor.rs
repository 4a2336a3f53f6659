//! Request/response interceptors for the outbound HTTP pipeline.
//!
//! Interceptors operate on the wire-level request before transmission and
//! on the response after receipt. This is where header injection (bearer
//! credentials) and redacted logging live; the 403 refresh-and-replay
//! decision itself belongs to [`crate::client::pipeline::RequestPipeline`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// How the response body should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Textual (JSON) payload.
    Text,
    /// Raw binary payload (RC image or document bytes).
    Binary,
}

/// Context shared by all interceptors for one pipeline execution.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request path, for correlation in logs.
    pub path: String,
    /// HTTP method.
    pub method: String,
    /// Custom metadata shared across the chain.
    metadata: Arc<parking_lot::RwLock<HashMap<String, String>>>,
}

impl RequestContext {
    /// Create a context for one request.
    pub fn new(path: String, method: String) -> Self {
        Self {
            path,
            method,
            metadata: Arc::new(parking_lot::RwLock::new(HashMap::new())),
        }
    }

    /// Set a metadata value.
    pub fn set_metadata(&self, key: String, value: String) {
        self.metadata.write().insert(key, value);
    }

    /// Get a metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<String> {
        self.metadata.read().get(key).cloned()
    }
}

/// An outbound request.
///
/// Immutable once issued, with one exception: the pipeline rewrites the
/// `Authorization` header when it replays the request after a token
/// refresh.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the configured base URL.
    pub path: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
    /// Expected response payload kind.
    pub response_kind: ResponseKind,
}

impl HttpRequest {
    /// Create a GET request expecting a JSON response.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            response_kind: ResponseKind::Text,
        }
    }

    /// Create a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            headers: HashMap::new(),
            body: Some(body),
            response_kind: ResponseKind::Text,
        }
    }

    /// Mark the request as expecting a binary response.
    pub fn binary(mut self) -> Self {
        self.response_kind = ResponseKind::Binary;
        self
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Get a header value.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Whether a header is present.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// A received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Raw response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response from status and body bytes.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is in the 4xx range.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Whether the status is in the 5xx range.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as lossily-decoded UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Hook into the request/response stages of the pipeline.
///
/// Request hooks run in priority order (lower first); response hooks run
/// in reverse, mirroring the nesting of an interceptor stack.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Called before the request is transmitted.
    async fn on_request(&self, request: &mut HttpRequest, context: &RequestContext) -> Result<()> {
        let _ = (request, context);
        Ok(())
    }

    /// Called after the response is received.
    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &RequestContext,
    ) -> Result<()> {
        let _ = (response, context);
        Ok(())
    }

    /// Priority for ordering (lower runs first on the request stage).
    fn priority(&self) -> i32 {
        50
    }
}

/// Ordered chain of interceptors.
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Add an interceptor, keeping the chain sorted by priority.
    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
        self.interceptors.sort_by_key(|i| i.priority());
    }

    /// Run the request stage through every interceptor in order.
    pub async fn process_request(
        &self,
        request: &mut HttpRequest,
        context: &RequestContext,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.on_request(request, context).await?;
        }
        Ok(())
    }

    /// Run the response stage through every interceptor in reverse order.
    pub async fn process_response(
        &self,
        response: &mut HttpResponse,
        context: &RequestContext,
    ) -> Result<()> {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.on_response(response, context).await?;
        }
        Ok(())
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("count", &self.interceptors.len())
            .finish()
    }
}
