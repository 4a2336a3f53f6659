//! Redacted request/response logging.
//!
//! Logs every pipeline execution at DEBUG with default-on redaction for
//! sensitive headers: the Authorization value is never written to the log
//! in clear, only its scheme (`Bearer [REDACTED]`).

use std::collections::HashMap;

use async_trait::async_trait;

use crate::client::interceptor::{HttpRequest, HttpResponse, Interceptor, RequestContext};
use crate::error::Result;

const REDACTED_HEADERS: [&str; 3] = ["authorization", "cookie", "x-api-key"];

/// Logging interceptor with sensitive-header redaction.
#[derive(Debug, Clone)]
pub struct LoggingInterceptor {
    show_auth_scheme: bool,
}

impl Default for LoggingInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingInterceptor {
    /// Create a logging interceptor with the default redaction set.
    pub fn new() -> Self {
        Self {
            show_auth_scheme: true,
        }
    }

    /// Whether to keep the auth scheme visible (`Bearer [REDACTED]`)
    /// instead of redacting the whole value.
    pub fn with_show_auth_scheme(mut self, show: bool) -> Self {
        self.show_auth_scheme = show;
        self
    }

    fn redact_value(&self, name: &str, value: &str) -> String {
        let lower = name.to_ascii_lowercase();
        if !REDACTED_HEADERS.contains(&lower.as_str()) {
            return value.to_string();
        }
        if lower == "authorization" && self.show_auth_scheme {
            if let Some(space_idx) = value.find(' ') {
                return format!("{} [REDACTED]", &value[..space_idx]);
            }
        }
        "[REDACTED]".to_string()
    }

    fn format_headers(&self, headers: &HashMap<String, String>) -> String {
        if headers.is_empty() {
            return "(no headers)".to_string();
        }
        let mut parts: Vec<String> = headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, self.redact_value(name, value)))
            .collect();
        parts.sort();
        parts.join(", ")
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn on_request(&self, request: &mut HttpRequest, context: &RequestContext) -> Result<()> {
        tracing::debug!(
            "HTTP {} {} | headers: [{}]",
            context.method,
            context.path,
            self.format_headers(&request.headers)
        );
        Ok(())
    }

    async fn on_response(
        &self,
        response: &mut HttpResponse,
        context: &RequestContext,
    ) -> Result<()> {
        tracing::debug!(
            "HTTP {} {} -> {} ({}B)",
            context.method,
            context.path,
            response.status,
            response.body.len()
        );
        Ok(())
    }

    fn priority(&self) -> i32 {
        100 // Run last on the request stage, first on the response stage.
    }
}
