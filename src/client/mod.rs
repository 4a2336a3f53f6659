//! High-level client for the GetRC backend.
//!
//! [`GetRcClient`] exposes one typed operation per backend endpoint.
//! Required-field validation happens before any network call; everything
//! that does reach the network goes through the authenticated
//! [`pipeline::RequestPipeline`].

pub mod auth;
pub mod interceptor;
pub mod logging;
pub mod pipeline;

use std::sync::Arc;

use crate::download::{DownloadWorkflow, SavedFile};
use crate::error::{Error, Result};
use crate::session::{persist_grant, SessionStore};
use crate::types::{
    DashboardData, ForgotPasswordRequest, LoginRequest, MessageResponse, RcRequest,
    ResetPasswordRequest, SignupRequest, TokenGrant,
};

pub use pipeline::{ClientConfig, HttpTransport, RequestPipeline, ReqwestTransport};

/// Backend endpoint paths.
pub mod routes {
    /// Login with email/mobile and password.
    pub const USER_LOGIN: &str = "/api/login/user-login";
    /// Create a new account.
    pub const USER_SIGNUP: &str = "/api/login/user-signup";
    /// Trigger OTP dispatch for a forgotten password.
    pub const FORGOT_PASSWORD: &str = "/api/login/forgot-password";
    /// Reset the password with an OTP.
    pub const RESET_PASSWORD: &str = "/api/login/reset-password";
    /// Exchange a refresh token for new credentials.
    pub const REFRESH_TOKEN: &str = "/api/login/refresh-token";
    /// End the server-side session.
    pub const USER_LOGOUT: &str = "/api/login/user-logout";
    /// Wallet balance and transaction history.
    pub const DASHBOARD: &str = "/api/dashboard/get-user-dashboard-data";
    /// Basic RC as PNG bytes.
    pub const SINGLE_RC: &str = "/api/dashboard/get-single-rc";
    /// Digital RC as PDF bytes.
    pub const DIGITAL_RC: &str = "/api/dashboard/get-digital-rc";
}

/// Which RC artifact to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcKind {
    /// Basic RC: a PNG image.
    Basic,
    /// Digital RC: a PDF document.
    Digital,
}

impl RcKind {
    /// Endpoint path for this kind.
    pub fn route(self) -> &'static str {
        match self {
            Self::Basic => routes::SINGLE_RC,
            Self::Digital => routes::DIGITAL_RC,
        }
    }

    /// File extension for the saved artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Basic => "png",
            Self::Digital => "pdf",
        }
    }

    /// Deterministic filename derived from the vehicle number.
    pub fn file_name(self, vehicle_number: &str) -> String {
        format!("{}_RC.{}", vehicle_number.trim(), self.extension())
    }
}

/// Parameters for [`GetRcClient::signup`].
#[derive(Debug, Clone)]
pub struct SignupParams {
    /// Full name of the account holder.
    pub fullname: String,
    /// Mobile number.
    pub mobile: String,
    /// Email address.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Password confirmation; must match `password`.
    pub confirm_password: String,
}

/// Client for the GetRC vehicle-registration-certificate service.
pub struct GetRcClient {
    pipeline: RequestPipeline,
    store: Arc<dyn SessionStore>,
}

impl GetRcClient {
    /// Create a client against the configured backend.
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config)?);
        Ok(Self::with_transport(transport, store))
    }

    /// Create a client over an explicit transport.
    ///
    /// This is the seam tests use to substitute a scripted transport.
    pub fn with_transport(transport: Arc<dyn HttpTransport>, store: Arc<dyn SessionStore>) -> Self {
        let pipeline = RequestPipeline::new(transport, store.clone());
        Self { pipeline, store }
    }

    /// The underlying pipeline, for issuing raw requests.
    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// The session store this client persists credentials into.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Log in and persist the granted credentials.
    pub async fn login(&self, email_or_phone: &str, password: &str) -> Result<TokenGrant> {
        if email_or_phone.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("email or phone and password are required"));
        }

        let body = serde_json::to_value(LoginRequest {
            email_or_phone: email_or_phone.to_string(),
            password: password.to_string(),
        })?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(routes::USER_LOGIN, body))
            .await?;
        let response = expect_success(response)?;

        let grant: TokenGrant = response.json()?;
        persist_grant(&*self.store, &grant).await?;
        tracing::info!("login succeeded - session persisted");
        Ok(grant)
    }

    /// Create a new account. Returns the backend's message.
    pub async fn signup(&self, params: &SignupParams) -> Result<String> {
        if params.fullname.trim().is_empty()
            || params.mobile.trim().is_empty()
            || params.email.trim().is_empty()
            || params.password.is_empty()
            || params.confirm_password.is_empty()
        {
            return Err(Error::validation("all fields are required"));
        }
        if params.password != params.confirm_password {
            return Err(Error::validation("passwords do not match"));
        }

        let body = serde_json::to_value(SignupRequest {
            fullname: params.fullname.clone(),
            mobile: params.mobile.clone(),
            email: params.email.clone(),
            password: params.password.clone(),
            role: "User".to_string(),
        })?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(routes::USER_SIGNUP, body))
            .await?;
        message_of(expect_success(response)?, "account created successfully")
    }

    /// Trigger OTP dispatch for a forgotten password.
    pub async fn forgot_password(&self, email_or_phone: &str) -> Result<String> {
        if email_or_phone.trim().is_empty() {
            return Err(Error::validation("email or phone is required"));
        }

        let body = serde_json::to_value(ForgotPasswordRequest {
            email_or_phone: email_or_phone.to_string(),
        })?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(routes::FORGOT_PASSWORD, body))
            .await?;
        message_of(expect_success(response)?, "OTP sent successfully")
    }

    /// Reset the password using the OTP received out of band.
    pub async fn reset_password(
        &self,
        email_or_phone: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<String> {
        if email_or_phone.trim().is_empty() || otp.trim().is_empty() || new_password.is_empty() {
            return Err(Error::validation("email or phone, OTP and new password are required"));
        }

        let body = serde_json::to_value(ResetPasswordRequest {
            email_or_phone: email_or_phone.to_string(),
            otp: otp.to_string(),
            new_password: new_password.to_string(),
        })?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(routes::RESET_PASSWORD, body))
            .await?;
        message_of(expect_success(response)?, "password reset successfully")
    }

    /// Log out: clear the session store, then notify the backend.
    ///
    /// The store is cleared first, so the logout request goes out without
    /// a bearer credential and local state is gone even if the backend
    /// call fails afterwards.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear_all().await?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(
                routes::USER_LOGOUT,
                serde_json::json!({}),
            ))
            .await?;
        expect_success(response)?;
        tracing::info!("logout acknowledged - session cleared");
        Ok(())
    }

    /// Fetch the wallet balance and transaction history.
    pub async fn dashboard(&self) -> Result<DashboardData> {
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::get(routes::DASHBOARD))
            .await?;
        expect_success(response)?.json()
    }

    /// Fetch the raw bytes of an RC artifact.
    pub async fn fetch_rc(&self, kind: RcKind, vehicle_number: &str) -> Result<Vec<u8>> {
        if vehicle_number.trim().is_empty() {
            return Err(Error::validation("please enter a vehicle number"));
        }

        let body = serde_json::to_value(RcRequest {
            rc_id: vehicle_number.trim().to_string(),
        })?;
        let response = self
            .pipeline
            .execute(interceptor::HttpRequest::post(kind.route(), body).binary())
            .await?;
        let response = expect_success(response)?;
        Ok(response.body.to_vec())
    }

    /// Download the basic RC (PNG) and save it through the workflow.
    pub async fn download_basic_rc(
        &self,
        vehicle_number: &str,
        workflow: &DownloadWorkflow,
    ) -> Result<SavedFile> {
        self.download_rc(RcKind::Basic, vehicle_number, workflow).await
    }

    /// Download the digital RC (PDF) and save it through the workflow.
    pub async fn download_digital_rc(
        &self,
        vehicle_number: &str,
        workflow: &DownloadWorkflow,
    ) -> Result<SavedFile> {
        self.download_rc(RcKind::Digital, vehicle_number, workflow).await
    }

    // Permission check first, then fetch, then decode/write/verify/register.
    async fn download_rc(
        &self,
        kind: RcKind,
        vehicle_number: &str,
        workflow: &DownloadWorkflow,
    ) -> Result<SavedFile> {
        if vehicle_number.trim().is_empty() {
            return Err(Error::validation("please enter a vehicle number"));
        }
        let target = workflow.acquire_target().await?;
        let bytes = self.fetch_rc(kind, vehicle_number).await?;
        let saved = workflow
            .save_to(target, &kind.file_name(vehicle_number), &bytes)
            .await?;
        tracing::info!(path = %saved.path.display(), location = ?saved.location, "RC saved");
        Ok(saved)
    }
}

impl std::fmt::Debug for GetRcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetRcClient")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Map a non-success response to [`Error::Http`] with the body message.
fn expect_success(response: interceptor::HttpResponse) -> Result<interceptor::HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<MessageResponse>()
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| response.text());
    Err(Error::Http {
        status: response.status,
        message,
    })
}

/// Pull the backend's message out of a success response, with a fallback.
fn message_of(response: interceptor::HttpResponse, fallback: &str) -> Result<String> {
    Ok(response
        .json::<MessageResponse>()
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rc_kind_filenames_derive_from_vehicle_number() {
        assert_eq!(RcKind::Basic.file_name("RJ14AB1234"), "RJ14AB1234_RC.png");
        assert_eq!(RcKind::Digital.file_name(" RJ14AB1234 "), "RJ14AB1234_RC.pdf");
    }

    #[test]
    fn expect_success_extracts_body_message() {
        let response = interceptor::HttpResponse::new(
            402,
            serde_json::to_vec(&serde_json::json!({ "message": "insufficient balance" })).unwrap(),
        );
        match expect_success(response) {
            Err(Error::Http { status, message }) => {
                assert_eq!(status, 402);
                assert_eq!(message, "insufficient balance");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn expect_success_falls_back_to_raw_body() {
        let response = interceptor::HttpResponse::new(500, b"boom".to_vec());
        match expect_success(response) {
            Err(Error::Http { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
