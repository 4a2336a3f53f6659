//! Wire types for the GetRC backend API.
//!
//! Field names follow the backend's camelCase JSON contract via serde
//! renames. The user profile carries the fields the dashboard displays
//! and flattens everything else, since the backend treats it as an
//! opaque record.

use serde::{Deserialize, Serialize};

/// Body for `POST /api/login/user-login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Email address or mobile number.
    #[serde(rename = "emailOrPhone")]
    pub email_or_phone: String,
    /// Account password.
    pub password: String,
}

/// Body for `POST /api/login/user-signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    /// Full name of the account holder.
    pub fullname: String,
    /// Mobile number.
    pub mobile: String,
    /// Email address.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Account role; the client always sends `User`.
    pub role: String,
}

/// Body for `POST /api/login/forgot-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    /// Email address or mobile number to dispatch the OTP to.
    #[serde(rename = "emailOrPhone")]
    pub email_or_phone: String,
}

/// Body for `POST /api/login/reset-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ResetPasswordRequest {
    /// Email address or mobile number the OTP was sent to.
    #[serde(rename = "emailOrPhone")]
    pub email_or_phone: String,
    /// One-time password received out of band.
    pub otp: String,
    /// Replacement password.
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

/// Body for `POST /api/login/refresh-token`.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    /// The stored refresh token.
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Body for the RC download endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RcRequest {
    /// Vehicle number identifying the RC to fetch.
    #[serde(rename = "rcId")]
    pub rc_id: String,
}

/// Credentials granted by login or token refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Short-lived access token.
    pub token: String,
    /// Longer-lived refresh token.
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    /// Profile of the authenticated user.
    pub user: UserProfile,
}

/// User profile as returned by login, refresh, and the dashboard.
///
/// Unknown fields are preserved in `extra` so the profile round-trips
/// through the session store without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Full name.
    #[serde(default)]
    pub fullname: String,
    /// Mobile number.
    #[serde(default)]
    pub mobile: String,
    /// Wallet balance in rupees.
    #[serde(default)]
    pub balance: Option<f64>,
    /// Any additional backend fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload of `GET /api/dashboard/get-user-dashboard-data`.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardData {
    /// Profile of the logged-in user, including the wallet balance.
    #[serde(rename = "userData")]
    pub user_data: UserProfile,
    /// Recent wallet transactions, most recent first.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// A single wallet transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Backend identifier; numeric or string depending on deployment.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Vehicle number the transaction was for.
    #[serde(rename = "vehicleNumber", default)]
    pub vehicle_number: String,
    /// Amount debited or credited.
    #[serde(default)]
    pub amount: f64,
    /// Creation timestamp as reported by the backend.
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
}

/// Generic success/failure message returned by several endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message, when the backend provides one.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_request_uses_camel_case_wire_names() {
        let body = serde_json::to_value(LoginRequest {
            email_or_phone: "user@example.com".to_string(),
            password: "secret".to_string(),
        })
        .unwrap();
        assert_eq!(body["emailOrPhone"], "user@example.com");
        assert_eq!(body["password"], "secret");
    }

    #[test]
    fn token_grant_round_trips_unknown_profile_fields() {
        let grant: TokenGrant = serde_json::from_value(json!({
            "token": "at-1",
            "refreshToken": "rt-1",
            "user": {
                "fullname": "Asha Verma",
                "mobile": "9000000000",
                "balance": 250.0,
                "kycStatus": "verified"
            }
        }))
        .unwrap();
        assert_eq!(grant.token, "at-1");
        assert_eq!(grant.user.extra["kycStatus"], "verified");

        let back = serde_json::to_value(&grant.user).unwrap();
        assert_eq!(back["kycStatus"], "verified");
    }

    #[test]
    fn dashboard_parses_transactions() {
        let data: DashboardData = serde_json::from_value(json!({
            "userData": { "fullname": "Asha", "mobile": "9", "balance": 10.0 },
            "transactions": [
                { "id": 1, "vehicleNumber": "RJ14AB1234", "amount": 50.0,
                  "createdAt": "2025-01-05T10:00:00Z" }
            ]
        }))
        .unwrap();
        assert_eq!(data.transactions.len(), 1);
        assert_eq!(data.transactions[0].vehicle_number, "RJ14AB1234");
    }
}
