//! Registration authority wire types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role requested at registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    PropertyManager,
}

/// `POST /register` body.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// `POST /register` success body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl RegisterResponse {
    /// Marker the authority uses to acknowledge code dispatch.
    pub const CODE_SENT_MARKER: &'static str = "Verification code sent";

    /// Whether the authority confirmed that a verification code went out.
    pub fn code_dispatched(&self) -> bool {
        self.message
            .as_deref()
            .map(|m| m.contains(Self::CODE_SENT_MARKER))
            .unwrap_or(false)
    }
}

/// `POST /verify-register` body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub phone_number: String,
    pub code: String,
}

impl fmt::Debug for VerifyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyRequest")
            .field("phone_number", &self.phone_number)
            .finish_non_exhaustive()
    }
}

/// `POST /verify-register` success body.
///
/// `token` is optional on the wire so a success status without a token can
/// be detected and refused by the caller rather than failing to parse.
#[derive(Clone, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

impl fmt::Debug for VerifyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyResponse")
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `POST /resend-otp` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub phone_number: String,
}

/// Failure body shared by every endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_wire_format() {
        let request = RegisterRequest {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone_number: "+15551234567".into(),
            password: "s3cret!pass".into(),
            confirm_password: "s3cret!pass".into(),
            role: Role::PropertyManager,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["fullName"], "Jane Doe");
        assert_eq!(json["phoneNumber"], "+15551234567");
        assert_eq!(json["confirmPassword"], "s3cret!pass");
        assert_eq!(json["role"], "property_manager");

        assert!(!format!("{:?}", request).contains("s3cret"));
    }

    #[test]
    fn test_code_dispatched() {
        let sent = RegisterResponse {
            message: Some("Verification code sent to +15551234567".into()),
        };
        assert!(sent.code_dispatched());

        let other = RegisterResponse {
            message: Some("Account created".into()),
        };
        assert!(!other.code_dispatched());
        assert!(!RegisterResponse::default().code_dispatched());
    }

    #[test]
    fn test_verify_response_without_token_parses() {
        let response: VerifyResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(response.token.is_none());

        let response: VerifyResponse =
            serde_json::from_str(r#"{"token":"abc","user":{"userId":"u-1"}}"#).unwrap();
        assert_eq!(response.token.as_deref(), Some("abc"));
        assert_eq!(
            response.user.and_then(|u| u.user_id).as_deref(),
            Some("u-1")
        );
    }
}
