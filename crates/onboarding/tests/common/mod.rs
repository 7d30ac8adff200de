//! Common test utilities for integration tests.

use onboarding::DraftInput;
use registration_client::{RegistrationAuthority, RegistrationClient};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PHONE: &str = "+15551234567";

/// Start a mock registration authority.
pub async fn mock_authority_server() -> MockServer {
    MockServer::start().await
}

/// Create a client pointed at the mock server's auth prefix.
pub fn test_authority(mock_server: &MockServer) -> Arc<dyn RegistrationAuthority> {
    let client = RegistrationClient::new(
        format!("{}/api/auth", mock_server.uri()),
        Duration::from_secs(5),
    )
    .unwrap();
    Arc::new(client)
}

/// A personal-information form that passes every rule.
pub fn valid_form() -> DraftInput {
    DraftInput {
        full_name: "Jane Doe".into(),
        email: "jane@example.com".into(),
        phone_number: PHONE.into(),
        password: "s3cret!pass".into(),
        confirm_password: "s3cret!pass".into(),
    }
}

/// Accept registrations and report the code as sent.
pub async fn mount_register_ok(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(serde_json::json!({ "message": "Verification code sent" })),
        )
        .mount(mock_server)
        .await;
}
