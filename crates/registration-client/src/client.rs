//! Registration authority HTTP client.

use crate::error::ClientError;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Remote authority that registers accounts and issues verification codes.
///
/// Implemented over HTTP by [`RegistrationClient`]; flow components depend on
/// this trait so they can be driven by test doubles.
#[async_trait]
pub trait RegistrationAuthority: Send + Sync {
    /// Submit a registration; the authority dispatches a code on success.
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ClientError>;

    /// Exchange a verification code for an auth token.
    async fn verify_register(&self, request: &VerifyRequest)
        -> Result<VerifyResponse, ClientError>;

    /// Ask the authority to send a fresh code.
    async fn resend_otp(&self, request: &ResendRequest) -> Result<(), ClientError>;
}

/// HTTP client for the registration authority.
#[derive(Clone)]
pub struct RegistrationClient {
    client: Client,
    base_url: String,
}

impl RegistrationClient {
    /// Create a new registration client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL all endpoints are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, "Sending request");

        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            warn!(status = %status, endpoint, "Authority rejected request");

            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl RegistrationAuthority for RegistrationClient {
    #[instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        let response = self.post("/register", request).await?;
        let body = response.text().await?;
        let parsed: RegisterResponse = serde_json::from_str(&body)?;

        debug!(message = ?parsed.message, "Registration acknowledged");
        Ok(parsed)
    }

    #[instrument(skip_all)]
    async fn verify_register(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse, ClientError> {
        let response = self.post("/verify-register", request).await?;
        let body = response.text().await?;
        let parsed: VerifyResponse = serde_json::from_str(&body)?;

        debug!(has_token = parsed.token.is_some(), "Verification answered");
        Ok(parsed)
    }

    #[instrument(skip_all)]
    async fn resend_otp(&self, request: &ResendRequest) -> Result<(), ClientError> {
        self.post("/resend-otp", request).await?;
        debug!("Verification code resent");
        Ok(())
    }
}
