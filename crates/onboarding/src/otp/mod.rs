//! Verification step: code entry, submission and resend with cooldown.

mod code;
mod cooldown;
mod mask;

pub use code::{OtpAttempt, OtpCode, OtpInput, CODE_LENGTH, INVALID_CODE_MESSAGE};
pub use cooldown::{Cooldown, RESEND_COOLDOWN_SECS};
pub use mask::{mask_phone_number, MASK_PLACEHOLDER};

use crate::error::{FlowError, FlowResult};
use registration_client::{
    ClientError, RegistrationAuthority, ResendRequest, VerifyRequest, VerifyResponse,
};
use secrecy::SecretString;
use session_store::{SessionKey, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

pub const VERIFY_FAILED_MESSAGE: &str = "Failed to verify code.";
pub const RESEND_FAILED_MESSAGE: &str = "Failed to resend OTP. Please try again.";

/// Verification step state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpState {
    EnteringCode,
    Submitting,
    Verified,
    EnteringCodeWithError(String),
}

/// Credentials issued by the authority for a verified phone number.
#[derive(Debug)]
pub struct AuthGrant {
    pub token: SecretString,
    pub user_id: Option<String>,
}

/// Result of a single `submit` call.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Token issued and persisted.
    Verified(AuthGrant),
    /// Authority refused the code or broke the contract; the user may retry.
    Failed(String),
    /// Code was not six digits; nothing was sent.
    Rejected(String),
    /// Another submission is already in flight, or the step is complete.
    Ignored,
    /// The response arrived after teardown and was dropped.
    Discarded,
}

/// Owns the verification step for one resolved phone number.
pub struct OtpController {
    store: Arc<Store>,
    authority: Arc<dyn RegistrationAuthority>,
    phone_number: String,
    masked_phone: String,
    state: Mutex<OtpState>,
    resend_error: Mutex<Option<String>>,
    in_flight: AtomicBool,
    torn_down: AtomicBool,
    cooldown: Cooldown,
}

impl OtpController {
    /// Resolve the phone number and arm the resend cooldown.
    ///
    /// The session store wins over `fallback_phone`; with neither, the
    /// session has expired and the flow has to start over.
    pub async fn mount(
        store: Arc<Store>,
        authority: Arc<dyn RegistrationAuthority>,
        fallback_phone: Option<&str>,
    ) -> FlowResult<Self> {
        let stored = store.session().await.phone_number;
        let fallback = fallback_phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let phone_number = match (stored, fallback) {
            (Some(stored), _) => stored,
            (None, Some(fallback)) => {
                debug!("No phone number in session store, using in-memory value");
                fallback
            }
            (None, None) => {
                warn!("Verification step opened without a phone number");
                return Err(FlowError::SessionExpired);
            }
        };

        let masked_phone = mask_phone_number(&phone_number);
        info!(phone_number = %masked_phone, "Verification step mounted");

        Ok(Self {
            store,
            authority,
            phone_number,
            masked_phone,
            state: Mutex::new(OtpState::EnteringCode),
            resend_error: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            cooldown: Cooldown::start(RESEND_COOLDOWN_SECS),
        })
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    /// Phone number safe for display.
    pub fn masked_phone(&self) -> &str {
        &self.masked_phone
    }

    pub fn state(&self) -> OtpState {
        lock(&self.state).clone()
    }

    /// Inline error for the code field, if any.
    pub fn error_message(&self) -> Option<String> {
        match &*lock(&self.state) {
            OtpState::EnteringCodeWithError(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Error from the most recent resend, if it failed.
    pub fn resend_error(&self) -> Option<String> {
        lock(&self.resend_error).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Seconds before resend is allowed again.
    pub fn cooldown(&self) -> u32 {
        self.cooldown.remaining()
    }

    pub fn can_resend(&self) -> bool {
        !self.is_torn_down() && self.cooldown.is_ready()
    }

    pub fn subscribe_cooldown(&self) -> watch::Receiver<u32> {
        self.cooldown.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Submit a code for verification.
    ///
    /// At most one submission is in flight; a call made while another is
    /// pending returns [`SubmitOutcome::Ignored`] without contacting the
    /// authority.
    #[instrument(skip_all, fields(phone_number = %self.masked_phone))]
    pub async fn submit(&self, code: &str) -> SubmitOutcome {
        if self.is_torn_down() {
            return SubmitOutcome::Discarded;
        }
        if self.state() == OtpState::Verified {
            return SubmitOutcome::Ignored;
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, &self.state) else {
            debug!("Submission already in flight, ignoring");
            return SubmitOutcome::Ignored;
        };

        let Some(code) = OtpCode::parse(code) else {
            self.set_state(OtpState::EnteringCodeWithError(
                INVALID_CODE_MESSAGE.to_string(),
            ));
            return SubmitOutcome::Rejected(INVALID_CODE_MESSAGE.to_string());
        };

        let attempt = OtpAttempt::new(code);
        self.set_state(OtpState::Submitting);
        debug!(submitted_at = %attempt.submitted_at, "Submitting verification code");

        let result = self
            .authority
            .verify_register(&VerifyRequest {
                phone_number: self.phone_number.clone(),
                code: attempt.code.as_str().to_string(),
            })
            .await;

        if self.is_torn_down() {
            debug!("Verification answered after teardown, discarding");
            return SubmitOutcome::Discarded;
        }

        match self.accept(result).await {
            Ok(grant) => {
                self.set_state(OtpState::Verified);
                info!("Phone number verified");
                SubmitOutcome::Verified(grant)
            }
            Err(e) => {
                warn!(error = %e, "Verification failed");
                let message = e.user_message(VERIFY_FAILED_MESSAGE);
                self.set_state(OtpState::EnteringCodeWithError(message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Ask the authority for a fresh code.
    ///
    /// The cooldown restarts before the request is sent and is not rolled
    /// back if the request fails.
    #[instrument(skip_all, fields(phone_number = %self.masked_phone))]
    pub async fn resend(&self) -> FlowResult<()> {
        if self.is_torn_down() {
            return Err(FlowError::InvalidTransition("verification step torn down"));
        }

        let remaining = self.cooldown.remaining();
        if remaining > 0 {
            return Err(FlowError::CooldownActive(remaining));
        }

        self.cooldown.restart(RESEND_COOLDOWN_SECS);
        *lock(&self.resend_error) = None;

        let result = self
            .authority
            .resend_otp(&ResendRequest {
                phone_number: self.phone_number.clone(),
            })
            .await;

        if self.is_torn_down() {
            debug!("Resend answered after teardown, discarding");
            return Ok(());
        }

        match result {
            Ok(()) => {
                info!("Verification code resent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Resend failed");
                *lock(&self.resend_error) = Some(RESEND_FAILED_MESSAGE.to_string());
                Err(e.into())
            }
        }
    }

    /// Stop the cooldown and drop any response still on its way.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            self.cooldown.cancel();
            debug!("Verification step torn down");
        }
    }

    async fn accept(
        &self,
        result: Result<VerifyResponse, ClientError>,
    ) -> FlowResult<AuthGrant> {
        let response = result?;

        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                FlowError::ContractViolation("verification succeeded without a token".into())
            })?;
        let user_id = response.user.and_then(|u| u.user_id);

        let mut entries = vec![(SessionKey::Token, token.clone())];
        if let Some(id) = &user_id {
            entries.push((SessionKey::UserId, id.clone()));
        }
        self.store.set_many(entries).await?;

        Ok(AuthGrant {
            token: SecretString::new(token),
            user_id,
        })
    }

    fn set_state(&self, state: OtpState) {
        *lock(&self.state) = state;
    }
}

impl Drop for OtpController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Holds the single in-flight slot for a submission.
///
/// Released on drop, so a cancelled submission never leaves the controller
/// stuck in `Submitting`.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a Mutex<OtpState>,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a Mutex<OtpState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, state })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        if *state == OtpState::Submitting {
            *state = OtpState::EnteringCode;
        }
        drop(state);
        self.flag.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
