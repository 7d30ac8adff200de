//! Personal-information submission.

use crate::draft::{DraftInput, RegistrationDraft};
use crate::error::{FlowError, FlowResult};
use crate::orchestrator::{Step, StepOrchestrator, View};
use registration_client::RegistrationAuthority;
use session_store::{SessionKey, Store};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const REGISTER_FAILED_MESSAGE: &str = "An unexpected error occurred.";

/// Validates the personal-information form and starts phone verification.
pub struct RegistrationSubmitter {
    store: Arc<Store>,
    authority: Arc<dyn RegistrationAuthority>,
}

impl RegistrationSubmitter {
    pub fn new(store: Arc<Store>, authority: Arc<dyn RegistrationAuthority>) -> Self {
        Self { store, authority }
    }

    /// Validate and register the draft, then switch to verification.
    ///
    /// The phone number and draft are persisted before the orchestrator is
    /// told to show the verification step. Any failure leaves the session
    /// store untouched, so the call can simply be retried.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        input: DraftInput,
        orchestrator: &mut StepOrchestrator,
    ) -> FlowResult<RegistrationDraft> {
        if orchestrator.view() != View::Step(Step::PersonalInfo) || orchestrator.is_authenticated()
        {
            return Err(FlowError::InvalidTransition(
                "registration is only accepted on the first step",
            ));
        }

        let draft = input.validate()?;

        let response = self
            .authority
            .register(&draft.to_request())
            .await
            .map_err(|e| {
                warn!(error = %e, "Registration request failed");
                FlowError::from(e)
            })?;

        if !response.code_dispatched() {
            warn!(message = ?response.message, "Registration acknowledged without code dispatch");
            return Err(FlowError::ContractViolation(format!(
                "unexpected registration response: {}",
                response.message.as_deref().unwrap_or("<empty>")
            )));
        }

        let mirrored = serde_json::to_string(&draft).map_err(|e| FlowError::Storage(e.into()))?;
        self.store
            .set_many(vec![
                (SessionKey::PhoneNumber, draft.phone_number().to_string()),
                (SessionKey::SessionData, mirrored),
            ])
            .await?;

        orchestrator.enter_otp_phase(&self.store).await?;
        info!("Registration submitted, verification code dispatched");

        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::tests::valid_input;
    use crate::error::{Field, TRANSIENT_MESSAGE};
    use crate::testing::MockAuthority;
    use registration_client::{ClientError, RegisterResponse, Role};

    fn submitter(store: &Arc<Store>, authority: MockAuthority) -> RegistrationSubmitter {
        RegistrationSubmitter::new(store.clone(), Arc::new(authority))
    }

    #[tokio::test]
    async fn test_password_mismatch_makes_no_remote_call() {
        let mut authority = MockAuthority::new();
        authority.expect_register().never();

        let store = Arc::new(Store::memory());
        let mut orchestrator = StepOrchestrator::new();
        let input = DraftInput {
            confirm_password: "different!1".into(),
            ..valid_input()
        };

        let result = submitter(&store, authority).submit(input, &mut orchestrator).await;

        let Err(FlowError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.for_field(Field::ConfirmPassword), Some("Passwords do not match"));
        assert_eq!(orchestrator.view(), View::Step(Step::PersonalInfo));
        assert!(store.session().await.phone_number.is_none());
    }

    #[tokio::test]
    async fn test_success_persists_before_otp_phase() {
        let mut authority = MockAuthority::new();
        authority
            .expect_register()
            .withf(|request| {
                request.phone_number == "+15551234567" && request.role == Role::PropertyManager
            })
            .times(1)
            .returning(|_| {
                Ok(RegisterResponse {
                    message: Some("Verification code sent to +15551234567".into()),
                })
            });

        let store = Arc::new(Store::memory());
        let mut orchestrator = StepOrchestrator::new();

        let draft = submitter(&store, authority)
            .submit(valid_input(), &mut orchestrator)
            .await
            .unwrap();

        assert_eq!(orchestrator.view(), View::OtpVerification);
        let session = store.session().await;
        assert_eq!(session.phone_number.as_deref(), Some("+15551234567"));

        let mirrored: RegistrationDraft = store.load_draft().await.unwrap().unwrap();
        assert_eq!(mirrored, draft);
    }

    #[tokio::test]
    async fn test_rejection_surfaces_server_message() {
        let mut authority = MockAuthority::new();
        authority.expect_register().times(1).returning(|_| {
            Err(ClientError::Rejected {
                status: 409,
                message: Some("An account with this email already exists".into()),
            })
        });

        let store = Arc::new(Store::memory());
        let mut orchestrator = StepOrchestrator::new();

        let err = submitter(&store, authority)
            .submit(valid_input(), &mut orchestrator)
            .await
            .unwrap_err();

        assert_eq!(
            err.user_message(REGISTER_FAILED_MESSAGE),
            "An account with this email already exists"
        );
        assert_eq!(store.session().await, Default::default());
        assert_eq!(orchestrator.view(), View::Step(Step::PersonalInfo));
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable() {
        let mut authority = MockAuthority::new();
        let mut calls = 0;
        authority.expect_register().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                let parse_error = serde_json::from_str::<RegisterResponse>("<html>").unwrap_err();
                Err(ClientError::Json(parse_error))
            } else {
                Ok(RegisterResponse {
                    message: Some("Verification code sent".into()),
                })
            }
        });

        let store = Arc::new(Store::memory());
        let mut orchestrator = StepOrchestrator::new();
        let submitter = submitter(&store, authority);

        let err = submitter
            .submit(valid_input(), &mut orchestrator)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert_eq!(err.user_message(REGISTER_FAILED_MESSAGE), TRANSIENT_MESSAGE);
        assert!(store.session().await.phone_number.is_none());

        submitter.submit(valid_input(), &mut orchestrator).await.unwrap();
        assert_eq!(orchestrator.view(), View::OtpVerification);
    }

    #[tokio::test]
    async fn test_unexpected_acknowledgement_is_contract_violation() {
        let mut authority = MockAuthority::new();
        authority.expect_register().times(1).returning(|_| {
            Ok(RegisterResponse {
                message: Some("Account created".into()),
            })
        });

        let store = Arc::new(Store::memory());
        let mut orchestrator = StepOrchestrator::new();

        let err = submitter(&store, authority)
            .submit(valid_input(), &mut orchestrator)
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::ContractViolation(_)));
        assert_eq!(err.user_message(REGISTER_FAILED_MESSAGE), REGISTER_FAILED_MESSAGE);
        assert!(store.session().await.phone_number.is_none());
    }

    #[tokio::test]
    async fn test_refused_outside_first_step() {
        let mut authority = MockAuthority::new();
        authority.expect_register().never();

        let store = Arc::new(Store::memory());
        store.set(SessionKey::PhoneNumber, "+15551234567").await.unwrap();
        let mut orchestrator = StepOrchestrator::new();
        orchestrator.enter_otp_phase(&store).await.unwrap();

        let result = submitter(&store, authority)
            .submit(valid_input(), &mut orchestrator)
            .await;
        assert!(matches!(result, Err(FlowError::InvalidTransition(_))));
    }
}
