//! The onboarding flow as a whole.

use crate::draft::{DraftInput, RegistrationDraft};
use crate::error::{FlowError, FlowResult};
use crate::orchestrator::{Step, StepOrchestrator, View};
use crate::otp::{OtpController, SubmitOutcome};
use crate::submitter::RegistrationSubmitter;
use registration_client::RegistrationAuthority;
use session_store::Store;
use std::sync::Arc;
use tracing::{info, warn};

/// Owns every piece of the flow and enforces one writer per phase.
///
/// The verification controller only exists while the orchestrator is in the
/// verification phase; it is torn down as soon as the phase ends.
pub struct OnboardingFlow {
    store: Arc<Store>,
    authority: Arc<dyn RegistrationAuthority>,
    orchestrator: StepOrchestrator,
    submitter: RegistrationSubmitter,
    otp: Option<OtpController>,
}

impl OnboardingFlow {
    /// Rebuild the flow from whatever the session store holds.
    ///
    /// A stored token resumes past verification, a stored phone number
    /// resumes at code entry, and anything else starts from the first step.
    pub async fn resume(
        store: Arc<Store>,
        authority: Arc<dyn RegistrationAuthority>,
    ) -> FlowResult<Self> {
        let session = store.session().await;
        let orchestrator = StepOrchestrator::from_session(&session);
        let submitter = RegistrationSubmitter::new(store.clone(), authority.clone());

        let mut flow = Self {
            store,
            authority,
            orchestrator,
            submitter,
            otp: None,
        };

        if flow.orchestrator.is_awaiting_otp() {
            flow.open_verification(None).await?;
        }

        info!(view = ?flow.view(), "Onboarding flow resumed");
        Ok(flow)
    }

    pub fn view(&self) -> View {
        self.orchestrator.view()
    }

    pub fn step(&self) -> Step {
        self.orchestrator.step()
    }

    pub fn orchestrator(&self) -> &StepOrchestrator {
        &self.orchestrator
    }

    /// Mounted verification controller, present only during code entry.
    pub fn otp(&self) -> Option<&OtpController> {
        self.otp.as_ref()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Register the personal information and open code entry.
    pub async fn submit_personal_info(&mut self, input: DraftInput) -> FlowResult<RegistrationDraft> {
        let draft = self.submitter.submit(input, &mut self.orchestrator).await?;
        self.open_verification(Some(draft.phone_number())).await?;
        Ok(draft)
    }

    /// Mount the verification controller.
    ///
    /// Without a phone number in the store or in `fallback_phone`, the flow
    /// is sent back to the first step and no controller is mounted.
    pub async fn open_verification(&mut self, fallback_phone: Option<&str>) -> FlowResult<()> {
        if !self.orchestrator.is_awaiting_otp() {
            return Err(FlowError::InvalidTransition("no verification in progress"));
        }

        if let Some(previous) = self.otp.take() {
            previous.teardown();
        }

        match OtpController::mount(self.store.clone(), self.authority.clone(), fallback_phone).await
        {
            Ok(controller) => {
                self.otp = Some(controller);
                Ok(())
            }
            Err(e) => {
                if e.forces_restart() {
                    warn!("Verification opened without a phone number, restarting");
                    self.orchestrator.restart();
                }
                Err(e)
            }
        }
    }

    /// Submit a verification code.
    ///
    /// On success the controller is torn down and the flow moves on to the
    /// step after personal information.
    pub async fn submit_code(&mut self, code: &str) -> FlowResult<SubmitOutcome> {
        let Some(otp) = self.otp.as_ref() else {
            return Err(FlowError::InvalidTransition("no verification in progress"));
        };

        let outcome = otp.submit(code).await;
        if let SubmitOutcome::Verified(_) = &outcome {
            self.orchestrator.complete_verification()?;
            if let Some(controller) = self.otp.take() {
                controller.teardown();
            }
        }

        Ok(outcome)
    }

    /// Ask for a fresh code, subject to the cooldown.
    pub async fn resend(&self) -> FlowResult<()> {
        match self.otp.as_ref() {
            Some(otp) => otp.resend().await,
            None => Err(FlowError::InvalidTransition("no verification in progress")),
        }
    }

    /// Move on once the current post-verification step is done.
    pub fn advance(&mut self) -> FlowResult<Step> {
        self.orchestrator.advance()
    }

    /// Forget the session and go back to the first step.
    pub async fn start_over(&mut self) -> FlowResult<()> {
        if let Some(controller) = self.otp.take() {
            controller.teardown();
        }
        self.store.clear().await?;
        self.orchestrator.restart();
        Ok(())
    }
}
