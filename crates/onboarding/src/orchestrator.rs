//! Step sequencing for the onboarding flow.

use crate::error::{FlowError, FlowResult};
use session_store::{Session, Store};
use tracing::{debug, info};

/// Onboarding steps, in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Step {
    #[default]
    PersonalInfo,
    CompanyInfo,
    PropertyDetails,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::PersonalInfo, Step::CompanyInfo, Step::PropertyDetails];

    /// One-based position shown in the step indicator.
    pub fn number(&self) -> u8 {
        match self {
            Step::PersonalInfo => 1,
            Step::CompanyInfo => 2,
            Step::PropertyDetails => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::PersonalInfo => "Personal Information",
            Step::CompanyInfo => "Company Information",
            Step::PropertyDetails => "Property Details",
        }
    }

    pub fn next(&self) -> Option<Step> {
        match self {
            Step::PersonalInfo => Some(Step::CompanyInfo),
            Step::CompanyInfo => Some(Step::PropertyDetails),
            Step::PropertyDetails => None,
        }
    }
}

/// What the flow shows right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Step(Step),
    OtpVerification,
}

/// Tracks the active step and the "awaiting OTP" sub-phase.
///
/// While awaiting a code, only the verification view is shown and the step
/// cannot advance. There is no backward navigation.
#[derive(Debug, Default)]
pub struct StepOrchestrator {
    step: Step,
    awaiting_otp: bool,
    authenticated: bool,
}

impl StepOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the phase from a persisted session after a restart.
    pub fn from_session(session: &Session) -> Self {
        if session.is_authenticated() {
            Self {
                step: Step::CompanyInfo,
                awaiting_otp: false,
                authenticated: true,
            }
        } else if session.awaiting_verification() {
            Self {
                step: Step::PersonalInfo,
                awaiting_otp: true,
                authenticated: false,
            }
        } else {
            Self::new()
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_awaiting_otp(&self) -> bool {
        self.awaiting_otp
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn view(&self) -> View {
        if self.awaiting_otp {
            View::OtpVerification
        } else {
            View::Step(self.step)
        }
    }

    /// Switch to the verification view.
    ///
    /// Only allowed once the session store holds the phone number the code
    /// was sent to.
    pub async fn enter_otp_phase(&mut self, store: &Store) -> FlowResult<()> {
        if self.authenticated || self.step != Step::PersonalInfo {
            return Err(FlowError::InvalidTransition(
                "verification only follows personal information",
            ));
        }

        if store.session().await.phone_number.is_none() {
            return Err(FlowError::SessionExpired);
        }

        self.awaiting_otp = true;
        info!("Awaiting verification code");
        Ok(())
    }

    /// Leave the verification view after the code was accepted.
    pub fn complete_verification(&mut self) -> FlowResult<Step> {
        if !self.awaiting_otp {
            return Err(FlowError::InvalidTransition("no verification in progress"));
        }

        self.awaiting_otp = false;
        self.authenticated = true;
        self.step = Step::CompanyInfo;
        info!(step = self.step.title(), "Phone verified, continuing onboarding");
        Ok(self.step)
    }

    /// Move past the current step once its submitter reported success.
    pub fn advance(&mut self) -> FlowResult<Step> {
        if self.awaiting_otp {
            return Err(FlowError::InvalidTransition(
                "cannot advance while awaiting verification",
            ));
        }
        if !self.authenticated {
            return Err(FlowError::InvalidTransition(
                "personal information must be verified first",
            ));
        }

        let next = self
            .step
            .next()
            .ok_or(FlowError::InvalidTransition("already at the last step"))?;
        debug!(from = self.step.title(), to = next.title(), "Advancing step");
        self.step = next;
        Ok(next)
    }

    /// Start over from the first step.
    pub fn restart(&mut self) {
        info!("Restarting onboarding from the first step");
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_store::SessionKey;

    #[test]
    fn test_step_metadata() {
        let titles: Vec<_> = Step::ALL.iter().map(|s| (s.number(), s.title())).collect();
        assert_eq!(
            titles,
            vec![
                (1, "Personal Information"),
                (2, "Company Information"),
                (3, "Property Details"),
            ]
        );
        assert_eq!(Step::PropertyDetails.next(), None);
    }

    #[tokio::test]
    async fn test_otp_phase_requires_stored_phone() {
        let store = Store::memory();
        let mut orchestrator = StepOrchestrator::new();

        let result = orchestrator.enter_otp_phase(&store).await;
        assert!(matches!(result, Err(FlowError::SessionExpired)));
        assert_eq!(orchestrator.view(), View::Step(Step::PersonalInfo));

        store.set(SessionKey::PhoneNumber, "+15551234567").await.unwrap();
        orchestrator.enter_otp_phase(&store).await.unwrap();
        assert_eq!(orchestrator.view(), View::OtpVerification);
    }

    #[tokio::test]
    async fn test_no_advance_while_awaiting_otp() {
        let store = Store::memory();
        store.set(SessionKey::PhoneNumber, "+15551234567").await.unwrap();

        let mut orchestrator = StepOrchestrator::new();
        orchestrator.enter_otp_phase(&store).await.unwrap();

        assert!(matches!(
            orchestrator.advance(),
            Err(FlowError::InvalidTransition(_))
        ));
        assert_eq!(orchestrator.step(), Step::PersonalInfo);
        assert_eq!(orchestrator.view(), View::OtpVerification);
    }

    #[tokio::test]
    async fn test_full_progression() {
        let store = Store::memory();
        store.set(SessionKey::PhoneNumber, "+15551234567").await.unwrap();

        let mut orchestrator = StepOrchestrator::new();
        assert!(orchestrator.advance().is_err());

        orchestrator.enter_otp_phase(&store).await.unwrap();
        assert_eq!(orchestrator.complete_verification().unwrap(), Step::CompanyInfo);
        assert!(orchestrator.is_authenticated());
        assert_eq!(orchestrator.view(), View::Step(Step::CompanyInfo));

        assert_eq!(orchestrator.advance().unwrap(), Step::PropertyDetails);
        assert!(orchestrator.advance().is_err());

        // Verification is not repeatable once authenticated
        assert!(orchestrator.enter_otp_phase(&store).await.is_err());
        assert!(orchestrator.complete_verification().is_err());
    }

    #[test]
    fn test_restart_clears_otp_phase() {
        let session = Session {
            phone_number: Some("+15551234567".into()),
            ..Session::default()
        };
        let mut orchestrator = StepOrchestrator::from_session(&session);
        assert_eq!(orchestrator.view(), View::OtpVerification);

        orchestrator.restart();
        assert_eq!(orchestrator.view(), View::Step(Step::PersonalInfo));
        assert!(!orchestrator.is_awaiting_otp());
    }

    #[test]
    fn test_from_session() {
        let orchestrator = StepOrchestrator::from_session(&Session::default());
        assert_eq!(orchestrator.view(), View::Step(Step::PersonalInfo));

        let session = Session {
            phone_number: Some("+15551234567".into()),
            auth_token: Some("tok".into()),
            ..Session::default()
        };
        let orchestrator = StepOrchestrator::from_session(&session);
        assert!(orchestrator.is_authenticated());
        assert_eq!(orchestrator.view(), View::Step(Step::CompanyInfo));
    }
}
