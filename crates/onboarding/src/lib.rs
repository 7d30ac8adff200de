//! Phone-verified account onboarding.
//!
//! The flow collects personal information, registers it with the remote
//! authority, verifies the phone number with a one-time code and then hands
//! over to the remaining onboarding steps. Progress is mirrored into a
//! [`session_store::Store`] so a reload resumes at the right phase.

pub mod config;
pub mod draft;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod otp;
pub mod submitter;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use draft::{DraftInput, PasswordChecks, RegistrationDraft};
pub use error::{Field, FieldError, FlowError, FlowResult, ValidationErrors};
pub use flow::OnboardingFlow;
pub use orchestrator::{Step, StepOrchestrator, View};
pub use otp::{
    mask_phone_number, AuthGrant, OtpController, OtpInput, OtpState, SubmitOutcome,
    RESEND_COOLDOWN_SECS,
};
pub use submitter::RegistrationSubmitter;
