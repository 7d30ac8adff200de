//! Onboarding flow error types.

use registration_client::ClientError;
use session_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Message shown when the authority could not be reached.
pub const TRANSIENT_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Message shown when the flow has to start over.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please register again.";

/// Form fields that can fail local validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FullName,
    Email,
    PhoneNumber,
    Password,
    ConfirmPassword,
    Code,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FullName => "fullName",
            Field::Email => "email",
            Field::PhoneNumber => "phoneNumber",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
            Field::Code => "code",
        }
    }
}

/// A single failed field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Every rule a candidate failed, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message reported for `field`.
    pub fn for_field(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Onboarding flow errors.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Local field validation failed; nothing was sent.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No phone number could be resolved for the verification step.
    #[error("Session expired: no phone number on record")]
    SessionExpired,

    /// The authority answered with a failure status.
    #[error("Rejected by authority ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    RemoteRejection {
        status: u16,
        message: Option<String>,
    },

    /// Network or parse failure talking to the authority.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Success status with a body that breaks the contract.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Resend available in {0}s")]
    CooldownActive(u32),

    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl FlowError {
    /// Inline message for the user.
    ///
    /// Server messages are shown verbatim; otherwise `fallback` is used for
    /// failures that carry nothing presentable.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FlowError::Validation(errors) => errors.to_string(),
            FlowError::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            FlowError::RemoteRejection {
                message: Some(message),
                ..
            } => message.clone(),
            FlowError::Transport(_) => TRANSIENT_MESSAGE.to_string(),
            FlowError::CooldownActive(seconds) => {
                format!("Please wait {}s before requesting a new code.", seconds)
            }
            FlowError::RemoteRejection { message: None, .. }
            | FlowError::ContractViolation(_)
            | FlowError::InvalidTransition(_)
            | FlowError::Storage(_) => fallback.to_string(),
        }
    }

    /// Whether the flow must restart from the first step.
    pub fn forces_restart(&self) -> bool {
        matches!(self, FlowError::SessionExpired)
    }
}

impl From<ClientError> for FlowError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Rejected { status, message } => {
                FlowError::RemoteRejection { status, message }
            }
            other => FlowError::Transport(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for FlowError {
    fn from(errors: ValidationErrors) -> Self {
        FlowError::Validation(errors)
    }
}

/// Result type alias for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
