//! Personal-information draft and its local validation rules.

use crate::error::{Field, ValidationErrors};
use registration_client::{RegisterRequest, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub const MIN_FULL_NAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Characters that satisfy the "special character" password rule.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{7,15}$").expect("valid phone regex"));

/// Raw personal-information form as typed by the user.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInput {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl DraftInput {
    /// Check every field rule and produce an immutable draft.
    pub fn validate(self) -> Result<RegistrationDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let full_name = self.full_name.trim().to_string();
        if full_name.chars().count() < MIN_FULL_NAME_LEN {
            errors.push(Field::FullName, "Full name must be at least 3 characters");
        }

        let email = self.email.trim().to_string();
        if !EMAIL_RE.is_match(&email) {
            errors.push(Field::Email, "Please enter a valid email address");
        }

        let phone_number = self.phone_number.trim().to_string();
        if phone_number.is_empty() {
            errors.push(Field::PhoneNumber, "Phone number is required.");
        } else if !PHONE_RE.is_match(&phone_number) {
            errors.push(Field::PhoneNumber, "Please enter a valid phone number");
        }

        let checks = PasswordChecks::evaluate(&self.password);
        if !checks.length {
            errors.push(Field::Password, "Password must be at least 8 characters");
        }
        if !checks.special {
            errors.push(
                Field::Password,
                "Password must contain at least 1 special character",
            );
        }
        if !checks.number {
            errors.push(Field::Password, "Password must contain at least 1 number");
        }

        if self.password != self.confirm_password {
            errors.push(Field::ConfirmPassword, "Passwords do not match");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(RegistrationDraft {
            full_name,
            email,
            phone_number,
            password: self.password,
            confirm_password: self.confirm_password,
            role: Role::PropertyManager,
        })
    }
}

impl fmt::Debug for DraftInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftInput")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .finish_non_exhaustive()
    }
}

/// Which password rules a typed value already satisfies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordChecks {
    pub length: bool,
    pub special: bool,
    pub number: bool,
}

impl PasswordChecks {
    pub fn evaluate(password: &str) -> Self {
        Self {
            length: password.chars().count() >= MIN_PASSWORD_LEN,
            special: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            number: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    pub fn all_met(&self) -> bool {
        self.length && self.special && self.number
    }
}

/// A validated registration payload.
///
/// Only obtainable through [`DraftInput::validate`] (deserialization runs
/// the same rules), so every instance satisfies the field constraints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DraftInput")]
pub struct RegistrationDraft {
    full_name: String,
    email: String,
    phone_number: String,
    password: String,
    confirm_password: String,
    role: Role,
}

impl RegistrationDraft {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Wire body for `POST /register`.
    pub fn to_request(&self) -> RegisterRequest {
        RegisterRequest {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            role: self.role,
        }
    }
}

impl TryFrom<DraftInput> for RegistrationDraft {
    type Error = ValidationErrors;

    fn try_from(input: DraftInput) -> Result<Self, Self::Error> {
        input.validate()
    }
}

impl fmt::Debug for RegistrationDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationDraft")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
