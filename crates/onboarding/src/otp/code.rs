//! One-time code entry and parsing.

use chrono::{DateTime, Utc};
use std::fmt;

/// Number of digits in a verification code.
pub const CODE_LENGTH: usize = 6;

pub const INVALID_CODE_MESSAGE: &str = "Please enter a valid 6-digit code.";

/// Code field contents.
///
/// Non-digit characters are dropped as they are typed and input stops at
/// [`CODE_LENGTH`] digits.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: String,
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append typed characters, keeping digits only.
    pub fn type_str(&mut self, typed: &str) {
        for c in typed.chars().filter(|c| c.is_ascii_digit()) {
            if self.digits.len() == CODE_LENGTH {
                break;
            }
            self.digits.push(c);
        }
    }

    /// Replace the whole field, e.g. on paste.
    pub fn replace(&mut self, value: &str) {
        self.digits.clear();
        self.type_str(value);
    }

    pub fn backspace(&mut self) {
        self.digits.pop();
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Submit is enabled iff the field holds exactly six digits.
    pub fn can_submit(&self) -> bool {
        OtpCode::parse(&self.digits).is_some()
    }
}

impl fmt::Debug for OtpInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpInput")
            .field("len", &self.digits.len())
            .finish()
    }
}

/// A well-formed six-digit code.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Accept exactly [`CODE_LENGTH`] ASCII digits and nothing else.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == CODE_LENGTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// A single verification request. Never persisted.
#[derive(Debug, Clone)]
pub struct OtpAttempt {
    pub code: OtpCode,
    pub submitted_at: DateTime<Utc>,
}

impl OtpAttempt {
    pub fn new(code: OtpCode) -> Self {
        Self {
            code,
            submitted_at: Utc::now(),
        }
    }
}
