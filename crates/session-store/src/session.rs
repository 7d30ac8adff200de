//! Typed view over the persisted session keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Logical keys persisted by the onboarding flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKey {
    /// Phone number the verification code was sent to
    #[serde(rename = "phoneNumber")]
    PhoneNumber,
    /// Auth token issued after successful verification
    #[serde(rename = "token")]
    Token,
    /// User identifier issued alongside the token
    #[serde(rename = "userId")]
    UserId,
    /// Serialized pending registration draft
    #[serde(rename = "sessionData")]
    SessionData,
}

impl SessionKey {
    pub const ALL: [SessionKey; 4] = [
        SessionKey::PhoneNumber,
        SessionKey::Token,
        SessionKey::UserId,
        SessionKey::SessionData,
    ];

    /// Key name as written to storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::PhoneNumber => "phoneNumber",
            SessionKey::Token => "token",
            SessionKey::UserId => "userId",
            SessionKey::SessionData => "sessionData",
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the persisted session.
///
/// Empty strings are treated as absent, so a blank value never satisfies
/// the "phone number present" precondition of the OTP phase.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub phone_number: Option<String>,
    pub pending_draft: Option<String>,
    pub auth_token: Option<String>,
    pub user_id: Option<String>,
}

impl Session {
    pub(crate) fn from_entries(entries: &BTreeMap<String, String>) -> Self {
        let read = |key: SessionKey| {
            entries
                .get(key.as_str())
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            phone_number: read(SessionKey::PhoneNumber),
            pending_draft: read(SessionKey::SessionData),
            auth_token: read(SessionKey::Token),
            user_id: read(SessionKey::UserId),
        }
    }

    /// Whether verification already completed for this session.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Whether a registration was submitted and awaits its code.
    pub fn awaiting_verification(&self) -> bool {
        self.phone_number.is_some() && self.auth_token.is_none()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phone_number", &self.phone_number)
            .field("pending_draft", &self.pending_draft.as_ref().map(|_| "[redacted]"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .field("user_id", &self.user_id)
            .finish()
    }
}
