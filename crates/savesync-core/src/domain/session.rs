//! Session credential and linked profile
//!
//! The client authenticates with an opaque bearer credential obtained by
//! exchanging a short link code. The credential has no expiry known to the
//! client; it stays valid until the server rejects it or the user logs out.

use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Length of the link codes issued by the server
pub const LINK_CODE_LEN: usize = 6;

/// Opaque bearer credential
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::InvalidCredential(
                "credential is empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Validated link code typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCode(String);

impl LinkCode {
    pub fn new(code: impl AsRef<str>) -> Result<Self, DomainError> {
        let code = code.as_ref().trim();
        if code.chars().count() != LINK_CODE_LEN {
            return Err(DomainError::InvalidLinkCode(format!(
                "expected {LINK_CODE_LEN} characters, got {}",
                code.chars().count()
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Profile of the linked user as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default = "default_plan")]
    pub plan: String,
}

fn default_plan() -> String {
    "free".to_string()
}

/// Result of a successful link
#[derive(Debug, Clone)]
pub struct LinkedSession {
    pub credential: Credential,
    pub profile: Profile,
}

/// Result of verifying a credential remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(Profile),
    Invalid,
}
