use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RFC 5321 limit on the total length of an address.
const MAX_EMAIL_LENGTH: usize = 254;

lazy_static! {
    // Structural check only: one local part, an @, and a dotted domain.
    // Deliverability is not our problem to verify.
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$"
    )
    .expect("Failed to compile email regex");
}

/// Errors produced when parsing an email address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailAddressError {
    #[error("Email must not be empty")]
    Empty,
    #[error("Email is too long ({0} characters, max {MAX_EMAIL_LENGTH})")]
    TooLong(usize),
    #[error("'{0}' is not a valid email address")]
    Invalid(String),
}

/// A validated, normalized email address.
///
/// Construction goes through [`EmailAddress::parse`], so holding one means
/// the structural check already passed. Input is trimmed and lowercased, which
/// is what makes the one-record-per-email invariant case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, EmailAddressError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(EmailAddressError::Empty);
        }
        if normalized.len() > MAX_EMAIL_LENGTH {
            return Err(EmailAddressError::TooLong(normalized.len()));
        }
        if !EMAIL_REGEX.is_match(&normalized) {
            return Err(EmailAddressError::Invalid(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscriber about to be persisted.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: EmailAddress,
}

/// A persisted waitlist subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
