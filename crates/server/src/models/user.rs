//! User domain types.

use chrono::{DateTime, Utc};

use loomkart_core::{Email, Role, UserId};

/// A registered account (domain type).
///
/// The password is never held here - only its argon2 hash, and only inside
/// the repository layer during verification.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (unique, lowercased).
    pub email: Email,
    /// Account role.
    pub role: Role,
    /// Whether the account may log in. Set on OTP verification.
    pub is_active: bool,
    /// Whether the email has been verified.
    pub email_verified: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A pending one-time-code challenge (signup OTP).
///
/// Only the SHA-256 digest of the code is stored. The challenge is
/// single-use: it is cleared after successful verification, and invalidated
/// once the attempt cap is exceeded.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// SHA-256 digest of the 6-digit code, hex-encoded.
    pub digest: String,
    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Failed attempts so far.
    pub attempts: i32,
}

impl OtpChallenge {
    /// Maximum wrong attempts before the challenge is invalidated.
    pub const MAX_ATTEMPTS: i32 = 5;

    /// Whether the attempt cap has been reached.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.attempts >= Self::MAX_ATTEMPTS
    }

    /// Whether the challenge has expired at `now`.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A pending password-reset challenge.
///
/// Stores the SHA-256 digest of the emailed token; single-use.
#[derive(Debug, Clone)]
pub struct ResetChallenge {
    /// SHA-256 digest of the reset token, hex-encoded.
    pub digest: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl ResetChallenge {
    /// Whether the challenge has expired at `now`.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
