//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::user::OtpChallenge;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] loomkart_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account exists but has not completed OTP verification.
    #[error("account not verified")]
    AccountNotVerified,

    /// The account is already verified; nothing to do.
    #[error("account already verified")]
    AlreadyVerified,

    /// No OTP or reset challenge is pending for this account.
    #[error("no pending verification")]
    NoPendingChallenge,

    /// The OTP has expired.
    #[error("verification code expired")]
    OtpExpired,

    /// The OTP does not match.
    #[error("incorrect verification code")]
    OtpMismatch {
        /// Attempts left before the challenge is invalidated.
        remaining: i32,
    },

    /// The OTP attempt cap was exceeded; the challenge is invalid.
    #[error("too many attempts")]
    TooManyAttempts,

    /// The reset token is unknown or already used.
    #[error("invalid reset token")]
    InvalidResetToken,

    /// The reset token has expired.
    #[error("reset token expired")]
    ResetTokenExpired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::UserNotFound | Self::AccountNotVerified => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidEmail(_)
            | Self::WeakPassword(_)
            | Self::AlreadyVerified
            | Self::NoPendingChallenge
            | Self::OtpExpired
            | Self::OtpMismatch { .. }
            | Self::TooManyAttempts
            | Self::InvalidResetToken
            | Self::ResetTokenExpired => StatusCode::BAD_REQUEST,
            Self::Repository(_) | Self::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message for this error.
    ///
    /// Credential failures collapse into one message so responses don't
    /// reveal whether an email is registered.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials | Self::UserNotFound => "Invalid credentials".to_string(),
            Self::UserAlreadyExists => "An account with this email already exists".to_string(),
            Self::InvalidEmail(_) => "Invalid email address".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::AccountNotVerified => {
                "Please verify your email before logging in".to_string()
            }
            Self::AlreadyVerified => "This account is already verified".to_string(),
            Self::NoPendingChallenge => "No verification is pending for this account".to_string(),
            Self::OtpExpired => "Verification code expired, request a new one".to_string(),
            Self::OtpMismatch { remaining } => {
                format!("Incorrect verification code, {remaining} attempts remaining")
            }
            Self::TooManyAttempts => {
                "Too many attempts, request a new verification code".to_string()
            }
            Self::InvalidResetToken => "Invalid or already used reset link".to_string(),
            Self::ResetTokenExpired => "Reset link expired, request a new one".to_string(),
            Self::Repository(_) | Self::PasswordHash => "Authentication error".to_string(),
        }
    }

    /// Mismatch error for a challenge that just recorded another wrong
    /// attempt.
    #[must_use]
    pub const fn mismatch_after(attempts: i32) -> Self {
        let remaining = OtpChallenge::MAX_ATTEMPTS - attempts;
        if remaining <= 0 {
            Self::TooManyAttempts
        } else {
            Self::OtpMismatch { remaining }
        }
    }
}
