//! Authentication service.
//!
//! Signup with OTP email verification, password login, and password reset.
//! Passwords are hashed with Argon2id; OTP codes and reset tokens are stored
//! only as SHA-256 digests and are single-use.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use loomkart_core::Email;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{OtpChallenge, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a signup OTP stays valid.
const OTP_TTL_MINUTES: i64 = 10;

/// How long a password-reset token stays valid.
const RESET_TTL_HOURS: i64 = 1;

/// Authentication service.
///
/// Plaintext codes and tokens are returned to the caller for delivery and
/// never persisted.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Signup and OTP verification
    // =========================================================================

    /// Register a new account and open its OTP challenge.
    ///
    /// The account starts inactive; it activates on OTP verification.
    /// Returns the created user and the plaintext OTP for email delivery.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid,
    /// `AuthError::WeakPassword` if the password doesn't meet requirements,
    /// or `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;
        let otp = generate_otp();
        let challenge = OtpChallenge {
            digest: sha256_hex(&otp),
            expires_at: Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
            attempts: 0,
        };

        let user = self
            .users
            .create(name, &email, &password_hash, &challenge)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok((user, otp))
    }

    /// Verify a signup OTP, activating the account on success.
    ///
    /// A wrong code increments the attempt counter; once the cap is reached
    /// the challenge is invalidated and every further attempt fails with
    /// `TooManyAttempts`, even with the correct code.
    ///
    /// # Errors
    ///
    /// Returns the specific challenge failure; see [`AuthError`].
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let (user, challenge) = self
            .users
            .get_otp_challenge(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let Some(challenge) = challenge else {
            return Err(AuthError::NoPendingChallenge);
        };

        match check_otp(&challenge, code, Utc::now()) {
            Ok(()) => {
                self.users.activate(user.id).await?;
                Ok(User {
                    is_active: true,
                    email_verified: true,
                    ..user
                })
            }
            Err(AuthError::OtpMismatch { .. }) => {
                let attempts = self.users.record_otp_attempt(user.id).await?;
                Err(AuthError::mismatch_after(attempts))
            }
            Err(other) => Err(other),
        }
    }

    /// Issue a fresh OTP for an unverified account, resetting the attempt
    /// counter. Returns the user and the plaintext code for delivery.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyVerified` if the account is verified, or
    /// `AuthError::UserNotFound` if no account matches.
    pub async fn resend_otp(&self, email: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let otp = generate_otp();
        let challenge = OtpChallenge {
            digest: sha256_hex(&otp),
            expires_at: Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
            attempts: 0,
        };
        self.users.replace_otp_challenge(user.id, &challenge).await?;

        Ok((user, otp))
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is
    /// wrong, or `AuthError::AccountNotVerified` for unverified accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountNotVerified);
        }

        Ok(user)
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Open a password-reset challenge for the account, if it exists.
    ///
    /// Returns `None` for unknown emails so the handler can respond
    /// identically either way; otherwise returns the user and the plaintext
    /// token for email delivery.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn forgot_password(&self, email: &str) -> Result<Option<(User, String)>, AuthError> {
        let email = Email::parse(email)?;
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TTL_HOURS);
        self.users
            .set_reset_challenge(user.id, &sha256_hex(&token), expires_at)
            .await?;

        Ok(Some((user, token)))
    }

    /// Complete a password reset. The token is single-use: the challenge is
    /// cleared in the same write that sets the new password hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` for unknown/used tokens or
    /// `AuthError::ResetTokenExpired` past the expiry.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let (user, challenge) = self
            .users
            .find_by_reset_digest(&sha256_hex(token))
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if challenge.expired(Utc::now()) {
            return Err(AuthError::ResetTokenExpired);
        }

        let password_hash = hash_password(new_password)?;
        self.users
            .set_password_and_clear_reset(user.id, &password_hash)
            .await?;

        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: loomkart_core::UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

// =============================================================================
// Challenge checks and hashing
// =============================================================================

/// Check a code against a pending OTP challenge.
///
/// Order matters: an exhausted challenge always fails with
/// `TooManyAttempts`, even if the code would match.
fn check_otp(challenge: &OtpChallenge, code: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
    if challenge.exhausted() {
        return Err(AuthError::TooManyAttempts);
    }
    if challenge.expired(now) {
        return Err(AuthError::OtpExpired);
    }
    if challenge.digest != sha256_hex(code.trim()) {
        return Err(AuthError::OtpMismatch { remaining: 0 });
    }
    Ok(())
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_otp() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Generate an opaque password-reset token.
fn generate_reset_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hex-encoded SHA-256 digest of the input.
fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn challenge(code: &str, attempts: i32, ttl_minutes: i64) -> OtpChallenge {
        OtpChallenge {
            digest: sha256_hex(code),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
            attempts,
        }
    }

    #[test]
    fn test_check_otp_accepts_correct_code() {
        let c = challenge("482910", 0, 10);
        assert!(check_otp(&c, "482910", Utc::now()).is_ok());
        // Leading/trailing whitespace from the client is tolerated
        assert!(check_otp(&c, " 482910 ", Utc::now()).is_ok());
    }

    #[test]
    fn test_check_otp_rejects_wrong_code() {
        let c = challenge("482910", 0, 10);
        assert!(matches!(
            check_otp(&c, "000000", Utc::now()),
            Err(AuthError::OtpMismatch { .. })
        ));
    }

    #[test]
    fn test_check_otp_rejects_expired() {
        let c = challenge("482910", 0, -1);
        assert!(matches!(
            check_otp(&c, "482910", Utc::now()),
            Err(AuthError::OtpExpired)
        ));
    }

    #[test]
    fn test_exhausted_challenge_rejects_even_correct_code() {
        // Five wrong attempts have been recorded; the sixth attempt fails
        // with TooManyAttempts even though the code matches.
        let c = challenge("482910", OtpChallenge::MAX_ATTEMPTS, 10);
        assert!(matches!(
            check_otp(&c, "482910", Utc::now()),
            Err(AuthError::TooManyAttempts)
        ));
    }

    #[test]
    fn test_mismatch_after_counts_down_then_locks() {
        assert!(matches!(
            AuthError::mismatch_after(1),
            AuthError::OtpMismatch { remaining: 4 }
        ));
        assert!(matches!(
            AuthError::mismatch_after(4),
            AuthError::OtpMismatch { remaining: 1 }
        ));
        assert!(matches!(
            AuthError::mismatch_after(5),
            AuthError::TooManyAttempts
        ));
    }

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_sha256_hex_is_stable() {
        assert_eq!(sha256_hex("482910"), sha256_hex("482910"));
        assert_ne!(sha256_hex("482910"), sha256_hex("482911"));
        assert_eq!(sha256_hex("x").len(), 64);
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
