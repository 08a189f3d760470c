//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use loomkart_core::{Email, Role, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::user::{OtpChallenge, ResetChallenge, User};

/// Database row for the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    role: Role,
    is_active: bool,
    email_verified: bool,
    otp_digest: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    otp_attempts: i32,
    reset_digest: Option<String>,
    reset_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, name, email, role, is_active, email_verified, \
     otp_digest, otp_expires_at, otp_attempts, reset_digest, reset_expires_at, \
     created_at, updated_at";

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            is_active: self.is_active,
            email_verified: self.email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn otp_challenge(&self) -> Option<OtpChallenge> {
        match (&self.otp_digest, self.otp_expires_at) {
            (Some(digest), Some(expires_at)) => Some(OtpChallenge {
                digest: digest.clone(),
                expires_at,
                attempts: self.otp_attempts,
            }),
            _ => None,
        }
    }

    fn reset_challenge(&self) -> Option<ResetChallenge> {
        match (&self.reset_digest, self.reset_expires_at) {
            (Some(digest), Some(expires_at)) => Some(ResetChallenge {
                digest: digest.clone(),
                expires_at,
            }),
            _ => None,
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new inactive user with its signup OTP challenge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
        challenge: &OtpChallenge,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, otp_digest, otp_expires_at, otp_attempts)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(&challenge.digest)
        .bind(challenge.expires_at)
        .bind(challenge.attempts)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email already exists"))?;

        Ok(row.into_user())
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// Get a user's password hash by email.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct HashRow {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, HashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.user.into_user(), r.password_hash)))
    }

    /// Get a user and their pending OTP challenge, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_otp_challenge(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<OtpChallenge>)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| {
            let challenge = r.otp_challenge();
            (r.into_user(), challenge)
        }))
    }

    /// Record a failed OTP attempt, returning the new attempt count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn record_otp_attempt(&self, user_id: UserId) -> Result<i32, RepositoryError> {
        let attempts: Option<i32> = sqlx::query_scalar(
            "UPDATE users
             SET otp_attempts = otp_attempts + 1, updated_at = NOW()
             WHERE id = $1
             RETURNING otp_attempts",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        attempts.ok_or(RepositoryError::NotFound)
    }

    /// Activate a user after successful OTP verification, clearing the
    /// challenge so the code cannot be replayed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn activate(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET is_active = TRUE, email_verified = TRUE,
                 otp_digest = NULL, otp_expires_at = NULL, otp_attempts = 0,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Replace the OTP challenge (resend), resetting the attempt counter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn replace_otp_challenge(
        &self,
        user_id: UserId,
        challenge: &OtpChallenge,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET otp_digest = $2, otp_expires_at = $3, otp_attempts = 0, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(&challenge.digest)
        .bind(challenge.expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Store a password-reset challenge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_reset_challenge(
        &self,
        user_id: UserId,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET reset_digest = $2, reset_expires_at = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(digest)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Find the user holding a pending reset challenge with this digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_reset_digest(
        &self,
        digest: &str,
    ) -> Result<Option<(User, ResetChallenge)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_digest = $1"
        ))
        .bind(digest)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.and_then(|r| {
            let challenge = r.reset_challenge()?;
            Some((r.into_user(), challenge))
        }))
    }

    /// Set a new password hash and clear the reset challenge in one write,
    /// making the reset token single-use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_password_and_clear_reset(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = $2, reset_digest = NULL, reset_expires_at = NULL,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
