//! Design repository for database operations.
//!
//! Saved custom designs are owner-scoped: every query carries the owning
//! user's ID, so one user can never see or delete another's designs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use loomkart_core::{DesignId, UserId};

use super::RepositoryError;

/// A saved custom design.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Design {
    /// Unique design ID.
    pub id: DesignId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Rendered preview image URL.
    pub preview_url: Option<String>,
    /// Free-form customization payload.
    pub payload: Json<serde_json::Value>,
    /// When the design was saved.
    pub created_at: DateTime<Utc>,
}

/// Repository for design database operations.
pub struct DesignRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DesignRepository<'a> {
    /// Create a new design repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's designs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Design>, RepositoryError> {
        let rows = sqlx::query_as::<_, Design>(
            "SELECT id, user_id, name, preview_url, payload, created_at
             FROM designs WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Get one of the user's designs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: DesignId,
    ) -> Result<Option<Design>, RepositoryError> {
        let row = sqlx::query_as::<_, Design>(
            "SELECT id, user_id, name, preview_url, payload, created_at
             FROM designs WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Save a design.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        name: &str,
        preview_url: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<Design, RepositoryError> {
        let row = sqlx::query_as::<_, Design>(
            "INSERT INTO designs (user_id, name, preview_url, payload)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, name, preview_url, payload, created_at",
        )
        .bind(user_id)
        .bind(name)
        .bind(preview_url)
        .bind(Json(payload))
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete one of the user's designs.
    ///
    /// Returns `true` if a design was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, id: DesignId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM designs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
