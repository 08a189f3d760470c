//! Cart repository for database operations.
//!
//! At most one active cart exists per user, enforced by a partial unique
//! index on `(user_id) WHERE status = 'active'`. Callers find-or-create
//! rather than blind-insert; the index closes the race between two
//! concurrent first reads.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use loomkart_core::{CartId, CartStatus, Money, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem};

/// Database row for the `carts` table.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    status: CartStatus,
    items: Json<Vec<CartItem>>,
    total_items: i32,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const CART_COLUMNS: &str =
    "id, user_id, status, items, total_items, total_amount, created_at, updated_at";

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            items: row.items.0,
            total_items: row.total_items.unsigned_abs(),
            total_amount: row.total_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's active cart, creating an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_or_create_active(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // The partial unique index makes the insert a no-op when an active
        // cart already exists, so concurrent first reads converge on one row.
        sqlx::query(
            "INSERT INTO carts (user_id, status, items, total_items, total_amount)
             VALUES ($1, 'active', '[]'::jsonb, 0, 0)
             ON CONFLICT (user_id) WHERE status = 'active' DO NOTHING",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'active'"
        ))
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Persist a cart's items and derived totals.
    ///
    /// The caller is expected to have recomputed totals via the cart's
    /// mutators; this method re-derives them anyway so a cart is never
    /// written with stale totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart doesn't exist.
    pub async fn save(&self, cart: &mut Cart) -> Result<(), RepositoryError> {
        cart.recompute_totals();

        let result = sqlx::query(
            "UPDATE carts
             SET items = $3, total_items = $4, total_amount = $5, updated_at = NOW()
             WHERE id = $1 AND user_id = $2",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(Json(&cart.items))
        .bind(i32::try_from(cart.total_items).unwrap_or(i32::MAX))
        .bind(cart.total_amount)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
