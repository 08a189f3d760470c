//! Order repository for database operations.
//!
//! Orders are append-mostly: created once, mutated only by the payment,
//! status-transition, and cancel operations, never deleted. Every mutation
//! appends to the JSONB `status_history` in the same statement, and the
//! guards that protect state conflicts (`ALREADY_PAID`, cancellable
//! statuses) are repeated in the UPDATE's WHERE clause so racing requests
//! cannot both commit.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use loomkart_core::{
    Money, OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::{RepositoryError, map_unique_violation};
use crate::models::order::{Order, OrderItem, ShippingInfo, StatusHistoryEntry};

/// Database row for the `orders` table.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    shipping: Json<ShippingInfo>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    transaction_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    subtotal: Money,
    discount: Money,
    shipping_cost: Money,
    cod_charges: Money,
    total: Money,
    status: OrderStatus,
    status_history: Json<Vec<StatusHistoryEntry>>,
    tracking_number: Option<String>,
    estimated_delivery_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, shipping, payment_method, \
     payment_status, transaction_id, paid_at, subtotal, discount, shipping_cost, cod_charges, \
     total, status, status_history, tracking_number, estimated_delivery_at, delivered_at, \
     cancelled_at, cancellation_reason, created_at, updated_at";

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            items: row.items.0,
            shipping: row.shipping.0,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            transaction_id: row.transaction_id,
            paid_at: row.paid_at,
            subtotal: row.subtotal,
            discount: row.discount,
            shipping_cost: row.shipping_cost,
            cod_charges: row.cod_charges,
            total: row.total,
            status: row.status,
            status_history: row.status_history.0,
            tracking_number: row.tracking_number,
            estimated_delivery_at: row.estimated_delivery_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for inserting a new order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_cost: Money,
    pub cod_charges: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub estimated_delivery_at: DateTime<Utc>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new order with its first status-history entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number collides.
    pub async fn create(&self, draft: &OrderDraft) -> Result<Order, RepositoryError> {
        let first_entry = StatusHistoryEntry::now(draft.status, "system", None);

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders
                 (order_number, user_id, items, shipping, payment_method, payment_status,
                  subtotal, discount, shipping_cost, cod_charges, total, status,
                  status_history, estimated_delivery_at)
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&draft.order_number)
        .bind(draft.user_id)
        .bind(Json(&draft.items))
        .bind(Json(&draft.shipping))
        .bind(draft.payment_method)
        .bind(draft.subtotal)
        .bind(draft.discount)
        .bind(draft.shipping_cost)
        .bind(draft.cod_charges)
        .bind(draft.total)
        .bind(draft.status)
        .bind(Json(vec![first_entry]))
        .bind(draft.estimated_delivery_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "order number already exists"))?;

        Ok(row.into())
    }

    /// Get an order by its order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(order_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// List a user's orders, newest first, optionally filtered by status.
    ///
    /// Returns the page of orders and the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows.into_iter().map(Order::from).collect(), total))
    }

    /// List all orders (admin), newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::order_status IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows.into_iter().map(Order::from).collect(), total))
    }

    /// Record a completed payment.
    ///
    /// The `payment_status <> 'completed'` guard is part of the statement,
    /// so of two racing successful attempts only one commits. Returns
    /// `false` when the guard rejected the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn complete_payment(
        &self,
        id: OrderId,
        transaction_id: &str,
        paid_at: DateTime<Utc>,
        new_status: OrderStatus,
        history: &[StatusHistoryEntry],
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET payment_status = 'completed', transaction_id = $2, paid_at = $3,
                 status = $4, status_history = status_history || $5, updated_at = NOW()
             WHERE id = $1 AND payment_status <> 'completed'",
        )
        .bind(id)
        .bind(transaction_id)
        .bind(paid_at)
        .bind(new_status)
        .bind(Json(history))
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a failed payment attempt. The order status is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_payment_failed(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE orders
             SET payment_status = 'failed', updated_at = NOW()
             WHERE id = $1 AND payment_status <> 'completed'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Apply an admin status transition, appending to the history.
    ///
    /// A tracking number is recorded when supplied; `delivered_at` is
    /// stamped when the target status is `delivered`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        entry: &StatusHistoryEntry,
        tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders
             SET status = $2,
                 status_history = status_history || $3,
                 tracking_number = COALESCE($4, tracking_number),
                 delivered_at = CASE WHEN $2 = 'delivered'::order_status
                                     THEN NOW() ELSE delivered_at END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(Json(std::slice::from_ref(entry)))
        .bind(tracking_number)
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::from).ok_or(RepositoryError::NotFound)
    }

    /// Cancel an order from a cancellable status.
    ///
    /// The cancellable-status guard is part of the statement; a `completed`
    /// payment flips to `refunded` in the same write (bookkeeping only, no
    /// refund transaction occurs). Returns `false` when the guard rejected
    /// the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cancel(
        &self,
        id: OrderId,
        reason: &str,
        entry: &StatusHistoryEntry,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders
             SET status = 'cancelled',
                 cancelled_at = NOW(),
                 cancellation_reason = $2,
                 payment_status = CASE WHEN payment_status = 'completed'
                                        THEN 'refunded'::payment_status
                                        ELSE payment_status END,
                 status_history = status_history || $3,
                 updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'confirmed')",
        )
        .bind(id)
        .bind(reason)
        .bind(Json(std::slice::from_ref(entry)))
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
