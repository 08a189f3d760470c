//! Read-only aggregation queries for the admin dashboard.
//!
//! Pure reporting over date-windowed counts and sums; nothing here mutates.
//! Revenue counts delivered orders only.

use serde::Serialize;
use sqlx::PgPool;

use loomkart_core::{Money, OrderStatus};

use super::RepositoryError;

/// User signup counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserStats {
    /// All registered users.
    pub total: i64,
    /// Signups since midnight.
    pub today: i64,
    /// Signups this calendar month.
    pub this_month: i64,
}

/// Catalog counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductStats {
    /// All active products.
    pub total: i64,
    /// Active products at or below their low-stock threshold.
    pub low_stock: i64,
}

/// Order volume counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderStats {
    /// All orders ever placed.
    pub total: i64,
    /// Orders placed since midnight.
    pub today: i64,
    /// Orders placed this calendar month.
    pub this_month: i64,
}

/// Order count for one status.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    /// The status.
    pub status: OrderStatus,
    /// Orders currently in it.
    pub count: i64,
}

/// Revenue sums over delivered orders.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevenueStats {
    /// Lifetime revenue.
    pub lifetime: Money,
    /// Revenue this calendar month.
    pub this_month: Money,
    /// Revenue last calendar month.
    pub last_month: Money,
}

/// Month-over-month revenue trend in percent.
///
/// An undefined previous month is treated as 100% growth.
#[must_use]
pub fn revenue_trend(this_month: Money, last_month: Money) -> f64 {
    use rust_decimal::prelude::ToPrimitive;

    let last = last_month.amount();
    if last.is_zero() {
        return 100.0;
    }
    let delta = this_month.amount() - last;
    (delta / last * rust_decimal::Decimal::from(100))
        .to_f64()
        .unwrap_or(0.0)
}

/// Repository for dashboard aggregation queries.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// User signup counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_stats(&self) -> Result<UserStats, RepositoryError> {
        let stats = sqlx::query_as::<_, UserStats>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS today,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS this_month
             FROM users",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Catalog counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_stats(&self) -> Result<ProductStats, RepositoryError> {
        let stats = sqlx::query_as::<_, ProductStats>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE stock_status <> 'in_stock') AS low_stock
             FROM products WHERE is_active",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Order volume counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_stats(&self) -> Result<OrderStats, RepositoryError> {
        let stats = sqlx::query_as::<_, OrderStats>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS today,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS this_month
             FROM orders",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }

    /// Orders grouped by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(counts)
    }

    /// Revenue sums over delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_stats(&self) -> Result<RevenueStats, RepositoryError> {
        let stats = sqlx::query_as::<_, RevenueStats>(
            "SELECT COALESCE(SUM(total), 0) AS lifetime,
                    COALESCE(SUM(total) FILTER (
                        WHERE created_at >= date_trunc('month', NOW())), 0) AS this_month,
                    COALESCE(SUM(total) FILTER (
                        WHERE created_at >= date_trunc('month', NOW()) - INTERVAL '1 month'
                          AND created_at < date_trunc('month', NOW())), 0) AS last_month
             FROM orders WHERE status = 'delivered'",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_trend_growth() {
        let trend = revenue_trend(Money::from_rupees(150), Money::from_rupees(100));
        assert!((trend - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_revenue_trend_decline() {
        let trend = revenue_trend(Money::from_rupees(50), Money::from_rupees(100));
        assert!((trend - -50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_revenue_trend_undefined_last_month_reads_as_full_growth() {
        let trend = revenue_trend(Money::from_rupees(500), Money::ZERO);
        assert!((trend - 100.0).abs() < f64::EPSILON);
    }
}
