//! Admin dashboard handler: read-only aggregate statistics.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::stats::{
    OrderStats, ProductStats, RevenueStats, StatsRepository, StatusCount, UserStats, revenue_trend,
};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::product::Product;
use crate::routes::orders::OrderSummaryView;
use crate::routes::{ApiData, ok};
use crate::state::AppState;

/// How many recent orders and low-stock products the dashboard lists.
const DASHBOARD_LIST_LIMIT: i64 = 10;

/// Order-volume section of the dashboard.
#[derive(Debug, Serialize)]
pub struct OrderSection {
    #[serde(flatten)]
    pub counts: OrderStats,
    pub by_status: Vec<StatusCount>,
}

/// Revenue section of the dashboard (delivered orders only).
#[derive(Debug, Serialize)]
pub struct RevenueSection {
    #[serde(flatten)]
    pub sums: RevenueStats,
    /// Month-over-month trend in percent.
    pub trend_pct: f64,
}

/// The assembled dashboard payload.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub users: UserStats,
    pub products: ProductStats,
    pub orders: OrderSection,
    pub revenue: RevenueSection,
    pub recent_orders: Vec<OrderSummaryView>,
    pub low_stock_alerts: Vec<Product>,
}

/// Aggregate statistics for the admin dashboard.
#[instrument(skip(_admin, state))]
pub async fn dashboard(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ApiData<Dashboard>>> {
    let stats = StatsRepository::new(state.pool());
    let orders_repo = OrderRepository::new(state.pool());
    let products_repo = ProductRepository::new(state.pool());

    let (users, products, order_counts, by_status, revenue, recent, low_stock) = tokio::try_join!(
        stats.user_stats(),
        stats.product_stats(),
        stats.order_stats(),
        stats.orders_by_status(),
        stats.revenue_stats(),
        orders_repo.list_all(None, DASHBOARD_LIST_LIMIT, 0),
        products_repo.low_stock(DASHBOARD_LIST_LIMIT),
    )?;

    let trend_pct = revenue_trend(revenue.this_month, revenue.last_month);
    let recent_orders = recent.0.iter().map(OrderSummaryView::from).collect();

    Ok(ok(Dashboard {
        users,
        products,
        orders: OrderSection {
            counts: order_counts,
            by_status,
        },
        revenue: RevenueSection {
            sums: revenue,
            trend_pct,
        },
        recent_orders,
        low_stock_alerts: low_stock,
    }))
}
