//! Admin order management: listing and status transitions.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use loomkart_core::{OrderNumber, OrderStatus};

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::order::{Order, StatusHistoryEntry, Transition, classify_transition};
use crate::routes::orders::{OrderListQuery, parse_status_filter};
use crate::routes::{ApiData, Page, Paginated, ok};
use crate::state::AppState;

/// Request to move an order to a new status.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: Option<String>,
    pub tracking_number: Option<String>,
}

/// All orders, newest first, optionally filtered by status.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiData<Paginated<Order>>>> {
    let page = Page::from_params(query.page, query.limit);
    let status = parse_status_filter(query.status.as_deref())?;

    let repo = OrderRepository::new(state.pool());
    let (orders, total) = repo.list_all(status, page.limit(), page.offset()).await?;

    Ok(ok(Paginated::new(orders, total, &page)))
}

/// Move an order to a new status.
///
/// The transition table classifies the change; anything off the forward
/// path is still applied but recorded in the history as an administrative
/// override. A tracking number is recorded when supplied with `shipped`.
#[instrument(skip(admin, state, body))]
pub async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    let order_number = OrderNumber::parse(&order_number)
        .map_err(|_| AppError::NotFound(format!("order '{order_number}' not found")))?;

    let target = body
        .status
        .as_deref()
        .ok_or_else(|| AppError::Validation("status is required".to_string()))?
        .parse::<OrderStatus>()
        .map_err(AppError::Validation)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order '{order_number}' not found")))?;

    let note = match classify_transition(order.status, target) {
        Transition::AdminOverride => Some(format!(
            "administrative override from '{}'",
            order.status
        )),
        Transition::Forward | Transition::Cancel => None,
    };
    let entry = StatusHistoryEntry::now(target, "admin", note);

    let tracking = if target == OrderStatus::Shipped {
        body.tracking_number.as_deref()
    } else {
        None
    };

    let updated = repo.set_status(order.id, target, &entry, tracking).await?;

    tracing::info!(
        order_number = %order_number,
        admin = %admin.email,
        from = %order.status,
        to = %target,
        "Order status updated"
    );

    Ok(Json(json!({
        "success": true,
        "orderId": updated.order_number,
        "status": updated.status,
        "trackingNumber": updated.tracking_number,
    })))
}
