//! Order route handlers: creation, payment, listing, cancellation.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use loomkart_core::{
    Money, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
};

use crate::db::orders::{OrderDraft, OrderRepository};
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{
    Order, OrderItem, OrderTotals, ShippingInfo, StatusHistoryEntry, estimated_delivery,
    generate_order_number, initial_status,
};
use crate::routes::{ApiData, Page, Paginated, ok};
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

/// One requested line item.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Option<i32>,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub customization: Option<serde_json::Value>,
}

/// Shipping fields as they arrive on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfoRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl ShippingInfoRequest {
    fn into_shipping(self) -> ShippingInfo {
        ShippingInfo {
            name: self.name.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            postal_code: self.postal_code.unwrap_or_default(),
        }
    }
}

/// Payment fields as they arrive on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoRequest {
    pub method: Option<PaymentMethod>,
}

/// Request to place an order.
///
/// Client-computed `subtotal`/`total` are accepted for wire compatibility
/// but ignored: the server recomputes everything from its own price
/// snapshots.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderItemRequest>>,
    pub shipping_info: Option<ShippingInfoRequest>,
    pub payment_info: Option<PaymentInfoRequest>,
    pub discount: Option<Money>,
    pub subtotal: Option<Money>,
    pub total: Option<Money>,
}

/// Request to pay for an order. The payload is forwarded to the gateway
/// as-is; the mock gateway ignores it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub payment_data: Option<serde_json::Value>,
}

/// Request to cancel an order.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Compact order summary returned by the creation endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryView {
    pub id: i32,
    pub order_id: String,
    pub status: OrderStatus,
    pub total: Money,
    pub payment_status: PaymentStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            order_id: order.order_number.to_string(),
            status: order.status,
            total: order.total,
            payment_status: order.payment_status,
            estimated_delivery: order.estimated_delivery_at,
            created_at: order.created_at,
        }
    }
}

/// Query parameters for order listings.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Status filter.
    pub status: Option<String>,
}

pub(crate) fn parse_status_filter(status: Option<&str>) -> Result<Option<OrderStatus>> {
    status
        .map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|_| AppError::Validation(format!("invalid status '{s}'")))
        })
        .transpose()
}

fn parse_order_number(raw: &str) -> Result<OrderNumber> {
    OrderNumber::parse(raw).map_err(|_| AppError::NotFound(format!("order '{raw}' not found")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Place an order.
///
/// Prices and names are snapshotted from the live products; the subtotal is
/// recomputed server-side. COD orders take the fixed surcharge exactly once
/// and start out confirmed (payment due on delivery); prepaid orders start
/// pending.
#[instrument(skip(user, state, body))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let item_requests = body.items.unwrap_or_default();
    if item_requests.is_empty() {
        return Err(AppError::Validation("items must not be empty".to_string()));
    }

    let shipping = body
        .shipping_info
        .ok_or_else(|| AppError::Validation("shippingInfo is required".to_string()))?
        .into_shipping();
    if let Some(field) = shipping.missing_field() {
        return Err(AppError::Validation(format!(
            "shippingInfo.{field} is required"
        )));
    }

    let method = body
        .payment_info
        .and_then(|p| p.method)
        .ok_or_else(|| AppError::Validation("paymentInfo.method is required".to_string()))?;

    // Snapshot every product's current name and effective price.
    let products = ProductRepository::new(state.pool());
    let mut items = Vec::with_capacity(item_requests.len());
    for request in item_requests {
        let product_id = request
            .product_id
            .map(ProductId::new)
            .ok_or_else(|| AppError::Validation("items[].productId is required".to_string()))?;
        let quantity = request.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(AppError::Validation(
                "items[].quantity must be at least 1".to_string(),
            ));
        }

        let product = products
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

        items.push(OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            price: product.effective_price(),
            quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
            size: request.size.unwrap_or_default(),
            color: request.color.unwrap_or_default(),
            customization: request.customization,
        });
    }

    let totals = OrderTotals::compute(
        &items,
        body.discount.unwrap_or(Money::ZERO),
        state.config().shipping_flat_rate,
        method,
    );

    let now = Utc::now();
    let draft = OrderDraft {
        order_number: generate_order_number(),
        user_id: user.id,
        items,
        shipping,
        payment_method: method,
        subtotal: totals.subtotal,
        discount: totals.discount,
        shipping_cost: totals.shipping_cost,
        cod_charges: totals.cod_charges,
        total: totals.total(),
        status: initial_status(method),
        estimated_delivery_at: estimated_delivery(now),
    };

    let repo = OrderRepository::new(state.pool());
    let order = repo.create(&draft).await?;

    tracing::info!(
        order_number = %order.order_number,
        user_id = %user.id,
        total = %order.total,
        method = %method,
        "Order placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "orderId": order.order_number,
            "order": OrderSummaryView::from(&order),
        })),
    ))
}

/// The caller's orders, newest first.
#[instrument(skip(user, state))]
pub async fn my_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiData<Paginated<Order>>>> {
    let page = Page::from_params(query.page, query.limit);
    let status = parse_status_filter(query.status.as_deref())?;

    let repo = OrderRepository::new(state.pool());
    let (orders, total) = repo
        .list_by_user(user.id, status, page.limit(), page.offset())
        .await?;

    Ok(ok(Paginated::new(orders, total, &page)))
}

/// Order detail; visible to its owner and to admins.
#[instrument(skip(user, state))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<ApiData<Order>>> {
    let order_number = parse_order_number(&order_number)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order '{order_number}' not found")))?;

    if order.user_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden("not your order".to_string()));
    }

    Ok(ok(order))
}

/// Pay for an order via the mock gateway.
///
/// COD never goes through this path, and an order whose payment already
/// completed is rejected before the gateway is invoked.
#[instrument(skip(user, state, _body))]
pub async fn pay(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(_body): Json<PayRequest>,
) -> Result<Json<serde_json::Value>> {
    let order_number = parse_order_number(&order_number)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order '{order_number}' not found")))?;

    if order.user_id != user.id {
        return Err(AppError::Forbidden("not your order".to_string()));
    }
    if order.payment_status == PaymentStatus::Completed {
        return Err(AppError::InvalidState("Order is already paid".to_string()));
    }
    if order.payment_method == PaymentMethod::Cod {
        return Err(AppError::InvalidState(
            "Cash on delivery orders are settled at the door".to_string(),
        ));
    }

    match state
        .payments()
        .charge(order.payment_method, order.total, &order.order_number)
        .await
    {
        Ok(receipt) => {
            // A successful payment confirms a pending order; any further
            // along and the status stays put.
            let (new_status, history) = if order.status == OrderStatus::Pending {
                (
                    OrderStatus::Confirmed,
                    vec![StatusHistoryEntry::now(
                        OrderStatus::Confirmed,
                        "system",
                        Some("payment completed".to_string()),
                    )],
                )
            } else {
                (order.status, Vec::new())
            };

            let applied = repo
                .complete_payment(
                    order.id,
                    &receipt.transaction_id,
                    receipt.paid_at,
                    new_status,
                    &history,
                )
                .await?;
            if !applied {
                // A concurrent attempt won the race.
                return Err(AppError::InvalidState("Order is already paid".to_string()));
            }

            Ok(Json(json!({
                "success": true,
                "orderId": order.order_number,
                "transactionId": receipt.transaction_id,
                "paymentStatus": PaymentStatus::Completed,
                "orderStatus": new_status,
            })))
        }
        Err(err) => {
            repo.mark_payment_failed(order.id).await?;
            Err(AppError::Payment(err))
        }
    }
}

/// Cancel an order. Only possible while pending or confirmed.
#[instrument(skip(user, state, body))]
pub async fn cancel(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<serde_json::Value>> {
    use crate::models::order::DEFAULT_CANCEL_REASON;

    let order_number = parse_order_number(&order_number)?;

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order '{order_number}' not found")))?;

    if order.user_id != user.id {
        return Err(AppError::Forbidden("not your order".to_string()));
    }
    if !order.can_cancel() {
        return Err(AppError::InvalidState(format!(
            "Order cannot be cancelled from status '{}'",
            order.status
        )));
    }

    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCEL_REASON)
        .to_owned();
    let entry = StatusHistoryEntry::now(OrderStatus::Cancelled, "customer", Some(reason.clone()));

    let applied = repo.cancel(order.id, &reason, &entry).await?;
    if !applied {
        // The order moved on between the read and the write.
        return Err(AppError::InvalidState(
            "Order can no longer be cancelled".to_string(),
        ));
    }

    let cancelled = repo
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| AppError::Internal("cancelled order vanished".to_string()))?;

    tracing::info!(order_number = %order_number, user_id = %user.id, "Order cancelled");

    Ok(Json(json!({
        "success": true,
        "orderId": cancelled.order_number,
        "status": cancelled.status,
        "cancelledAt": cancelled.cancelled_at,
    })))
}
