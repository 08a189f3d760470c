//! Admin surface: dashboard statistics, order management, catalog management.
//!
//! Every handler requires the admin role via the `RequireAdmin` extractor.

pub mod dashboard;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/orders", get(orders::index))
        .route("/orders/{order_number}/status", put(orders::set_status))
        .route("/products", post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::destroy),
        )
        .route("/products/low-stock", get(products::low_stock))
        .route("/categories", post(products::create_category))
}
