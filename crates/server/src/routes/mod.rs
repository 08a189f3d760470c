//! HTTP route handlers for the API server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (verifies database)
//!
//! # Auth (rate limited)
//! POST /auth/register           - Create account, email OTP
//! POST /auth/verify-otp         - Verify signup OTP
//! POST /auth/resend-otp         - Issue a fresh OTP
//! POST /auth/login              - Password login (session cookie)
//! POST /auth/logout             - Clear session
//! POST /auth/forgot-password    - Open password-reset challenge
//! POST /auth/reset-password     - Complete password reset
//! GET  /auth/me                 - Current user profile
//!
//! # Catalog (public)
//! GET  /products                - Paginated listing (category/search filters)
//! GET  /products/{slug}         - Product detail
//! GET  /categories              - Category list
//!
//! # Cart (requires auth)
//! GET    /cart                  - Active cart (created lazily)
//! POST   /cart/add              - Add item (merges same product/size/color)
//! PUT    /cart/update           - Replace item quantity (0 removes)
//! DELETE /cart/remove           - Remove item
//! DELETE /cart/clear            - Empty the cart
//!
//! # Orders (requires auth)
//! POST /orders                          - Place an order
//! GET  /orders/myorders                 - Own orders, paginated
//! GET  /orders/{orderNumber}            - Order detail (owner or admin)
//! POST /orders/{orderNumber}/pay        - Pay via the mock gateway
//! PUT  /orders/{orderNumber}/cancel     - Cancel (pending/confirmed only)
//!
//! # Designs (requires auth)
//! GET    /designs               - Own designs
//! POST   /designs               - Save a design
//! GET    /designs/{id}          - Design detail
//! DELETE /designs/{id}          - Delete a design
//!
//! # Admin (requires admin role)
//! GET  /admin/dashboard                     - Aggregate statistics
//! GET  /admin/orders                        - All orders, paginated
//! PUT  /admin/orders/{orderNumber}/status   - Status transition
//! POST /admin/products                      - Create product
//! PUT  /admin/products/{id}                 - Update product
//! DELETE /admin/products/{id}               - Soft-delete product
//! GET  /admin/products/low-stock            - Low-stock listing
//! POST /admin/categories                    - Create category
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod designs;
pub mod orders;
pub mod products;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde::Serialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Standard success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiData<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiData<T>> {
    Json(ApiData {
        success: true,
        data,
    })
}

/// Pagination parameters with sane defaults.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// 1-based page number.
    pub page: i64,
    /// Page size, clamped to 1..=100.
    pub limit: i64,
}

impl Page {
    /// Build from optional query parameters.
    #[must_use]
    pub fn from_params(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1),
            limit: limit.unwrap_or(20),
        }
    }

    /// Clamped page size.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    /// Row offset for the clamped page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::from_params(None, None)
    }
}

/// A paginated result set.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Paginated<T> {
    /// Assemble a page of results.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, page: &Page) -> Self {
        Self {
            items,
            total,
            page: page.page.max(1),
            limit: page.limit(),
        }
    }
}

/// Create the auth routes router (rate limited).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", put(cart::update))
        .route("/remove", delete(cart::remove))
        .route("/clear", delete(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/myorders", get(orders::my_orders))
        .route("/{order_number}", get(orders::show))
        .route("/{order_number}/pay", post(orders::pay))
        .route("/{order_number}/cancel", put(orders::cancel))
}

/// Create the design routes router.
pub fn design_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(designs::index).post(designs::create))
        .route("/{id}", get(designs::show).delete(designs::destroy))
}

/// Create all routes for the API server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/designs", design_routes())
        .nest("/admin", admin::routes())
}
