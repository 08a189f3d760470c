//! Cart route handlers.
//!
//! Every handler operates on the authenticated caller's own active cart,
//! looked up (or lazily created) by the caller's identity; cross-user
//! access is impossible by construction. Totals are recomputed by the cart
//! mutators before every save.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use loomkart_core::ProductId;

use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::{Cart, CartItem};
use crate::routes::{ApiData, ok};
use crate::state::AppState;

/// Request to add an item. All fields are required.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<i32>,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Request to replace an item's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: Option<i32>,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Request to remove an item.
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub product_id: Option<i32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

fn required_str<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn required_product(value: Option<i32>) -> Result<ProductId> {
    value
        .map(ProductId::new)
        .ok_or_else(|| AppError::Validation("product_id is required".to_string()))
}

/// The caller's active cart, created lazily.
#[instrument(skip(user, state))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiData<Cart>>> {
    let repo = CartRepository::new(state.pool());
    let cart = repo.find_or_create_active(user.id).await?;

    Ok(ok(cart))
}

/// Add an item, merging into an existing (product, size, color) line.
#[instrument(skip(user, state, body))]
pub async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<ApiData<Cart>>> {
    let product_id = required_product(body.product_id)?;
    let size = required_str(&body.size, "size")?;
    let color = required_str(&body.color, "color")?;
    let quantity = body.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_string()));
    }

    let products = ProductRepository::new(state.pool());
    let product = products
        .get(product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

    let carts = CartRepository::new(state.pool());
    let mut cart = carts.find_or_create_active(user.id).await?;

    // Snapshot the product at add time; later price changes leave the line
    // untouched.
    cart.add_item(CartItem {
        product_id: product.id,
        name: product.name.clone(),
        image_url: product.image_url.clone(),
        price: product.effective_price(),
        quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
        size: size.to_owned(),
        color: color.to_owned(),
    });
    carts.save(&mut cart).await?;

    Ok(ok(cart))
}

/// Replace an item's quantity; zero or less removes the line.
#[instrument(skip(user, state, body))]
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<ApiData<Cart>>> {
    let product_id = required_product(body.product_id)?;
    let size = required_str(&body.size, "size")?;
    let color = required_str(&body.color, "color")?;
    let quantity = body
        .quantity
        .ok_or_else(|| AppError::Validation("quantity is required".to_string()))?;

    let carts = CartRepository::new(state.pool());
    let mut cart = carts.find_or_create_active(user.id).await?;

    if !cart.set_quantity(product_id, size, color, quantity) {
        return Err(AppError::NotFound("item not in cart".to_string()));
    }
    carts.save(&mut cart).await?;

    Ok(ok(cart))
}

/// Remove the line matching the (product, size, color) triple.
#[instrument(skip(user, state, body))]
pub async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<RemoveItemRequest>,
) -> Result<Json<ApiData<Cart>>> {
    let product_id = required_product(body.product_id)?;
    let size = required_str(&body.size, "size")?;
    let color = required_str(&body.color, "color")?;

    let carts = CartRepository::new(state.pool());
    let mut cart = carts.find_or_create_active(user.id).await?;

    if !cart.remove_item(product_id, size, color) {
        return Err(AppError::NotFound("item not in cart".to_string()));
    }
    carts.save(&mut cart).await?;

    Ok(ok(cart))
}

/// Empty the cart.
#[instrument(skip(user, state))]
pub async fn clear(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiData<Cart>>> {
    let carts = CartRepository::new(state.pool());
    let mut cart = carts.find_or_create_active(user.id).await?;

    cart.clear();
    carts.save(&mut cart).await?;

    Ok(ok(cart))
}
