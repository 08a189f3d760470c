//! Admin catalog management: product CRUD and category creation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use loomkart_core::{CategoryId, Money, ProductId};

use crate::db::products::{CategoryRepository, ProductDraft, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::product::{Category, Product};
use crate::routes::{ApiData, ok};
use crate::state::AppState;

/// Default low-stock threshold for new products.
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Request to create a product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub price: Option<Money>,
    pub sale_price: Option<Money>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub image_url: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
}

/// Request to update a product. Absent fields keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub price: Option<Money>,
    pub sale_price: Option<Money>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub image_url: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Request to create a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

/// Lowercase-and-hyphenate a name into a URL slug.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_owned()
}

/// Create a product.
#[instrument(skip(_admin, state, body))]
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiData<Product>>)> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
    let price = body
        .price
        .ok_or_else(|| AppError::Validation("price is required".to_string()))?;
    if price.is_negative() {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }

    let draft = ProductDraft {
        name: name.to_owned(),
        slug: body
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| slugify(name), slugify),
        description: body.description.unwrap_or_default(),
        category_id: body.category_id.map(CategoryId::new),
        price,
        sale_price: body.sale_price,
        stock_quantity: body.stock_quantity.unwrap_or(0),
        low_stock_threshold: body
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        image_url: body.image_url,
        sizes: body.sizes.unwrap_or_default(),
        colors: body.colors.unwrap_or_default(),
        is_active: true,
    };

    let repo = ProductRepository::new(state.pool());
    let product = repo.create(&draft).await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");

    Ok((StatusCode::CREATED, ok(product)))
}

/// Update a product. Absent fields keep their current value; the stock
/// status is re-derived from the written quantity and threshold.
#[instrument(skip(_admin, state, body))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiData<Product>>> {
    let id = ProductId::new(id);

    let repo = ProductRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;

    let draft = ProductDraft {
        name: body.name.unwrap_or(existing.name),
        slug: body.slug.as_deref().map_or(existing.slug, slugify),
        description: body.description.unwrap_or(existing.description),
        category_id: body
            .category_id
            .map(CategoryId::new)
            .or(existing.category_id),
        price: body.price.unwrap_or(existing.price),
        sale_price: body.sale_price.or(existing.sale_price),
        stock_quantity: body.stock_quantity.unwrap_or(existing.stock_quantity),
        low_stock_threshold: body
            .low_stock_threshold
            .unwrap_or(existing.low_stock_threshold),
        image_url: body.image_url.or(existing.image_url),
        sizes: body.sizes.unwrap_or(existing.sizes),
        colors: body.colors.unwrap_or(existing.colors),
        is_active: body.is_active.unwrap_or(existing.is_active),
    };

    let product = repo.update(id, &draft).await?;

    Ok(ok(product))
}

/// Soft-delete a product.
#[instrument(skip(_admin, state))]
pub async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    let repo = ProductRepository::new(state.pool());
    repo.deactivate(ProductId::new(id)).await?;

    Ok(Json(json!({ "success": true, "message": "Product removed" })))
}

/// Active products at or below their low-stock threshold.
#[instrument(skip(_admin, state))]
pub async fn low_stock(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ApiData<Vec<Product>>>> {
    let repo = ProductRepository::new(state.pool());
    let products = repo.low_stock(50).await?;

    Ok(ok(products))
}

/// Create a category.
#[instrument(skip(_admin, state, body))]
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiData<Category>>)> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;

    let slug = body
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| slugify(name), slugify);

    let repo = CategoryRepository::new(state.pool());
    let category = repo
        .create(name, &slug, body.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, ok(category)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Block Print Tee"), "block-print-tee");
        assert_eq!(slugify("  Kalamkari  Kurta! "), "kalamkari-kurta");
        assert_eq!(slugify("Saree (Silk) #3"), "saree-silk-3");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
    }
}
