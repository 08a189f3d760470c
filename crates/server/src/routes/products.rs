//! Public catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::products::{CategoryRepository, ProductFilter, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::product::{Category, Product};
use crate::routes::{ApiData, Page, Paginated, ok};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Category slug filter.
    pub category: Option<String>,
    /// Case-insensitive name substring.
    pub search: Option<String>,
}

/// Paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiData<Paginated<Product>>>> {
    let page = Page::from_params(query.page, query.limit);
    let filter = ProductFilter {
        category: query.category.clone(),
        search: query.search.clone(),
        include_inactive: false,
    };

    let repo = ProductRepository::new(state.pool());
    let (products, total) = repo.list(&filter, page.limit(), page.offset()).await?;

    Ok(ok(Paginated::new(products, total, &page)))
}

/// Product detail by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiData<Product>>> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}' not found")))?;

    Ok(ok(product))
}

/// Category listing.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<ApiData<Vec<Category>>>> {
    let repo = CategoryRepository::new(state.pool());
    let categories = repo.list().await?;

    Ok(ok(categories))
}
