//! Product and category repositories.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use loomkart_core::{CategoryId, Money, ProductId, StockStatus};

use super::{RepositoryError, map_unique_violation};
use crate::models::product::{Category, Product, derive_stock_status};

/// Database row for the `products` table.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    slug: String,
    description: String,
    category_id: Option<CategoryId>,
    price: Money,
    sale_price: Option<Money>,
    stock_quantity: i32,
    low_stock_threshold: i32,
    stock_status: StockStatus,
    image_url: Option<String>,
    sizes: Json<Vec<String>>,
    colors: Json<Vec<String>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const PRODUCT_COLUMNS: &str = "id, name, slug, description, category_id, price, sale_price, \
     stock_quantity, low_stock_threshold, stock_status, image_url, sizes, colors, is_active, \
     created_at, updated_at";

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            category_id: row.category_id,
            price: row.price,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            low_stock_threshold: row.low_stock_threshold,
            stock_status: row.stock_status,
            image_url: row.image_url,
            sizes: row.sizes.0,
            colors: row.colors.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for creating or replacing a product.
///
/// `stock_status` is not part of the draft: it is derived from quantity and
/// threshold at write time, so the persisted status can never disagree with
/// the persisted quantity.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub image_url: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_active: bool,
}

/// Paged listing filters for the public catalog.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to a category slug.
    pub category: Option<String>,
    /// Case-insensitive name substring.
    pub search: Option<String>,
    /// Include soft-deleted products (admin listings).
    pub include_inactive: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching the filter, newest first.
    ///
    /// Returns the page of products and the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE (p.is_active OR $1)
               AND ($2::text IS NULL
                    OR p.category_id = (SELECT id FROM categories WHERE slug = $2))
               AND ($3::text IS NULL OR p.name ILIKE '%' || $3 || '%')
             ORDER BY p.created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.include_inactive)
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products p
             WHERE (p.is_active OR $1)
               AND ($2::text IS NULL
                    OR p.category_id = (SELECT id FROM categories WHERE slug = $2))
               AND ($3::text IS NULL OR p.name ILIKE '%' || $3 || '%')",
        )
        .bind(filter.include_inactive)
        .bind(filter.category.as_deref())
        .bind(filter.search.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    /// Get a product by ID, regardless of active state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product. Derives `stock_status` before the insert.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug already exists.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let stock_status = derive_stock_status(draft.stock_quantity, draft.low_stock_threshold);

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products
                 (name, slug, description, category_id, price, sale_price,
                  stock_quantity, low_stock_threshold, stock_status, image_url,
                  sizes, colors, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(draft.price)
        .bind(draft.sale_price)
        .bind(draft.stock_quantity)
        .bind(draft.low_stock_threshold)
        .bind(stock_status)
        .bind(draft.image_url.as_deref())
        .bind(Json(&draft.sizes))
        .bind(Json(&draft.colors))
        .bind(draft.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "product slug already exists"))?;

        Ok(row.into())
    }

    /// Replace a product's fields. Derives `stock_status` before the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let stock_status = derive_stock_status(draft.stock_quantity, draft.low_stock_threshold);

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET name = $2, slug = $3, description = $4, category_id = $5,
                 price = $6, sale_price = $7, stock_quantity = $8,
                 low_stock_threshold = $9, stock_status = $10, image_url = $11,
                 sizes = $12, colors = $13, is_active = $14, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(&draft.description)
        .bind(draft.category_id)
        .bind(draft.price)
        .bind(draft.sale_price)
        .bind(draft.stock_quantity)
        .bind(draft.low_stock_threshold)
        .bind(stock_status)
        .bind(draft.image_url.as_deref())
        .bind(Json(&draft.sizes))
        .bind(Json(&draft.colors))
        .bind(draft.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "product slug already exists"))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Active products at or below their low-stock threshold, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active AND stock_status <> 'in_stock'
             ORDER BY stock_quantity ASC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Database row for the `categories` table.
#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug already exists.
    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, slug, description)
             VALUES ($1, $2, $3)
             RETURNING id, name, slug, description",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "category slug already exists"))?;

        Ok(row.into())
    }
}
