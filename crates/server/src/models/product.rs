//! Product domain types and stock derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomkart_core::{CategoryId, Money, ProductId, StockStatus};

/// A catalog entry (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// URL slug (unique).
    pub slug: String,
    /// Merchandising description.
    pub description: String,
    /// Category this product belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// List price.
    pub price: Money,
    /// Discounted price; the product is on sale iff this is present and
    /// lower than `price`.
    pub sale_price: Option<Money>,
    /// Units on hand.
    pub stock_quantity: i32,
    /// At or below this quantity the product counts as low stock.
    pub low_stock_threshold: i32,
    /// Derived from quantity and threshold before every save.
    pub stock_status: StockStatus,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Available sizes.
    pub sizes: Vec<String>,
    /// Available colors.
    pub colors: Vec<String>,
    /// Soft-delete flag; inactive products are hidden from the catalog.
    pub is_active: bool,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a buyer pays right now: `sale_price` when present and
    /// lower than `price`, else `price`.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        effective_price(self.price, self.sale_price)
    }

    /// Whether the sale price applies.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }
}

/// A catalog category (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL slug (unique).
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Derive the stock status from quantity and threshold.
///
/// Must be called before every product save so the persisted status is
/// always consistent with the persisted quantity.
#[must_use]
pub const fn derive_stock_status(quantity: i32, low_stock_threshold: i32) -> StockStatus {
    if quantity <= 0 {
        StockStatus::OutOfStock
    } else if quantity <= low_stock_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

/// Effective price given list and sale prices.
#[must_use]
pub fn effective_price(price: Money, sale_price: Option<Money>) -> Money {
    match sale_price {
        Some(sale) if sale < price => sale,
        _ => price,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_out_of_stock_at_zero_and_below() {
        assert_eq!(derive_stock_status(0, 5), StockStatus::OutOfStock);
        assert_eq!(derive_stock_status(-3, 5), StockStatus::OutOfStock);
    }

    #[test]
    fn test_stock_status_low_stock_within_threshold() {
        assert_eq!(derive_stock_status(1, 5), StockStatus::LowStock);
        assert_eq!(derive_stock_status(5, 5), StockStatus::LowStock);
    }

    #[test]
    fn test_stock_status_in_stock_above_threshold() {
        assert_eq!(derive_stock_status(6, 5), StockStatus::InStock);
        assert_eq!(derive_stock_status(500, 5), StockStatus::InStock);
    }

    #[test]
    fn test_effective_price_prefers_lower_sale_price() {
        let price = Money::from_rupees(999);
        let sale = Money::from_rupees(749);
        assert_eq!(effective_price(price, Some(sale)), sale);
    }

    #[test]
    fn test_effective_price_ignores_higher_sale_price() {
        let price = Money::from_rupees(999);
        let sale = Money::from_rupees(1299);
        assert_eq!(effective_price(price, Some(sale)), price);
        assert_eq!(effective_price(price, None), price);
    }
}
