//! Cart domain types and item-list arithmetic.
//!
//! A cart line is keyed by the (product, size, color) triple; the triple is
//! unique within a cart. `total_items` and `total_amount` are derived from
//! the item list and recomputed before every persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loomkart_core::{CartId, CartStatus, Money, ProductId, UserId};

/// One line in a cart.
///
/// Name, image, and price are snapshots taken when the line was added;
/// later product changes do not retroactively affect existing lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product name at the time the line was added.
    pub name: String,
    /// Product image at the time the line was added.
    pub image_url: Option<String>,
    /// Effective unit price at the time the line was added.
    pub price: Money,
    /// Units of this line, always >= 1.
    pub quantity: u32,
    /// Chosen size.
    pub size: String,
    /// Chosen color.
    pub color: String,
}

impl CartItem {
    /// Whether this line is the given (product, size, color) triple.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, size: &str, color: &str) -> bool {
        self.product_id == product_id && self.size == size && self.color == color
    }

    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// A user's cart (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Lifecycle status; at most one `Active` cart exists per user.
    pub status: CartStatus,
    /// Item lines, unique by (product, size, color).
    pub items: Vec<CartItem>,
    /// Derived: sum of line quantities.
    pub total_items: u32,
    /// Derived: sum of line totals.
    pub total_amount: Money,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Add a line, merging into an existing (product, size, color) triple by
    /// accumulating quantity rather than duplicating the line.
    pub fn add_item(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|line| line.matches(item.product_id, &item.size, &item.color))
        {
            Some(line) => line.quantity += item.quantity,
            None => self.items.push(item),
        }
        self.recompute_totals();
    }

    /// Replace the quantity of an existing triple. A quantity of zero or
    /// less removes the line entirely.
    ///
    /// Returns `false` if no line matches the triple.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        size: &str,
        color: &str,
        quantity: i64,
    ) -> bool {
        let Some(index) = self
            .items
            .iter()
            .position(|line| line.matches(product_id, size, color))
        else {
            return false;
        };

        if quantity <= 0 {
            self.items.remove(index);
        } else if let Some(line) = self.items.get_mut(index) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.recompute_totals();
        true
    }

    /// Remove the line matching the triple.
    ///
    /// Returns `false` if no line matches.
    pub fn remove_item(&mut self, product_id: ProductId, size: &str, color: &str) -> bool {
        let before = self.items.len();
        self.items
            .retain(|line| !line.matches(product_id, size, color));
        self.recompute_totals();
        self.items.len() < before
    }

    /// Empty the item list.
    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute_totals();
    }

    /// Recompute the derived totals from the item list.
    ///
    /// Called by every mutator; also exposed for the persistence layer so a
    /// cart is never written with stale totals.
    pub fn recompute_totals(&mut self) {
        let (count, amount) = totals(&self.items);
        self.total_items = count;
        self.total_amount = amount;
    }
}

/// Derived totals for an item list: (sum of quantities, sum of line totals).
#[must_use]
pub fn totals(items: &[CartItem]) -> (u32, Money) {
    let count = items.iter().map(|line| line.quantity).sum();
    let amount = items.iter().map(CartItem::line_total).sum();
    (count, amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_cart() -> Cart {
        Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            status: CartStatus::Active,
            items: Vec::new(),
            total_items: 0,
            total_amount: Money::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tee(quantity: u32, size: &str, color: &str) -> CartItem {
        CartItem {
            product_id: ProductId::new(10),
            name: "Block Print Tee".to_string(),
            image_url: None,
            price: Money::from_rupees(499),
            quantity,
            size: size.to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn test_add_item_appends_new_triple() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));
        cart.add_item(tee(1, "L", "indigo"));

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_amount, Money::from_rupees(499 * 3));
    }

    #[test]
    fn test_add_item_merges_same_triple() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));
        cart.add_item(tee(3, "M", "indigo"));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().unwrap().quantity, 5);
        assert_eq!(cart.total_items, 5);
    }

    #[test]
    fn test_same_product_different_size_is_a_new_line() {
        let mut cart = empty_cart();
        cart.add_item(tee(1, "M", "indigo"));
        cart.add_item(tee(1, "M", "rust"));

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_set_quantity_replaces() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));

        assert!(cart.set_quantity(ProductId::new(10), "M", "indigo", 7));
        assert_eq!(cart.items.first().unwrap().quantity, 7);
        assert_eq!(cart.total_items, 7);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));

        assert!(cart.set_quantity(ProductId::new(10), "M", "indigo", 0));
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.total_amount, Money::ZERO);
    }

    #[test]
    fn test_set_quantity_unknown_triple() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));

        assert!(!cart.set_quantity(ProductId::new(10), "XL", "indigo", 1));
        assert_eq!(cart.total_items, 2);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));
        cart.add_item(tee(1, "L", "indigo"));

        assert!(cart.remove_item(ProductId::new(10), "M", "indigo"));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_items, 1);
        assert!(!cart.remove_item(ProductId::new(10), "M", "indigo"));
    }

    #[test]
    fn test_clear() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));
        cart.clear();

        assert!(cart.items.is_empty());
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.total_amount, Money::ZERO);
    }

    #[test]
    fn test_totals_after_every_mutation() {
        let mut cart = empty_cart();
        cart.add_item(tee(2, "M", "indigo"));
        cart.add_item(tee(1, "L", "rust"));
        cart.set_quantity(ProductId::new(10), "M", "indigo", 4);
        cart.remove_item(ProductId::new(10), "L", "rust");

        let (count, amount) = totals(&cart.items);
        assert_eq!(cart.total_items, count);
        assert_eq!(cart.total_amount, amount);
        assert_eq!(count, 4);
        assert_eq!(amount, Money::from_rupees(499 * 4));
    }
}
