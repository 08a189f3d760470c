//! Order domain types, totals arithmetic, and the status state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use loomkart_core::{
    Money, OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

/// Fixed surcharge for cash-on-delivery orders, applied exactly once at
/// order creation.
pub const COD_SURCHARGE: i64 = 50;

/// Days from order creation to the estimated delivery date.
pub const ESTIMATED_DELIVERY_DAYS: i64 = 7;

/// Cancellation reason recorded when the customer gives none.
pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by customer";

/// One line in an order.
///
/// Name and unit price are snapshots taken at order creation; later product
/// changes do not affect placed orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product name at the time of the order.
    pub name: String,
    /// Effective unit price at the time of the order.
    pub price: Money,
    /// Units of this line, always >= 1.
    pub quantity: u32,
    /// Chosen size.
    pub size: String,
    /// Chosen color.
    pub color: String,
    /// Free-form customization payload (e.g. a saved design reference).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<serde_json::Value>,
}

impl OrderItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// Shipping destination recorded on the order. All fields are required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingInfo {
    /// Recipient name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Postal code.
    pub postal_code: String,
}

impl ShippingInfo {
    /// Name of the first empty field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        let fields = [
            (self.name.trim(), "name"),
            (self.phone.trim(), "phone"),
            (self.address.trim(), "address"),
            (self.city.trim(), "city"),
            (self.state.trim(), "state"),
            (self.postal_code.trim(), "postal_code"),
        ];
        fields
            .into_iter()
            .find_map(|(value, field)| value.is_empty().then_some(field))
    }
}

/// One entry in an order's append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    /// The status the order moved to.
    pub status: OrderStatus,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    /// Who drove the transition ("customer", "admin", "system").
    pub actor: String,
    /// Optional note, e.g. the override marker or a cancellation reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StatusHistoryEntry {
    /// Build an entry stamped `now`.
    #[must_use]
    pub fn now(status: OrderStatus, actor: &str, note: Option<String>) -> Self {
        Self {
            status,
            at: Utc::now(),
            actor: actor.to_owned(),
            note,
        }
    }
}

// =============================================================================
// Totals
// =============================================================================

/// The monetary breakdown of an order.
///
/// The invariant `total = subtotal - discount + shipping_cost + cod_charges`
/// holds by construction: `total()` derives from the stored components, and
/// the COD surcharge is fixed at composition time, so recomputing the total
/// never re-applies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of line totals, computed from price snapshots.
    pub subtotal: Money,
    /// Discount applied, clamped to [0, subtotal].
    pub discount: Money,
    /// Flat shipping cost from server config.
    pub shipping_cost: Money,
    /// COD surcharge; zero for prepaid methods.
    pub cod_charges: Money,
}

impl OrderTotals {
    /// Compute totals from item snapshots.
    ///
    /// The subtotal comes from the snapshotted line prices, never from the
    /// request body. The discount is clamped to [0, subtotal]. The COD
    /// surcharge is included iff the payment method is COD.
    #[must_use]
    pub fn compute(
        items: &[OrderItem],
        discount: Money,
        shipping_cost: Money,
        method: PaymentMethod,
    ) -> Self {
        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let discount = if discount.is_negative() {
            Money::ZERO
        } else if discount > subtotal {
            subtotal
        } else {
            discount
        };
        let cod_charges = if method == PaymentMethod::Cod {
            Money::from_rupees(COD_SURCHARGE)
        } else {
            Money::ZERO
        };

        Self {
            subtotal,
            discount,
            shipping_cost,
            cod_charges,
        }
    }

    /// The grand total: `subtotal - discount + shipping_cost + cod_charges`.
    #[must_use]
    pub fn total(&self) -> Money {
        self.subtotal.saturating_sub(self.discount) + self.shipping_cost + self.cod_charges
    }
}

// =============================================================================
// State machine
// =============================================================================

/// How a status change is classified by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A forward step along the fulfillment path.
    Forward,
    /// A customer cancellation from a cancellable status.
    Cancel,
    /// Anything else. Permitted for admins and recorded as an override in
    /// the status history rather than rejected.
    AdminOverride,
}

/// The forward fulfillment path.
const FORWARD_TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Pending, OrderStatus::Confirmed),
    (OrderStatus::Confirmed, OrderStatus::Processing),
    (OrderStatus::Processing, OrderStatus::Shipped),
    (OrderStatus::Shipped, OrderStatus::Delivered),
];

/// Classify a status change against the transition table.
#[must_use]
pub fn classify_transition(from: OrderStatus, to: OrderStatus) -> Transition {
    if FORWARD_TRANSITIONS.contains(&(from, to)) {
        Transition::Forward
    } else if to == OrderStatus::Cancelled && can_cancel(from) {
        Transition::Cancel
    } else {
        Transition::AdminOverride
    }
}

/// Whether a customer may still cancel from this status.
#[must_use]
pub const fn can_cancel(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::Confirmed)
}

// =============================================================================
// Order
// =============================================================================

/// A placed order (domain type). Never physically deleted; cancellation is
/// a status, not a deletion.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Database ID.
    pub id: OrderId,
    /// Human-readable identifier; immutable once assigned.
    pub order_number: OrderNumber,
    /// Owning user.
    pub user_id: UserId,
    /// Line items with price/name snapshots.
    pub items: Vec<OrderItem>,
    /// Shipping destination.
    pub shipping: ShippingInfo,
    /// How the order is paid.
    pub payment_method: PaymentMethod,
    /// Settlement state of the payment.
    pub payment_status: PaymentStatus,
    /// Gateway transaction id, once a payment completed.
    pub transaction_id: Option<String>,
    /// When the payment completed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Monetary breakdown.
    pub subtotal: Money,
    /// Discount applied at creation.
    pub discount: Money,
    /// Shipping cost applied at creation.
    pub shipping_cost: Money,
    /// COD surcharge applied at creation (zero for prepaid methods).
    pub cod_charges: Money,
    /// Grand total; equals `subtotal - discount + shipping_cost + cod_charges`.
    pub total: Money,
    /// Fulfillment status.
    pub status: OrderStatus,
    /// Append-only transition log.
    pub status_history: Vec<StatusHistoryEntry>,
    /// Carrier tracking number, recorded when shipped.
    pub tracking_number: Option<String>,
    /// Estimated delivery date, set at creation.
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    /// Actual delivery timestamp.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the order was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why the order was cancelled.
    pub cancellation_reason: Option<String>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The stored monetary breakdown.
    #[must_use]
    pub const fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            discount: self.discount,
            shipping_cost: self.shipping_cost,
            cod_charges: self.cod_charges,
        }
    }

    /// Whether the stored total matches its components.
    #[must_use]
    pub fn totals_consistent(&self) -> bool {
        self.totals().total() == self.total
    }

    /// Whether the customer may still cancel.
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        can_cancel(self.status)
    }
}

/// The status a fresh order starts in.
///
/// COD orders skip the payment step entirely (the surcharge is collected on
/// delivery), so they are confirmed immediately; prepaid orders stay pending
/// until a payment succeeds.
#[must_use]
pub const fn initial_status(method: PaymentMethod) -> OrderStatus {
    match method {
        PaymentMethod::Cod => OrderStatus::Confirmed,
        PaymentMethod::Card | PaymentMethod::Upi | PaymentMethod::Wallet => OrderStatus::Pending,
    }
}

/// Generate a fresh order number from the current time and a random
/// four-digit component.
#[must_use]
pub fn generate_order_number() -> OrderNumber {
    use rand::Rng;
    let random: u16 = rand::rng().random_range(1000..=9999);
    OrderNumber::compose(Utc::now(), random)
}

/// Estimated delivery date for an order created at `created_at`.
#[must_use]
pub fn estimated_delivery(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(ESTIMATED_DELIVERY_DAYS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            name: "Kalamkari Kurta".to_string(),
            price: Money::from_rupees(price),
            quantity,
            size: "M".to_string(),
            color: "indigo".to_string(),
            customization: None,
        }
    }

    #[test]
    fn test_totals_prepaid() {
        let items = [line(20, 2), line(15, 1)];
        let totals = OrderTotals::compute(
            &items,
            Money::from_rupees(5),
            Money::ZERO,
            PaymentMethod::Card,
        );

        assert_eq!(totals.subtotal, Money::from_rupees(55));
        assert_eq!(totals.cod_charges, Money::ZERO);
        assert_eq!(totals.total(), Money::from_rupees(50));
    }

    #[test]
    fn test_totals_cod_scenario() {
        // 2 x 20 + 1 x 15 = 55 subtotal, 5 discount, free shipping, COD:
        // 55 - 5 + 0 + 50 = 100
        let items = [line(20, 2), line(15, 1)];
        let totals = OrderTotals::compute(
            &items,
            Money::from_rupees(5),
            Money::ZERO,
            PaymentMethod::Cod,
        );

        assert_eq!(totals.subtotal, Money::from_rupees(55));
        assert_eq!(totals.cod_charges, Money::from_rupees(COD_SURCHARGE));
        assert_eq!(totals.total(), Money::from_rupees(100));
    }

    #[test]
    fn test_cod_surcharge_applied_exactly_once() {
        let items = [line(100, 1)];
        let totals = OrderTotals::compute(&items, Money::ZERO, Money::ZERO, PaymentMethod::Cod);

        // Re-deriving the total any number of times never re-applies the
        // surcharge.
        assert_eq!(totals.total(), Money::from_rupees(150));
        assert_eq!(totals.total(), Money::from_rupees(150));
        assert_eq!(totals.cod_charges, Money::from_rupees(COD_SURCHARGE));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let items = [line(30, 1)];
        let totals = OrderTotals::compute(
            &items,
            Money::from_rupees(100),
            Money::ZERO,
            PaymentMethod::Card,
        );

        assert_eq!(totals.discount, Money::from_rupees(30));
        assert_eq!(totals.total(), Money::ZERO);
    }

    #[test]
    fn test_negative_discount_ignored() {
        let items = [line(30, 1)];
        let totals = OrderTotals::compute(
            &items,
            Money::from_rupees(-10),
            Money::ZERO,
            PaymentMethod::Card,
        );

        assert_eq!(totals.discount, Money::ZERO);
        assert_eq!(totals.total(), Money::from_rupees(30));
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(initial_status(PaymentMethod::Cod), OrderStatus::Confirmed);
        assert_eq!(initial_status(PaymentMethod::Card), OrderStatus::Pending);
        assert_eq!(initial_status(PaymentMethod::Upi), OrderStatus::Pending);
        assert_eq!(initial_status(PaymentMethod::Wallet), OrderStatus::Pending);
    }

    #[test]
    fn test_forward_transitions() {
        assert_eq!(
            classify_transition(OrderStatus::Pending, OrderStatus::Confirmed),
            Transition::Forward
        );
        assert_eq!(
            classify_transition(OrderStatus::Processing, OrderStatus::Shipped),
            Transition::Forward
        );
        assert_eq!(
            classify_transition(OrderStatus::Shipped, OrderStatus::Delivered),
            Transition::Forward
        );
    }

    #[test]
    fn test_cancel_transitions() {
        assert_eq!(
            classify_transition(OrderStatus::Pending, OrderStatus::Cancelled),
            Transition::Cancel
        );
        assert_eq!(
            classify_transition(OrderStatus::Confirmed, OrderStatus::Cancelled),
            Transition::Cancel
        );
        // Cancelling a shipped order is not a customer cancel
        assert_eq!(
            classify_transition(OrderStatus::Shipped, OrderStatus::Cancelled),
            Transition::AdminOverride
        );
    }

    #[test]
    fn test_everything_else_is_an_override() {
        assert_eq!(
            classify_transition(OrderStatus::Delivered, OrderStatus::Pending),
            Transition::AdminOverride
        );
        assert_eq!(
            classify_transition(OrderStatus::Pending, OrderStatus::Shipped),
            Transition::AdminOverride
        );
        assert_eq!(
            classify_transition(OrderStatus::Cancelled, OrderStatus::Refunded),
            Transition::AdminOverride
        );
    }

    #[test]
    fn test_can_cancel_guard() {
        assert!(can_cancel(OrderStatus::Pending));
        assert!(can_cancel(OrderStatus::Confirmed));
        assert!(!can_cancel(OrderStatus::Processing));
        assert!(!can_cancel(OrderStatus::Shipped));
        assert!(!can_cancel(OrderStatus::Delivered));
        assert!(!can_cancel(OrderStatus::Cancelled));
    }

    #[test]
    fn test_shipping_info_missing_field() {
        let mut info = ShippingInfo {
            name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address: "14 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560001".to_string(),
        };
        assert_eq!(info.missing_field(), None);

        info.city = "  ".to_string();
        assert_eq!(info.missing_field(), Some("city"));
    }

    #[test]
    fn test_generate_order_number_shape() {
        let number = generate_order_number();
        assert!(OrderNumber::parse(number.as_str()).is_ok());
    }

    #[test]
    fn test_estimated_delivery_window() {
        let created = Utc::now();
        let eta = estimated_delivery(created);
        assert_eq!(eta - created, Duration::days(ESTIMATED_DELIVERY_DAYS));
    }
}
