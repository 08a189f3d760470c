//! Mock payment gateway.
//!
//! Stands in for a real payment provider: each method is a randomized
//! success/failure generator with an artificial delay simulating the gateway
//! round trip. The outcome source is injectable so tests run deterministic
//! and latency-free.
//!
//! COD never passes through here - it settles on delivery.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use uuid::Uuid;

use loomkart_core::{Money, OrderNumber, PaymentMethod};

/// Simulated gateway latency bounds in milliseconds.
const LATENCY_MS: std::ops::RangeInclusive<u64> = 1000..=2000;

/// Errors returned by the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway declined the charge. Carries the gateway's reason string.
    #[error("{0}")]
    Declined(String),

    /// The method never goes through the online gateway.
    #[error("Payment method '{0}' cannot be paid online")]
    UnsupportedMethod(PaymentMethod),
}

/// A completed charge.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// Gateway transaction identifier.
    pub transaction_id: String,
    /// When the charge completed.
    pub paid_at: DateTime<Utc>,
}

/// Source of uniform random draws in `[0, 1)` deciding charge outcomes.
///
/// The production source draws from the thread RNG; tests inject fixed or
/// seeded sources to make outcomes deterministic.
pub trait OutcomeSource: Send + Sync {
    /// Draw the next outcome value.
    fn roll(&self) -> f64;
}

/// Production outcome source backed by the thread RNG.
#[derive(Debug, Default)]
pub struct ThreadRngOutcomes;

impl OutcomeSource for ThreadRngOutcomes {
    fn roll(&self) -> f64 {
        rand::rng().random()
    }
}

/// Outcome source that always returns the same value. Test double.
#[derive(Debug)]
pub struct FixedOutcomes(pub f64);

impl OutcomeSource for FixedOutcomes {
    fn roll(&self) -> f64 {
        self.0
    }
}

/// Outcome source drawing from a seeded RNG. Test double for statistical
/// properties.
#[derive(Debug)]
pub struct SeededOutcomes(Mutex<StdRng>);

impl SeededOutcomes {
    /// Create a source seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl OutcomeSource for SeededOutcomes {
    fn roll(&self) -> f64 {
        match self.0.lock() {
            Ok(mut rng) => rng.random(),
            Err(poisoned) => poisoned.into_inner().random(),
        }
    }
}

/// The mock payment gateway.
pub struct PaymentSimulator {
    outcomes: Box<dyn OutcomeSource>,
    simulate_latency: bool,
}

impl PaymentSimulator {
    /// Production simulator: thread RNG outcomes, 1-2 s simulated latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Box::new(ThreadRngOutcomes),
            simulate_latency: true,
        }
    }

    /// Simulator with an injected outcome source and no latency.
    #[must_use]
    pub fn with_outcomes(outcomes: Box<dyn OutcomeSource>) -> Self {
        Self {
            outcomes,
            simulate_latency: false,
        }
    }

    /// The success probability for an online method; `None` for COD.
    #[must_use]
    pub const fn success_rate(method: PaymentMethod) -> Option<f64> {
        match method {
            PaymentMethod::Card => Some(0.90),
            PaymentMethod::Upi => Some(0.95),
            PaymentMethod::Wallet => Some(0.92),
            PaymentMethod::Cod => None,
        }
    }

    /// Attempt to charge `amount` for `order_number` via `method`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::UnsupportedMethod` for COD, or
    /// `PaymentError::Declined` with the gateway's reason string when the
    /// simulated charge fails.
    pub async fn charge(
        &self,
        method: PaymentMethod,
        amount: Money,
        order_number: &OrderNumber,
    ) -> Result<PaymentReceipt, PaymentError> {
        let Some(rate) = Self::success_rate(method) else {
            return Err(PaymentError::UnsupportedMethod(method));
        };

        if self.simulate_latency {
            let delay = rand::rng().random_range(LATENCY_MS);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.outcomes.roll() < rate {
            let receipt = PaymentReceipt {
                transaction_id: format!("TXN-{}", Uuid::new_v4().simple()),
                paid_at: Utc::now(),
            };
            tracing::info!(
                order_number = %order_number,
                method = %method,
                amount = %amount,
                transaction_id = %receipt.transaction_id,
                "Payment completed"
            );
            Ok(receipt)
        } else {
            let reason = decline_reason(method);
            tracing::warn!(
                order_number = %order_number,
                method = %method,
                amount = %amount,
                reason,
                "Payment declined"
            );
            Err(PaymentError::Declined(reason.to_owned()))
        }
    }
}

impl Default for PaymentSimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// The gateway's reason string for a declined charge.
const fn decline_reason(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "Card declined by issuing bank",
        PaymentMethod::Upi => "UPI transaction failed, please retry from your UPI app",
        PaymentMethod::Wallet => "Insufficient wallet balance",
        PaymentMethod::Cod => "Cash on delivery is settled at the door",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order_number() -> OrderNumber {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        OrderNumber::compose(at, 4821)
    }

    #[tokio::test]
    async fn test_charge_success_records_transaction() {
        let simulator = PaymentSimulator::with_outcomes(Box::new(FixedOutcomes(0.0)));
        let receipt = simulator
            .charge(PaymentMethod::Card, Money::from_rupees(499), &order_number())
            .await
            .unwrap();

        assert!(receipt.transaction_id.starts_with("TXN-"));
    }

    #[tokio::test]
    async fn test_charge_failure_carries_reason() {
        let simulator = PaymentSimulator::with_outcomes(Box::new(FixedOutcomes(0.9999)));
        let err = simulator
            .charge(PaymentMethod::Upi, Money::from_rupees(499), &order_number())
            .await
            .unwrap_err();

        match err {
            PaymentError::Declined(reason) => assert!(reason.contains("UPI")),
            PaymentError::UnsupportedMethod(_) => panic!("expected a decline"),
        }
    }

    #[tokio::test]
    async fn test_cod_is_rejected_without_rolling() {
        let simulator = PaymentSimulator::with_outcomes(Box::new(FixedOutcomes(0.0)));
        let err = simulator
            .charge(PaymentMethod::Cod, Money::from_rupees(499), &order_number())
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_success_rates() {
        assert_eq!(PaymentSimulator::success_rate(PaymentMethod::Card), Some(0.90));
        assert_eq!(PaymentSimulator::success_rate(PaymentMethod::Upi), Some(0.95));
        assert_eq!(
            PaymentSimulator::success_rate(PaymentMethod::Wallet),
            Some(0.92)
        );
        assert_eq!(PaymentSimulator::success_rate(PaymentMethod::Cod), None);
    }

    #[tokio::test]
    async fn test_card_success_rate_over_1000_seeded_draws() {
        let simulator = PaymentSimulator::with_outcomes(Box::new(SeededOutcomes::new(7)));
        let number = order_number();

        let mut successes = 0;
        for _ in 0..1000 {
            if simulator
                .charge(PaymentMethod::Card, Money::from_rupees(100), &number)
                .await
                .is_ok()
            {
                successes += 1;
            }
        }

        // ~90% success; generous band keeps the test robust to seed choice.
        assert!(
            (850..=950).contains(&successes),
            "card simulator succeeded {successes}/1000 times"
        );
    }
}
