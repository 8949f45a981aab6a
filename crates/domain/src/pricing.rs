//! The canonical pricing policy.
//!
//! One injectable tax rate and flat shipping fee apply to every checkout;
//! no other code computes totals.

use common::Money;
use serde::Serialize;

/// Tax and shipping applied at checkout.
#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,
    /// Flat shipping fee per order.
    pub shipping_flat: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 1000,
            shipping_flat: Money::from_dollars(10),
        }
    }
}

impl PricingPolicy {
    pub fn new(tax_rate_bps: u32, shipping_flat: Money) -> Self {
        Self {
            tax_rate_bps,
            shipping_flat,
        }
    }

    /// Computes the full price breakdown for an order subtotal.
    pub fn quote(&self, subtotal: Money) -> Totals {
        let tax = subtotal.bps(self.tax_rate_bps);
        let shipping = self.shipping_flat;
        Totals {
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }
}

/// Price breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_worked_example() {
        // 2 x $5.00 + 1 x $10.00 = $20.00; 10% tax = $2.00; $10.00 shipping
        let subtotal = Money::from_dollars(5).times(2) + Money::from_dollars(10);
        let totals = PricingPolicy::default().quote(subtotal);

        assert_eq!(totals.subtotal, Money::from_dollars(20));
        assert_eq!(totals.tax, Money::from_dollars(2));
        assert_eq!(totals.shipping, Money::from_dollars(10));
        assert_eq!(totals.total, Money::from_dollars(32));
    }

    #[test]
    fn zero_subtotal_still_charges_shipping() {
        let totals = PricingPolicy::default().quote(Money::zero());
        assert_eq!(totals.tax, Money::zero());
        assert_eq!(totals.total, Money::from_dollars(10));
    }

    #[test]
    fn custom_rate_and_fee() {
        let policy = PricingPolicy::new(500, Money::from_dollars(5));
        let totals = policy.quote(Money::from_dollars(100));
        assert_eq!(totals.tax, Money::from_dollars(5));
        assert_eq!(totals.total, Money::from_dollars(110));
    }

    #[test]
    fn tax_truncates_fractional_cents() {
        // $0.05 at 10% is 0.5 cents, truncated to zero
        let totals = PricingPolicy::default().quote(Money::from_cents(5));
        assert_eq!(totals.tax, Money::zero());
    }
}
