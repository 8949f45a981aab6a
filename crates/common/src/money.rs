//! Money represented in integer cents to avoid floating point drift.

use serde::{Deserialize, Serialize};

/// A monetary amount in cents (e.g. 1000 = $10.00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from whole dollars.
    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies the amount by a quantity.
    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }

    /// Returns the given fraction of this amount in basis points,
    /// truncated towards zero. `Money::from_dollars(20).bps(1000)` is $2.00.
    pub fn bps(&self, basis_points: u32) -> Money {
        Money(self.0 * i64::from(basis_points) / 10_000)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dollars = self.0 / 100;
        let rem = (self.0 % 100).abs();
        if self.0 < 0 && dollars == 0 {
            write!(f, "-$0.{rem:02}")
        } else if self.0 < 0 {
            write!(f, "-${}.{rem:02}", dollars.abs())
        } else {
            write!(f, "${dollars}.{rem:02}")
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        assert_eq!(Money::from_dollars(12).cents(), 1200);
        assert_eq!(Money::from_cents(1234).cents(), 1234);
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!(a.times(3).cents(), 3000);
    }

    #[test]
    fn basis_points() {
        // 10% of $20.00
        assert_eq!(Money::from_dollars(20).bps(1000).cents(), 200);
        // 5% of $0.99 truncates
        assert_eq!(Money::from_cents(99).bps(500).cents(), 4);
    }

    #[test]
    fn sum_of_line_totals() {
        let total: Money = [Money::from_cents(500).times(2), Money::from_cents(1000)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn serialization_is_transparent() {
        let m = Money::from_cents(1999);
        assert_eq!(serde_json::to_string(&m).unwrap(), "1999");
        let back: Money = serde_json::from_str("1999").unwrap();
        assert_eq!(back, m);
    }
}
