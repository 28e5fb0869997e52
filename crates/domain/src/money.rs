use serde::{Deserialize, Serialize};

/// Money amount represented in minor units (cents) to avoid floating
/// point issues. Single-currency by design; the currency code lives in
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a money amount from minor units (e.g. 6000 = 60.00).
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity, e.g. a line's unit price times its count.
    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0 * i64::from(quantity))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.0.abs() / 100, self.0.abs() % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cents_roundtrip() {
        assert_eq!(Money::from_cents(6000).cents(), 6000);
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn times_computes_line_totals() {
        assert_eq!(Money::from_cents(6000).times(3).cents(), 18000);
        assert_eq!(Money::from_cents(999).times(0).cents(), 0);
    }

    #[test]
    fn display_formats_major_and_minor_units() {
        assert_eq!(Money::from_cents(18000).to_string(), "180.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn sum_accumulates() {
        let total: Money = [100, 250, 50].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 400);
    }

    #[test]
    fn serializes_as_plain_integer() {
        assert_eq!(serde_json::to_string(&Money::from_cents(6000)).unwrap(), "6000");
    }
}
