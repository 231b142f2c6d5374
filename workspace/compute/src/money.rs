//! Fixed-point money.
//!
//! All settlement arithmetic runs on whole cents so that replaying the same
//! events always yields bit-identical results.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// An amount of the settlement currency in hundredths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Largest magnitude accepted from a caller: ten trillion currency units.
    ///
    /// Keeps the sum of any realistic number of lines far away from `i64` limits.
    /// Sums are still checked, see [`Cents::checked_sum`].
    pub const MAX: Cents = Cents(1_000_000_000_000_000);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn amount(self) -> i64 {
        self.0
    }

    /// Exact conversion for caller input.
    ///
    /// Returns `None` for sub-cent precision or a magnitude above [`Cents::MAX`].
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let scaled = value.checked_mul(Decimal::ONE_HUNDRED)?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled
            .to_i64()
            .filter(|cents| cents.unsigned_abs() <= Cents::MAX.0.unsigned_abs())
            .map(Self)
    }

    /// Conversion for values read back from storage.
    ///
    /// Some backends round-trip decimals through floating point, so the value is
    /// rounded to the nearest cent instead of rejected.
    pub fn from_stored(value: Decimal) -> Option<Self> {
        value
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Self)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `max(self, 0)`
    pub fn non_negative(self) -> Self {
        self.max(Cents::ZERO)
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_neg(self) -> Option<Cents> {
        self.0.checked_neg().map(Self)
    }

    /// Sum of all values, or `None` as soon as the running total leaves `i64`.
    pub fn checked_sum<I>(values: I) -> Option<Cents>
    where
        I: IntoIterator<Item = Cents>,
    {
        values
            .into_iter()
            .try_fold(Cents::ZERO, |total, value| total.checked_add(value))
    }
}

/// A stored amount as it is shown to clients: rounded to the cent, always two places.
pub fn to_cent_scale(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_is_exact() {
        assert_eq!(Cents::from_decimal(Decimal::new(12345, 2)), Some(Cents::new(12345)));
        assert_eq!(Cents::from_decimal(Decimal::new(150, 0)), Some(Cents::new(15000)));
        assert_eq!(Cents::from_decimal(Decimal::new(-5, 1)), Some(Cents::new(-50)));
        // 1.005 has a fraction of a cent
        assert_eq!(Cents::from_decimal(Decimal::new(1005, 3)), None);
        // Trailing zeros beyond two places are fine
        assert_eq!(Cents::from_decimal(Decimal::new(100500, 4)), Some(Cents::new(1005)));
    }

    #[test]
    fn test_from_stored_rounds_to_nearest_cent() {
        assert_eq!(
            Cents::from_stored(Decimal::new(1000000000000000001, 17)),
            Some(Cents::new(1000))
        );
        assert_eq!(Cents::from_stored(Decimal::new(1005, 3)), Some(Cents::new(101)));
        assert_eq!(Cents::from_stored(Decimal::new(-1005, 3)), Some(Cents::new(-101)));
    }

    #[test]
    fn test_cent_scale_pads_and_rounds() {
        assert_eq!(to_cent_scale(Decimal::new(100, 0)).to_string(), "100.00");
        assert_eq!(to_cent_scale(Decimal::new(333299999, 7)).to_string(), "33.33");
    }

    #[test]
    fn test_from_decimal_rejects_amounts_above_ceiling() {
        let ceiling = Cents::MAX.to_decimal();
        assert_eq!(Cents::from_decimal(ceiling), Some(Cents::MAX));
        assert_eq!(Cents::from_decimal(-ceiling), Some(Cents::new(-Cents::MAX.amount())));
        assert_eq!(Cents::from_decimal(ceiling + Decimal::new(1, 2)), None);
        assert_eq!(Cents::from_decimal(Decimal::new(i64::MAX - 1, 2)), None);
        assert_eq!(Cents::from_decimal(Decimal::MAX), None);
    }

    #[test]
    fn test_checked_arithmetic_and_display() {
        let total = Cents::checked_sum([Cents::new(10), Cents::new(25), Cents::new(-5)]).unwrap();
        assert_eq!(total, Cents::new(30));
        let total = total.checked_sub(Cents::new(45)).unwrap();
        assert!(total.is_negative());
        assert_eq!(total.non_negative(), Cents::ZERO);
        assert_eq!(total.checked_neg().unwrap().to_string(), "0.15");
        assert_eq!(Cents::new(12000).to_decimal(), Decimal::new(120, 0));
        assert_eq!(Cents::checked_sum(std::iter::empty()), Some(Cents::ZERO));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let near_limit = Cents::new(i64::MAX - 1);
        assert_eq!(near_limit.checked_add(Cents::new(300)), None);
        assert_eq!(Cents::new(i64::MIN).checked_sub(Cents::new(1)), None);
        assert_eq!(Cents::new(i64::MIN).checked_neg(), None);
        assert_eq!(Cents::checked_sum([near_limit, Cents::new(300)]), None);
        // Wrapping back into range must not hide an earlier overflow
        assert_eq!(Cents::checked_sum([near_limit, Cents::new(300), Cents::new(-600)]), None);
    }
}
