use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const IDR_CURRENCY_CODE: &str = "IDR";
pub const IDR_CURRENCY_CODE_LOWER: &str = "idr";

//--------------------------------------       Rupiah        ---------------------------------------------------------

/// An amount of Indonesian Rupiah, stored as a whole number of rupiah.
///
/// Rupiah has no sub-unit in practice, so all monetary arithmetic in the storefront is integer arithmetic and
/// amounts survive serialization without any floating-point drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Rupiah(i64);

op!(binary Rupiah, Add, add);
op!(binary Rupiah, Sub, sub);
op!(inplace Rupiah, AddAssign, add_assign);
op!(inplace Rupiah, SubAssign, sub_assign);
op!(unary Rupiah, Neg, neg);
op!(scalar Rupiah, i64, Mul, mul);

impl Sum for Rupiah {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupiahConversionError(format!("Value {} is too large to convert to Rupiah", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}Rp{}", group_thousands(self.0.unsigned_abs()))
    }
}

impl Rupiah {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity given as `u32`, as used for cart line totals.
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * i64::from(quantity))
    }
}

// Indonesian convention groups thousands with a dot, e.g. Rp12.000
fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    while n >= 1000 {
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.push(n.to_string());
    groups.reverse();
    groups.join(".")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_groups_thousands_with_dots() {
        assert_eq!(Rupiah::new(0).to_string(), "Rp0");
        assert_eq!(Rupiah::new(950).to_string(), "Rp950");
        assert_eq!(Rupiah::new(12_000).to_string(), "Rp12.000");
        assert_eq!(Rupiah::new(29_240).to_string(), "Rp29.240");
        assert_eq!(Rupiah::new(1_250_500).to_string(), "Rp1.250.500");
        assert_eq!(Rupiah::new(-5_000).to_string(), "-Rp5.000");
    }

    #[test]
    fn arithmetic_delegates_to_inner_value() {
        let a = Rupiah::new(24_000);
        let b = Rupiah::new(5_000);
        assert_eq!((a + b).value(), 29_000);
        assert_eq!((a - b).value(), 19_000);
        assert_eq!((b * 3).value(), 15_000);
        assert_eq!(Rupiah::new(8_000).times(3).value(), 24_000);
        assert_eq!((-b).value(), -5_000);
        let total: Rupiah = [a, b, Rupiah::new(240)].into_iter().sum();
        assert_eq!(total.value(), 29_240);
    }

    #[test]
    fn serializes_as_a_bare_integer() {
        let price = Rupiah::new(15_000);
        assert_eq!(serde_json::to_string(&price).unwrap(), "15000");
        let back: Rupiah = serde_json::from_str("15000").unwrap();
        assert_eq!(back, price);
    }
}
