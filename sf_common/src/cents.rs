use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "NGN";

/// Verified gateway amounts may differ from the order total by at most this much.
pub const AMOUNT_TOLERANCE: Cents = Cents(1);

//--------------------------------------       Cents         ---------------------------------------------------------
/// A monetary amount in the minor unit of its currency (kobo, cents, ...).
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(inplace Cents, SubAssign, sub_assign);
op!(scalar Cents, i64, Mul, mul);
op!(unary Cents, Neg, neg);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor currency units: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {value} is too large to convert to Cents")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts a major-unit amount (e.g. `49.99`) as reported by some gateways, rounding to the nearest minor unit.
    pub fn from_major(amount: f64) -> Result<Self, CentsConversionError> {
        let minor = (amount * 100.0).round();
        if !minor.is_finite() || minor.abs() > i64::MAX as f64 {
            return Err(CentsConversionError(format!("{amount} is not a valid amount")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(minor as i64))
    }

    pub fn abs_diff(&self, other: Cents) -> Cents {
        Cents((self.0 - other.0).abs())
    }

    /// True if the two amounts differ by no more than `tolerance`.
    pub fn is_within(&self, other: Cents, tolerance: Cents) -> bool {
        self.abs_diff(other) <= tolerance
    }
}
