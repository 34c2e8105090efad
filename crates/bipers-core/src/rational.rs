// crates/bipers-core/src/rational.rs

//! Exact rational coordinates with a floating-point shadow.
//!
//! All comparisons that gate arrangement topology run on `f64` shadows first;
//! whenever two doubles land within [`EPSILON`] of each other the caller must
//! fall through to the exact values. [`almost_equal`] implements that screen.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::str::FromStr;

/// Arbitrary-precision rational used for every grade value.
pub type Exact = num_rational::BigRational;

/// Threshold below which two doubles are considered "too close to call" and
/// the exact comparison must decide.
pub const EPSILON: f64 = 9.313_225_746_154_785_156_25e-10; // 2^-30

/// True iff `a` and `b` are near enough that an exact comparison is required.
#[inline]
#[must_use]
pub fn almost_equal(a: f64, b: f64) -> bool {
    let diff = (a - b).abs();
    diff <= EPSILON || diff <= (a.abs() + b.abs()) * EPSILON
}

/// Exact value of an integer.
#[must_use]
pub fn exact_int(value: i64) -> Exact {
    Exact::from_integer(BigInt::from(value))
}

/// Lossy conversion to the `f64` shadow.
#[must_use]
pub fn exact_to_f64(value: &Exact) -> f64 {
    value.to_f64().unwrap_or_else(|| {
        // Out-of-range magnitudes collapse to signed infinity; the exact
        // value still decides any comparison that lands in the screen.
        if value.is_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    })
}

/// Shadow an entire grade vector.
#[must_use]
pub fn to_f64_vec(values: &[Exact]) -> Vec<f64> {
    values.iter().map(exact_to_f64).collect()
}

/// Render an exact value as a lossless fraction string: `"3/10"`, or a plain
/// integer when the denominator is one.
#[must_use]
pub fn format_exact(value: &Exact) -> String {
    if value.denom() == &BigInt::from(1) {
        value.numer().to_string()
    } else {
        format!("{}/{}", value.numer(), value.denom())
    }
}

/// Parse a fraction string produced by [`format_exact`].
///
/// # Errors
/// Returns [`Error::Format`] on malformed numerals or a zero denominator.
pub fn parse_exact(text: &str) -> Result<Exact> {
    let mk_err = || Error::Format(format!("malformed rational value {text:?}"));
    match text.split_once('/') {
        Some((num, den)) => {
            let numer = BigInt::from_str(num.trim()).map_err(|_| mk_err())?;
            let denom = BigInt::from_str(den.trim()).map_err(|_| mk_err())?;
            if denom.is_zero() {
                return Err(Error::Format(format!("zero denominator in {text:?}")));
            }
            Ok(Exact::new(numer, denom))
        }
        None => {
            let numer = BigInt::from_str(text.trim()).map_err(|_| mk_err())?;
            Ok(Exact::from_integer(numer))
        }
    }
}

/// Serde adapter: `Vec<Exact>` as a vector of fraction strings.
pub mod exact_vec_serde {
    use super::{format_exact, parse_exact, Exact};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Exact], ser: S) -> Result<S::Ok, S::Error> {
        let strings: Vec<String> = values.iter().map(format_exact).collect();
        ser.collect_seq(strings)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<Exact>, D::Error> {
        let strings = Vec::<String>::deserialize(de)?;
        strings
            .iter()
            .map(|s| parse_exact(s).map_err(D::Error::custom))
            .collect()
    }
}
