//! Fixed-point and wide-integer arithmetic for pool pricing.
//!
//! All token quantities are `u128` base units and all prices are scaled by
//! [`PRECISION`] (1e18). The product of two reserves can exceed 128 bits,
//! so multiply-divide and square-root route through a 256-bit intermediate
//! represented as a `(hi, lo)` pair of `u128` halves.

use std::cmp::Ordering;

use veilswap_types::constants::{BPS_DENOMINATOR, PRECISION};
use veilswap_types::{Result, VeilswapError};

const LO_MASK: u128 = (1u128 << 64) - 1;

/// Integer square root by Newton's method, rounding down.
#[must_use]
pub fn sqrt(x: u128) -> u128 {
    if x == 0 {
        return 0;
    }
    let mut estimate = x / 2 + 1;
    let mut result = x;
    while estimate < result {
        result = estimate;
        estimate = (x / estimate + estimate) / 2;
    }
    result
}

/// Full 256-bit product of two `u128` values as `(hi, lo)` halves.
#[must_use]
pub(crate) fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LO_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LO_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Each of the three middle terms is below 2^64, so their sum fits u128.
    let mid = (ll >> 64) + (lh & LO_MASK) + (hl & LO_MASK);
    let lo = (mid << 64) | (ll & LO_MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Lexicographic comparison of two 256-bit `(hi, lo)` values.
pub(crate) fn wide_cmp(a: (u128, u128), b: (u128, u128)) -> Ordering {
    match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    }
}

/// Divide the 256-bit value `(hi, lo)` by `divisor`, rounding down.
///
/// Binary search for the largest `q` with `q * divisor <= (hi, lo)`.
/// Callers must ensure `hi < divisor`, which guarantees the quotient
/// fits in `u128`.
fn wide_div(hi: u128, lo: u128, divisor: u128) -> u128 {
    debug_assert!(divisor > 0 && hi < divisor);
    let target = (hi, lo);
    let mut low: u128 = 0;
    let mut high: u128 = u128::MAX;
    while low < high {
        // Upper midpoint, written overflow-safe.
        let mid = high - (high - low) / 2;
        if wide_cmp(wide_mul(mid, divisor), target) == Ordering::Greater {
            high = mid - 1;
        } else {
            low = mid;
        }
    }
    low
}

/// `floor(a * b / c)` with a 256-bit intermediate product.
///
/// # Errors
///
/// - [`VeilswapError::DivisionByZero`] if `c == 0`.
/// - [`VeilswapError::MathOverflow`] if the quotient exceeds `u128::MAX`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(VeilswapError::DivisionByZero { context: "mul_div" });
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / c);
    }
    let (hi, lo) = wide_mul(a, b);
    // The quotient fits in u128 exactly when hi < c.
    if hi >= c {
        return Err(VeilswapError::MathOverflow { context: "mul_div" });
    }
    Ok(wide_div(hi, lo, c))
}

/// `floor(sqrt(a * b))` without overflowing the intermediate product.
///
/// Used for initial liquidity shares, where the geometric mean of the two
/// deposits prices the first mint independently of token decimals.
#[must_use]
pub fn sqrt_product(a: u128, b: u128) -> u128 {
    if let Some(product) = a.checked_mul(b) {
        return sqrt(product);
    }
    // Binary search for the largest s with s * s <= a * b over the wide
    // product. Exact, unlike sqrt(a) * sqrt(b).
    let target = wide_mul(a, b);
    let mut low: u128 = 0;
    let mut high: u128 = u128::MAX;
    while low < high {
        let mid = high - (high - low) / 2;
        if wide_cmp(wide_mul(mid, mid), target) == Ordering::Greater {
            high = mid - 1;
        } else {
            low = mid;
        }
    }
    low
}

/// `floor(amount * bps / 10_000)`: a basis-point slice of an amount.
pub fn bps_of(amount: u128, bps: u32) -> Result<u128> {
    mul_div(amount, u128::from(bps), BPS_DENOMINATOR)
}

/// Spot price of token0 in token1 units, scaled by [`PRECISION`].
pub fn spot_price(reserve0: u128, reserve1: u128) -> Result<u128> {
    if reserve0 == 0 {
        return Err(VeilswapError::DivisionByZero { context: "spot_price" });
    }
    mul_div(reserve1, PRECISION, reserve0)
}
