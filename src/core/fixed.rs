//! Fixed-point arithmetic for USD valuation and health factors.
//!
//! All on-ledger amounts are unsigned integers in the smallest unit of
//! their token. USD values and health factors share a single 18-decimal
//! fixed-point precision ([`WAD`]). Products of two 18-decimal values do
//! not fit in `u128`, so intermediate math widens to 256 bits and divides
//! last to minimize truncation.

use primitive_types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// One full unit in the shared 18-decimal fixed-point precision.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Percent of collateral value that counts toward solvency (50% encodes
/// a 200% overcollateralization requirement).
pub const LIQUIDATION_THRESHOLD_PERCENT: u128 = 50;

/// Denominator for the threshold and bonus percentages.
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Extra collateral awarded to a liquidator, as a percent of the
/// debt-equivalent collateral amount.
pub const LIQUIDATION_BONUS_PERCENT: u128 = 10;

/// Minimum health factor for a solvent account: 1.0 in WAD terms.
/// The bound is inclusive; an account sitting exactly here is solvent.
pub const MIN_HEALTH_FACTOR: u128 = WAD;

/// Number of decimals of the shared fixed-point precision.
pub const WAD_DECIMALS: u32 = 18;

/// Checked `10^exp`. `None` once the power leaves `u128` range.
pub fn pow10(exp: u32) -> Option<u128> {
    10u128.checked_pow(exp)
}

/// `floor(a * b / denom)` with a 256-bit intermediate product.
///
/// Returns `None` if `denom` is zero or the quotient does not fit in
/// `u128`. The widening means the multiplication itself can never
/// overflow: a 128-bit by 128-bit product is at most 256 bits.
///
/// # Examples
///
/// ```
/// use issuance_engine::core::fixed::{mul_div, WAD};
///
/// // 2000 USD/token (WAD-scaled) * 15 tokens (18 decimals) / token unit
/// let price = 2_000 * WAD;
/// let amount = 15 * WAD;
/// assert_eq!(mul_div(price, amount, WAD), Some(30_000 * WAD));
/// ```
pub fn mul_div(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    let wide = U256::from(a) * U256::from(b);
    let quotient = wide / U256::from(denom);
    if quotient > U256::from(u128::MAX) {
        None
    } else {
        Some(quotient.as_u128())
    }
}

/// Render a smallest-unit amount as a human-readable decimal.
///
/// Returns `None` when the amount exceeds what `Decimal` can carry
/// (values beyond 28 significant digits).
pub fn to_decimal(amount: u128, decimals: u32) -> Option<Decimal> {
    let mantissa = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, decimals).ok()
}

/// Parse a human-readable decimal into a smallest-unit amount,
/// truncating any precision beyond `decimals`.
///
/// Returns `None` for negative values or values out of `u128` range.
///
/// # Examples
///
/// ```
/// use issuance_engine::core::fixed::from_decimal;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(from_decimal(dec!(1.5), 18), Some(1_500_000_000_000_000_000));
/// assert_eq!(from_decimal(dec!(-1), 18), None);
/// ```
pub fn from_decimal(value: Decimal, decimals: u32) -> Option<u128> {
    if value.is_sign_negative() {
        return None;
    }
    let unit = Decimal::try_from_i128_with_scale(i128::try_from(pow10(decimals)?).ok()?, 0).ok()?;
    value.checked_mul(unit)?.trunc().to_u128()
}
