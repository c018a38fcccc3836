//! Fixed-point conversion between a token's smallest unit and its display unit.
//!
//! Both directions are integer operations on `U256`. Scaling down is floor
//! division, so converting down and back up never yields more than the input.

use alloy_primitives::U256;

/// `10^decimals`, saturating at `U256::MAX` for exponents beyond 77.
#[inline]
pub fn unit_scale(decimals: u8) -> U256 {
    U256::from(10u8).saturating_pow(U256::from(decimals))
}

/// Scale a display amount up to the smallest unit: `amount * 10^decimals`.
#[inline]
pub fn to_smallest_unit(amount: U256, decimals: u8) -> U256 {
    amount.saturating_mul(unit_scale(decimals))
}

/// Scale a smallest-unit amount down to whole display units, discarding the remainder.
#[inline]
pub fn from_smallest_unit(amount: U256, decimals: u8) -> U256 {
    amount / unit_scale(decimals)
}

/// Render a smallest-unit amount as a decimal string, e.g. `4000000` @ 6 -> `"4"`,
/// `1234567` @ 6 -> `"1.234567"`. Trailing fractional zeros are trimmed.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let scale = unit_scale(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac.is_zero() {
        return whole.to_string();
    }

    let digits = frac.to_string();
    let width = decimals as usize;
    let padded = format!("{}{}", "0".repeat(width.saturating_sub(digits.len())), digits);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}
