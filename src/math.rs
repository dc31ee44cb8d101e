//! Multiplier and house-edge arithmetic
//!
//! Every value is an integer scaled by [`BP_VALUE`] and every division truncates,
//! exactly as the game contracts compute payouts. Floating point only appears in
//! the cosmetic formatting helpers at the bottom of this module.

use crate::errors::MathError;
use ethers::types::U256;
use once_cell::sync::Lazy;

/// Basis-point scale: 10_000 = 100%
pub const BP_VALUE: u32 = 10_000;

/// Reference stake used to derive net multipliers without losing precision
static REFERENCE_STAKE: Lazy<U256> = Lazy::new(|| U256::exp10(18));

/// `amount * bet_count * multiplier / BP_VALUE`
pub fn gross_payout(amount: U256, bet_count: u32, multiplier: u32) -> Result<U256, MathError> {
    let scaled = amount
        .checked_mul(U256::from(bet_count))
        .and_then(|total| total.checked_mul(U256::from(multiplier)))
        .ok_or(MathError::Overflow)?;
    Ok(scaled / U256::from(BP_VALUE))
}

/// House share of a payout: `payout * house_edge / BP_VALUE`
pub fn fees(payout: U256, house_edge: u16) -> Result<U256, MathError> {
    let scaled = payout
        .checked_mul(U256::from(house_edge))
        .ok_or(MathError::Overflow)?;
    Ok(scaled / U256::from(BP_VALUE))
}

/// Gross payout minus the house fees on it
pub fn net_payout(
    amount: U256,
    bet_count: u32,
    multiplier: u32,
    house_edge: u16,
) -> Result<U256, MathError> {
    let gross = gross_payout(amount, bet_count, multiplier)?;
    let fee = fees(gross, house_edge)?;
    gross.checked_sub(fee).ok_or(MathError::Overflow)
}

/// Net multiplier in basis points.
///
/// Runs the payout of a 10^18 stake through [`net_payout`] and scales the result
/// back to basis points, rounding half up. Cannot overflow for `u32` multipliers.
pub fn net_multiplier(multiplier: u32, house_edge: u16) -> u32 {
    let stake = *REFERENCE_STAKE;
    let gross = stake * U256::from(multiplier) / U256::from(BP_VALUE);
    let net = gross - gross * U256::from(house_edge) / U256::from(BP_VALUE);
    let scaled = net * U256::from(BP_VALUE);
    let rounded = (scaled + stake / 2) / stake;
    rounded.low_u32()
}

/// Total stake of a multi-bet: `amount * bet_count`
pub fn total_bet_amount(amount: U256, bet_count: u32) -> Result<U256, MathError> {
    amount
        .checked_mul(U256::from(bet_count))
        .ok_or(MathError::Overflow)
}

/// Raise `amount` by `buffer_bp` basis points
pub fn apply_buffer(amount: U256, buffer_bp: u32) -> Result<U256, MathError> {
    let extra = amount
        .checked_mul(U256::from(buffer_bp))
        .ok_or(MathError::Overflow)?
        / U256::from(BP_VALUE);
    amount.checked_add(extra).ok_or(MathError::Overflow)
}

/// `round(value * BP_VALUE / total)` for probability weights
pub fn ratio_bp(value: u128, total: u128) -> Result<u32, MathError> {
    if total == 0 {
        return Err(MathError::DivisionByZero);
    }
    let scaled = value
        .checked_mul(BP_VALUE as u128)
        .ok_or(MathError::Overflow)?;
    let rounded = (scaled + total / 2) / total;
    u32::try_from(rounded).map_err(|_| MathError::Overflow)
}

/// Basis points as a percentage (cosmetic)
pub fn bp_to_percent(bp: u32) -> f64 {
    bp as f64 / BP_VALUE as f64 * 100.0
}

/// Round to `decimals` places (cosmetic)
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Multiplier label such as `x1.95` (cosmetic)
pub fn format_multiplier(multiplier: u32) -> String {
    let whole = multiplier / BP_VALUE;
    let rest = multiplier % BP_VALUE;
    if rest == 0 {
        return format!("x{}", whole);
    }
    // Three decimals, rounded half up on the fourth
    let millis = (rest + 5) / 10;
    if millis == 1_000 {
        return format!("x{}", whole + 1);
    }
    let digits = format!("{:03}", millis);
    format!("x{}.{}", whole, digits.trim_end_matches('0'))
}

/// Token amount with `decimals` fractional digits, trailing zeros trimmed
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let unit = U256::exp10(decimals as usize);
    let whole = amount / unit;
    let fraction = amount % unit;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
