//! Decimal amount <-> base unit conversion

use alloy::primitives::U256;

/// Precision used for the slippage multiplier
const SLIPPAGE_SCALE: u64 = 1_000_000;

/// Convert a human amount to base units with `decimals` fractional digits.
///
/// Digits beyond `decimals` are truncated. Returns `None` for negative,
/// non-finite or unrepresentable amounts.
pub fn to_base_units(amount: f64, decimals: u8) -> Option<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return None;
    }

    // f64 Display never uses exponent notation
    let text = amount.to_string();
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (text.as_str(), ""),
    };

    let decimals = decimals as usize;
    let mut frac: String = frac.chars().take(decimals).collect();
    while frac.len() < decimals {
        frac.push('0');
    }

    let scale = U256::from(10).checked_pow(U256::from(decimals))?;
    let whole = U256::from_str_radix(whole, 10).ok()?;
    let frac = if frac.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&frac, 10).ok()?
    };

    whole.checked_mul(scale)?.checked_add(frac)
}

/// Format a U256 value with decimals
pub fn format_units(value: U256, decimals: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let remainder_str = format!("{:0>width$}", remainder, width = decimals as usize);
    let trimmed = remainder_str.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

/// Linear minimum output: `amount_in * (1 - slippage)`.
///
/// No price quote is taken, so this only bounds same-unit pairs.
pub fn min_amount_out(amount_in: U256, slippage: f64) -> U256 {
    let keep = ((1.0 - slippage.clamp(0.0, 1.0)) * SLIPPAGE_SCALE as f64).round() as u64;
    amount_in * U256::from(keep) / U256::from(SLIPPAGE_SCALE)
}
