//! Integer amounts.
//!
//! Currency is counted in its smallest indivisible unit (e.g. wei), credits
//! are whole units. Neither is ever represented as a float.

use crate::error::TypesError;

/// Amount of external currency, in base units.
pub type Currency = u128;

/// Number of voting credits.
pub type Credits = u128;

/// Identifier of a proposal.
pub type ProposalId = u64;

/// Base units per whole currency unit (10^18).
pub const CURRENCY_UNIT: Currency = 1_000_000_000_000_000_000;

/// Split a payment into whole credits and the unspent remainder.
///
/// Returns `(credits, remainder)` with `credits * price + remainder == paid`.
/// `price` must be non-zero.
pub fn credits_for(paid: Currency, price: Currency) -> Option<(Credits, Currency)> {
    Some((paid.checked_div(price)?, paid.checked_rem(price)?))
}

/// Currency value of `credits` at `price`.
pub fn currency_for(credits: Credits, price: Currency) -> Option<Currency> {
    credits.checked_mul(price)
}

/// Parse a decimal currency string such as `"0.1"` or `"12"` into base units.
pub fn parse_currency(s: &str) -> Result<Currency, TypesError> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(TypesError::InvalidAmount(s.to_string()));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TypesError::InvalidAmount(s.to_string()));
    }
    if frac.len() > 18 {
        return Err(TypesError::InvalidAmount(format!("too many decimals: {}", s)));
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
    let frac_units: u128 = if frac.is_empty() {
        0
    } else {
        let scale = 10u128.pow(18 - frac.len() as u32);
        frac.parse::<u128>()? * scale
    };

    whole
        .checked_mul(CURRENCY_UNIT)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| TypesError::InvalidAmount(format!("overflow: {}", s)))
}

/// Format base units as a decimal currency string, trimming trailing zeros.
pub fn format_currency(amount: Currency) -> String {
    let whole = amount / CURRENCY_UNIT;
    let frac = amount % CURRENCY_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:018}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
