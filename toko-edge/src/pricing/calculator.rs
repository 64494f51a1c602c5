//! Discount Calculator
//!
//! Per-rule discount amounts and best-of rule selection.
//! Uses rust_decimal for precise calculations, stores as f64.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::models::{DiscountKind, DiscountRule};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

// ==================== Conversion Helpers ====================

/// Largest amount one cart line may reach. Line sums and percentage
/// products stay far inside Decimal's range below it.
pub const MAX_LINE_AMOUNT: i64 = 1_000_000_000_000_000;

/// Convert f64 to Decimal for calculation
///
/// Values Decimal cannot hold become zero. Use [`try_to_decimal`] for
/// untrusted input.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert f64 to Decimal, `None` for NaN, infinities and out-of-range values
#[inline]
pub fn try_to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// unit price × quantity
///
/// `None` when the price has no Decimal form or the product leaves
/// [-MAX_LINE_AMOUNT, MAX_LINE_AMOUNT].
pub fn line_subtotal(unit_price: f64, quantity: i64) -> Option<Decimal> {
    let amount = try_to_decimal(unit_price)?.checked_mul(Decimal::from(quantity))?;
    (amount.abs() <= Decimal::from(MAX_LINE_AMOUNT)).then_some(amount)
}

// ==================== Rule Selection ====================

/// Which rule wins when two rules yield the same discount amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The rule listed earlier keeps the line
    #[default]
    FirstListed,
    /// A later rule with an equal amount replaces the earlier one
    LastListed,
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_listed" => Ok(TieBreak::FirstListed),
            "last" | "last_listed" => Ok(TieBreak::LastListed),
            other => Err(format!("unknown tie-break policy: {}", other)),
        }
    }
}

/// Discount a single rule yields against a line subtotal (unclamped)
pub fn rule_amount(rule: &DiscountRule, line_subtotal: Decimal) -> Decimal {
    let value = to_decimal(rule.value);
    match rule.kind {
        DiscountKind::Percentage => line_subtotal.saturating_mul(value) / Decimal::ONE_HUNDRED,
        DiscountKind::Fixed => value,
    }
}

/// Select the rule yielding the largest discount.
///
/// Rules are never stacked. A rule whose amount is zero never wins.
pub fn select_best<'a>(
    candidates: &[&'a DiscountRule],
    line_subtotal: Decimal,
    tie_break: TieBreak,
) -> Option<(&'a DiscountRule, Decimal)> {
    let mut best: Option<(&'a DiscountRule, Decimal)> = None;

    for rule in candidates {
        let amount = rule_amount(rule, line_subtotal);
        if amount <= Decimal::ZERO {
            continue;
        }
        let replace = match best {
            None => true,
            Some((_, current)) => match tie_break {
                TieBreak::FirstListed => amount > current,
                TieBreak::LastListed => amount >= current,
            },
        };
        if replace {
            best = Some((rule, amount));
        }
    }

    best
}

/// Clamp a discount into [0, line_subtotal]
#[inline]
pub fn clamp_discount(amount: Decimal, line_subtotal: Decimal) -> Decimal {
    amount.max(Decimal::ZERO).min(line_subtotal.max(Decimal::ZERO))
}
