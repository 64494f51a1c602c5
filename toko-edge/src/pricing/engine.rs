//! Discount Engine
//!
//! Prices a cart: every line gets at most one discount. A manual override
//! wins, a line with automatic discounts switched off gets none, otherwise the
//! largest in-force matching rule applies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{DiscountRule, PaymentMethod, TransactionCreate, TransactionItem};
use std::sync::Arc;

use super::calculator::{TieBreak, clamp_discount, line_subtotal, select_best, to_decimal, to_f64};
use super::matcher::applicable_rules;
use crate::cart::{CartError, CartLine, CartResult};
use crate::stores::{CatalogStore, StoreResult};

/// Where a line's discount came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountSource {
    None,
    Manual,
    Rule { rule_id: i64, name: String },
}

/// A cart line with its computed discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub line_subtotal: f64,
    /// Always within [0, line_subtotal]
    pub applied_discount: f64,
    pub final_price: f64,
    pub source: DiscountSource,
}

/// Order breakdown consumed by checkout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
}

impl PricedCart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn transaction_items(&self) -> Vec<TransactionItem> {
        self.lines
            .iter()
            .map(|line| TransactionItem {
                product_id: line.product_id,
                name: line.name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
                subtotal: line.line_subtotal,
                discount: line.applied_discount,
                total: line.final_price,
            })
            .collect()
    }

    pub fn to_transaction(
        &self,
        payment_method: PaymentMethod,
        customer_name: Option<String>,
    ) -> TransactionCreate {
        TransactionCreate {
            items: self.transaction_items(),
            subtotal: self.subtotal,
            discount: self.discount,
            total: self.total,
            payment_method,
            customer_name,
        }
    }
}

/// Round to cents without leaving Decimal
fn round_money(value: Decimal) -> Decimal {
    to_decimal(to_f64(value))
}

fn out_of_range(line: &CartLine) -> CartError {
    CartError::AmountOutOfRange {
        product_id: line.product_id,
        quantity: line.quantity,
    }
}

/// Price one line. Returns (subtotal, discount, source) in cents precision.
fn price_line(
    line: &CartLine,
    rules: &[DiscountRule],
    now: i64,
    tie_break: TieBreak,
) -> CartResult<(Decimal, Decimal, DiscountSource)> {
    let subtotal = line_subtotal(line.unit_price, line.quantity)
        .map(round_money)
        .ok_or_else(|| out_of_range(line))?;

    if let Some(manual) = line.manual_discount {
        let amount = round_money(clamp_discount(to_decimal(manual), subtotal));
        return Ok((subtotal, amount, DiscountSource::Manual));
    }

    if line.discount_disabled {
        return Ok((subtotal, Decimal::ZERO, DiscountSource::None));
    }

    let candidates = applicable_rules(rules, line.product_id, &line.category, now);
    Ok(match select_best(&candidates, subtotal, tie_break) {
        Some((rule, amount)) => {
            let amount = round_money(clamp_discount(amount, subtotal));
            (
                subtotal,
                amount,
                DiscountSource::Rule {
                    rule_id: rule.id,
                    name: rule.name.clone(),
                },
            )
        }
        None => (subtotal, Decimal::ZERO, DiscountSource::None),
    })
}

/// Price every line of a cart. Pure: same inputs always give the same output.
///
/// Fails with [`CartError::AmountOutOfRange`] when a line or the running
/// total leaves the representable money range; nothing is clamped silently.
pub fn price_lines(
    lines: &[CartLine],
    rules: &[DiscountRule],
    now: i64,
    tie_break: TieBreak,
) -> CartResult<PricedCart> {
    let mut subtotal_acc = Decimal::ZERO;
    let mut discount_acc = Decimal::ZERO;
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        let (subtotal, discount, source) = price_line(line, rules, now, tie_break)?;
        subtotal_acc = subtotal_acc
            .checked_add(subtotal)
            .ok_or_else(|| out_of_range(line))?;
        discount_acc = discount_acc
            .checked_add(discount)
            .ok_or_else(|| out_of_range(line))?;

        priced.push(PricedLine {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_subtotal: to_f64(subtotal),
            applied_discount: to_f64(discount),
            final_price: to_f64(subtotal - discount),
            source,
        });
    }

    Ok(PricedCart {
        lines: priced,
        subtotal: to_f64(subtotal_acc),
        discount: to_f64(discount_acc),
        total: to_f64(subtotal_acc - discount_acc),
    })
}

/// Loads in-force rules from the catalogue and prices carts with them
#[derive(Clone)]
pub struct DiscountEngine {
    catalog: Arc<dyn CatalogStore>,
    tie_break: TieBreak,
}

impl std::fmt::Debug for DiscountEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountEngine")
            .field("catalog", &"<CatalogStore>")
            .field("tie_break", &self.tie_break)
            .finish()
    }
}

impl DiscountEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, tie_break: TieBreak) -> Self {
        Self { catalog, tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Rules in force at `now`, in catalogue order
    pub async fn load_rules(&self, now: i64) -> StoreResult<Vec<DiscountRule>> {
        let rules = self.catalog.list_active_discount_rules(now).await?;
        // The store may be lenient about windows; the engine is not.
        Ok(rules.into_iter().filter(|r| r.is_in_force(now)).collect())
    }
}
