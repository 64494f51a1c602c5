//! Active cart session
//!
//! A `Cart` is owned by exactly one checkout counter and mutated through
//! `&mut self`. Failing operations leave the cart untouched.

mod error;

pub use error::{CartError, CartResult};

use serde::{Deserialize, Serialize};
use shared::models::{DiscountRule, PaymentMethod, Product, TransactionCreate};

use crate::pricing::{PricedCart, TieBreak, line_subtotal, price_lines, to_f64, try_to_decimal};

/// One product entry in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub unit_price: f64,
    /// 1..=max_stock
    pub quantity: i64,
    /// Available stock at the last catalogue snapshot
    pub max_stock: i64,
    /// Manual override, never above the line subtotal
    pub manual_discount: Option<f64>,
    /// Automatic rule discounts switched off for this line
    pub discount_disabled: bool,
}

impl CartLine {
    /// `None` when price × quantity leaves the money range
    pub fn subtotal(&self) -> Option<f64> {
        line_subtotal(self.unit_price, self.quantity).map(to_f64)
    }
}

/// Outcome of a quantity change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated(i64),
    Removed,
    /// The product was not in the cart; nothing changed
    Missing,
}

/// A priced, validated cart ready to be written as a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOrder {
    pub priced: PricedCart,
    pub payment_method: PaymentMethod,
    /// Trimmed customer name (credit sales only)
    pub customer_name: Option<String>,
}

impl CheckoutOrder {
    pub fn to_transaction(&self) -> TransactionCreate {
        self.priced
            .to_transaction(self.payment_method, self.customer_name.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    fn line_mut(&mut self, product_id: i64) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    /// Add one unit of a product, creating the line if needed.
    ///
    /// Returns the new quantity of the line.
    pub fn add_line(&mut self, product: &Product) -> CartResult<i64> {
        validate_snapshot(product)?;

        if product.stock <= 0 {
            return Err(CartError::OutOfStock {
                product_id: product.id,
            });
        }

        if let Some(line) = self.line_mut(product.id) {
            let requested = line.quantity + 1;
            if requested > product.stock {
                return Err(CartError::InsufficientStock {
                    product_id: product.id,
                    requested,
                    available: product.stock,
                });
            }
            check_amount(product.id, line.unit_price, requested)?;
            line.quantity = requested;
            line.max_stock = product.stock;
            return Ok(requested);
        }

        check_amount(product.id, product.price, 1)?;
        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            unit_price: product.price,
            quantity: 1,
            max_stock: product.stock,
            manual_discount: None,
            discount_disabled: false,
        });
        tracing::debug!(product_id = product.id, "Cart line added");
        Ok(1)
    }

    /// Change a line's quantity by `delta`.
    ///
    /// A resulting quantity of zero or less removes the line.
    pub fn change_quantity(&mut self, product_id: i64, delta: i64) -> CartResult<QuantityChange> {
        let Some(idx) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return Ok(QuantityChange::Missing);
        };

        let line = &mut self.lines[idx];
        let candidate = line.quantity.saturating_add(delta);

        if candidate <= 0 {
            self.lines.remove(idx);
            return Ok(QuantityChange::Removed);
        }

        if candidate > line.max_stock {
            return Err(CartError::InsufficientStock {
                product_id,
                requested: candidate,
                available: line.max_stock,
            });
        }

        let subtotal = check_amount(product_id, line.unit_price, candidate)?;
        line.quantity = candidate;
        // Keep a manual override within the (possibly smaller) subtotal
        if let Some(manual) = line.manual_discount
            && manual > subtotal
        {
            line.manual_discount = Some(subtotal);
        }
        Ok(QuantityChange::Updated(candidate))
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove_line(&mut self, product_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Set or clear a line's manual discount.
    ///
    /// `amount <= 0` clears the override. A positive amount also re-enables
    /// the line's discounts.
    pub fn set_manual_discount(&mut self, product_id: i64, amount: f64) -> CartResult<()> {
        let line = self
            .line_mut(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;

        let subtotal = line.subtotal().ok_or(CartError::AmountOutOfRange {
            product_id,
            quantity: line.quantity,
        })?;
        if amount.is_nan() || amount > subtotal {
            return Err(CartError::InvalidDiscount {
                product_id,
                amount,
                subtotal,
            });
        }

        if amount <= 0.0 {
            line.manual_discount = None;
            return Ok(());
        }

        line.manual_discount = Some(amount);
        line.discount_disabled = false;
        Ok(())
    }

    /// Flip automatic discounts for a line. Returns the new `discount_disabled`.
    pub fn toggle_auto_discount(&mut self, product_id: i64) -> CartResult<bool> {
        let line = self
            .line_mut(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.discount_disabled = !line.discount_disabled;
        Ok(line.discount_disabled)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Price the cart against a rule set at `now`
    pub fn price(
        &self,
        rules: &[DiscountRule],
        now: i64,
        tie_break: TieBreak,
    ) -> CartResult<PricedCart> {
        price_lines(&self.lines, rules, now, tie_break)
    }

    /// Validate and price the cart for checkout without changing it
    pub fn prepare_checkout(
        &self,
        rules: &[DiscountRule],
        now: i64,
        tie_break: TieBreak,
        payment_method: PaymentMethod,
        customer_name: Option<&str>,
    ) -> CartResult<CheckoutOrder> {
        if self.lines.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let customer_name = match payment_method {
            PaymentMethod::Credit => {
                let name = customer_name.map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err(CartError::MissingCustomer);
                }
                Some(name.to_string())
            }
            _ => None,
        };

        Ok(CheckoutOrder {
            priced: self.price(rules, now, tie_break)?,
            payment_method,
            customer_name,
        })
    }

    /// Validate, price and clear the cart
    pub fn commit_checkout(
        &mut self,
        rules: &[DiscountRule],
        now: i64,
        tie_break: TieBreak,
        payment_method: PaymentMethod,
        customer_name: Option<&str>,
    ) -> CartResult<CheckoutOrder> {
        let order = self.prepare_checkout(rules, now, tie_break, payment_method, customer_name)?;
        self.clear();
        Ok(order)
    }
}

fn validate_snapshot(product: &Product) -> CartResult<()> {
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(CartError::InvalidProduct {
            product_id: product.id,
            reason: format!("price must be a non-negative number, got {}", product.price),
        });
    }
    if try_to_decimal(product.price).is_none() {
        return Err(CartError::InvalidProduct {
            product_id: product.id,
            reason: format!("price {} is out of range", product.price),
        });
    }
    Ok(())
}

/// Line subtotal for `quantity` units, rejected when out of range
fn check_amount(product_id: i64, unit_price: f64, quantity: i64) -> CartResult<f64> {
    line_subtotal(unit_price, quantity)
        .map(to_f64)
        .ok_or(CartError::AmountOutOfRange {
            product_id,
            quantity,
        })
}
