//! Discount Rule Matcher
//!
//! Logic for matching rules to cart lines and checking time validity.

use shared::models::{DiscountRule, DiscountScope};

/// Check if a rule targets a product based on scope
pub fn matches_scope(rule: &DiscountRule, product_id: i64, category: &str) -> bool {
    match &rule.scope {
        DiscountScope::All => true,
        DiscountScope::Products { product_ids } => product_ids.contains(&product_id),
        DiscountScope::Categories { categories } => categories.iter().any(|c| c == category),
    }
}

/// Rules in force at `now` that target the product, in listed order
pub fn applicable_rules<'a>(
    rules: &'a [DiscountRule],
    product_id: i64,
    category: &str,
    now: i64,
) -> Vec<&'a DiscountRule> {
    rules
        .iter()
        .filter(|rule| rule.is_in_force(now) && matches_scope(rule, product_id, category))
        .collect()
}
