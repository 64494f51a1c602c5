//! Discount Rule Model

use crate::error::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};

/// How a rule's magnitude is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Magnitude is a percentage of the line subtotal (0-100)
    Percentage,
    /// Magnitude is a flat currency amount per line
    Fixed,
}

/// Which cart lines a rule applies to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scope", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountScope {
    All,
    Products { product_ids: Vec<i64> },
    Categories { categories: Vec<String> },
}

/// Automatic discount rule (read-only to the pricing engine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: i64,
    pub name: String,
    pub kind: DiscountKind,
    /// Percentage: 10 = 10%, fixed: 5000 = Rp 5.000
    pub value: f64,
    #[serde(flatten)]
    pub scope: DiscountScope,
    /// Window start (Unix millis, inclusive). `None` = unbounded
    pub valid_from: Option<i64>,
    /// Window end (Unix millis, inclusive). `None` = unbounded
    pub valid_until: Option<i64>,
    pub is_active: bool,
}

impl DiscountRule {
    /// Enabled and inside the active window at `now`
    pub fn is_in_force(&self, now: i64) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from
            && now < from
        {
            return false;
        }
        if let Some(until) = self.valid_until
            && now > until
        {
            return false;
        }
        true
    }

    /// Admin-side validation applied before a rule is stored
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(invalid(self.id, "name must not be empty"));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(invalid(self.id, "value must be a non-negative number"));
        }
        if self.kind == DiscountKind::Percentage && self.value > 100.0 {
            return Err(invalid(self.id, "percentage must be between 0 and 100"));
        }
        match &self.scope {
            DiscountScope::All => {}
            DiscountScope::Products { product_ids } if product_ids.is_empty() => {
                return Err(invalid(self.id, "product scope requires at least one product"));
            }
            DiscountScope::Categories { categories } if categories.is_empty() => {
                return Err(invalid(self.id, "category scope requires at least one category"));
            }
            _ => {}
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until)
            && from > until
        {
            return Err(invalid(self.id, "valid_from is after valid_until"));
        }
        Ok(())
    }
}

fn invalid(rule_id: i64, reason: &str) -> AppError {
    AppError::with_message(ErrorCode::DiscountRuleInvalid, reason).with_detail("rule_id", rule_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: DiscountKind, value: f64, scope: DiscountScope) -> DiscountRule {
        DiscountRule {
            id: 1,
            name: "Promo".to_string(),
            kind,
            value,
            scope,
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn test_in_force_window_is_inclusive() {
        let mut r = rule(DiscountKind::Percentage, 10.0, DiscountScope::All);
        r.valid_from = Some(1000);
        r.valid_until = Some(2000);

        assert!(!r.is_in_force(999));
        assert!(r.is_in_force(1000));
        assert!(r.is_in_force(2000));
        assert!(!r.is_in_force(2001));
    }

    #[test]
    fn test_open_ended_window() {
        let mut r = rule(DiscountKind::Fixed, 500.0, DiscountScope::All);
        r.valid_from = Some(1000);
        assert!(r.is_in_force(i64::MAX));
        assert!(!r.is_in_force(0));
    }

    #[test]
    fn test_disabled_rule_never_in_force() {
        let mut r = rule(DiscountKind::Percentage, 10.0, DiscountScope::All);
        r.is_active = false;
        assert!(!r.is_in_force(0));
    }

    #[test]
    fn test_validate_percentage_range() {
        assert!(rule(DiscountKind::Percentage, 100.0, DiscountScope::All).validate().is_ok());
        let err = rule(DiscountKind::Percentage, 100.5, DiscountScope::All)
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DiscountRuleInvalid);
        assert!(rule(DiscountKind::Fixed, 250_000.0, DiscountScope::All).validate().is_ok());
        assert!(rule(DiscountKind::Fixed, -1.0, DiscountScope::All).validate().is_err());
    }

    #[test]
    fn test_validate_scope_targets() {
        let empty = DiscountScope::Products { product_ids: vec![] };
        assert!(rule(DiscountKind::Fixed, 1.0, empty).validate().is_err());

        let cats = DiscountScope::Categories {
            categories: vec!["Buah Impor".to_string()],
        };
        assert!(rule(DiscountKind::Fixed, 1.0, cats).validate().is_ok());
    }

    #[test]
    fn test_scope_serde_shape() {
        let r = rule(
            DiscountKind::Percentage,
            15.0,
            DiscountScope::Products { product_ids: vec![3, 4] },
        );
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["scope"], "PRODUCTS");
        assert_eq!(json["product_ids"], serde_json::json!([3, 4]));
        assert_eq!(json["kind"], "PERCENTAGE");

        let back: DiscountRule = serde_json::from_value(json).unwrap();
        assert_eq!(back.scope, r.scope);
    }
}
