use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-employee overrides supplied with a trigger request.
///
/// Bonuses land in the payslip's `other_allowances`; loan and advance
/// deductions land in `other_deductions`. All amounts must be non-negative;
/// the API rejects the request otherwise before any mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Adjustment {
    #[serde(default)]
    #[schema(value_type = String, example = "50.00")]
    pub overtime_bonus: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "100.00")]
    pub other_bonuses: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "0.00")]
    pub loan_deductions: Decimal,

    #[serde(default)]
    #[schema(value_type = String, example = "0.00")]
    pub advance_deductions: Decimal,
}

impl Adjustment {
    /// The first negative field, if any, for validation messages.
    pub fn first_negative_field(&self) -> Option<&'static str> {
        if self.overtime_bonus < Decimal::ZERO {
            Some("overtime_bonus")
        } else if self.other_bonuses < Decimal::ZERO {
            Some("other_bonuses")
        } else if self.loan_deductions < Decimal::ZERO {
            Some("loan_deductions")
        } else if self.advance_deductions < Decimal::ZERO {
            Some("advance_deductions")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_is_all_zero() {
        let adj = Adjustment::default();
        assert_eq!(adj.overtime_bonus, Decimal::ZERO);
        assert!(adj.first_negative_field().is_none());
    }

    #[test]
    fn negative_field_is_reported() {
        let adj = Adjustment {
            loan_deductions: dec!(-1),
            ..Adjustment::default()
        };
        assert_eq!(adj.first_negative_field(), Some("loan_deductions"));
    }

    #[test]
    fn missing_fields_deserialize_to_zero() {
        let adj: Adjustment = serde_json::from_str(r#"{"other_bonuses": "25.00"}"#).unwrap();
        assert_eq!(adj.other_bonuses, dec!(25));
        assert_eq!(adj.advance_deductions, Decimal::ZERO);
    }
}
