//! Deduction rule engine.
//!
//! Pure, stateless functions computing overtime pay and the statutory
//! deductions (pension, progressive tax, medical levy) from gross earnings
//! and a [`StatutoryRules`] version. Every monetary result is rounded to two
//! decimal places, half-up, exactly once at the point it is computed;
//! downstream code never re-rounds.

pub mod config;

pub use config::{PensionRules, StatutoryConfig, StatutoryRules, TaxBracket};

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{PayrollError, PayrollResult};

/// Rounds a monetary amount to 2dp, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `round(hours * rate, 2)`. Negative hours or rate are rejected.
pub fn compute_overtime_pay(hours: Decimal, rate: Decimal) -> PayrollResult<Decimal> {
    if hours < Decimal::ZERO {
        return Err(PayrollError::computation(format!(
            "overtime hours must be non-negative, got {hours}"
        )));
    }
    if rate < Decimal::ZERO {
        return Err(PayrollError::computation(format!(
            "overtime rate must be non-negative, got {rate}"
        )));
    }
    Ok(round_money(hours * rate))
}

/// Percentage-of-gross pension, with a ceiling on pensionable earnings.
pub fn compute_pension(gross: Decimal, pension: &PensionRules) -> Decimal {
    let pensionable = gross.min(pension.pensionable_cap);
    round_money(pensionable * pension.rate / Decimal::ONE_HUNDRED)
}

/// Progressive tax over ordered brackets.
///
/// Each tier taxes the slice of income between the previous tier's ceiling
/// and its own; the final open-ended tier taxes the remainder. The sum is
/// rounded once at the end.
pub fn compute_tax(taxable: Decimal, brackets: &[TaxBracket]) -> Decimal {
    let taxable = taxable.max(Decimal::ZERO);
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for bracket in brackets {
        let slice = match bracket.upper {
            Some(upper) => (taxable.min(upper) - lower).max(Decimal::ZERO),
            None => (taxable - lower).max(Decimal::ZERO),
        };
        tax += slice * bracket.rate / Decimal::ONE_HUNDRED;
        match bracket.upper {
            Some(upper) if taxable > upper => lower = upper,
            _ => break,
        }
    }
    round_money(tax)
}

/// Flat percentage of gross, no cap.
pub fn compute_medical_levy(gross: Decimal, rules: &StatutoryRules) -> Decimal {
    round_money(gross * rules.medical_levy_rate / Decimal::ONE_HUNDRED)
}

/// The three statutory components for one gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatutoryDeductions {
    pub pension: Decimal,
    pub tax: Decimal,
    pub medical_levy: Decimal,
}

impl StatutoryDeductions {
    pub fn total(&self) -> Decimal {
        self.pension + self.tax + self.medical_levy
    }
}

/// Computes all statutory deductions for a gross amount.
///
/// Pension and the medical levy apply to gross; tax applies to gross after
/// pension.
pub fn compute_statutory(
    gross: Decimal,
    rules: &StatutoryRules,
) -> PayrollResult<StatutoryDeductions> {
    if gross < Decimal::ZERO {
        return Err(PayrollError::computation(format!(
            "gross earnings must be non-negative, got {gross}"
        )));
    }
    let pension = compute_pension(gross, &rules.pension);
    let tax = compute_tax(gross - pension, &rules.tax_brackets);
    let medical_levy = compute_medical_levy(gross, rules);
    Ok(StatutoryDeductions {
        pension,
        tax,
        medical_levy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn builtin_rules() -> StatutoryRules {
        StatutoryConfig::builtin()
            .rules_for(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .unwrap()
            .clone()
    }

    #[test]
    fn overtime_pay_is_hours_times_rate() {
        assert_eq!(compute_overtime_pay(dec!(10), dec!(15)).unwrap(), dec!(150));
        assert_eq!(compute_overtime_pay(dec!(0), dec!(15)).unwrap(), dec!(0));
    }

    #[test]
    fn overtime_rounds_half_up() {
        // 3.5h * 10.01 = 35.035 -> 35.04
        assert_eq!(
            compute_overtime_pay(dec!(3.5), dec!(10.01)).unwrap(),
            dec!(35.04)
        );
    }

    #[test]
    fn negative_overtime_hours_are_rejected() {
        let err = compute_overtime_pay(dec!(-1), dec!(15)).unwrap_err();
        assert_eq!(err.code(), "COMPUTATION_ERROR");
    }

    #[test]
    fn pension_respects_cap() {
        let pension = PensionRules {
            rate: dec!(5),
            pensionable_cap: dec!(10000),
        };
        assert_eq!(compute_pension(dec!(5650), &pension), dec!(282.50));
        // Above the cap, pension stops growing.
        assert_eq!(compute_pension(dec!(12000), &pension), dec!(500.00));
        assert_eq!(compute_pension(dec!(20000), &pension), dec!(500.00));
    }

    #[test]
    fn tax_walks_the_brackets() {
        let rules = builtin_rules();
        // 5367.50: 1000 @ 0% + 2000 @ 10% + 2367.50 @ 20% = 673.50
        assert_eq!(compute_tax(dec!(5367.50), &rules.tax_brackets), dec!(673.50));
        assert_eq!(compute_tax(dec!(500), &rules.tax_brackets), dec!(0));
        // 7000: 0 + 200 + 600 + 1000 @ 30% = 1100
        assert_eq!(compute_tax(dec!(7000), &rules.tax_brackets), dec!(1100));
    }

    #[test]
    fn tax_is_continuous_at_bracket_boundaries() {
        let rules = builtin_rules();
        // One cent above a boundary adds at most one marginal-rate cent.
        let at = compute_tax(dec!(3000), &rules.tax_brackets);
        let above = compute_tax(dec!(3000.01), &rules.tax_brackets);
        assert!(above - at <= dec!(0.01));
        assert!(above >= at);
    }

    #[test]
    fn medical_levy_has_no_cap() {
        let rules = builtin_rules();
        assert_eq!(compute_medical_levy(dec!(5650), &rules), dec!(113.00));
        assert_eq!(compute_medical_levy(dec!(50000), &rules), dec!(1000.00));
    }

    #[test]
    fn statutory_components_for_worked_scenario() {
        let rules = builtin_rules();
        let ded = compute_statutory(dec!(5650), &rules).unwrap();
        assert_eq!(ded.pension, dec!(282.50));
        assert_eq!(ded.tax, dec!(673.50));
        assert_eq!(ded.medical_levy, dec!(113.00));
        assert_eq!(ded.total(), dec!(1069.00));
    }

    #[test]
    fn negative_gross_is_rejected() {
        let rules = builtin_rules();
        assert!(compute_statutory(dec!(-1), &rules).is_err());
    }

    proptest! {
        // Tax is monotonically non-decreasing in taxable income.
        #[test]
        fn tax_is_monotone(a in 0u64..5_000_000, b in 0u64..5_000_000) {
            let rules = builtin_rules();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo = Decimal::new(lo as i64, 2);
            let hi = Decimal::new(hi as i64, 2);
            prop_assert!(
                compute_tax(lo, &rules.tax_brackets) <= compute_tax(hi, &rules.tax_brackets)
            );
        }

        // Net identity: deductions never exceed what the schedule defines.
        #[test]
        fn statutory_total_never_exceeds_gross_for_sane_rates(cents in 0u64..5_000_000) {
            let rules = builtin_rules();
            let gross = Decimal::new(cents as i64, 2);
            let ded = compute_statutory(gross, &rules).unwrap();
            prop_assert!(ded.total() <= gross);
        }
    }
}
