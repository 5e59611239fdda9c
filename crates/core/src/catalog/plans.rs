//! Investment plan tiers.

use rust_decimal::Decimal;
use serde::Serialize;

/// One investment tier.
///
/// Returns are paid once per period and capital is returned at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvestmentPlan {
    pub id: &'static str,
    pub tier: &'static str,
    /// Return per period, in percent.
    pub return_percent: u32,
    pub period: &'static str,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub capital_back: bool,
    pub periods: u32,
    pub cancellable: bool,
}

const fn plan(
    id: &'static str,
    tier: &'static str,
    return_percent: u32,
    min: u32,
    max: u32,
) -> InvestmentPlan {
    InvestmentPlan {
        id,
        tier,
        return_percent,
        period: "weekly",
        min_amount: Decimal::from_parts(min, 0, 0, false, 0),
        max_amount: Decimal::from_parts(max, 0, 0, false, 0),
        capital_back: true,
        periods: 1,
        cancellable: false,
    }
}

/// All tiers, ordered by minimum amount.
pub const PLANS: [InvestmentPlan; 5] = [
    plan("01", "Tier 1", 50, 50, 999),
    plan("02", "Tier 2", 60, 1000, 2999),
    plan("03", "Tier 3", 65, 3000, 4999),
    plan("04", "Tier 4", 70, 5000, 9999),
    plan("05", "Tier 5", 75, 10_000, 19_999),
];

/// The tier whose range contains `amount`, if any.
///
/// Displayed bounds are whole dollars; a tier covers everything from its
/// minimum up to the next tier's minimum, so `999.50` is still Tier 1. Only
/// the last tier is capped by its own maximum.
#[must_use]
pub fn plan_for_amount(amount: Decimal) -> Option<&'static InvestmentPlan> {
    let last = PLANS.last()?;
    if amount > last.max_amount {
        return None;
    }
    PLANS.iter().rev().find(|p| amount >= p.min_amount)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_contiguous_and_ordered() {
        let cent = Decimal::new(1, 2);
        for pair in PLANS.windows(2) {
            let [lower, upper] = pair else { unreachable!() };
            assert_eq!(upper.min_amount - lower.max_amount, Decimal::ONE);
            assert!(lower.return_percent < upper.return_percent);
            assert_eq!(plan_for_amount(lower.max_amount).unwrap(), lower);
            assert_eq!(plan_for_amount(upper.min_amount - cent).unwrap(), lower);
            assert_eq!(plan_for_amount(upper.min_amount).unwrap(), upper);
        }
    }

    #[test]
    fn test_fractional_amounts_between_displayed_bounds() {
        assert_eq!(plan_for_amount(Decimal::new(99_950, 2)).unwrap().tier, "Tier 1");
        assert_eq!(plan_for_amount(Decimal::new(299_901, 2)).unwrap().tier, "Tier 2");
        assert_eq!(plan_for_amount(Decimal::new(999_999, 2)).unwrap().tier, "Tier 4");
        assert!(plan_for_amount(Decimal::new(4_999, 2)).is_none());
        assert!(plan_for_amount(Decimal::new(1_999_901, 2)).is_none());
    }

    #[test]
    fn test_plan_for_amount() {
        assert_eq!(plan_for_amount(Decimal::new(50, 0)).unwrap().tier, "Tier 1");
        assert_eq!(plan_for_amount(Decimal::new(1000, 0)).unwrap().tier, "Tier 2");
        assert_eq!(
            plan_for_amount(Decimal::new(19_999, 0)).unwrap().tier,
            "Tier 5"
        );
        assert!(plan_for_amount(Decimal::new(49, 0)).is_none());
        assert!(plan_for_amount(Decimal::new(20_000, 0)).is_none());
    }
}
