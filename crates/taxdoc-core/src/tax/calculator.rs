//! Progressive bracket tax and standard deductions.

use rust_decimal::Decimal;

use crate::models::profile::FilingStatus;

/// Upper bound of a bracket in whole dollars; `None` means unbounded.
type Bracket = (Option<i64>, Decimal);

const fn rate(percent: i64) -> Decimal {
    Decimal::from_parts(percent as u32, 0, 0, false, 2)
}

const SINGLE: [Bracket; 7] = [
    (Some(11_600), rate(10)),
    (Some(47_150), rate(12)),
    (Some(100_525), rate(22)),
    (Some(191_950), rate(24)),
    (Some(243_725), rate(32)),
    (Some(609_350), rate(35)),
    (None, rate(37)),
];

const MARRIED_JOINTLY: [Bracket; 7] = [
    (Some(23_200), rate(10)),
    (Some(94_300), rate(12)),
    (Some(201_050), rate(22)),
    (Some(383_900), rate(24)),
    (Some(487_450), rate(32)),
    (Some(731_200), rate(35)),
    (None, rate(37)),
];

const MARRIED_SEPARATE: [Bracket; 7] = [
    (Some(11_600), rate(10)),
    (Some(47_150), rate(12)),
    (Some(100_525), rate(22)),
    (Some(191_950), rate(24)),
    (Some(243_725), rate(32)),
    (Some(365_600), rate(35)),
    (None, rate(37)),
];

const HEAD_HOUSEHOLD: [Bracket; 7] = [
    (Some(16_550), rate(10)),
    (Some(63_100), rate(12)),
    (Some(100_500), rate(22)),
    (Some(191_950), rate(24)),
    (Some(243_700), rate(32)),
    (Some(609_350), rate(35)),
    (None, rate(37)),
];

fn brackets(status: FilingStatus) -> &'static [Bracket] {
    match status {
        FilingStatus::Single => &SINGLE,
        FilingStatus::MarriedJointly => &MARRIED_JOINTLY,
        FilingStatus::MarriedSeparate => &MARRIED_SEPARATE,
        FilingStatus::HeadHousehold => &HEAD_HOUSEHOLD,
    }
}

/// Standard deduction for `status`.
pub fn standard_deduction(status: FilingStatus) -> Decimal {
    Decimal::from(match status {
        FilingStatus::Single | FilingStatus::MarriedSeparate => 13_750,
        FilingStatus::MarriedJointly => 27_500,
        FilingStatus::HeadHousehold => 20_600,
    })
}

/// Tax owed on `taxable_income` under the brackets for `status`.
pub fn bracket_tax(taxable_income: Decimal, status: FilingStatus) -> Decimal {
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for &(limit, rate) in brackets(status) {
        if taxable_income <= lower {
            break;
        }
        let upper = match limit {
            Some(limit) => Decimal::from(limit).min(taxable_income),
            None => taxable_income,
        };
        tax += (upper - lower) * rate;
        match limit {
            Some(limit) => lower = Decimal::from(limit),
            None => break,
        }
    }
    tax
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_bracket_tax() {
        // 1,160 at 10% plus 3,438 at 12%
        assert_eq!(bracket_tax(Decimal::from(40_250), FilingStatus::Single), Decimal::from(4_598));
        assert_eq!(bracket_tax(Decimal::from(11_600), FilingStatus::Single), Decimal::from(1_160));
    }

    #[test]
    fn test_zero_and_negative_income() {
        for status in FilingStatus::ALL {
            assert_eq!(bracket_tax(Decimal::ZERO, status), Decimal::ZERO);
            assert_eq!(bracket_tax(Decimal::from(-5), status), Decimal::ZERO);
        }
    }

    #[test]
    fn test_top_bracket_is_unbounded() {
        let income = Decimal::from(1_000_000);
        let below = bracket_tax(Decimal::from(609_350), FilingStatus::Single);
        let expected = below + Decimal::from(1_000_000 - 609_350) * rate(37);
        assert_eq!(bracket_tax(income, FilingStatus::Single), expected);
    }

    #[test]
    fn test_married_separate_differs_only_at_top() {
        let income = Decimal::from(300_000);
        assert_eq!(
            bracket_tax(income, FilingStatus::MarriedSeparate),
            bracket_tax(income, FilingStatus::Single)
        );
        let income = Decimal::from(500_000);
        assert!(
            bracket_tax(income, FilingStatus::MarriedSeparate)
                > bracket_tax(income, FilingStatus::Single)
        );
    }

    #[test]
    fn test_standard_deductions() {
        assert_eq!(standard_deduction(FilingStatus::Single), Decimal::from(13_750));
        assert_eq!(standard_deduction(FilingStatus::MarriedJointly), Decimal::from(27_500));
        assert_eq!(standard_deduction(FilingStatus::MarriedSeparate), Decimal::from(13_750));
        assert_eq!(standard_deduction(FilingStatus::HeadHousehold), Decimal::from(20_600));
    }
}
