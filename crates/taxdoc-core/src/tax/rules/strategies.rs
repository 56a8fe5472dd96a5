//! Candidate strategies and the per-document-type field catalogue.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::amounts::parse_amount;
use super::patterns::*;
use crate::models::config::{AmountRange, ExtractionConfig};
use crate::models::document::DocumentType;
use crate::models::profile::{DeductionCategory, IncomeCategory};

/// Monetary fields the extractor knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldName {
    Wages,
    FederalWithheld,
    InterestIncome,
    OrdinaryDividends,
    CapitalGainDistributions,
    NonemployeeCompensation,
    GrossDistribution,
    MortgageInterest,
    PartnershipIncome,
}

/// Where an accepted field value is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Income(IncomeCategory),
    Deduction(DeductionCategory),
    Withheld,
}

impl FieldName {
    pub const ALL: [FieldName; 9] = [
        Self::Wages,
        Self::FederalWithheld,
        Self::InterestIncome,
        Self::OrdinaryDividends,
        Self::CapitalGainDistributions,
        Self::NonemployeeCompensation,
        Self::GrossDistribution,
        Self::MortgageInterest,
        Self::PartnershipIncome,
    ];

    /// Human-readable label used in warnings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Wages => "wages",
            Self::FederalWithheld => "federal tax withheld",
            Self::InterestIncome => "interest income",
            Self::OrdinaryDividends => "ordinary dividends",
            Self::CapitalGainDistributions => "capital gain distributions",
            Self::NonemployeeCompensation => "nonemployee compensation",
            Self::GrossDistribution => "gross distribution",
            Self::MortgageInterest => "mortgage interest",
            Self::PartnershipIncome => "partnership income",
        }
    }

    pub fn target(&self) -> FieldTarget {
        match self {
            Self::Wages => FieldTarget::Income(IncomeCategory::Wages),
            Self::FederalWithheld => FieldTarget::Withheld,
            Self::InterestIncome => FieldTarget::Income(IncomeCategory::Interest),
            Self::OrdinaryDividends => FieldTarget::Income(IncomeCategory::Dividends),
            Self::CapitalGainDistributions => FieldTarget::Income(IncomeCategory::CapitalGains),
            Self::NonemployeeCompensation | Self::GrossDistribution | Self::PartnershipIncome => {
                FieldTarget::Income(IncomeCategory::OtherIncome)
            }
            Self::MortgageInterest => FieldTarget::Deduction(DeductionCategory::MortgageInterest),
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value proposed for a field. Transient: dropped once accepted or
/// rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCandidate {
    /// Text the strategy matched.
    pub raw_match: String,
    /// Parsed amount.
    pub parsed_value: Decimal,
    /// Position of the producing strategy in its list (0 = most specific).
    pub source_pattern_rank: usize,
}

impl FieldCandidate {
    pub fn new(raw_match: impl Into<String>, parsed_value: Decimal, rank: usize) -> Self {
        Self {
            raw_match: raw_match.into(),
            parsed_value,
            source_pattern_rank: rank,
        }
    }
}

/// One way of finding a field value.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// First match of the pattern; group 1 is the amount.
    Pattern(Regex),
    /// Every match of the pattern; the largest plausible value wins.
    LargestMatch(Regex),
    /// A known value, used as-is.
    Fixed(Decimal),
}

impl Strategy {
    /// Candidates this strategy proposes, in preference order.
    fn candidates(&self, text: &str, rank: usize) -> Vec<FieldCandidate> {
        match self {
            Self::Pattern(re) => re
                .captures(text)
                .into_iter()
                .filter_map(|caps| candidate_from(&caps, rank))
                .collect(),
            Self::LargestMatch(re) => {
                let mut all: Vec<FieldCandidate> = re
                    .captures_iter(text)
                    .filter_map(|caps| candidate_from(&caps, rank))
                    .collect();
                all.sort_by(|a, b| b.parsed_value.cmp(&a.parsed_value));
                all
            }
            Self::Fixed(value) => vec![FieldCandidate::new("fixed", *value, rank)],
        }
    }
}

fn candidate_from(caps: &regex::Captures<'_>, rank: usize) -> Option<FieldCandidate> {
    let raw = caps.get(1)?.as_str();
    match parse_amount(raw) {
        Some(value) => Some(FieldCandidate::new(raw, value, rank)),
        None => {
            trace!("Could not parse {:?} as an amount", raw);
            None
        }
    }
}

/// Why a candidate was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange(AmountRange),
    ExceedsRatio { reference: FieldName, limit: Decimal },
    MissingReference(FieldName),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(range) => write!(f, "outside {}..={}", range.min, range.max),
            Self::ExceedsRatio { reference, limit } => {
                write!(f, "exceeds {} of {}", limit, reference)
            }
            Self::MissingReference(reference) => write!(f, "no {} to compare against", reference),
        }
    }
}

/// Predicate a candidate must satisfy to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plausibility {
    pub range: AmountRange,
    /// At most `fraction` × an already accepted field.
    pub ratio: Option<(FieldName, Decimal)>,
}

impl Plausibility {
    pub fn check(
        &self,
        value: Decimal,
        accepted: &BTreeMap<FieldName, Decimal>,
    ) -> Result<(), Rejection> {
        if !self.range.contains(value) {
            return Err(Rejection::OutOfRange(self.range));
        }
        if let Some((reference, fraction)) = self.ratio {
            let base = accepted
                .get(&reference)
                .ok_or(Rejection::MissingReference(reference))?;
            let limit = *base * fraction;
            if value > limit {
                return Err(Rejection::ExceedsRatio { reference, limit });
            }
        }
        Ok(())
    }
}

/// Everything needed to extract one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field: FieldName,
    pub required: bool,
    pub strategies: Vec<Strategy>,
    pub plausibility: Plausibility,
}

impl FieldSpec {
    /// Evaluate strategies in order and accept the first plausible candidate.
    pub fn evaluate(
        &self,
        text: &str,
        accepted: &BTreeMap<FieldName, Decimal>,
    ) -> Option<FieldCandidate> {
        for (rank, strategy) in self.strategies.iter().enumerate() {
            for candidate in strategy.candidates(text, rank) {
                match self.plausibility.check(candidate.parsed_value, accepted) {
                    Ok(()) => {
                        trace!(
                            "Accepted {} = {} from strategy {} ({:?})",
                            self.field, candidate.parsed_value, rank, candidate.raw_match
                        );
                        return Some(candidate);
                    }
                    Err(reason) => trace!(
                        "Rejected {} candidate {} from strategy {}: {}",
                        self.field, candidate.parsed_value, rank, reason
                    ),
                }
            }
        }
        None
    }
}

fn patterns(list: &[&Regex]) -> Vec<Strategy> {
    list.iter().map(|re| Strategy::Pattern((*re).clone())).collect()
}

/// Default strategies for `field` on a document of type `doc_type`.
pub fn default_strategies(doc_type: DocumentType, field: FieldName) -> Vec<Strategy> {
    match field {
        FieldName::Wages => patterns(&[
            &*WAGES_BOX_1,
            &*WAGES_TIPS_OTHER,
            &*WAGES_LABELED,
            &*AMOUNT_BEFORE_AMOUNT,
            &*AMOUNT_BEFORE_FEDERAL,
            &*BARE_WAGE_AMOUNT,
        ]),
        // Bare amounts are only trusted on wage statements.
        FieldName::FederalWithheld if doc_type == DocumentType::WageStatement => patterns(&[
            &*WITHHELD_BOX_2,
            &*WITHHELD_LABELED,
            &*AMOUNT_BEFORE_BOX_OR_FED,
            &*BARE_WITHHELD_AMOUNT,
        ]),
        FieldName::FederalWithheld => patterns(&[&*WITHHELD_LABELED]),
        FieldName::InterestIncome => {
            patterns(&[&*INTEREST_INCOME, &*INTEREST_BOX_1, &*TOTAL_INTEREST])
        }
        FieldName::OrdinaryDividends => {
            patterns(&[&*ORDINARY_DIVIDENDS, &*DIVIDENDS_BOX_1A, &*TOTAL_DIVIDENDS])
        }
        FieldName::CapitalGainDistributions => patterns(&[&*CAPITAL_GAIN_DISTRIBUTIONS]),
        FieldName::NonemployeeCompensation => {
            patterns(&[&*NONEMPLOYEE_COMPENSATION, &*NONEMPLOYEE_BOX_7])
        }
        FieldName::GrossDistribution => patterns(&[&*GROSS_DISTRIBUTION, &*IRA_DISTRIBUTIONS]),
        FieldName::MortgageInterest => {
            patterns(&[&*MORTGAGE_BOX_1, &*MORTGAGE_RECEIVED, &*AMOUNT_BEFORE_MORTGAGE])
        }
        FieldName::PartnershipIncome => patterns(&[&*PARTNER_SHARE, &*K1_FORM_1065]),
    }
}

/// Fields attempted for a document type, in extraction order, with whether
/// each is required.
pub fn catalogue(doc_type: DocumentType) -> &'static [(FieldName, bool)] {
    use FieldName::*;
    match doc_type {
        DocumentType::WageStatement => &[(Wages, true), (FederalWithheld, true)],
        DocumentType::InterestStatement => &[(InterestIncome, true), (FederalWithheld, false)],
        DocumentType::DividendStatement => &[
            (OrdinaryDividends, true),
            (CapitalGainDistributions, false),
            (FederalWithheld, false),
        ],
        DocumentType::MiscCompensation => &[(NonemployeeCompensation, true)],
        DocumentType::RetirementDistribution => {
            &[(GrossDistribution, true), (FederalWithheld, false)]
        }
        DocumentType::MortgageInterest => &[(MortgageInterest, true)],
        DocumentType::PartnershipShare => &[(PartnershipIncome, true)],
        DocumentType::Unclassified => &[],
    }
}

/// Plausibility for `field`; withholding is bounded by the document's
/// primary (first catalogued) field.
pub fn plausibility(
    doc_type: DocumentType,
    field: FieldName,
    config: &ExtractionConfig,
) -> Plausibility {
    let ratio = match field {
        FieldName::FederalWithheld => catalogue(doc_type)
            .first()
            .map(|(primary, _)| *primary)
            .filter(|primary| *primary != FieldName::FederalWithheld)
            .map(|primary| (primary, config.withheld_max_fraction)),
        _ => None,
    };
    Plausibility {
        range: config.bounds_for(field),
        ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_out_of_range_candidate_advances_to_next_strategy() {
        let spec = FieldSpec {
            field: FieldName::Wages,
            required: true,
            strategies: patterns(&[&*WAGES_LABELED, &*BARE_WAGE_AMOUNT]),
            plausibility: Plausibility {
                range: AmountRange::new(dec(100), dec(1_000_000)),
                ratio: None,
            },
        };
        // "Wages 12.00" parses but is below range; the bare pattern finds 54000.00
        let accepted = spec
            .evaluate("Wages 12.00\nbox total 54000.00", &BTreeMap::new())
            .unwrap();
        assert_eq!(accepted.parsed_value, Decimal::new(5400000, 2));
        assert_eq!(accepted.source_pattern_rank, 1);
    }

    #[test]
    fn test_ratio_needs_reference() {
        let plausibility = Plausibility {
            range: AmountRange::new(dec(0), dec(10_000_000)),
            ratio: Some((FieldName::Wages, Decimal::new(5, 1))),
        };
        assert_eq!(
            plausibility.check(dec(100), &BTreeMap::new()),
            Err(Rejection::MissingReference(FieldName::Wages))
        );

        let accepted = BTreeMap::from([(FieldName::Wages, dec(1000))]);
        assert_eq!(plausibility.check(dec(500), &accepted), Ok(()));
        assert!(matches!(
            plausibility.check(dec(501), &accepted),
            Err(Rejection::ExceedsRatio { .. })
        ));
    }

    #[test]
    fn test_largest_match_prefers_biggest_plausible_value() {
        let re = Regex::new(r"(\d[\d,]*\.\d{2})").unwrap();
        let spec = FieldSpec {
            field: FieldName::Wages,
            required: true,
            strategies: vec![Strategy::LargestMatch(re)],
            plausibility: Plausibility {
                range: AmountRange::new(dec(10_000), dec(500_000)),
                ratio: None,
            },
        };
        let accepted = spec
            .evaluate("1,200.00 98,000.50 7,000,000.00", &BTreeMap::new())
            .unwrap();
        assert_eq!(accepted.parsed_value, Decimal::new(9800050, 2));
    }

    #[test]
    fn test_withheld_ratio_follows_primary_field() {
        let config = ExtractionConfig::default();
        let p = plausibility(DocumentType::WageStatement, FieldName::FederalWithheld, &config);
        assert_eq!(p.ratio, Some((FieldName::Wages, Decimal::new(5, 1))));

        let p = plausibility(DocumentType::InterestStatement, FieldName::FederalWithheld, &config);
        assert_eq!(p.ratio.map(|(f, _)| f), Some(FieldName::InterestIncome));

        let p = plausibility(DocumentType::WageStatement, FieldName::Wages, &config);
        assert_eq!(p.ratio, None);
    }

    #[test]
    fn test_every_field_has_a_target() {
        for field in FieldName::ALL {
            assert!(!default_strategies(DocumentType::WageStatement, field).is_empty());
            let _ = field.target();
        }
        assert_eq!(
            FieldName::MortgageInterest.target(),
            FieldTarget::Deduction(DeductionCategory::MortgageInterest)
        );
    }
}
