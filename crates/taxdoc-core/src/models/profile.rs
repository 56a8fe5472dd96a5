//! Submission-wide running totals and the final summary record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationFailure;
use crate::models::document::{DocumentType, ExtractionMethod};

/// Filing status for the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedJointly,
    MarriedSeparate,
    HeadHousehold,
}

impl FilingStatus {
    pub const ALL: [FilingStatus; 4] = [
        Self::Single,
        Self::MarriedJointly,
        Self::MarriedSeparate,
        Self::HeadHousehold,
    ];

    /// Wire token, e.g. `married_jointly`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::MarriedJointly => "married_jointly",
            Self::MarriedSeparate => "married_separate",
            Self::HeadHousehold => "head_household",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::MarriedJointly => "Married Filing Jointly",
            Self::MarriedSeparate => "Married Filing Separately",
            Self::HeadHousehold => "Head of Household",
        }
    }
}

impl FromStr for FilingStatus {
    type Err = ValidationFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.token() == s.trim())
            .ok_or_else(|| ValidationFailure::UnsupportedFilingStatus {
                token: s.to_string(),
                allowed: Self::ALL.map(|st| st.token()).join(", "),
            })
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Income buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    Wages,
    Interest,
    Dividends,
    CapitalGains,
    #[serde(rename = "other")]
    OtherIncome,
}

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 5] = [
        Self::Wages,
        Self::Interest,
        Self::Dividends,
        Self::CapitalGains,
        Self::OtherIncome,
    ];
}

/// Itemizable deduction buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionCategory {
    Charity,
    Medical,
    MortgageInterest,
    #[serde(rename = "other")]
    OtherDeduction,
}

impl DeductionCategory {
    pub const ALL: [DeductionCategory; 4] = [
        Self::Charity,
        Self::Medical,
        Self::MortgageInterest,
        Self::OtherDeduction,
    ];
}

/// What a single document contributed, kept for the summary's per-file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
}

/// Running totals for one submission.
///
/// Mutated additively as documents are folded in. Every amount is kept
/// non-negative; the warnings list is append-only and ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxProfile {
    pub income: BTreeMap<IncomeCategory, Decimal>,
    pub deductions: BTreeMap<DeductionCategory, Decimal>,
    pub tax_withheld: Decimal,
    pub individuals: Vec<String>,
    pub warnings: Vec<String>,
    pub documents: Vec<DocumentSummary>,
}

impl TaxProfile {
    /// Empty profile with every category present at zero.
    pub fn new() -> Self {
        Self {
            income: IncomeCategory::ALL
                .into_iter()
                .map(|c| (c, Decimal::ZERO))
                .collect(),
            deductions: DeductionCategory::ALL
                .into_iter()
                .map(|c| (c, Decimal::ZERO))
                .collect(),
            tax_withheld: Decimal::ZERO,
            individuals: Vec::new(),
            warnings: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub fn income(&self, category: IncomeCategory) -> Decimal {
        self.income.get(&category).copied().unwrap_or_default()
    }

    pub fn deduction(&self, category: DeductionCategory) -> Decimal {
        self.deductions.get(&category).copied().unwrap_or_default()
    }

    pub fn total_income(&self) -> Decimal {
        self.income.values().copied().sum()
    }

    pub fn total_deductions(&self) -> Decimal {
        self.deductions.values().copied().sum()
    }

    /// Add to an income bucket. Negative amounts are ignored.
    pub fn add_income(&mut self, category: IncomeCategory, amount: Decimal) {
        if amount > Decimal::ZERO {
            *self.income.entry(category).or_default() += amount;
        }
    }

    /// Add to a deduction bucket. Negative amounts are ignored.
    pub fn add_deduction(&mut self, category: DeductionCategory, amount: Decimal) {
        if amount > Decimal::ZERO {
            *self.deductions.entry(category).or_default() += amount;
        }
    }

    pub fn add_withheld(&mut self, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.tax_withheld += amount;
        }
    }

    /// Record a detected individual, keeping first-seen order without duplicates.
    pub fn add_individual(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.individuals.iter().any(|n| n == name) {
            self.individuals.push(name.to_string());
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl Default for TaxProfile {
    fn default() -> Self {
        Self::new()
    }
}

/// Which deduction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionElection {
    Standard,
    Itemized,
}

/// Final result of a submission. Amounts are pre-formatted with two
/// fractional digits and thousands separators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub income: BTreeMap<IncomeCategory, String>,
    pub deductions: BTreeMap<DeductionCategory, String>,
    pub total_income: String,
    /// The elected deduction amount.
    pub total_deductions: String,
    pub itemized_deductions: String,
    pub deduction_election: DeductionElection,
    pub taxable_income: String,
    pub tax: String,
    pub tax_rate: String,
    pub tax_withheld: String,
    pub refund_or_owed: String,
    pub is_refund: bool,
    pub individuals: Vec<String>,
    pub filing_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    pub documents: Vec<DocumentSummary>,
}

impl SummaryRecord {
    /// Warnings as a slice, empty when there are none.
    pub fn warnings(&self) -> &[String] {
        self.warnings.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_filing_status_tokens() {
        for status in FilingStatus::ALL {
            assert_eq!(FilingStatus::from_str(status.token()).unwrap(), status);
        }
        assert_eq!(FilingStatus::MarriedJointly.label(), "Married Filing Jointly");
    }

    #[test]
    fn test_unknown_filing_status_is_validation_failure() {
        let err = FilingStatus::from_str("widowed").unwrap_err();
        match err {
            ValidationFailure::UnsupportedFilingStatus { token, allowed } => {
                assert_eq!(token, "widowed");
                assert!(allowed.contains("head_household"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_profile_ignores_negative_amounts() {
        let mut profile = TaxProfile::new();
        profile.add_income(IncomeCategory::Wages, Decimal::new(-500, 0));
        profile.add_deduction(DeductionCategory::Medical, Decimal::new(-1, 0));
        profile.add_withheld(Decimal::new(-10, 0));
        assert_eq!(profile.total_income(), Decimal::ZERO);
        assert_eq!(profile.total_deductions(), Decimal::ZERO);
        assert_eq!(profile.tax_withheld, Decimal::ZERO);
    }

    #[test]
    fn test_individuals_are_deduplicated() {
        let mut profile = TaxProfile::new();
        profile.add_individual("Jane Doe");
        profile.add_individual(" Jane Doe ");
        profile.add_individual("John Doe");
        assert_eq!(profile.individuals, vec!["Jane Doe", "John Doe"]);
    }

    #[test]
    fn test_summary_category_keys() {
        let mut income = BTreeMap::new();
        income.insert(IncomeCategory::OtherIncome, "1.00".to_string());
        income.insert(IncomeCategory::CapitalGains, "2.00".to_string());
        let json = serde_json::to_string(&income).unwrap();
        assert_eq!(json, r#"{"capital_gains":"2.00","other":"1.00"}"#);
    }
}
