//! Folding per-document fields into submission totals, and the final
//! summary.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::calculator::{bracket_tax, standard_deduction};
use super::fields::FieldExtraction;
use super::rules::{FieldTarget, format_amount, format_percent};
use crate::models::document::{DocumentType, ExtractionFailure, ExtractionMethod};
use crate::models::profile::{
    DeductionElection, DocumentSummary, FilingStatus, SummaryRecord, TaxProfile,
};

/// Accumulates documents into a [`TaxProfile`] and turns the result into a
/// [`SummaryRecord`].
///
/// Every step takes the profile by value and returns the next state; a
/// submission owns exactly one profile and folds into it serially.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Merge one document's fields.
    pub fn fold(
        &self,
        mut profile: TaxProfile,
        file_name: &str,
        method: ExtractionMethod,
        extraction: &FieldExtraction,
    ) -> TaxProfile {
        profile.documents.push(DocumentSummary {
            file_name: file_name.to_string(),
            document_type: Some(extraction.document_type),
            method: Some(method),
        });

        if extraction.document_type == DocumentType::Unclassified {
            profile.warn(format!(
                "No income found in {}: document type not recognized",
                file_name
            ));
            return profile;
        }

        if let Some(name) = &extraction.individual {
            profile.add_individual(name);
        }

        for field in &extraction.misses {
            profile.warn(format!("Could not find {} in {}", field.label(), file_name));
        }

        let income_before = profile.income.clone();
        for (&field, &value) in &extraction.fields {
            match field.target() {
                FieldTarget::Income(category) => profile.add_income(category, value),
                FieldTarget::Deduction(category) => profile.add_deduction(category, value),
                FieldTarget::Withheld => profile.add_withheld(value),
            }
        }

        if profile.income == income_before {
            profile.warn(format!("No income found in {}", file_name));
        }

        debug!(
            file = %file_name,
            "Folded {} field(s) from {} form",
            extraction.fields.len(),
            extraction.document_type
        );
        profile
    }

    /// Record a document whose text could not be extracted.
    pub fn record_failure(
        &self,
        mut profile: TaxProfile,
        file_name: &str,
        failure: &ExtractionFailure,
    ) -> TaxProfile {
        warn!(file = %file_name, "Extraction failed: {}", failure.message);
        profile.documents.push(DocumentSummary {
            file_name: file_name.to_string(),
            document_type: None,
            method: Some(failure.last_method),
        });
        profile.warn(format!(
            "Failed to extract text from {}: {}",
            file_name, failure.kind
        ));
        profile
    }

    /// Record a file skipped because of its extension.
    pub fn skip_unsupported(&self, mut profile: TaxProfile, file_name: &str) -> TaxProfile {
        profile.warn(format!("Skipping unsupported file: {}", file_name));
        profile
    }

    /// Record a document whose processing aborted unexpectedly.
    pub fn record_fault(&self, mut profile: TaxProfile, file_name: &str) -> TaxProfile {
        profile.documents.push(DocumentSummary {
            file_name: file_name.to_string(),
            document_type: None,
            method: None,
        });
        profile.warn(format!("Error processing {}: internal fault", file_name));
        profile
    }

    /// Compute the election, tax and refund and format the summary.
    pub fn finalize(&self, profile: &TaxProfile, status: FilingStatus) -> SummaryRecord {
        let mut warnings = profile.warnings.clone();

        if status == FilingStatus::MarriedJointly && profile.individuals.len() < 2 {
            warnings.push(
                "Joint filing detected but only found information for one individual. \
                 Joint calculations may be inaccurate."
                    .to_string(),
            );
        }

        let total_income = profile.total_income();
        let itemized = profile.total_deductions();
        let standard = standard_deduction(status);

        let (election, deduction) = if itemized > standard {
            (DeductionElection::Itemized, itemized)
        } else {
            warnings.push(format!(
                "Itemized deductions (${}) do not exceed the standard deduction (${}). \
                 Using standard deduction.",
                format_amount(itemized),
                format_amount(standard)
            ));
            (DeductionElection::Standard, standard)
        };

        if total_income.is_zero() {
            warnings.push(
                "No income found in the uploaded documents. Please check that the \
                 documents were correctly scanned and contain income information."
                    .to_string(),
            );
        }

        let taxable_income = (total_income - deduction).max(Decimal::ZERO);
        let tax = bracket_tax(taxable_income, status);
        let tax_rate = if taxable_income.is_zero() {
            Decimal::ZERO
        } else {
            tax / taxable_income * Decimal::ONE_HUNDRED
        };
        let refund = profile.tax_withheld - tax;

        info!(
            "Finalized: income {}, taxable {}, tax {}, withheld {}",
            total_income, taxable_income, tax, profile.tax_withheld
        );

        SummaryRecord {
            income: profile
                .income
                .iter()
                .map(|(c, v)| (*c, format_amount(*v)))
                .collect(),
            deductions: profile
                .deductions
                .iter()
                .map(|(c, v)| (*c, format_amount(*v)))
                .collect(),
            total_income: format_amount(total_income),
            total_deductions: format_amount(deduction),
            itemized_deductions: format_amount(itemized),
            deduction_election: election,
            taxable_income: format_amount(taxable_income),
            tax: format_amount(tax),
            tax_rate: format_percent(tax_rate),
            tax_withheld: format_amount(profile.tax_withheld),
            refund_or_owed: format_amount(refund.abs()),
            is_refund: refund > Decimal::ZERO,
            individuals: profile.individuals.clone(),
            filing_status: status.label().to_string(),
            warnings: (!warnings.is_empty()).then_some(warnings),
            documents: profile.documents.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::FailureKind;
    use crate::models::profile::{DeductionCategory, IncomeCategory};
    use crate::tax::rules::FieldName;
    use pretty_assertions::assert_eq;

    fn extraction(doc_type: DocumentType, fields: &[(FieldName, i64)]) -> FieldExtraction {
        let mut extraction = FieldExtraction::empty(doc_type);
        for &(field, dollars) in fields {
            extraction.fields.insert(field, Decimal::from(dollars));
        }
        extraction
    }

    fn wage_doc(wages: i64, withheld: i64) -> FieldExtraction {
        extraction(
            DocumentType::WageStatement,
            &[(FieldName::Wages, wages), (FieldName::FederalWithheld, withheld)],
        )
    }

    #[test]
    fn test_zero_income_for_every_status() {
        let engine = AggregationEngine::new();
        for status in FilingStatus::ALL {
            let summary = engine.finalize(&TaxProfile::new(), status);
            assert_eq!(summary.tax, "0.00");
            assert_eq!(summary.tax_rate, "0.00%");
            assert!(!summary.is_refund);
            assert!(
                summary
                    .warnings()
                    .iter()
                    .any(|w| w.starts_with("No income found"))
            );
        }
    }

    #[test]
    fn test_single_wage_earner() {
        let engine = AggregationEngine::new();
        let profile = engine.fold(
            TaxProfile::new(),
            "w2.pdf",
            ExtractionMethod::NativePdfText,
            &wage_doc(54_000, 6_200),
        );
        let summary = engine.finalize(&profile, FilingStatus::Single);

        assert_eq!(summary.total_income, "54,000.00");
        assert_eq!(summary.total_deductions, "13,750.00");
        assert_eq!(summary.deduction_election, DeductionElection::Standard);
        assert_eq!(summary.taxable_income, "40,250.00");
        assert_eq!(summary.tax, "4,598.00");
        assert_eq!(summary.tax_rate, "11.42%");
        assert_eq!(summary.tax_withheld, "6,200.00");
        assert_eq!(summary.refund_or_owed, "1,602.00");
        assert!(summary.is_refund);
        assert_eq!(summary.filing_status, "Single");
        assert_eq!(summary.income[&IncomeCategory::Wages], "54,000.00");
    }

    #[test]
    fn test_amount_owed() {
        let engine = AggregationEngine::new();
        let profile = engine.fold(
            TaxProfile::new(),
            "w2.pdf",
            ExtractionMethod::NativePdfText,
            &wage_doc(54_000, 1_000),
        );
        let summary = engine.finalize(&profile, FilingStatus::Single);
        assert!(!summary.is_refund);
        assert_eq!(summary.refund_or_owed, "3,598.00");
    }

    #[test]
    fn test_fold_is_monotonic_in_income() {
        let engine = AggregationEngine::new();
        let mut profile = TaxProfile::new();
        let mut last = Decimal::ZERO;
        let docs = [
            wage_doc(40_000, 100),
            extraction(DocumentType::InterestStatement, &[(FieldName::InterestIncome, 150)]),
            extraction(DocumentType::MortgageInterest, &[(FieldName::MortgageInterest, 9_000)]),
            extraction(DocumentType::PartnershipShare, &[(FieldName::PartnershipIncome, 2_500)]),
        ];
        for (i, doc) in docs.iter().enumerate() {
            profile = engine.fold(profile, &format!("doc{i}"), ExtractionMethod::NeuralOcr, doc);
            assert!(profile.total_income() >= last);
            last = profile.total_income();
        }
        assert_eq!(last, Decimal::from(42_650));
        assert_eq!(profile.income(IncomeCategory::OtherIncome), Decimal::from(2_500));
        assert_eq!(profile.deduction(DeductionCategory::MortgageInterest), Decimal::from(9_000));
    }

    #[test]
    fn test_deduction_election() {
        let engine = AggregationEngine::new();
        let status = FilingStatus::Single;

        let mut profile = TaxProfile::new();
        profile.add_income(IncomeCategory::Wages, Decimal::from(100_000));
        profile.add_deduction(DeductionCategory::MortgageInterest, Decimal::from(20_000));
        let summary = engine.finalize(&profile, status);
        assert_eq!(summary.deduction_election, DeductionElection::Itemized);
        assert_eq!(summary.total_deductions, "20,000.00");
        assert_eq!(summary.taxable_income, "80,000.00");
        assert!(summary.warnings.is_none());

        // Equal to the standard deduction defers to standard.
        let mut profile = TaxProfile::new();
        profile.add_income(IncomeCategory::Wages, Decimal::from(100_000));
        profile.add_deduction(DeductionCategory::Charity, standard_deduction(status));
        let summary = engine.finalize(&profile, status);
        assert_eq!(summary.deduction_election, DeductionElection::Standard);
        assert_eq!(summary.warnings().len(), 1);
        assert!(summary.warnings()[0].contains("Using standard deduction"));
    }

    #[test]
    fn test_joint_filing_with_one_individual_warns() {
        let engine = AggregationEngine::new();
        let mut doc = wage_doc(54_000, 6_200);
        doc.individual = Some("Jane Doe".to_string());
        let profile = engine.fold(TaxProfile::new(), "w2.pdf", ExtractionMethod::NativePdfText, &doc);

        let summary = engine.finalize(&profile, FilingStatus::MarriedJointly);
        assert!(summary.warnings()[0].starts_with("Joint filing detected"));
        assert_eq!(summary.total_deductions, "27,500.00");
        assert_eq!(summary.individuals, vec!["Jane Doe"]);
    }

    #[test]
    fn test_per_document_warnings() {
        let engine = AggregationEngine::new();
        let mut profile = TaxProfile::new();

        let mut partial = extraction(DocumentType::WageStatement, &[(FieldName::FederalWithheld, 50)]);
        partial.misses.push(FieldName::Wages);
        profile = engine.fold(profile, "a.pdf", ExtractionMethod::TraditionalOcr, &partial);
        profile = engine.fold(
            profile,
            "b.png",
            ExtractionMethod::TraditionalOcr,
            &FieldExtraction::empty(DocumentType::Unclassified),
        );
        profile = engine.record_failure(
            profile,
            "c.pdf",
            &ExtractionFailure::new(FailureKind::NoText, "all pages blank", ExtractionMethod::TraditionalOcr),
        );
        profile = engine.skip_unsupported(profile, "d.docx");

        assert_eq!(
            profile.warnings,
            vec![
                "Could not find wages in a.pdf",
                "No income found in a.pdf",
                "No income found in b.png: document type not recognized",
                "Failed to extract text from c.pdf: no readable text found",
                "Skipping unsupported file: d.docx",
            ]
        );
        assert_eq!(profile.tax_withheld, Decimal::from(50));
        assert_eq!(profile.documents.len(), 3);
    }
}
