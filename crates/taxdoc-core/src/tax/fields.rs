//! Per-document-type field extraction.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use super::issuers::{IssuerEntry, IssuerTable};
use super::rules::patterns::RECIPIENT_NAME;
use super::rules::{FieldName, FieldSpec, catalogue, default_strategies, plausibility};
use crate::models::config::ExtractionConfig;
use crate::models::document::DocumentType;

/// Fields accepted from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldExtraction {
    pub document_type: DocumentType,
    pub fields: BTreeMap<FieldName, Decimal>,
    /// Required fields no strategy could supply.
    pub misses: Vec<FieldName>,
    /// Issuer override whose rules were used, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Recipient named on the form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub individual: Option<String>,
}

impl FieldExtraction {
    /// Extraction with nothing found, for documents that were never
    /// classified.
    pub fn empty(document_type: DocumentType) -> Self {
        Self {
            document_type,
            fields: BTreeMap::new(),
            misses: Vec::new(),
            issuer: None,
            individual: None,
        }
    }

    pub fn get(&self, field: FieldName) -> Option<Decimal> {
        self.fields.get(&field).copied()
    }
}

/// Pulls monetary fields out of classified text.
pub struct FieldExtractor {
    config: ExtractionConfig,
    issuers: Arc<IssuerTable>,
}

impl FieldExtractor {
    pub fn new(config: ExtractionConfig, issuers: Arc<IssuerTable>) -> Self {
        Self { config, issuers }
    }

    /// Extract every catalogued field for `doc_type`.
    ///
    /// Fields run in catalogue order so ratio bounds can see fields accepted
    /// earlier in the same document.
    pub fn extract(&self, doc_type: DocumentType, text: &str) -> FieldExtraction {
        let mut extraction = FieldExtraction::empty(doc_type);
        if doc_type == DocumentType::Unclassified {
            return extraction;
        }

        let issuer = self.issuers.lookup(text, doc_type);
        extraction.issuer = issuer.map(|e| e.name.clone());

        for &(field, required) in catalogue(doc_type) {
            let spec = self.spec_for(doc_type, field, required, issuer);
            match spec.evaluate(text, &extraction.fields) {
                Some(candidate) => {
                    info!("Found {}: {}", field, candidate.parsed_value);
                    extraction.fields.insert(field, candidate.parsed_value);
                }
                None if required => {
                    debug!("No plausible {} on {} form", field, doc_type);
                    extraction.misses.push(field);
                }
                None => debug!("Optional {} not present on {} form", field, doc_type),
            }
        }

        extraction.individual = RECIPIENT_NAME
            .captures(text)
            .map(|caps| caps[1].to_string());

        extraction
    }

    fn spec_for(
        &self,
        doc_type: DocumentType,
        field: FieldName,
        required: bool,
        issuer: Option<&IssuerEntry>,
    ) -> FieldSpec {
        let mut plausibility = plausibility(doc_type, field, &self.config);
        let strategies = match issuer.and_then(|e| e.field_rule(field)) {
            Some(rule) => {
                plausibility.range = rule.bounds(plausibility.range);
                rule.strategies.clone()
            }
            None => default_strategies(doc_type, field),
        };
        FieldSpec {
            field,
            required,
            strategies,
            plausibility,
        }
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default(), Arc::new(IssuerTable::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::AmountRange;
    use pretty_assertions::assert_eq;

    fn cents(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    #[test]
    fn test_wage_statement_fields() {
        let extraction = FieldExtractor::default().extract(
            DocumentType::WageStatement,
            "Wages 54000.00 ... Federal tax withheld 6200.00",
        );
        assert_eq!(extraction.get(FieldName::Wages), Some(cents(5_400_000)));
        assert_eq!(extraction.get(FieldName::FederalWithheld), Some(cents(620_000)));
        assert!(extraction.misses.is_empty());
    }

    #[test]
    fn test_box_labels_and_thousands_separators() {
        let text = "Employee's name Jane Doe\n\
                    1 Wages, tips, other compensation 61,250.40\n\
                    2 Federal income tax withheld 7,010.12";
        let extraction = FieldExtractor::default().extract(DocumentType::WageStatement, text);
        assert_eq!(extraction.get(FieldName::Wages), Some(cents(6_125_040)));
        assert_eq!(extraction.get(FieldName::FederalWithheld), Some(cents(701_012)));
        assert_eq!(extraction.individual.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_out_of_range_wages_fall_through_to_next_pattern() {
        // The labeled value is below the wage floor; the bare amount is used.
        let text = "Wages 12.00\nsummary 48000.00";
        let extraction = FieldExtractor::default().extract(DocumentType::WageStatement, text);
        assert_eq!(extraction.get(FieldName::Wages), Some(cents(4_800_000)));
    }

    #[test]
    fn test_withheld_above_ratio_is_rejected() {
        let text = "Wages 10000.00\nFederal tax withheld 9000.00";
        let extraction = FieldExtractor::default().extract(DocumentType::WageStatement, text);
        assert_eq!(extraction.get(FieldName::Wages), Some(cents(1_000_000)));
        assert_eq!(extraction.get(FieldName::FederalWithheld), None);
        assert_eq!(extraction.misses, vec![FieldName::FederalWithheld]);
    }

    #[test]
    fn test_optional_fields_are_not_misses() {
        let extraction = FieldExtractor::default()
            .extract(DocumentType::InterestStatement, "Interest Income 150.00");
        assert_eq!(extraction.get(FieldName::InterestIncome), Some(cents(15_000)));
        assert_eq!(extraction.get(FieldName::FederalWithheld), None);
        assert!(extraction.misses.is_empty());
    }

    #[test]
    fn test_other_document_types() {
        let extractor = FieldExtractor::default();

        let div = extractor.extract(
            DocumentType::DividendStatement,
            "1a Ordinary dividends 1,250.10\n2a Total capital gain distr. 310.55",
        );
        assert_eq!(div.get(FieldName::OrdinaryDividends), Some(cents(125_010)));
        assert_eq!(div.get(FieldName::CapitalGainDistributions), Some(cents(31_055)));

        let mortgage = extractor.extract(
            DocumentType::MortgageInterest,
            "Form 1098\n1 Mortgage interest received from borrower 8,400.00",
        );
        assert_eq!(mortgage.get(FieldName::MortgageInterest), Some(cents(840_000)));

        let nec = extractor.extract(
            DocumentType::MiscCompensation,
            "Form 1099-NEC Nonemployee compensation 3,000.00",
        );
        assert_eq!(nec.get(FieldName::NonemployeeCompensation), Some(cents(300_000)));
    }

    #[test]
    fn test_unclassified_extracts_nothing() {
        let extraction =
            FieldExtractor::default().extract(DocumentType::Unclassified, "Wages 54000.00");
        assert_eq!(extraction, FieldExtraction::empty(DocumentType::Unclassified));
    }

    #[test]
    fn test_issuer_rules_replace_defaults() {
        let table = IssuerTable::from_json(
            r#"[{
                "name": "Acme",
                "signatures": ["ACME CORP"],
                "fields": {
                    "Wages": {
                        "patterns": ["Box 1 total (\\d[\\d,]*\\.\\d{2})"],
                        "largest_of": "(\\d{1,3}(?:,\\d{3})*\\.\\d{2})",
                        "min": "10000"
                    },
                    "FederalWithheld": { "fixed": "15142.14" }
                }
            }]"#,
        )
        .unwrap();
        let extractor = FieldExtractor::new(ExtractionConfig::default(), Arc::new(table));

        let text = "ACME CORP\nline 512.00\nline 98,500.00\nline 1,250.00";
        let extraction = extractor.extract(DocumentType::WageStatement, text);
        assert_eq!(extraction.issuer.as_deref(), Some("Acme"));
        assert_eq!(extraction.get(FieldName::Wages), Some(cents(9_850_000)));
        assert_eq!(extraction.get(FieldName::FederalWithheld), Some(cents(1_514_214)));
    }

    #[test]
    fn test_configured_bounds_apply() {
        let mut config = ExtractionConfig::default();
        config.bounds.insert(
            FieldName::InterestIncome,
            AmountRange::new(Decimal::from(500), Decimal::from(1_000)),
        );
        let extractor = FieldExtractor::new(config, Arc::new(IssuerTable::empty()));
        let extraction = extractor.extract(DocumentType::InterestStatement, "Interest Income 150.00");
        assert_eq!(extraction.misses, vec![FieldName::InterestIncome]);
    }
}
