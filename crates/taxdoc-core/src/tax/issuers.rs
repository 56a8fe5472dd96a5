//! Issuer-override table.
//!
//! Some payers lay their forms out so differently that header detection and
//! generic patterns are unreliable. Entries here match on name signatures and
//! can force a document type and replace per-field strategies, including
//! fixed known values. The table is data, loaded once at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rules::{FieldName, Strategy, parse_amount};
use crate::error::ConfigError;
use crate::models::config::AmountRange;
use crate::models::document::DocumentType;

/// One issuer entry as written in the table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerRecord {
    pub name: String,
    /// Case-sensitive substrings; any one of them identifies the issuer.
    pub signatures: Vec<String>,
    #[serde(default = "default_forced_type")]
    pub forced_type: DocumentType,
    /// Only consulted after every built-in classification rule missed.
    #[serde(default)]
    pub fallback_only: bool,
    /// Extra regex that must also match before the entry applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_pattern: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<FieldName, FieldRuleRecord>,
}

fn default_forced_type() -> DocumentType {
    DocumentType::WageStatement
}

/// Field rule as written in the table file. Amounts are strings so that
/// cents survive untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRuleRecord {
    Fixed {
        fixed: String,
    },
    Patterns {
        patterns: Vec<String>,
        /// Fallback pattern whose largest plausible match is taken.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        largest_of: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<String>,
    },
}

/// Compiled replacement rule for one field.
#[derive(Debug, Clone)]
pub struct IssuerFieldRule {
    pub strategies: Vec<Strategy>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl IssuerFieldRule {
    /// Intersect `bounds` with this rule's own limits. A rule can only
    /// tighten the catalogue range, never widen it.
    pub fn bounds(&self, bounds: AmountRange) -> AmountRange {
        AmountRange::new(
            self.min.map_or(bounds.min, |min| min.max(bounds.min)),
            self.max.map_or(bounds.max, |max| max.min(bounds.max)),
        )
    }
}

/// A compiled issuer entry.
#[derive(Debug, Clone)]
pub struct IssuerEntry {
    pub name: String,
    pub signatures: Vec<String>,
    pub forced_type: DocumentType,
    pub fallback_only: bool,
    requires: Option<Regex>,
    pub fields: BTreeMap<FieldName, IssuerFieldRule>,
}

impl IssuerEntry {
    fn compile(record: IssuerRecord) -> Result<Self, ConfigError> {
        let signatures: Vec<String> = record
            .signatures
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if signatures.is_empty() {
            return Err(ConfigError::NoSignatures(record.name));
        }

        let requires = record
            .requires_pattern
            .as_deref()
            .map(|p| compile_pattern(&record.name, p))
            .transpose()?;

        let mut fields = BTreeMap::new();
        for (field, rule) in record.fields {
            fields.insert(field, compile_rule(&record.name, rule)?);
        }

        Ok(Self {
            name: record.name,
            signatures,
            forced_type: record.forced_type,
            fallback_only: record.fallback_only,
            requires,
            fields,
        })
    }

    /// Whether this entry applies to `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.signatures.iter().any(|s| text.contains(s.as_str()))
            && self.requires.as_ref().is_none_or(|re| re.is_match(text))
    }

    pub fn field_rule(&self, field: FieldName) -> Option<&IssuerFieldRule> {
        self.fields.get(&field)
    }
}

fn compile_pattern(issuer: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Pattern {
        issuer: issuer.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn compile_amount(issuer: &str, value: &str) -> Result<Decimal, ConfigError> {
    parse_amount(value)
        .or_else(|| Decimal::from_str(value.trim()).ok())
        .ok_or_else(|| ConfigError::Amount {
            issuer: issuer.to_string(),
            value: value.to_string(),
        })
}

fn compile_rule(issuer: &str, rule: FieldRuleRecord) -> Result<IssuerFieldRule, ConfigError> {
    match rule {
        FieldRuleRecord::Fixed { fixed } => Ok(IssuerFieldRule {
            strategies: vec![Strategy::Fixed(compile_amount(issuer, &fixed)?)],
            min: None,
            max: None,
        }),
        FieldRuleRecord::Patterns {
            patterns,
            largest_of,
            min,
            max,
        } => {
            let mut strategies = patterns
                .iter()
                .map(|p| compile_pattern(issuer, p).map(Strategy::Pattern))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(p) = largest_of {
                strategies.push(Strategy::LargestMatch(compile_pattern(issuer, &p)?));
            }
            Ok(IssuerFieldRule {
                strategies,
                min: min.map(|v| compile_amount(issuer, &v)).transpose()?,
                max: max.map(|v| compile_amount(issuer, &v)).transpose()?,
            })
        }
    }
}

/// Ordered issuer entries. Earlier entries win.
#[derive(Debug, Clone, Default)]
pub struct IssuerTable {
    entries: Vec<IssuerEntry>,
}

impl IssuerTable {
    /// Table with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a table from parsed records.
    pub fn from_records(records: Vec<IssuerRecord>) -> Result<Self, ConfigError> {
        let entries = records
            .into_iter()
            .map(IssuerEntry::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Parse and compile a JSON table.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let records: Vec<IssuerRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Load a JSON table from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&content)?;
        info!("Loaded {} issuer entries from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn entries(&self) -> &[IssuerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry that short-circuits classification.
    pub fn override_for(&self, text: &str) -> Option<&IssuerEntry> {
        self.entries
            .iter()
            .filter(|e| !e.fallback_only)
            .find(|e| e.matches(text))
    }

    /// First fallback-only entry matching `text`.
    pub fn fallback_for(&self, text: &str) -> Option<&IssuerEntry> {
        self.entries
            .iter()
            .filter(|e| e.fallback_only)
            .find(|e| e.matches(text))
    }

    /// Entry whose field rules apply to a document already classified as
    /// `doc_type`.
    pub fn lookup(&self, text: &str, doc_type: DocumentType) -> Option<&IssuerEntry> {
        let entry = self.override_for(text).or_else(|| {
            self.fallback_for(text)
                .filter(|e| e.forced_type == doc_type)
        });
        if let Some(e) = entry {
            debug!("Issuer override {:?} applies", e.name);
        }
        entry
    }
}
