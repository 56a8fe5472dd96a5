//! Tax-document understanding: classification, field extraction, issuer
//! overrides and aggregation into a summary.

pub mod aggregate;
pub mod calculator;
pub mod classifier;
pub mod fields;
pub mod issuers;
pub mod rules;
pub mod submission;

pub use aggregate::AggregationEngine;
pub use classifier::DocumentClassifier;
pub use fields::{FieldExtraction, FieldExtractor};
pub use issuers::{IssuerEntry, IssuerTable};
pub use rules::FieldName;
pub use submission::{SubmissionProcessor, SubmittedFile};
