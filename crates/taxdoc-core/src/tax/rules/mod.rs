//! Rule-based building blocks for tax-form field extraction.

pub mod amounts;
pub mod patterns;
pub mod strategies;

pub use amounts::{format_amount, format_percent, parse_amount, round_cents};
pub use strategies::{
    FieldCandidate, FieldName, FieldSpec, FieldTarget, Plausibility, Rejection, Strategy,
    catalogue, default_strategies, plausibility,
};
