//! Data models for documents, the running tax profile, and configuration.

pub mod config;
pub mod document;
pub mod profile;
