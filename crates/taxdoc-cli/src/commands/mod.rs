pub mod config;
pub mod estimate;
pub mod inspect;
pub mod issuers;
mod setup;
