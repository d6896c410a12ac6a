// src/types/mod.rs
pub mod output;
pub mod token;
pub mod vulnerability;

pub use output::ScanReport;
pub use token::JwtToken;
pub use vulnerability::{Confidence, Finding, Risk, VulnerabilityType};
