use crate::fuzzers::header::KeyReferences;
use crate::types::Finding;
use serde::Serialize;

/// Outcome of scanning one parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: String,
    pub parameter: String,
    pub algorithm: String,
    pub discovered_secret: Option<String>,
    pub successful_fuzzer: Option<String>,
    /// `kid`/`jku` header fields, kept for key injection follow-ups.
    pub key_references: KeyReferences,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn is_vulnerable(&self) -> bool {
        !self.findings.is_empty()
    }
}
