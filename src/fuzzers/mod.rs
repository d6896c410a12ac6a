//! JWT attack strategies.
//!
//! Strategies run in a fixed order per parameter and the chain stops at the
//! first strategy that confirms a vulnerability. Inside a strategy, techniques
//! run in order and the first success wins as well.

pub mod context;
mod custom_field;
pub mod header;
pub mod misc;
pub mod payload;
pub mod signature;

use crate::config::FuzzerConfig;
use crate::error::JWTFuzzerError;
use crate::jwt_core::trust_store::TrustStore;
use crate::types::vulnerability::{message, MessageField};
use crate::types::{Confidence, Finding, Risk, VulnerabilityType};
use async_trait::async_trait;
use chrono::Utc;
use context::ServerSideAttack;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use header::HeaderFuzzer;
pub use misc::MiscFuzzer;
pub use payload::PayloadFuzzer;
pub use signature::SignatureFuzzer;

#[async_trait]
pub trait JwtFuzzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs this strategy's techniques against one parameter. Returns `true`
    /// iff a technique confirmed a vulnerability, in which case exactly one
    /// finding has been raised.
    async fn fuzz_jwt_tokens(&self, context: &ServerSideAttack<'_>) -> bool;
}

/// Sends `fuzzed_token` through the host and reports whether it was accepted.
/// Nothing is sent once the scan is stopped.
pub async fn execute_attack(fuzzed_token: &str, context: &ServerSideAttack<'_>) -> bool {
    if context.is_stop() {
        return false;
    }
    debug!("Sending fuzzed token for parameter '{}'", context.parameter());
    context.host().send_and_check(fuzzed_token).await
}

/// Reports one finding against the context's URI and parameter.
pub fn raise_alert(
    vulnerability: VulnerabilityType,
    risk: Risk,
    confidence: Confidence,
    evidence: &str,
    context: &ServerSideAttack<'_>,
) {
    let finding = Finding {
        vulnerability,
        risk,
        confidence,
        uri: context.uri().to_string(),
        parameter: context.parameter().to_string(),
        evidence: evidence.to_string(),
        name: message(vulnerability, MessageField::Name),
        description: message(vulnerability, MessageField::Description),
        references: message(vulnerability, MessageField::References),
        solution: message(vulnerability, MessageField::Solution),
        detected_at: Utc::now(),
    };
    info!(
        "{} confirmed on {} (parameter '{}')",
        finding.name,
        finding.uri,
        finding.parameter
    );
    context.host().raise_finding(finding);
}

/// Collapses a technique result: errors are logged and count as "not
/// vulnerable" so the next technique still runs.
pub(crate) fn technique_outcome(
    fuzzer: &str,
    technique: &str,
    outcome: Result<bool, JWTFuzzerError>,
) -> bool {
    match outcome {
        Ok(found) => found,
        Err(e) => {
            warn!("{} technique '{}' skipped: {}", fuzzer, technique, e);
            false
        }
    }
}

/// Strategies in the order they are tried for every parameter.
pub fn default_fuzzers(
    config: &FuzzerConfig,
    trust_store: Option<Arc<TrustStore>>,
    discovered_secret: Option<String>,
) -> Vec<Box<dyn JwtFuzzer>> {
    vec![
        Box::new(
            HeaderFuzzer::new(config.header_fuzzers())
                .with_discovered_secret(discovered_secret.clone()),
        ),
        Box::new(
            PayloadFuzzer::new(config.payload_fuzzers()).with_discovered_secret(discovered_secret),
        ),
        Box::new(SignatureFuzzer::new(trust_store)),
        Box::new(MiscFuzzer::new()),
    ]
}

/// Runs `fuzzers` in order, stopping after the first that succeeds. Returns
/// the name of the successful strategy.
pub async fn fuzz_parameter(
    fuzzers: &[Box<dyn JwtFuzzer>],
    context: &ServerSideAttack<'_>,
) -> Option<&'static str> {
    for fuzzer in fuzzers {
        if context.is_stop() {
            debug!("Scan stopped before {}", fuzzer.name());
            return None;
        }
        if fuzzer.fuzz_jwt_tokens(context).await {
            return Some(fuzzer.name());
        }
    }
    None
}
