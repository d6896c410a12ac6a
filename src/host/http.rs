use crate::error::JWTFuzzerError;
use crate::fuzzers::context::ScanHost;
use crate::types::{Finding, JwtToken};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the token travels in each replayed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenPlacement {
    /// Request header, e.g. `Authorization: Bearer <token>`.
    Header { name: String, prefix: String },
    /// Query string parameter.
    Query { name: String },
}

impl TokenPlacement {
    pub fn parameter(&self) -> &str {
        match self {
            TokenPlacement::Header { name, .. } | TokenPlacement::Query { name } => name,
        }
    }

    /// Whether `token` can be carried at all. Header values may not contain
    /// control bytes such as NUL; the query string percent-encodes them.
    pub fn can_carry(&self, token: &str) -> bool {
        match self {
            TokenPlacement::Header { prefix, .. } => {
                HeaderValue::from_str(&format!("{}{}", prefix, token)).is_ok()
            }
            TokenPlacement::Query { .. } => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTarget {
    pub url: String,
    pub method: String,
    pub placement: TokenPlacement,
}

/// Response shape recorded for a known-good or known-bad token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub status: u16,
    pub body: String,
}

/// Decides whether `candidate` looks like the response to a valid token.
///
/// When the two baselines differ in status, the status alone decides.
/// Otherwise the body has to match the accepted baseline and differ from the
/// rejected one.
pub fn response_indicates_acceptance(
    accepted: &Baseline,
    rejected: &Baseline,
    candidate: &Baseline,
) -> bool {
    if accepted.status != rejected.status {
        return candidate.status == accepted.status;
    }
    candidate.body == accepted.body && candidate.body != rejected.body
}

/// Replays fuzzed tokens against a live HTTP endpoint and compares the
/// responses with baselines captured for the original token and for a
/// corrupted copy of it.
pub struct HttpScanHost {
    client: Client,
    target: HttpTarget,
    method: Method,
    accepted: Baseline,
    rejected: Baseline,
    findings: Mutex<Vec<Finding>>,
    undeliverable_reported: AtomicBool,
}

impl HttpScanHost {
    /// Builds the client and records both baselines.
    pub async fn connect(
        target: HttpTarget,
        original_token: &str,
        timeout: Duration,
    ) -> Result<Self, JWTFuzzerError> {
        let method =
            Method::from_bytes(target.method.to_uppercase().as_bytes()).map_err(|e| {
                JWTFuzzerError::Config(format!("Invalid HTTP method '{}': {}", target.method, e))
            })?;
        let client = Client::builder().timeout(timeout).build()?;

        let accepted = fetch(request(&client, &method, &target, original_token)).await?;
        let corrupted = corrupt_signature(original_token)?;
        let rejected = fetch(request(&client, &method, &target, &corrupted)).await?;
        debug!(
            "Baselines for {}: accepted={} rejected={}",
            target.url, accepted.status, rejected.status
        );
        if accepted == rejected {
            warn!(
                "Original and corrupted tokens get identical responses, \
                 acceptance cannot be observed"
            );
        }

        Ok(HttpScanHost {
            client,
            target,
            method,
            accepted,
            rejected,
            findings: Mutex::new(Vec::new()),
            undeliverable_reported: AtomicBool::new(false),
        })
    }

    pub fn target(&self) -> &HttpTarget {
        &self.target
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.lock_findings().clone()
    }

    fn lock_findings(&self) -> MutexGuard<'_, Vec<Finding>> {
        self.findings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ScanHost for HttpScanHost {
    async fn send_and_check(&self, token: &str) -> bool {
        if !self.target.placement.can_carry(token) {
            if !self.undeliverable_reported.swap(true, Ordering::Relaxed) {
                info!(
                    "Fuzzed token not deliverable in header placement '{}', skipped untested; \
                     use --query to cover null byte attacks",
                    self.target.placement.parameter()
                );
            } else {
                debug!("Fuzzed token not deliverable in header placement, skipped");
            }
            return false;
        }
        match fetch(request(&self.client, &self.method, &self.target, token)).await {
            Ok(response) => {
                response_indicates_acceptance(&self.accepted, &self.rejected, &response)
            }
            Err(e) => {
                warn!("Request to {} failed: {}", self.target.url, e);
                false
            }
        }
    }

    fn raise_finding(&self, finding: Finding) {
        self.lock_findings().push(finding);
    }
}

fn request(client: &Client, method: &Method, target: &HttpTarget, token: &str) -> RequestBuilder {
    let builder = client.request(method.clone(), &target.url);
    match &target.placement {
        TokenPlacement::Header { name, prefix } => {
            builder.header(name.as_str(), format!("{}{}", prefix, token))
        }
        TokenPlacement::Query { name } => builder.query(&[(name.as_str(), token)]),
    }
}

async fn fetch(builder: RequestBuilder) -> Result<Baseline, JWTFuzzerError> {
    let response = builder.send().await?;
    let status: StatusCode = response.status();
    let body = response.text().await?;
    Ok(Baseline {
        status: status.as_u16(),
        body,
    })
}

/// The original token with every signature bit flipped.
fn corrupt_signature(token: &str) -> Result<String, JWTFuzzerError> {
    let parsed = JwtToken::parse(token)?;
    let signature: Vec<u8> = if parsed.signature().is_empty() {
        vec![0xff; 32]
    } else {
        parsed.signature().iter().map(|b| !b).collect()
    };
    Ok(parsed.with_signature(signature).encoded())
}
