use crate::error::JWTFuzzerError;
use crate::types::{Finding, JwtToken};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop signal shared between the host and the running strategies.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the fuzz strategies need from the scanner driving them.
#[async_trait]
pub trait ScanHost: Send + Sync {
    /// Sends a fresh copy of the captured message with `token` substituted for
    /// the attacked parameter. Returns whether the target accepted the token.
    async fn send_and_check(&self, token: &str) -> bool;

    /// Records one confirmed finding.
    fn raise_finding(&self, finding: Finding);
}

/// Everything one parameter's attack chain works from. Read only while the
/// chain runs.
pub struct ServerSideAttack<'a> {
    host: &'a dyn ScanHost,
    uri: String,
    parameter: String,
    original_value: String,
    token: JwtToken,
    cancellation: CancellationFlag,
}

impl<'a> ServerSideAttack<'a> {
    pub fn new(
        host: &'a dyn ScanHost,
        uri: impl Into<String>,
        parameter: impl Into<String>,
        original_value: impl Into<String>,
        cancellation: CancellationFlag,
    ) -> Result<Self, JWTFuzzerError> {
        let original_value = original_value.into();
        let token = JwtToken::parse(&original_value)?;
        Ok(ServerSideAttack {
            host,
            uri: uri.into(),
            parameter: parameter.into(),
            original_value,
            token,
            cancellation,
        })
    }

    pub fn host(&self) -> &dyn ScanHost {
        self.host
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    /// The token observed in the captured message.
    pub fn token(&self) -> &JwtToken {
        &self.token
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn is_stop(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHost;

    #[async_trait]
    impl ScanHost for NullHost {
        async fn send_and_check(&self, _token: &str) -> bool {
            false
        }

        fn raise_finding(&self, _finding: Finding) {}
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());
        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_context_parses_original_value() {
        let host = NullHost;
        let value = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJhbGljZSJ9.c2ln";
        let context = ServerSideAttack::new(
            &host,
            "https://example.test/api",
            "Authorization",
            value,
            CancellationFlag::new(),
        )
        .unwrap();

        assert_eq!(context.token().algorithm(), "HS256");
        assert_eq!(context.token().encoded(), value);
        assert_eq!(context.parameter(), "Authorization");
        assert!(!context.is_stop());

        let flag = CancellationFlag::new();
        let malformed = ServerSideAttack::new(&host, "u", "p", "not-a-jwt", flag);
        assert!(malformed.is_err());
    }
}
