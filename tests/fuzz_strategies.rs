use async_trait::async_trait;
use jsonwebtoken::crypto::verify;
use jsonwebtoken::{Algorithm, DecodingKey};
use rusty_jwt_fuzz::config::FuzzerConfig;
use rusty_jwt_fuzz::constants::EYE_CATCHER;
use rusty_jwt_fuzz::fuzzers::context::{CancellationFlag, ScanHost, ServerSideAttack};
use rusty_jwt_fuzz::fuzzers::{
    default_fuzzers, fuzz_parameter, HeaderFuzzer, JwtFuzzer, MiscFuzzer, PayloadFuzzer,
    SignatureFuzzer,
};
use rusty_jwt_fuzz::jwt_core::trust_store::TrustStore;
use rusty_jwt_fuzz::jwt_core::utils::{base64_url_encode, hmac_sign, JwsAlgorithm};
use rusty_jwt_fuzz::types::{Finding, JwtToken, VulnerabilityType};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type Oracle = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Records every token sent and every finding raised; acceptance is decided
/// by the oracle.
struct FakeHost {
    oracle: Oracle,
    sent: Mutex<Vec<String>>,
    findings: Mutex<Vec<Finding>>,
}

impl FakeHost {
    fn new(oracle: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        FakeHost {
            oracle: Box::new(oracle),
            sent: Mutex::new(Vec::new()),
            findings: Mutex::new(Vec::new()),
        }
    }

    fn rejecting() -> Self {
        Self::new(|_| false)
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn findings(&self) -> Vec<Finding> {
        self.findings.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanHost for FakeHost {
    async fn send_and_check(&self, token: &str) -> bool {
        self.sent.lock().unwrap().push(token.to_string());
        (self.oracle)(token)
    }

    fn raise_finding(&self, finding: Finding) {
        self.findings.lock().unwrap().push(finding);
    }
}

fn compact(header: &str, payload: &str, signature: &[u8]) -> String {
    format!(
        "{}.{}.{}",
        base64_url_encode(header.as_bytes()),
        base64_url_encode(payload.as_bytes()),
        base64_url_encode(signature)
    )
}

fn hmac_token(payload: &str, secret: &str) -> String {
    let unsigned = JwtToken::new(r#"{"alg":"HS256","typ":"JWT"}"#, payload, Vec::new(), "HS256");
    let signature = hmac_sign(
        JwsAlgorithm::HS256,
        unsigned.encoded_without_signature().as_bytes(),
        secret.as_bytes(),
    )
    .unwrap();
    unsigned.with_signature(signature).encoded()
}

fn test_data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn context<'a>(host: &'a FakeHost, token: &str) -> ServerSideAttack<'a> {
    ServerSideAttack::new(
        host,
        "https://api.example.test/profile",
        "Authorization",
        token,
        CancellationFlag::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_none_algorithm_stops_at_first_accepted_variant() {
    let counter = Arc::new(Mutex::new(0usize));
    let seen = counter.clone();
    let host = FakeHost::new(move |_| {
        let mut count = seen.lock().unwrap();
        *count += 1;
        *count == 3
    });
    let token = hmac_token(r#"{"sub":"alice"}"#, "secret");
    let ctx = context(&host, &token);

    assert!(HeaderFuzzer::new(Vec::new()).fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    assert_eq!(sent.len(), 3);
    let accepted = JwtToken::parse(&sent[2]).unwrap();
    assert_eq!(accepted.header(), r#"{"alg":"none"}"#);
    assert!(accepted.signature().is_empty());
    assert!(sent[2].ends_with('.'));
    assert_eq!(accepted.payload(), r#"{"sub":"alice"}"#);

    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::NoneAlgorithm);
    assert_eq!(findings[0].evidence, sent[2]);
    assert_eq!(findings[0].parameter, "Authorization");
}

#[tokio::test]
async fn test_none_algorithm_tries_every_combination() {
    let host = FakeHost::rejecting();
    let token = hmac_token(r#"{"sub":"alice"}"#, "secret");
    let ctx = context(&host, &token);

    assert!(!HeaderFuzzer::new(Vec::new()).fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    assert_eq!(sent.len(), 12);
    let algorithms: Vec<String> = sent
        .iter()
        .map(|t| JwtToken::parse(t).unwrap().algorithm().to_string())
        .collect();
    assert_eq!(&algorithms[..3], &["none", "none", "none"]);
    assert_eq!(&algorithms[9..], &["nOnE", "nOnE", "nOnE"]);
    assert!(host.findings().is_empty());
    // The captured token is never altered.
    assert_eq!(ctx.token().encoded(), token);
}

#[tokio::test]
async fn test_header_recon_records_key_references() {
    let host = FakeHost::rejecting();
    let token = compact(
        r#"{"alg":"RS256","kid":"signing-2024","jku":"https://keys.example.test/jwks.json"}"#,
        r#"{"sub":"alice"}"#,
        &[9u8; 32],
    );
    let ctx = context(&host, &token);
    let fuzzer = HeaderFuzzer::new(Vec::new());
    assert!(fuzzer.key_references().is_none());

    assert!(!fuzzer.fuzz_jwt_tokens(&ctx).await);

    // Recon adds no request beyond the twelve `none` attempts.
    assert_eq!(host.sent().len(), 12);
    let references = fuzzer.key_references().unwrap();
    assert_eq!(references.kid.as_deref(), Some("signing-2024"));
    assert_eq!(
        references.jku.as_deref(),
        Some("https://keys.example.test/jwks.json")
    );
}

#[tokio::test]
async fn test_null_byte_field_fuzzing_targets_one_claim_at_a_time() {
    let marker = format!("user\u{0}{}", EYE_CATCHER);
    let expected = marker.clone();
    let host = FakeHost::new(move |candidate| {
        JwtToken::parse(candidate)
            .and_then(|t| t.payload_json())
            .map(|claims| claims.get("role").and_then(Value::as_str) == Some(expected.as_str()))
            .unwrap_or(false)
    });
    let token = hmac_token(r#"{"sub":"alice","role":"user"}"#, "secret");
    let original = JwtToken::parse(&token).unwrap();
    let ctx = context(&host, &token);

    assert!(PayloadFuzzer::new(Vec::new()).fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    // Segment attack, then `sub`, then `role`.
    assert_eq!(sent.len(), 3);
    assert!(sent[0].contains('\0'));

    let sub_attempt = JwtToken::parse(&sent[1]).unwrap().payload_json().unwrap();
    assert_eq!(sub_attempt["sub"], Value::String(format!("alice\u{0}{}", EYE_CATCHER)));
    assert_eq!(sub_attempt["role"], "user");

    let role_attempt = JwtToken::parse(&sent[2]).unwrap();
    let claims = role_attempt.payload_json().unwrap();
    assert_eq!(claims["sub"], "alice");
    assert_eq!(claims["role"], Value::String(marker));
    assert_eq!(role_attempt.signature(), original.signature());

    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::NullByte);
}

#[tokio::test]
async fn test_algorithm_confusion_uses_each_trusted_key() {
    let trust_store = Arc::new(TrustStore::load(test_data("trust_store.pem")).unwrap());
    let beta_key = std::fs::read(test_data("beta_spki.der")).unwrap();

    let oracle_key = beta_key.clone();
    let host = FakeHost::new(move |candidate| {
        let Ok(token) = JwtToken::parse(candidate) else {
            return false;
        };
        if token.algorithm() != "HS256" {
            return false;
        }
        let expected = hmac_sign(
            JwsAlgorithm::HS256,
            token.encoded_without_signature().as_bytes(),
            &oracle_key,
        )
        .unwrap();
        token.signature() == expected.as_slice()
    });
    let token = compact(
        r#"{"alg":"RS256","typ":"JWT"}"#,
        r#"{"sub":"alice"}"#,
        &[7u8; 256],
    );
    let ctx = context(&host, &token);

    assert!(SignatureFuzzer::new(Some(trust_store)).fuzz_jwt_tokens(&ctx).await);

    // Three trusted certificates; the second one is accepted and the third is never tried.
    let confusion_attempts: Vec<JwtToken> = host
        .sent()
        .iter()
        .filter_map(|t| JwtToken::parse(t).ok())
        .filter(|t| t.algorithm() == "HS256")
        .collect();
    assert_eq!(confusion_attempts.len(), 2);
    assert_eq!(confusion_attempts[1].header(), r#"{"alg":"HS256","typ":"JWT"}"#);

    let alpha_key = std::fs::read(test_data("alpha_spki.der")).unwrap();
    let gamma_key = std::fs::read(test_data("gamma_spki.der")).unwrap();
    let signed_with = |attempt: &JwtToken, key: &[u8]| {
        let expected = hmac_sign(
            JwsAlgorithm::HS256,
            attempt.encoded_without_signature().as_bytes(),
            key,
        )
        .unwrap();
        attempt.signature() == expected.as_slice()
    };
    assert!(signed_with(&confusion_attempts[0], &alpha_key));
    assert!(signed_with(&confusion_attempts[1], &beta_key));
    assert!(!confusion_attempts
        .iter()
        .any(|attempt| signed_with(attempt, &gamma_key)));

    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::AlgorithmConfusion);
}

#[tokio::test]
async fn test_algorithm_confusion_needs_rsa_token() {
    let trust_store = Arc::new(TrustStore::load(test_data("trust_store.pem")).unwrap());
    let host = FakeHost::rejecting();
    let token = hmac_token(r#"{"sub":"alice"}"#, "secret");
    let ctx = context(&host, &token);

    assert!(!SignatureFuzzer::new(Some(trust_store)).fuzz_jwt_tokens(&ctx).await);

    // HMAC tokens get no key injection and no confusion, only the two null byte attempts.
    assert_eq!(host.sent().len(), 2);
}

#[tokio::test]
async fn test_jwk_injection_signs_with_embedded_key() {
    let host = FakeHost::new(|candidate| {
        let Ok(token) = JwtToken::parse(candidate) else {
            return false;
        };
        let Ok(header) = token.header_json() else {
            return false;
        };
        let Some(jwk) = header.get("jwk") else {
            return false;
        };
        let (Some(x), Some(y)) = (jwk["x"].as_str(), jwk["y"].as_str()) else {
            return false;
        };
        let key = DecodingKey::from_ec_components(x, y).unwrap();
        verify(
            &base64_url_encode(token.signature()),
            token.encoded_without_signature().as_bytes(),
            &key,
            Algorithm::ES256,
        )
        .unwrap_or(false)
    });
    let token = compact(r#"{"alg":"ES256"}"#, r#"{"sub":"alice"}"#, &[1u8; 64]);
    let ctx = context(&host, &token);

    assert!(SignatureFuzzer::new(None).fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    assert_eq!(sent.len(), 1);
    let forged = JwtToken::parse(&sent[0]).unwrap();
    let header = forged.header_json().unwrap();
    assert_eq!(header["alg"], "ES256");
    assert_eq!(header["jwk"]["kty"], "EC");
    assert_eq!(header["jwk"]["crv"], "P-256");
    assert_eq!(forged.payload(), r#"{"sub":"alice"}"#);

    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::JwkCustomKey);
}

#[tokio::test]
async fn test_jwk_injection_covers_es512() {
    let host = FakeHost::rejecting();
    let token = compact(r#"{"alg":"ES512"}"#, r#"{"sub":"alice"}"#, &[1u8; 132]);
    let ctx = context(&host, &token);

    assert!(!SignatureFuzzer::new(None).fuzz_jwt_tokens(&ctx).await);

    // One P-521 forgery, then the two null byte attempts.
    let sent = host.sent();
    assert_eq!(sent.len(), 3);
    let forged = JwtToken::parse(&sent[0]).unwrap();
    let header = forged.header_json().unwrap();
    assert_eq!(header["jwk"]["crv"], "P-521");
    assert_eq!(forged.signature().len(), 132);
}

#[tokio::test]
async fn test_empty_tokens_are_tried_in_order() {
    let host = FakeHost::new(|candidate| candidate == ".....");
    let token = hmac_token(r#"{"sub":"alice"}"#, "secret");
    let ctx = context(&host, &token);

    assert!(MiscFuzzer::new().fuzz_jwt_tokens(&ctx).await);

    assert_eq!(host.sent(), vec!["...".to_string(), ".....".to_string()]);
    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::EmptyTokens);
    assert_eq!(findings[0].evidence, ".....");
}

#[tokio::test]
async fn test_cancelled_scan_sends_nothing() {
    let host = FakeHost::new(|_| true);
    let token = compact(
        r#"{"alg":"RS256"}"#,
        r#"{"sub":"alice","role":"user"}"#,
        &[3u8; 16],
    );
    let cancellation = CancellationFlag::new();
    cancellation.cancel();
    let ctx = ServerSideAttack::new(
        &host,
        "https://api.example.test",
        "token",
        token.as_str(),
        cancellation,
    )
    .unwrap();
    let trust_store = Arc::new(TrustStore::load(test_data("trust_store.pem")).unwrap());

    let fuzzers = default_fuzzers(&FuzzerConfig::default(), Some(trust_store), None);
    for fuzzer in &fuzzers {
        assert!(!fuzzer.fuzz_jwt_tokens(&ctx).await, "{} reported success", fuzzer.name());
    }
    assert_eq!(fuzz_parameter(&fuzzers, &ctx).await, None);

    assert!(host.sent().is_empty());
    assert!(host.findings().is_empty());
}

#[tokio::test]
async fn test_chain_stops_after_first_successful_strategy() {
    // Accepts only the payload segment null byte attempt.
    let host = FakeHost::new(|candidate| candidate.contains(&format!("\u{0}{}.", EYE_CATCHER)));
    let token = hmac_token(r#"{"sub":"alice"}"#, "secret");
    let ctx = context(&host, &token);

    let fuzzers = default_fuzzers(&FuzzerConfig::default(), None, None);
    assert_eq!(fuzz_parameter(&fuzzers, &ctx).await, Some("PayloadFuzzer"));

    // Twelve `none` attempts, then the accepted payload attempt.
    assert_eq!(host.sent().len(), 13);
    assert!(!host.sent().iter().any(|t| t.starts_with("...")));
    assert_eq!(host.findings().len(), 1);
}

#[tokio::test]
async fn test_custom_payload_field_is_resigned_with_configured_secret() {
    let config = FuzzerConfig::from_toml_str(
        r#"
        [[custom_field_fuzzers]]
        field_name = "role"
        signature_required = true
        signing_secret = "correct-horse"
        payloads = { values = ["admin", "root"] }
        "#,
    )
    .unwrap();
    let key = DecodingKey::from_secret(b"correct-horse");
    let host = FakeHost::new(move |candidate| {
        let Ok(token) = JwtToken::parse(candidate) else {
            return false;
        };
        let signed = verify(
            &base64_url_encode(token.signature()),
            token.encoded_without_signature().as_bytes(),
            &key,
            Algorithm::HS256,
        )
        .unwrap_or(false);
        let is_root = token
            .payload_json()
            .map(|claims| claims.get("role").and_then(Value::as_str) == Some("root"))
            .unwrap_or(false);
        signed && is_root
    });
    let token = hmac_token(r#"{"sub":"alice","role":"user"}"#, "correct-horse");
    let ctx = context(&host, &token);

    assert!(PayloadFuzzer::new(config.payload_fuzzers()).fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    // Segment attempt, two field attempts, then "admin" and "root".
    assert_eq!(sent.len(), 5);
    let admin = JwtToken::parse(&sent[3]).unwrap().payload_json().unwrap();
    assert_eq!(admin["role"], "admin");
    assert_eq!(admin["sub"], "alice");

    let findings = host.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vulnerability, VulnerabilityType::CustomPayload);
    assert_eq!(findings[0].evidence, sent[4]);
}

#[tokio::test]
async fn test_custom_field_without_usable_secret_is_skipped() {
    let config = FuzzerConfig::from_toml_str(
        r#"
        [[custom_field_fuzzers]]
        field_name = "role"
        signature_required = true
        payloads = { values = ["admin"] }
        "#,
    )
    .unwrap();
    let host = FakeHost::rejecting();
    let token = compact(r#"{"alg":"RS256"}"#, r#"{"role":"user"}"#, &[5u8; 32]);
    let ctx = context(&host, &token);

    assert!(!PayloadFuzzer::new(config.payload_fuzzers()).fuzz_jwt_tokens(&ctx).await);

    // Only the two null byte attempts; no custom value is sent unsigned.
    assert_eq!(host.sent().len(), 2);
}

#[tokio::test]
async fn test_custom_header_field_uses_discovered_secret() {
    let config = FuzzerConfig::from_toml_str(
        r#"
        [[custom_field_fuzzers]]
        field_name = "kid"
        header_field = true
        signature_required = true
        payloads = { values = ["../../dev/null"] }
        "#,
    )
    .unwrap();
    let host = FakeHost::new(|candidate| {
        JwtToken::parse(candidate)
            .and_then(|t| t.header_json())
            .map(|header| header.get("kid").and_then(Value::as_str) == Some("../../dev/null"))
            .unwrap_or(false)
    });
    let unsigned = JwtToken::new(
        r#"{"alg":"HS256","kid":"k1"}"#,
        r#"{"sub":"alice"}"#,
        Vec::new(),
        "HS256",
    );
    let signature = hmac_sign(
        JwsAlgorithm::HS256,
        unsigned.encoded_without_signature().as_bytes(),
        b"secret",
    )
    .unwrap();
    let token = unsigned.with_signature(signature).encoded();
    let ctx = context(&host, &token);

    let fuzzer = HeaderFuzzer::new(config.header_fuzzers())
        .with_discovered_secret(Some("secret".to_string()));
    assert!(fuzzer.fuzz_jwt_tokens(&ctx).await);

    let sent = host.sent();
    assert_eq!(sent.len(), 13);
    let forged = JwtToken::parse(&sent[12]).unwrap();
    assert_eq!(forged.header(), r#"{"alg":"HS256","kid":"../../dev/null"}"#);
    let expected = hmac_sign(
        JwsAlgorithm::HS256,
        forged.encoded_without_signature().as_bytes(),
        b"secret",
    )
    .unwrap();
    assert_eq!(forged.signature(), expected.as_slice());
}

#[test]
fn test_trust_store_loads_pem_bundle() {
    let store = TrustStore::load(test_data("trust_store.pem")).unwrap();
    let aliases: Vec<&str> = store.certificates().iter().map(|c| c.alias()).collect();
    assert_eq!(aliases, vec!["alpha.test", "beta.test", "gamma.test"]);

    for (certificate, fixture) in store
        .certificates()
        .iter()
        .zip(["alpha_spki.der", "beta_spki.der", "gamma_spki.der"])
    {
        let expected = std::fs::read(test_data(fixture)).unwrap();
        assert_eq!(certificate.public_key_der(), expected.as_slice());
    }
}
