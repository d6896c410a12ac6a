use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub const MESSAGE_PREFIX: &str = "jwt.scanner.vulnerability";

/// Weakness classes a fuzz strategy can confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityType {
    NoneAlgorithm,
    NullByte,
    CustomPayload,
    JwkCustomKey,
    AlgorithmConfusion,
    EmptyTokens,
}

impl VulnerabilityType {
    /// Catalog key fragment of this vulnerability type.
    pub fn key(&self) -> &'static str {
        match self {
            VulnerabilityType::NoneAlgorithm => "nonealgorithm",
            VulnerabilityType::NullByte => "nullbyte",
            VulnerabilityType::CustomPayload => "custompayload",
            VulnerabilityType::JwkCustomKey => "jwkcustomkey",
            VulnerabilityType::AlgorithmConfusion => "algorithmconfusion",
            VulnerabilityType::EmptyTokens => "emptytokens",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageField {
    Name,
    Description,
    References,
    Solution,
}

impl MessageField {
    pub fn suffix(&self) -> &'static str {
        match self {
            MessageField::Name => "name",
            MessageField::Description => "desc",
            MessageField::References => "refs",
            MessageField::Solution => "soln",
        }
    }
}

pub fn message_key(prefix: &str, vulnerability: VulnerabilityType, field: MessageField) -> String {
    format!("{}.{}.{}", prefix, vulnerability.key(), field.suffix())
}

const MESSAGES: &[(&str, &str)] = &[
    ("jwt.scanner.vulnerability.nonealgorithm.name", "JWT None Algorithm Accepted"),
    ("jwt.scanner.vulnerability.nonealgorithm.desc", "The server accepted a JWT whose header declares the 'none' algorithm and which carries no signature. Signature verification is skipped for such tokens, so any claim can be forged."),
    ("jwt.scanner.vulnerability.nonealgorithm.refs", "https://cheatsheetseries.owasp.org/cheatsheets/JSON_Web_Token_for_Java_Cheat_Sheet.html"),
    ("jwt.scanner.vulnerability.nonealgorithm.soln", "Reject tokens declaring the 'none' algorithm in any letter case and pin the accepted algorithms on the server side."),
    ("jwt.scanner.vulnerability.nullbyte.name", "JWT Null Byte Truncation"),
    ("jwt.scanner.vulnerability.nullbyte.desc", "The server accepted a JWT into which a null byte followed by extra content was injected. The validator truncates input at the null byte, so content after it escapes signature verification."),
    ("jwt.scanner.vulnerability.nullbyte.refs", "https://owasp.org/www-community/attacks/Embedding_Null_Code"),
    ("jwt.scanner.vulnerability.nullbyte.soln", "Validate the complete token, reject tokens containing null bytes and never treat a null byte as a string terminator."),
    ("jwt.scanner.vulnerability.custompayload.name", "JWT Custom Field Manipulation Accepted"),
    ("jwt.scanner.vulnerability.custompayload.desc", "The server accepted a JWT in which a configured header or payload field was replaced with a fuzzed value."),
    ("jwt.scanner.vulnerability.custompayload.refs", "https://tools.ietf.org/html/rfc7519"),
    ("jwt.scanner.vulnerability.custompayload.soln", "Verify the signature before trusting any field and validate field values against an allow list."),
    ("jwt.scanner.vulnerability.jwkcustomkey.name", "JWT Embedded JWK Trusted"),
    ("jwt.scanner.vulnerability.jwkcustomkey.desc", "The server accepted a JWT signed with an attacker generated private key whose public key was embedded in the token's 'jwk' header field (CVE-2018-0114 class). Any attacker can mint valid tokens."),
    ("jwt.scanner.vulnerability.jwkcustomkey.refs", "https://nvd.nist.gov/vuln/detail/CVE-2018-0114"),
    ("jwt.scanner.vulnerability.jwkcustomkey.soln", "Never verify a token with a key supplied by the token itself. Resolve verification keys from a trusted, pre-configured key set."),
    ("jwt.scanner.vulnerability.algorithmconfusion.name", "JWT Algorithm Confusion"),
    ("jwt.scanner.vulnerability.algorithmconfusion.desc", "The server accepted a JWT declaring HS256 whose HMAC was computed with the server's RSA public key as secret. The key lookup ignores the declared algorithm, so the public key doubles as a shared secret."),
    ("jwt.scanner.vulnerability.algorithmconfusion.refs", "https://auth0.com/blog/critical-vulnerabilities-in-json-web-token-libraries/"),
    ("jwt.scanner.vulnerability.algorithmconfusion.soln", "Bind each verification key to one algorithm and reject tokens whose declared algorithm does not match it."),
    ("jwt.scanner.vulnerability.emptytokens.name", "JWT Malformed Token Accepted"),
    ("jwt.scanner.vulnerability.emptytokens.desc", "The server accepted a token consisting only of empty segments. The validator fails open on malformed input."),
    ("jwt.scanner.vulnerability.emptytokens.refs", "https://tools.ietf.org/html/rfc7515"),
    ("jwt.scanner.vulnerability.emptytokens.soln", "Reject tokens that do not parse as a well formed JWS and fail closed on every validation error."),
];

/// Looks up alert text by its full catalog key.
pub fn lookup_message(key: &str) -> Option<&'static str> {
    MESSAGES
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, text)| *text)
}

pub fn message(vulnerability: VulnerabilityType, field: MessageField) -> String {
    let key = message_key(MESSAGE_PREFIX, vulnerability, field);
    lookup_message(&key).map(String::from).unwrap_or(key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Risk {
    Info,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
    Confirmed,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::High => write!(f, "HIGH"),
            Risk::Medium => write!(f, "MEDIUM"),
            Risk::Low => write!(f, "LOW"),
            Risk::Info => write!(f, "INFO"),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Confirmed => write!(f, "CONFIRMED"),
            Confidence::High => write!(f, "HIGH"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::Low => write!(f, "LOW"),
        }
    }
}

/// One confirmed weakness, attributed to the attacked URI and parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub vulnerability: VulnerabilityType,
    pub risk: Risk,
    pub confidence: Confidence,
    pub uri: String,
    pub parameter: String,
    pub evidence: String,
    pub name: String,
    pub description: String,
    pub references: String,
    pub solution: String,
    pub detected_at: DateTime<Utc>,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {}\nURI: {} (parameter '{}')\n{}\nEvidence: {}\nSolution: {}\nReferences: {}",
            self.risk,
            self.confidence,
            self.name,
            self.uri,
            self.parameter,
            self.description,
            self.evidence.escape_debug(),
            self.solution,
            self.references
        )
    }
}
