use thiserror::Error;

#[derive(Error, Debug)]
pub enum JWTFuzzerError {
    #[error("Invalid JWT format")]
    InvalidFormat,
    #[error("Invalid base64url segment: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid JSON segment: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Segment is not a JSON object: {0}")]
    NotAnObject(&'static str),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
    #[error("Trust store error: {0}")]
    TrustStore(String),
    #[error("Payload source error: {0}")]
    PayloadSource(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Async task failed: {0}")]
    AsyncTaskError(#[from] tokio::task::JoinError),
}

impl From<rsa::Error> for JWTFuzzerError {
    fn from(err: rsa::Error) -> Self {
        JWTFuzzerError::Crypto(err.to_string())
    }
}

impl From<signature::Error> for JWTFuzzerError {
    fn from(err: signature::Error) -> Self {
        JWTFuzzerError::Crypto(err.to_string())
    }
}
