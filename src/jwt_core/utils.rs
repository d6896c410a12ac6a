//! Codec and signing primitives shared by the fuzz strategies.

use crate::error::JWTFuzzerError;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;

/// Unpadded URL-safe base64, as used for every JWS segment.
pub fn base64_url_encode(bytes: &[u8]) -> String {
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

pub fn base64_url_decode(segment: &str) -> Result<Vec<u8>, JWTFuzzerError> {
    Ok(base64::decode_config(segment, base64::URL_SAFE_NO_PAD)?)
}

/// Parses a header or payload segment into a JSON object.
pub fn parse_json_object(
    json: &str,
    segment: &'static str,
) -> Result<Map<String, Value>, JWTFuzzerError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(JWTFuzzerError::NotAnObject(segment)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmFamily {
    Hmac,
    Rsa,
    Ec,
    Okp,
}

/// JWS signing algorithms this crate knows how to forge for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwsAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    ES256,
    ES384,
    ES512,
    EdDSA,
}

impl JwsAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        let algorithm = match name {
            "HS256" => JwsAlgorithm::HS256,
            "HS384" => JwsAlgorithm::HS384,
            "HS512" => JwsAlgorithm::HS512,
            "RS256" => JwsAlgorithm::RS256,
            "RS384" => JwsAlgorithm::RS384,
            "RS512" => JwsAlgorithm::RS512,
            "PS256" => JwsAlgorithm::PS256,
            "PS384" => JwsAlgorithm::PS384,
            "PS512" => JwsAlgorithm::PS512,
            "ES256" => JwsAlgorithm::ES256,
            "ES384" => JwsAlgorithm::ES384,
            "ES512" => JwsAlgorithm::ES512,
            "EdDSA" => JwsAlgorithm::EdDSA,
            _ => return None,
        };
        Some(algorithm)
    }

    pub fn name(&self) -> &'static str {
        match self {
            JwsAlgorithm::HS256 => "HS256",
            JwsAlgorithm::HS384 => "HS384",
            JwsAlgorithm::HS512 => "HS512",
            JwsAlgorithm::RS256 => "RS256",
            JwsAlgorithm::RS384 => "RS384",
            JwsAlgorithm::RS512 => "RS512",
            JwsAlgorithm::PS256 => "PS256",
            JwsAlgorithm::PS384 => "PS384",
            JwsAlgorithm::PS512 => "PS512",
            JwsAlgorithm::ES256 => "ES256",
            JwsAlgorithm::ES384 => "ES384",
            JwsAlgorithm::ES512 => "ES512",
            JwsAlgorithm::EdDSA => "EdDSA",
        }
    }

    pub fn family(&self) -> AlgorithmFamily {
        match self {
            JwsAlgorithm::HS256 | JwsAlgorithm::HS384 | JwsAlgorithm::HS512 => {
                AlgorithmFamily::Hmac
            }
            JwsAlgorithm::RS256
            | JwsAlgorithm::RS384
            | JwsAlgorithm::RS512
            | JwsAlgorithm::PS256
            | JwsAlgorithm::PS384
            | JwsAlgorithm::PS512 => AlgorithmFamily::Rsa,
            JwsAlgorithm::ES256 | JwsAlgorithm::ES384 | JwsAlgorithm::ES512 => AlgorithmFamily::Ec,
            JwsAlgorithm::EdDSA => AlgorithmFamily::Okp,
        }
    }

    /// Maps to the `jsonwebtoken` algorithm used for offline verification.
    pub fn to_jsonwebtoken(&self) -> Option<jsonwebtoken::Algorithm> {
        use jsonwebtoken::Algorithm;
        let algorithm = match self {
            JwsAlgorithm::HS256 => Algorithm::HS256,
            JwsAlgorithm::HS384 => Algorithm::HS384,
            JwsAlgorithm::HS512 => Algorithm::HS512,
            JwsAlgorithm::RS256 => Algorithm::RS256,
            JwsAlgorithm::RS384 => Algorithm::RS384,
            JwsAlgorithm::RS512 => Algorithm::RS512,
            JwsAlgorithm::PS256 => Algorithm::PS256,
            JwsAlgorithm::PS384 => Algorithm::PS384,
            JwsAlgorithm::PS512 => Algorithm::PS512,
            JwsAlgorithm::ES256 => Algorithm::ES256,
            JwsAlgorithm::ES384 => Algorithm::ES384,
            JwsAlgorithm::EdDSA => Algorithm::EdDSA,
            JwsAlgorithm::ES512 => return None,
        };
        Some(algorithm)
    }
}

impl fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Computes an HMAC over `signing_input` with arbitrary secret bytes.
///
/// Any secret is accepted, including the DER encoding of a public key: the
/// algorithm confusion attack depends on exactly that misuse.
pub fn hmac_sign(
    algorithm: JwsAlgorithm,
    signing_input: &[u8],
    secret: &[u8],
) -> Result<Vec<u8>, JWTFuzzerError> {
    match algorithm {
        JwsAlgorithm::HS256 => compute_mac::<Hmac<Sha256>>(secret, signing_input),
        JwsAlgorithm::HS384 => compute_mac::<Hmac<Sha384>>(secret, signing_input),
        JwsAlgorithm::HS512 => compute_mac::<Hmac<Sha512>>(secret, signing_input),
        other => Err(JWTFuzzerError::UnsupportedAlgorithm(format!(
            "{} is not an HMAC algorithm",
            other
        ))),
    }
}

fn compute_mac<M>(secret: &[u8], input: &[u8]) -> Result<Vec<u8>, JWTFuzzerError>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(secret)
        .map_err(|e| JWTFuzzerError::Crypto(e.to_string()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}
