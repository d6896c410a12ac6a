use crate::constants::COMMON_SECRETS;
use crate::error::JWTFuzzerError;
use crate::jwt_core::utils::{base64_url_encode, AlgorithmFamily};
use crate::types::JwtToken;
use jsonwebtoken::crypto::verify;
use jsonwebtoken::DecodingKey;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Offline dictionary search for the shared secret of an HMAC token.
pub struct SecretCracker {
    candidates: Vec<String>,
    max_key_length: usize,
}

impl SecretCracker {
    pub fn new(max_key_length: usize) -> Self {
        SecretCracker {
            candidates: COMMON_SECRETS.lines().map(String::from).collect(),
            max_key_length,
        }
    }

    /// Adds every non-empty line of a wordlist file to the candidates.
    pub fn with_wordlist<P: AsRef<Path>>(mut self, path: P) -> Result<Self, JWTFuzzerError> {
        let content = std::fs::read_to_string(path)?;
        self.candidates.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
        Ok(self)
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn crack(&self, token: &JwtToken) -> Result<Option<String>, JWTFuzzerError> {
        let algorithm = token
            .jws_algorithm()
            .filter(|alg| alg.family() == AlgorithmFamily::Hmac)
            .ok_or_else(|| JWTFuzzerError::UnsupportedAlgorithm(token.algorithm().to_string()))?;
        let verification_algorithm = algorithm
            .to_jsonwebtoken()
            .ok_or_else(|| JWTFuzzerError::UnsupportedAlgorithm(algorithm.to_string()))?;

        let signature = base64_url_encode(token.signature());
        let message = token.encoded_without_signature();
        debug!(
            "Trying {} candidate secrets for {}",
            self.candidates.len(),
            algorithm
        );

        let found = self
            .candidates
            .par_iter()
            .filter(|secret| secret.chars().count() <= self.max_key_length)
            .find_map_any(|secret| {
                let key = DecodingKey::from_secret(secret.as_bytes());
                match verify(&signature, message.as_bytes(), &key, verification_algorithm) {
                    Ok(true) => Some(secret.clone()),
                    _ => None,
                }
            });

        if let Some(secret) = &found {
            info!("Recovered HMAC secret for {} token", algorithm);
            debug!("Recovered secret: {}", secret);
        }
        Ok(found)
    }
}
