use super::context::ServerSideAttack;
use super::custom_field::fuzz_custom_fields;
use super::{execute_attack, raise_alert, technique_outcome, JwtFuzzer};
use crate::config::CustomFieldFuzzer;
use crate::constants::{
    ALGORITHM_PLACEHOLDER, HEADER_FORMAT_VARIANTS, HEADER_JWK_SET_URL, HEADER_KEY_ID,
    NONE_ALGORITHM_VARIANTS,
};
use crate::error::JWTFuzzerError;
use crate::types::{Confidence, JwtToken, Risk, VulnerabilityType};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::info;

const NAME: &str = "HeaderFuzzer";

/// Key references carried by a token header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyReferences {
    pub kid: Option<String>,
    pub jku: Option<String>,
}

impl KeyReferences {
    pub fn from_token(token: &JwtToken) -> Result<Self, JWTFuzzerError> {
        let header = token.header_json()?;
        let field = |name: &str| {
            header.get(name).map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };
        Ok(KeyReferences {
            kid: field(HEADER_KEY_ID),
            jku: field(HEADER_JWK_SET_URL),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.kid.is_none() && self.jku.is_none()
    }
}

/// Attacks on the JOSE header: `none` algorithm, custom header fields.
pub struct HeaderFuzzer {
    custom_fuzzers: Vec<CustomFieldFuzzer>,
    discovered_secret: Option<String>,
    key_references: Mutex<Option<KeyReferences>>,
}

impl HeaderFuzzer {
    pub fn new(custom_fuzzers: Vec<CustomFieldFuzzer>) -> Self {
        HeaderFuzzer {
            custom_fuzzers,
            discovered_secret: None,
            key_references: Mutex::new(None),
        }
    }

    pub fn with_discovered_secret(mut self, secret: Option<String>) -> Self {
        self.discovered_secret = secret;
        self
    }

    async fn none_algorithm_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let original = context.token();
        for variant in NONE_ALGORITHM_VARIANTS {
            for format in HEADER_FORMAT_VARIANTS {
                if context.is_stop() {
                    return Ok(false);
                }
                let forged = original
                    .with_header(format.replace(ALGORITHM_PLACEHOLDER, variant))
                    .with_algorithm(variant)
                    .with_signature(Vec::new());
                let evidence = forged.encoded();
                if execute_attack(&evidence, context).await {
                    raise_alert(
                        VulnerabilityType::NoneAlgorithm,
                        Risk::High,
                        Confidence::High,
                        &evidence,
                        context,
                    );
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// `kid`/`jku` references seen by the last reconnaissance run.
    pub fn key_references(&self) -> Option<KeyReferences> {
        self.key_references
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records `kid`/`jku` header fields for injection style attacks. Sends
    /// nothing.
    fn key_reference_recon(&self, context: &ServerSideAttack<'_>) -> Result<bool, JWTFuzzerError> {
        let references = KeyReferences::from_token(context.token())?;
        if !references.is_empty() {
            info!(
                "Token on '{}' references keys: kid={:?} jku={:?}",
                context.parameter(),
                references.kid,
                references.jku
            );
        }
        *self
            .key_references
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(references);
        Ok(false)
    }
}

#[async_trait]
impl JwtFuzzer for HeaderFuzzer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fuzz_jwt_tokens(&self, context: &ServerSideAttack<'_>) -> bool {
        if context.is_stop() {
            return false;
        }
        if technique_outcome(NAME, "none algorithm", self.none_algorithm_attack(context).await) {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        if fuzz_custom_fields(
            NAME,
            &self.custom_fuzzers,
            self.discovered_secret.as_deref(),
            context,
        )
        .await
        {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        technique_outcome(NAME, "key reference recon", self.key_reference_recon(context))
    }
}
