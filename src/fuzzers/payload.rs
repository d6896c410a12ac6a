use super::context::ServerSideAttack;
use super::custom_field::fuzz_custom_fields;
use super::{execute_attack, raise_alert, technique_outcome, JwtFuzzer};
use crate::config::CustomFieldFuzzer;
use crate::constants::{EYE_CATCHER, NULL_BYTE};
use crate::error::JWTFuzzerError;
use crate::jwt_core::utils::base64_url_encode;
use crate::types::{Confidence, Risk, VulnerabilityType};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const NAME: &str = "PayloadFuzzer";

/// Attacks on the claims segment: null byte truncation, custom payload fields.
pub struct PayloadFuzzer {
    custom_fuzzers: Vec<CustomFieldFuzzer>,
    discovered_secret: Option<String>,
}

impl PayloadFuzzer {
    pub fn new(custom_fuzzers: Vec<CustomFieldFuzzer>) -> Self {
        PayloadFuzzer {
            custom_fuzzers,
            discovered_secret: None,
        }
    }

    pub fn with_discovered_secret(mut self, secret: Option<String>) -> Self {
        self.discovered_secret = secret;
        self
    }

    /// Appends a null byte and marker to the encoded payload segment, keeping
    /// the original signature.
    async fn null_byte_segment_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let original = context.token();
        let evidence = format!(
            "{}{}{}.{}",
            original.encoded_without_signature(),
            NULL_BYTE,
            EYE_CATCHER,
            base64_url_encode(original.signature())
        );
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

    /// Appends a null byte and marker to one string claim at a time. The
    /// signature still covers the original payload.
    async fn null_byte_field_attack(
        &self,
        context: &ServerSideAttack<'_>,
    ) -> Result<bool, JWTFuzzerError> {
        let original = context.token();
        let claims = original.payload_json()?;

        for (name, value) in &claims {
            let Value::String(text) = value else {
                continue;
            };
            if context.is_stop() {
                return Ok(false);
            }

            // Each attempt starts again from the untouched claims.
            let mut fuzzed = claims.clone();
            fuzzed.insert(
                name.clone(),
                Value::String(format!("{}{}{}", text, NULL_BYTE, EYE_CATCHER)),
            );
            let evidence = original.with_payload_json(&fuzzed)?.encoded();
            debug!("Null byte appended to claim '{}'", name);

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
        }
        Ok(false)
    }
}

#[async_trait]
impl JwtFuzzer for PayloadFuzzer {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fuzz_jwt_tokens(&self, context: &ServerSideAttack<'_>) -> bool {
        if context.is_stop() {
            return false;
        }
        if technique_outcome(
            NAME,
            "null byte segment",
            self.null_byte_segment_attack(context).await,
        ) {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        if technique_outcome(
            NAME,
            "null byte field",
            self.null_byte_field_attack(context).await,
        ) {
            return true;
        }

        if context.is_stop() {
            return false;
        }
        fuzz_custom_fields(
            NAME,
            &self.custom_fuzzers,
            self.discovered_secret.as_deref(),
            context,
        )
        .await
    }
}
