use super::context::ServerSideAttack;
use super::{execute_attack, raise_alert, technique_outcome};
use crate::config::CustomFieldFuzzer;
use crate::error::JWTFuzzerError;
use crate::jwt_core::payloads::for_each_payload;
use crate::jwt_core::utils::{hmac_sign, AlgorithmFamily, JwsAlgorithm};
use crate::types::{Confidence, Risk, VulnerabilityType};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info};

/// Runs every configured custom field fuzzer in order; first success wins.
pub(crate) async fn fuzz_custom_fields(
    owner: &'static str,
    fuzzers: &[CustomFieldFuzzer],
    discovered_secret: Option<&str>,
    context: &ServerSideAttack<'_>,
) -> bool {
    for fuzzer in fuzzers {
        if context.is_stop() {
            return false;
        }
        let outcome = fuzz_custom_field(fuzzer, discovered_secret, context).await;
        if technique_outcome(owner, &fuzzer.field_name, outcome) {
            return true;
        }
    }
    false
}

async fn fuzz_custom_field(
    fuzzer: &CustomFieldFuzzer,
    discovered_secret: Option<&str>,
    context: &ServerSideAttack<'_>,
) -> Result<bool, JWTFuzzerError> {
    let original = context.token();
    let fields = if fuzzer.header_field {
        original.header_json()?
    } else {
        original.payload_json()?
    };
    if !fields.contains_key(&fuzzer.field_name) {
        debug!("Field '{}' not present, skipping", fuzzer.field_name);
        return Ok(false);
    }

    let signing = if fuzzer.signature_required {
        match hmac_signing_key(fuzzer, discovered_secret, original.jws_algorithm()) {
            Some(signing) => Some(signing),
            None => {
                info!(
                    "Field '{}' needs a signature but no HMAC secret applies to {}, skipping",
                    fuzzer.field_name,
                    original.algorithm()
                );
                return Ok(false);
            }
        }
    } else {
        None
    };

    let fields = &fields;
    let field_name = fuzzer.field_name.as_str();
    let header_field = fuzzer.header_field;

    for_each_payload(&fuzzer.payloads, context.cancellation(), move |value| {
        async move {
            let mut candidate = fields.clone();
            candidate.insert(field_name.to_string(), Value::String(value.clone()));
            let forged = if header_field {
                original.with_header_json(&candidate)?
            } else {
                original.with_payload_json(&candidate)?
            };

            let serialized = if header_field {
                forged.header_json()?
            } else {
                forged.payload_json()?
            };
            if serialized.get(field_name).and_then(Value::as_str) != Some(value.as_str()) {
                debug!("Field '{}' did not take value {:?}", field_name, value);
                return Ok(false);
            }

            let forged = match signing {
                Some((algorithm, secret)) => {
                    let signature = hmac_sign(
                        algorithm,
                        forged.encoded_without_signature().as_bytes(),
                        secret.as_bytes(),
                    )?;
                    forged.with_signature(signature)
                }
                None => forged,
            };

            let evidence = forged.encoded();
            if execute_attack(&evidence, context).await {
                raise_alert(
                    VulnerabilityType::CustomPayload,
                    Risk::Medium,
                    Confidence::Medium,
                    &evidence,
                    context,
                );
                return Ok(true);
            }
            Ok::<bool, JWTFuzzerError>(false)
        }
        .boxed()
    })
    .await
}

/// HMAC algorithm and secret to re-sign with: the fuzzer's own secret, else
/// the discovered one. Only HMAC tokens can be re-signed.
fn hmac_signing_key<'s>(
    fuzzer: &'s CustomFieldFuzzer,
    discovered_secret: Option<&'s str>,
    algorithm: Option<JwsAlgorithm>,
) -> Option<(JwsAlgorithm, &'s str)> {
    let algorithm = algorithm.filter(|alg| alg.family() == AlgorithmFamily::Hmac)?;
    let secret = fuzzer.signing_secret.as_deref().or(discovered_secret)?;
    Some((algorithm, secret))
}
