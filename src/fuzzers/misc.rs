use super::context::ServerSideAttack;
use super::{execute_attack, raise_alert, JwtFuzzer};
use crate::constants::EMPTY_TOKENS;
use crate::types::{Confidence, Risk, VulnerabilityType};
use async_trait::async_trait;

/// Submits structurally empty tokens in place of the real one.
#[derive(Default)]
pub struct MiscFuzzer;

impl MiscFuzzer {
    pub fn new() -> Self {
        MiscFuzzer
    }
}

#[async_trait]
impl JwtFuzzer for MiscFuzzer {
    fn name(&self) -> &'static str {
        "MiscFuzzer"
    }

    async fn fuzz_jwt_tokens(&self, context: &ServerSideAttack<'_>) -> bool {
        for candidate in EMPTY_TOKENS {
            if context.is_stop() {
                return false;
            }
            if execute_attack(candidate, context).await {
                raise_alert(
                    VulnerabilityType::EmptyTokens,
                    Risk::High,
                    Confidence::High,
                    candidate,
                    context,
                );
                return true;
            }
        }
        false
    }
}
