//! Attacker key material for forged tokens.
//!
//! A freshly generated key pair yields its public half as a JWK, ready to be
//! embedded in a forged header, and an opaque signer for the private half.

use crate::error::JWTFuzzerError;
use crate::jwt_core::utils::{base64_url_encode, AlgorithmFamily, JwsAlgorithm};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer};
use std::fmt;

pub const RSA_KEY_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
    P521,
    Ed25519,
    Ed448,
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
            Curve::Ed25519 => "Ed25519",
            Curve::Ed448 => "Ed448",
        }
    }

    /// Every curve a JWS algorithm may legitimately be used with.
    pub fn for_algorithm(algorithm: JwsAlgorithm) -> &'static [Curve] {
        match algorithm {
            JwsAlgorithm::ES256 => &[Curve::P256],
            JwsAlgorithm::ES384 => &[Curve::P384],
            JwsAlgorithm::ES512 => &[Curve::P521],
            JwsAlgorithm::EdDSA => &[Curve::Ed25519, Curve::Ed448],
            _ => &[],
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    Rsa { bits: usize },
    Curve(Curve),
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpec::Rsa { bits } => write!(f, "RSA-{}", bits),
            KeySpec::Curve(curve) => write!(f, "{}", curve),
        }
    }
}

/// Key shapes worth forging with for the given algorithm, in trial order.
/// HMAC algorithms have none.
pub fn key_specs_for(algorithm: JwsAlgorithm) -> Vec<KeySpec> {
    match algorithm.family() {
        AlgorithmFamily::Rsa => vec![KeySpec::Rsa { bits: RSA_KEY_SIZE }],
        AlgorithmFamily::Ec | AlgorithmFamily::Okp => Curve::for_algorithm(algorithm)
            .iter()
            .copied()
            .map(KeySpec::Curve)
            .collect(),
        AlgorithmFamily::Hmac => Vec::new(),
    }
}

enum SigningMaterial {
    Rsa(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// Private half of a forged key pair, bound to one JWS algorithm.
pub struct ForgedSigner {
    algorithm: JwsAlgorithm,
    material: SigningMaterial,
}

impl ForgedSigner {
    pub fn algorithm(&self) -> JwsAlgorithm {
        self.algorithm
    }

    pub fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, JWTFuzzerError> {
        match &self.material {
            SigningMaterial::Rsa(key) => sign_rsa(self.algorithm, key, signing_input),
            SigningMaterial::P256(key) => {
                let signature: p256::ecdsa::Signature = key.try_sign(signing_input)?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningMaterial::P384(key) => {
                let signature: p384::ecdsa::Signature = key.try_sign(signing_input)?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningMaterial::P521(key) => {
                let signature: p521::ecdsa::Signature = key.try_sign(signing_input)?;
                Ok(signature.to_bytes().to_vec())
            }
            SigningMaterial::Ed25519(key) => {
                let signature: ed25519_dalek::Signature = key.try_sign(signing_input)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}

fn sign_rsa(
    algorithm: JwsAlgorithm,
    key: &RsaPrivateKey,
    signing_input: &[u8],
) -> Result<Vec<u8>, JWTFuzzerError> {
    use rsa::pkcs1v15::SigningKey;
    use rsa::pss::BlindedSigningKey;

    let mut rng = rand::thread_rng();
    let bytes = match algorithm {
        JwsAlgorithm::RS256 => SigningKey::<Sha256>::new(key.clone())
            .try_sign(signing_input)?
            .to_vec(),
        JwsAlgorithm::RS384 => SigningKey::<Sha384>::new(key.clone())
            .try_sign(signing_input)?
            .to_vec(),
        JwsAlgorithm::RS512 => SigningKey::<Sha512>::new(key.clone())
            .try_sign(signing_input)?
            .to_vec(),
        JwsAlgorithm::PS256 => BlindedSigningKey::<Sha256>::new(key.clone())
            .try_sign_with_rng(&mut rng, signing_input)?
            .to_vec(),
        JwsAlgorithm::PS384 => BlindedSigningKey::<Sha384>::new(key.clone())
            .try_sign_with_rng(&mut rng, signing_input)?
            .to_vec(),
        JwsAlgorithm::PS512 => BlindedSigningKey::<Sha512>::new(key.clone())
            .try_sign_with_rng(&mut rng, signing_input)?
            .to_vec(),
        other => return Err(JWTFuzzerError::UnsupportedAlgorithm(other.to_string())),
    };
    Ok(bytes)
}

/// A freshly generated key pair: public JWK plus its signer.
pub struct ForgedKeyPair {
    public_jwk: Value,
    signer: ForgedSigner,
}

impl ForgedKeyPair {
    pub fn public_jwk(&self) -> &Value {
        &self.public_jwk
    }

    pub fn signer(&self) -> &ForgedSigner {
        &self.signer
    }
}

/// Generates a key pair of shape `spec` that signs with `algorithm`.
///
/// RSA generation is CPU heavy; async callers should run this on a blocking
/// thread.
pub fn generate_key_pair(
    algorithm: JwsAlgorithm,
    spec: KeySpec,
) -> Result<ForgedKeyPair, JWTFuzzerError> {
    let (public_jwk, material) = match spec {
        KeySpec::Rsa { bits } => {
            if algorithm.family() != AlgorithmFamily::Rsa {
                return Err(JWTFuzzerError::UnsupportedAlgorithm(format!(
                    "{} cannot be signed with an RSA key",
                    algorithm
                )));
            }
            let key = RsaPrivateKey::new(&mut rand::thread_rng(), bits)?;
            let jwk = json!({
                "kty": "RSA",
                "e": base64_url_encode(&key.e().to_bytes_be()),
                "n": base64_url_encode(&key.n().to_bytes_be()),
            });
            (jwk, SigningMaterial::Rsa(key))
        }
        KeySpec::Curve(curve) => {
            if !Curve::for_algorithm(algorithm).contains(&curve) {
                return Err(JWTFuzzerError::UnsupportedCurve(format!(
                    "{} is not valid for {}",
                    curve, algorithm
                )));
            }
            generate_curve_material(curve)?
        }
    };

    Ok(ForgedKeyPair {
        public_jwk,
        signer: ForgedSigner {
            algorithm,
            material,
        },
    })
}

fn generate_curve_material(curve: Curve) -> Result<(Value, SigningMaterial), JWTFuzzerError> {
    match curve {
        Curve::P256 => {
            let key = p256::ecdsa::SigningKey::random(&mut OsRng);
            let point = key.verifying_key().to_encoded_point(false);
            let jwk = ec_jwk(curve, point.x().map(|x| &x[..]), point.y().map(|y| &y[..]))?;
            Ok((jwk, SigningMaterial::P256(key)))
        }
        Curve::P384 => {
            let key = p384::ecdsa::SigningKey::random(&mut OsRng);
            let point = key.verifying_key().to_encoded_point(false);
            let jwk = ec_jwk(curve, point.x().map(|x| &x[..]), point.y().map(|y| &y[..]))?;
            Ok((jwk, SigningMaterial::P384(key)))
        }
        Curve::P521 => {
            let key = p521::ecdsa::SigningKey::random(&mut OsRng);
            let point = p521::ecdsa::VerifyingKey::from(&key).to_encoded_point(false);
            let jwk = ec_jwk(curve, point.x().map(|x| &x[..]), point.y().map(|y| &y[..]))?;
            Ok((jwk, SigningMaterial::P521(key)))
        }
        Curve::Ed25519 => {
            let key = ed25519_dalek::SigningKey::generate(&mut OsRng);
            let jwk = json!({
                "kty": "OKP",
                "crv": curve.name(),
                "x": base64_url_encode(key.verifying_key().as_bytes()),
            });
            Ok((jwk, SigningMaterial::Ed25519(key)))
        }
        Curve::Ed448 => Err(JWTFuzzerError::UnsupportedCurve(curve.to_string())),
    }
}

fn ec_jwk(curve: Curve, x: Option<&[u8]>, y: Option<&[u8]>) -> Result<Value, JWTFuzzerError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(json!({
            "kty": "EC",
            "crv": curve.name(),
            "x": base64_url_encode(x),
            "y": base64_url_encode(y),
        })),
        _ => Err(JWTFuzzerError::Crypto(format!(
            "{} public point has no affine coordinates",
            curve
        ))),
    }
}
