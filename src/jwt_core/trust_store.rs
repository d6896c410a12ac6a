//! Certificates whose public keys are replayed as HMAC secrets.

use crate::error::JWTFuzzerError;
use std::path::Path;
use tracing::debug;
use x509_parser::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCertificate {
    alias: String,
    public_key_der: Vec<u8>,
}

impl TrustedCertificate {
    pub fn new(alias: impl Into<String>, public_key_der: impl Into<Vec<u8>>) -> Self {
        TrustedCertificate {
            alias: alias.into(),
            public_key_der: public_key_der.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// DER encoded SubjectPublicKeyInfo of the certificate.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }
}

/// Ordered `(alias, certificate)` collection.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    certificates: Vec<TrustedCertificate>,
}

impl TrustStore {
    pub fn from_certificates(certificates: Vec<TrustedCertificate>) -> Self {
        TrustStore { certificates }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, JWTFuzzerError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            JWTFuzzerError::TrustStore(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_pem(&data)
    }

    /// Reads every CERTIFICATE block of a PEM bundle, in file order. The alias
    /// is the subject common name, or `cert-<index>` without one.
    pub fn from_pem(data: &[u8]) -> Result<Self, JWTFuzzerError> {
        // x509-parser's prelude exports its own `pem` module.
        let blocks =
            ::pem::parse_many(data).map_err(|e| JWTFuzzerError::TrustStore(e.to_string()))?;

        let mut certificates = Vec::new();
        for (index, block) in blocks.iter().filter(|b| b.tag() == "CERTIFICATE").enumerate() {
            let (_, certificate) = X509Certificate::from_der(block.contents())
                .map_err(|e| JWTFuzzerError::TrustStore(format!("certificate {}: {}", index, e)))?;

            let alias = certificate
                .subject()
                .iter_common_name()
                .next()
                .and_then(|cn| cn.as_str().ok())
                .map(String::from)
                .unwrap_or_else(|| format!("cert-{}", index));
            debug!("Loaded trusted certificate '{}'", alias);

            certificates.push(TrustedCertificate::new(
                alias,
                certificate.public_key().raw.to_vec(),
            ));
        }

        if certificates.is_empty() {
            return Err(JWTFuzzerError::TrustStore(
                "no certificates found".to_string(),
            ));
        }
        Ok(TrustStore { certificates })
    }

    pub fn certificates(&self) -> &[TrustedCertificate] {
        &self.certificates
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}
