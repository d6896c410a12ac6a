//! Fuzzer configuration, read from a TOML file.
//!
//! ```toml
//! trust_store_path = "certs/trusted.pem"
//! hmac_max_key_length = 26
//!
//! [[custom_field_fuzzers]]
//! field_name = "role"
//! header_field = false
//! signature_required = true
//! signing_secret = "secret"
//! payloads = { values = ["admin", "root"] }
//!
//! [[custom_field_fuzzers]]
//! field_name = "kid"
//! header_field = true
//! payloads = { file = "kid-payloads.txt", comment_token = "#", ignore_trimmed_empty_lines = true }
//! ```

use crate::constants::DEFAULT_HMAC_MAX_KEY_LENGTH;
use crate::error::JWTFuzzerError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FuzzerConfig {
    pub trust_store_path: Option<PathBuf>,
    pub hmac_max_key_length: usize,
    pub secret_wordlist: Option<PathBuf>,
    pub custom_field_fuzzers: Vec<CustomFieldFuzzer>,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            trust_store_path: None,
            hmac_max_key_length: DEFAULT_HMAC_MAX_KEY_LENGTH,
            secret_wordlist: None,
            custom_field_fuzzers: Vec::new(),
        }
    }
}

/// One user-defined fuzz target inside the token header or payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldFuzzer {
    pub field_name: String,
    #[serde(default)]
    pub header_field: bool,
    #[serde(default)]
    pub signature_required: bool,
    /// HMAC secret used when `signature_required` is set.
    #[serde(default)]
    pub signing_secret: Option<String>,
    pub payloads: PayloadSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PayloadSource {
    Inline { values: Vec<String> },
    File(FilePayloadSource),
}

/// Line oriented payload file.
#[derive(Debug, Clone, Deserialize)]
pub struct FilePayloadSource {
    pub file: PathBuf,
    #[serde(default)]
    pub comment_token: Option<String>,
    #[serde(default)]
    pub ignore_trimmed_empty_lines: bool,
    #[serde(default)]
    pub ignore_first_line: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FuzzerConfig {
    /// Reads the file and resolves relative paths against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, JWTFuzzerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JWTFuzzerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, JWTFuzzerError> {
        let config: FuzzerConfig =
            toml::from_str(content).map_err(|e| JWTFuzzerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), JWTFuzzerError> {
        if self.hmac_max_key_length == 0 {
            return Err(JWTFuzzerError::Config(
                "hmac_max_key_length must be positive".to_string(),
            ));
        }
        for (index, fuzzer) in self.custom_field_fuzzers.iter().enumerate() {
            if fuzzer.field_name.trim().is_empty() {
                return Err(JWTFuzzerError::Config(format!(
                    "custom_field_fuzzers[{}] has an empty field_name",
                    index
                )));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(path) = self.trust_store_path.as_mut() {
            resolve(path);
        }
        if let Some(path) = self.secret_wordlist.as_mut() {
            resolve(path);
        }
        for fuzzer in &mut self.custom_field_fuzzers {
            if let PayloadSource::File(source) = &mut fuzzer.payloads {
                resolve(&mut source.file);
            }
        }
    }

    pub fn header_fuzzers(&self) -> Vec<CustomFieldFuzzer> {
        self.custom_field_fuzzers
            .iter()
            .filter(|f| f.header_field)
            .cloned()
            .collect()
    }

    pub fn payload_fuzzers(&self) -> Vec<CustomFieldFuzzer> {
        self.custom_field_fuzzers
            .iter()
            .filter(|f| !f.header_field)
            .cloned()
            .collect()
    }
}
