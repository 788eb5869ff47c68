//! Publish-side configuration.

use serde::{Deserialize, Serialize};

use crate::{BatchError, DigestAlgorithm, LeafHashMode};

/// Default maximum length of a single block, in bytes.
pub const DEFAULT_MAX_BLOCK_LEN: usize = 64 * 1024;

/// Default maximum number of leaves in one batch.
pub const DEFAULT_MAX_BATCH_SIZE: u64 = 1 << 20;

/// Settings for building and signing batches.
///
/// ```toml
/// digest_algorithm = "sha256"
/// leaf_mode = "hash-content"
/// max_block_len = 4096
/// freshness_seconds = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Digest used for leaves, internal nodes and publisher ids.
    pub digest_algorithm: DigestAlgorithm,
    /// How block content is turned into a leaf digest.
    pub leaf_mode: LeafHashMode,
    /// Largest block accepted by the builder.
    pub max_block_len: usize,
    /// Largest number of blocks accepted in one batch.
    pub max_batch_size: u64,
    /// Freshness placed in the shared metadata of every published batch.
    pub freshness_seconds: Option<u32>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            digest_algorithm: DigestAlgorithm::default(),
            leaf_mode: LeafHashMode::default(),
            max_block_len: DEFAULT_MAX_BLOCK_LEN,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            freshness_seconds: None,
        }
    }
}

impl BatchConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, BatchError> {
        let config: BatchConfig =
            toml::from_str(input).map_err(|e| BatchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make every batch fail.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.max_block_len == 0 {
            return Err(BatchError::InvalidConfig(
                "max_block_len must be greater than zero".into(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(BatchError::InvalidConfig(
                "max_batch_size must be at least one".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = BatchConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, BatchConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = BatchConfig::from_toml_str(
            r#"
            digest_algorithm = "sha256"
            leaf_mode = "content-is-digest"
            max_block_len = 4096
            max_batch_size = 10000
            freshness_seconds = 60
            "#,
        )
        .expect("valid config");
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!(config.leaf_mode, LeafHashMode::ContentIsDigest);
        assert_eq!(config.max_block_len, 4096);
        assert_eq!(config.max_batch_size, 10000);
        assert_eq!(config.freshness_seconds, Some(60));
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let err = BatchConfig::from_toml_str(r#"digest_algorithm = "md5""#)
            .expect_err("md5 is not supported");
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(BatchConfig::from_toml_str("max_depth = 3").is_err());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(BatchConfig::from_toml_str("max_block_len = 0").is_err());
        assert!(BatchConfig::from_toml_str("max_batch_size = 0").is_err());
    }
}
