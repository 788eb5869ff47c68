//! Digest algorithms and the leaf/internal-node hash functions.
//!
//! Hash domain separation:
//! - Raw-content leaf:   `H(0x00 || content)`
//! - Pre-digested leaf:  `H(0x00 || H(content))`
//! - Internal node:      `H(0x01 || left || right)`
//!
//! The tags keep a leaf input from ever colliding with an internal merge.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::BatchError;

/// Length in bytes of every digest produced by the supported algorithms.
pub const DIGEST_LEN: usize = 32;

/// A fixed-length digest.
pub type Digest = [u8; DIGEST_LEN];

/// Domain tag prepended to leaf hash inputs.
const LEAF_DOMAIN_TAG: u8 = 0x00;
/// Domain tag prepended to internal merge inputs.
const INTERNAL_DOMAIN_TAG: u8 = 0x01;

/// Digest algorithm used for leaves, internal nodes and publisher ids.
///
/// The identifier travels in the shared metadata so a verifier selects the
/// same algorithm the publisher used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigestAlgorithm {
    /// BLAKE3 with 32-byte output.
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Stable one-byte identifier used on the wire.
    pub fn id(self) -> u8 {
        match self {
            DigestAlgorithm::Blake3 => 0x01,
            DigestAlgorithm::Sha256 => 0x02,
        }
    }

    /// Resolve a wire identifier.
    pub fn from_id(id: u8) -> Result<Self, BatchError> {
        match id {
            0x01 => Ok(DigestAlgorithm::Blake3),
            0x02 => Ok(DigestAlgorithm::Sha256),
            other => Err(BatchError::UnsupportedMode(format!(
                "unknown digest algorithm id 0x{:02x}",
                other
            ))),
        }
    }

    /// Hash the concatenation of `parts`.
    pub fn hash_parts(self, parts: &[&[u8]]) -> Digest {
        match self {
            DigestAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                for part in parts {
                    hasher.update(part);
                }
                *hasher.finalize().as_bytes()
            }
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().into()
            }
        }
    }
}

/// How a block's content becomes its leaf digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafHashMode {
    /// The block carries raw content: `leaf = H(0x00 || content)`.
    #[default]
    HashContent,
    /// The block carries a digest computed upstream (for example over a large
    /// item hashed in pieces): `leaf = H(0x00 || H(content))`.
    ContentIsDigest,
}

impl LeafHashMode {
    /// Stable one-byte identifier used on the wire.
    pub fn id(self) -> u8 {
        match self {
            LeafHashMode::HashContent => 0x00,
            LeafHashMode::ContentIsDigest => 0x01,
        }
    }

    /// Resolve a wire identifier.
    pub fn from_id(id: u8) -> Result<Self, BatchError> {
        match id {
            0x00 => Ok(LeafHashMode::HashContent),
            0x01 => Ok(LeafHashMode::ContentIsDigest),
            other => Err(BatchError::UnsupportedMode(format!(
                "unknown leaf hash mode id 0x{:02x}",
                other
            ))),
        }
    }

    /// Number of digest invocations needed for one leaf in this mode.
    pub fn digest_calls(self) -> u32 {
        match self {
            LeafHashMode::HashContent => 1,
            LeafHashMode::ContentIsDigest => 2,
        }
    }
}

/// Source of digests for tree construction.
///
/// The builtin providers cannot fail; the trait is fallible so a hardware or
/// remote provider can report errors, which abort the batch.
pub trait DigestProvider {
    /// The algorithm this provider implements.
    fn algorithm(&self) -> DigestAlgorithm;

    /// Hash the concatenation of `parts`.
    fn digest(&self, parts: &[&[u8]]) -> Result<Digest, BatchError>;
}

impl DigestProvider for DigestAlgorithm {
    fn algorithm(&self) -> DigestAlgorithm {
        *self
    }

    fn digest(&self, parts: &[&[u8]]) -> Result<Digest, BatchError> {
        Ok(self.hash_parts(parts))
    }
}

/// Compute the leaf digest of `content` under `mode`.
pub fn leaf_digest<D: DigestProvider + ?Sized>(
    provider: &D,
    mode: LeafHashMode,
    content: &[u8],
) -> Result<Digest, BatchError> {
    match mode {
        LeafHashMode::HashContent => provider.digest(&[&[LEAF_DOMAIN_TAG], content]),
        LeafHashMode::ContentIsDigest => {
            let inner = provider.digest(&[content])?;
            provider.digest(&[&[LEAF_DOMAIN_TAG], &inner])
        }
    }
}

/// Merge two children into their parent: `H(0x01 || left || right)`.
pub fn node_digest<D: DigestProvider + ?Sized>(
    provider: &D,
    left: &Digest,
    right: &Digest,
) -> Result<Digest, BatchError> {
    provider.digest(&[&[INTERNAL_DOMAIN_TAG], left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for alg in [DigestAlgorithm::Blake3, DigestAlgorithm::Sha256] {
            assert_eq!(DigestAlgorithm::from_id(alg.id()), Ok(alg));
        }
        for mode in [LeafHashMode::HashContent, LeafHashMode::ContentIsDigest] {
            assert_eq!(LeafHashMode::from_id(mode.id()), Ok(mode));
        }
        assert!(matches!(
            DigestAlgorithm::from_id(0x7f),
            Err(BatchError::UnsupportedMode(_))
        ));
        assert!(matches!(
            LeafHashMode::from_id(0x02),
            Err(BatchError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_leaf_digest_uses_domain_tag() {
        let expected = {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&[0x00]);
            hasher.update(b"segment");
            *hasher.finalize().as_bytes()
        };
        let leaf = leaf_digest(&DigestAlgorithm::Blake3, LeafHashMode::HashContent, b"segment")
            .expect("builtin digest cannot fail");
        assert_eq!(leaf, expected);
        assert_ne!(leaf, *blake3::hash(b"segment").as_bytes());
    }

    #[test]
    fn test_pre_digested_leaf_is_double_hash() {
        let upstream = *blake3::hash(b"a large item hashed upstream").as_bytes();
        let leaf = leaf_digest(
            &DigestAlgorithm::Blake3,
            LeafHashMode::ContentIsDigest,
            &upstream,
        )
        .expect("builtin digest cannot fail");

        let inner = *blake3::hash(&upstream).as_bytes();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[0x00]);
        hasher.update(&inner);
        assert_eq!(leaf, *hasher.finalize().as_bytes());

        let raw = leaf_digest(&DigestAlgorithm::Blake3, LeafHashMode::HashContent, &upstream)
            .expect("builtin digest cannot fail");
        assert_ne!(leaf, raw);
    }

    #[test]
    fn test_node_digest_is_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        for alg in [DigestAlgorithm::Blake3, DigestAlgorithm::Sha256] {
            let ab = node_digest(&alg, &a, &b).expect("builtin digest cannot fail");
            let ba = node_digest(&alg, &b, &a).expect("builtin digest cannot fail");
            assert_ne!(ab, ba);
        }
    }

    #[test]
    fn test_sha256_matches_reference() {
        let got = DigestAlgorithm::Sha256.hash_parts(&[b"ab", b"c"]);
        assert_eq!(
            hex::encode(got),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
