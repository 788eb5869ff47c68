//! Shared batch metadata and the signed payload.
//!
//! The metadata is identical in every bundle of a batch and is covered by the
//! root signature, so none of its fields can be altered undetected.

use std::fmt;

use bincode::{Decode, Encode};

use crate::{BatchError, Digest, DigestAlgorithm, LeafHashMode, MerkleBatchTree};

/// Context string prefixed to every signed payload.
pub(crate) const SIGNATURE_CONTEXT: &[u8] = b"ccn-merkle-batch/v1\0";

/// Identity of a publisher: the digest of its public key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct PublisherId(pub Digest);

impl PublisherId {
    /// Derive the id of the holder of `public_key`.
    pub fn from_public_key(algorithm: DigestAlgorithm, public_key: &[u8]) -> Self {
        PublisherId(algorithm.hash_parts(&[public_key]))
    }

    /// The raw digest.
    pub fn as_bytes(&self) -> &Digest {
        &self.0
    }
}

impl fmt::Debug for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublisherId({})", hex::encode(self.0))
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Where a verifier can find the key that signed a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub enum KeyLocator {
    /// Name under which the key is published.
    Name(Vec<u8>),
    /// The public key bytes themselves.
    Key(Vec<u8>),
}

/// Fields shared by every bundle of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedMetadata {
    /// Who signed the batch.
    pub publisher: PublisherId,
    /// How to find the signing key.
    pub key_locator: KeyLocator,
    /// Content name without the per-segment suffix. Opaque to this crate.
    pub name_prefix: Vec<u8>,
    /// Publication time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// How long caches may treat the content as fresh.
    pub freshness_seconds: Option<u32>,
    /// Digest used throughout the tree.
    pub digest_algorithm: DigestAlgorithm,
    /// How block content became a leaf digest.
    pub leaf_mode: LeafHashMode,
    /// Segment number of leaf 0.
    pub first_segment: u64,
    /// Number of leaves (N).
    pub batch_size: u64,
}

impl SharedMetadata {
    /// Metadata for `tree`: the tree-derived fields come from the tree, the
    /// rest from the caller.
    pub fn for_tree(
        tree: &MerkleBatchTree,
        publisher: PublisherId,
        key_locator: KeyLocator,
        name_prefix: impl Into<Vec<u8>>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            publisher,
            key_locator,
            name_prefix: name_prefix.into(),
            timestamp_ms,
            freshness_seconds: None,
            digest_algorithm: tree.algorithm(),
            leaf_mode: tree.leaf_mode(),
            first_segment: tree.first_segment(),
            batch_size: tree.leaf_count(),
        }
    }

    /// Set the freshness period.
    pub fn with_freshness_seconds(mut self, freshness_seconds: Option<u32>) -> Self {
        self.freshness_seconds = freshness_seconds;
        self
    }

    /// The exact bytes the root signature covers:
    /// `context || root || canonical(metadata)`.
    pub fn signed_payload(&self, root: &Digest) -> Result<Vec<u8>, BatchError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        let encoded = bincode::encode_to_vec(self.to_wire(), config)
            .map_err(|e| BatchError::InvalidEncoding(format!("metadata encode error: {}", e)))?;
        let mut payload = Vec::with_capacity(SIGNATURE_CONTEXT.len() + root.len() + encoded.len());
        payload.extend_from_slice(SIGNATURE_CONTEXT);
        payload.extend_from_slice(root);
        payload.extend_from_slice(&encoded);
        Ok(payload)
    }

    /// Reject metadata whose tree-derived fields disagree with `tree`.
    pub(crate) fn check_tree(&self, tree: &MerkleBatchTree) -> Result<(), BatchError> {
        if self.batch_size != tree.leaf_count() {
            return Err(BatchError::ConstructionError(format!(
                "metadata batch size {} does not match tree of {} leaves",
                self.batch_size,
                tree.leaf_count()
            )));
        }
        if self.digest_algorithm != tree.algorithm() {
            return Err(BatchError::ConstructionError(format!(
                "metadata digest algorithm {:?} does not match tree {:?}",
                self.digest_algorithm,
                tree.algorithm()
            )));
        }
        if self.leaf_mode != tree.leaf_mode() {
            return Err(BatchError::ConstructionError(format!(
                "metadata leaf mode {:?} does not match tree {:?}",
                self.leaf_mode,
                tree.leaf_mode()
            )));
        }
        if self.first_segment != tree.first_segment() {
            return Err(BatchError::ConstructionError(format!(
                "metadata first segment {} does not match tree {}",
                self.first_segment,
                tree.first_segment()
            )));
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self) -> MetadataWire {
        MetadataWire {
            publisher: self.publisher.0,
            key_locator: self.key_locator.clone(),
            name_prefix: self.name_prefix.clone(),
            timestamp_ms: self.timestamp_ms,
            freshness_seconds: self.freshness_seconds,
            digest_algorithm: self.digest_algorithm.id(),
            leaf_mode: self.leaf_mode.id(),
            first_segment: self.first_segment,
            batch_size: self.batch_size,
        }
    }

    pub(crate) fn from_wire(wire: MetadataWire) -> Result<Self, BatchError> {
        Ok(Self {
            publisher: PublisherId(wire.publisher),
            key_locator: wire.key_locator,
            name_prefix: wire.name_prefix,
            timestamp_ms: wire.timestamp_ms,
            freshness_seconds: wire.freshness_seconds,
            digest_algorithm: DigestAlgorithm::from_id(wire.digest_algorithm)?,
            leaf_mode: LeafHashMode::from_id(wire.leaf_mode)?,
            first_segment: wire.first_segment,
            batch_size: wire.batch_size,
        })
    }
}

/// Metadata as encoded for signing and on the wire. Algorithm and mode are
/// raw identifiers so unknown values surface as
/// [`BatchError::UnsupportedMode`] rather than a decode failure.
#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct MetadataWire {
    pub(crate) publisher: Digest,
    pub(crate) key_locator: KeyLocator,
    pub(crate) name_prefix: Vec<u8>,
    pub(crate) timestamp_ms: u64,
    pub(crate) freshness_seconds: Option<u32>,
    pub(crate) digest_algorithm: u8,
    pub(crate) leaf_mode: u8,
    pub(crate) first_segment: u64,
    pub(crate) batch_size: u64,
}
