//! Per-block authentication bundles and their byte encoding.
//!
//! The assembler does no cryptography: it packages one block's witness path
//! with the batch's single signature and shared metadata.

use bincode::{Decode, Encode};

use crate::{
    metadata::MetadataWire, BatchError, MerkleBatchTree, RootSignature, SharedMetadata,
    WitnessPath,
};

/// Decode limit for an encoded bundle.
const MAX_ENCODED_BUNDLE_LEN: usize = 1024 * 1024;

/// Longest path accepted when decoding; no batch addressable by a `u64`
/// segment count is taller.
const MAX_PATH_ENTRIES: usize = 64;

/// Everything needed to verify one block on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationBundle {
    /// Siblings from this block's leaf to the root.
    pub path: WitnessPath,
    /// Copy of the batch's root signature.
    pub signature: RootSignature,
    /// Copy of the batch's shared metadata.
    pub metadata: SharedMetadata,
    /// Segment number of this block.
    pub segment_index: u64,
    /// Number of leaves in the batch (N).
    pub batch_size: u64,
}

#[derive(Encode, Decode)]
struct BundleWire {
    path: WitnessPath,
    signature: Vec<u8>,
    metadata: MetadataWire,
    segment_index: u64,
    batch_size: u64,
}

impl AuthenticationBundle {
    /// Position of this block's leaf in the batch, if the segment number is
    /// not below the batch's first segment.
    pub fn leaf_index(&self) -> Option<u64> {
        self.segment_index.checked_sub(self.metadata.first_segment)
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, BatchError> {
        let wire = BundleWire {
            path: self.path.clone(),
            signature: self.signature.as_bytes().to_vec(),
            metadata: self.metadata.to_wire(),
            segment_index: self.segment_index,
            batch_size: self.batch_size,
        };
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(wire, config)
            .map_err(|e| BatchError::InvalidEncoding(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    ///
    /// Unknown digest algorithm or leaf mode identifiers give
    /// [`BatchError::UnsupportedMode`]; everything else malformed gives
    /// [`BatchError::InvalidEncoding`].
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self, BatchError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<MAX_ENCODED_BUNDLE_LEN>();
        let (wire, read): (BundleWire, usize) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| BatchError::InvalidEncoding(format!("decode error: {}", e)))?;
        if read != bytes.len() {
            return Err(BatchError::InvalidEncoding(format!(
                "{} trailing bytes after bundle",
                bytes.len() - read
            )));
        }
        if wire.path.len() > MAX_PATH_ENTRIES {
            return Err(BatchError::InvalidEncoding(format!(
                "path of {} entries exceeds maximum {}",
                wire.path.len(),
                MAX_PATH_ENTRIES
            )));
        }
        Ok(Self {
            path: wire.path,
            signature: RootSignature::new(wire.signature),
            metadata: SharedMetadata::from_wire(wire.metadata)?,
            segment_index: wire.segment_index,
            batch_size: wire.batch_size,
        })
    }
}

impl MerkleBatchTree {
    /// Bundle for leaf `leaf_index`.
    pub fn bundle(
        &self,
        leaf_index: u64,
        signature: &RootSignature,
        metadata: &SharedMetadata,
    ) -> Result<AuthenticationBundle, BatchError> {
        metadata.check_tree(self)?;
        self.bundle_unchecked(leaf_index, signature, metadata)
    }

    /// Bundles for every leaf, in segment order. All-or-nothing.
    pub fn bundles(
        &self,
        signature: &RootSignature,
        metadata: &SharedMetadata,
    ) -> Result<Vec<AuthenticationBundle>, BatchError> {
        metadata.check_tree(self)?;
        (0..self.leaf_count())
            .map(|leaf_index| self.bundle_unchecked(leaf_index, signature, metadata))
            .collect()
    }

    fn bundle_unchecked(
        &self,
        leaf_index: u64,
        signature: &RootSignature,
        metadata: &SharedMetadata,
    ) -> Result<AuthenticationBundle, BatchError> {
        let path = self.path(leaf_index)?;
        Ok(AuthenticationBundle {
            path,
            signature: signature.clone(),
            metadata: metadata.clone(),
            segment_index: self.first_segment() + leaf_index,
            batch_size: self.leaf_count(),
        })
    }
}
