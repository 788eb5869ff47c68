//! Blocks (segments) of published content.

use crate::{BatchError, Digest, DigestAlgorithm, LeafHashMode};

/// One independently fetchable segment of a larger content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    segment: u64,
    content: Vec<u8>,
    leaf_mode: LeafHashMode,
}

impl Block {
    /// A block carrying raw content.
    pub fn new(segment: u64, content: Vec<u8>) -> Self {
        Self {
            segment,
            content,
            leaf_mode: LeafHashMode::HashContent,
        }
    }

    /// A block whose content is a digest computed upstream.
    pub fn pre_digested(segment: u64, digest: Digest) -> Self {
        Self {
            segment,
            content: digest.to_vec(),
            leaf_mode: LeafHashMode::ContentIsDigest,
        }
    }

    /// Segment number within the published item.
    pub fn segment(&self) -> u64 {
        self.segment
    }

    /// The block's bytes as published.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Declared leaf-hash mode.
    pub fn leaf_mode(&self) -> LeafHashMode {
        self.leaf_mode
    }

    /// Consume the block and return its bytes.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    /// Content-addressed identity of this block, usable as a deduplication
    /// key. Independent of the segment number.
    pub fn content_digest(&self, algorithm: DigestAlgorithm) -> Digest {
        algorithm.hash_parts(&[&self.content])
    }
}

/// Split `content` into raw-content blocks of at most `block_size` bytes,
/// numbered from `first_segment`.
///
/// Empty content yields a single empty block so that every item has at least
/// one segment.
pub fn segment_content(
    content: &[u8],
    block_size: usize,
    first_segment: u64,
) -> Result<Vec<Block>, BatchError> {
    if block_size == 0 {
        return Err(BatchError::ConstructionError(
            "block size must be greater than zero".into(),
        ));
    }
    if content.is_empty() {
        return Ok(vec![Block::new(first_segment, Vec::new())]);
    }
    Ok(content
        .chunks(block_size)
        .enumerate()
        .map(|(i, chunk)| Block::new(first_segment + i as u64, chunk.to_vec()))
        .collect())
}
