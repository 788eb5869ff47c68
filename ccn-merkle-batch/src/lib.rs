//! Batch authentication for segmented content.
//!
//! Large published content is split into independently named and fetched
//! blocks. Instead of signing every block, a Merkle tree is built over a
//! batch, its root is signed once, and every block carries an
//! [`AuthenticationBundle`]: its witness path, the root signature and the
//! shared metadata. Any single block can then be verified on its own, fetched
//! out of order from an untrusted cache.
//!
//! # Flow
//!
//! - [`TreeBuilder::build`] hashes the blocks into a [`MerkleBatchTree`].
//! - [`sign_batch`] signs the root plus [`SharedMetadata`] exactly once.
//! - [`MerkleBatchTree::bundles`] packages a bundle per block; the tree is
//!   then dropped.
//! - [`verify_block`] recomputes the root from one block and its bundle and
//!   checks the signature.
//!
//! [`BatchPublisher`] runs the publish side end to end. Every operation that
//! hashes or signs returns a [`CostResult`] reporting the work done.

#![warn(missing_docs)]

mod block;
mod bundle;
mod config;
mod error;
pub(crate) mod hash;
mod keys;
mod metadata;
mod path;
mod publish;
mod signer;
pub(crate) mod tree;
mod verify;

#[cfg(test)]
pub(crate) mod test_utils;

pub use block::{segment_content, Block};
pub use bundle::AuthenticationBundle;
pub use ccn_batch_costs::{CostContext, CostResult, OperationCost};
pub use config::{BatchConfig, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_BLOCK_LEN};
pub use error::BatchError;
pub use hash::{
    leaf_digest, node_digest, Digest, DigestAlgorithm, DigestProvider, LeafHashMode, DIGEST_LEN,
};
pub use keys::{KeyResolver, KeyRing};
pub use metadata::{KeyLocator, PublisherId, SharedMetadata};
pub use path::{PathEntry, Side, WitnessPath};
pub use publish::{BatchPublisher, SignedBatch};
pub use signer::{sign_batch, BatchSigner, RootSignature, SignatureVerifier};
pub use tree::{ceil_log2, MerkleBatchTree, TreeBuilder, TreeShape};
pub use verify::{verify_block, BlockVerifier};
