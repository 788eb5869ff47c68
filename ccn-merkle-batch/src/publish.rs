//! End-to-end publishing of one batch.

use ccn_batch_costs::{
    cost_return_on_error, cost_return_on_error_no_add, CostResult, CostsExt, OperationCost,
};

use crate::{
    segment_content, sign_batch, AuthenticationBundle, BatchConfig, BatchError, BatchSigner,
    Block, Digest, KeyLocator, PublisherId, RootSignature, SharedMetadata, TreeBuilder,
};

/// Output of a successful publish. The tree itself is gone; only the root
/// is kept for the caller's records.
#[derive(Debug, Clone)]
pub struct SignedBatch {
    /// Root digest the signature covers.
    pub root: Digest,
    /// The batch's single signature.
    pub signature: RootSignature,
    /// Metadata shared by every bundle.
    pub metadata: SharedMetadata,
    /// One bundle per block, in segment order.
    pub bundles: Vec<AuthenticationBundle>,
}

/// Builds, signs and bundles batches for one publisher key.
///
/// Publishing is all-or-nothing: any failure returns an error and no
/// bundles.
pub struct BatchPublisher<'a, S: BatchSigner + ?Sized> {
    config: &'a BatchConfig,
    signer: &'a S,
    key_locator: KeyLocator,
    publisher: PublisherId,
}

impl<'a, S: BatchSigner + ?Sized> BatchPublisher<'a, S> {
    /// Publisher signing with `signer`, advertising `key_locator`.
    pub fn new(config: &'a BatchConfig, signer: &'a S, key_locator: KeyLocator) -> Self {
        let publisher =
            PublisherId::from_public_key(config.digest_algorithm, &signer.public_key_bytes());
        Self {
            config,
            signer,
            key_locator,
            publisher,
        }
    }

    /// Identity placed in every batch's metadata.
    pub fn publisher(&self) -> PublisherId {
        self.publisher
    }

    /// Publish `blocks` under `name_prefix`.
    pub fn publish(
        &self,
        name_prefix: &[u8],
        timestamp_ms: u64,
        blocks: &[Block],
    ) -> CostResult<SignedBatch, BatchError> {
        let mut cost = OperationCost::default();

        cost_return_on_error_no_add!(&cost, self.config.validate());
        let tree = cost_return_on_error!(&mut cost, TreeBuilder::new(self.config).build(blocks));
        let metadata = SharedMetadata::for_tree(
            &tree,
            self.publisher,
            self.key_locator.clone(),
            name_prefix,
            timestamp_ms,
        )
        .with_freshness_seconds(self.config.freshness_seconds);
        let signature = cost_return_on_error!(&mut cost, sign_batch(&tree, &metadata, self.signer));
        let bundles = cost_return_on_error_no_add!(&cost, tree.bundles(&signature, &metadata));
        let root = tree.root();
        drop(tree);

        tracing::debug!(
            blocks = bundles.len(),
            sign_calls = cost.sign_calls,
            hash_calls = cost.total_hash_calls(),
            "published batch"
        );
        Ok(SignedBatch {
            root,
            signature,
            metadata,
            bundles,
        })
        .wrap_with_cost(cost)
    }

    /// Split `content` into segments of `block_size` bytes starting at
    /// `first_segment`, then publish them as one batch.
    pub fn publish_content(
        &self,
        name_prefix: &[u8],
        timestamp_ms: u64,
        content: &[u8],
        block_size: usize,
        first_segment: u64,
    ) -> CostResult<SignedBatch, BatchError> {
        let cost = OperationCost::default();
        let blocks = cost_return_on_error_no_add!(
            &cost,
            segment_content(content, block_size, first_segment)
        );
        self.publish(name_prefix, timestamp_ms, &blocks)
    }
}
