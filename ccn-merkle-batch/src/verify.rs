//! Per-block verification.
//!
//! Pure function of one block's content, its bundle and a key resolver. No
//! other block and no tree is needed; only an O(path length) chain is
//! recomputed.

use ccn_batch_costs::{
    cost_return_on_error, cost_return_on_error_no_add, CostContext, CostResult, CostsExt,
    OperationCost,
};

use crate::{
    hash::leaf_digest, tree::ceil_log2, AuthenticationBundle, BatchError, KeyResolver,
    PublisherId, SignatureVerifier, TreeShape,
};

/// Verify one block against its bundle.
///
/// Fails with [`BatchError::PathMismatch`] when the bundle's shape is
/// inconsistent with its batch size and segment, and with
/// [`BatchError::SignatureInvalid`] when the recomputed root and metadata do
/// not carry a valid signature from a trusted key.
pub fn verify_block<R: KeyResolver + ?Sized>(
    content: &[u8],
    bundle: &AuthenticationBundle,
    resolver: &R,
) -> CostResult<(), BatchError> {
    let outcome = verify_inner(content, bundle, resolver);
    if let Err(e) = &outcome.value {
        tracing::debug!(
            segment = bundle.segment_index,
            batch_size = bundle.batch_size,
            error = %e,
            "block verification failed"
        );
    }
    outcome
}

fn verify_inner<R: KeyResolver + ?Sized>(
    content: &[u8],
    bundle: &AuthenticationBundle,
    resolver: &R,
) -> CostResult<(), BatchError> {
    let mut cost = OperationCost::default();
    let metadata = &bundle.metadata;
    let algorithm = metadata.digest_algorithm;

    cost_return_on_error_no_add!(&cost, check_shape(bundle));

    let leaf = cost_return_on_error_no_add!(
        &cost,
        leaf_digest(&algorithm, metadata.leaf_mode, content)
    );
    cost.digest_calls += metadata.leaf_mode.digest_calls();
    let candidate_root = cost_return_on_error!(&mut cost, bundle.path.fold(&algorithm, leaf));

    let key = cost_return_on_error_no_add!(
        &cost,
        resolver.resolve(metadata).ok_or_else(|| {
            BatchError::SignatureInvalid(format!(
                "no trusted key for publisher {}",
                metadata.publisher
            ))
        })
    );
    cost.digest_calls += 1;
    if PublisherId::from_public_key(algorithm, &key.public_key_bytes()) != metadata.publisher {
        return Err(BatchError::SignatureInvalid(format!(
            "resolved key does not belong to publisher {}",
            metadata.publisher
        )))
        .wrap_with_cost(cost);
    }

    let payload = cost_return_on_error_no_add!(&cost, metadata.signed_payload(&candidate_root));
    cost.signature_checks += 1;
    if !key.verify_payload(&payload, &bundle.signature) {
        return Err(BatchError::SignatureInvalid(format!(
            "signature does not cover segment {}",
            bundle.segment_index
        )))
        .wrap_with_cost(cost);
    }

    Ok(()).wrap_with_cost(cost)
}

/// Check the bundle's structure before any hashing.
///
/// Beyond the `⌈log₂N⌉ + 1` length bound, the side sequence must be exactly
/// the one the promotion rule gives for this leaf in a batch of N.
fn check_shape(bundle: &AuthenticationBundle) -> Result<u64, BatchError> {
    let batch_size = bundle.batch_size;
    if batch_size == 0 {
        return Err(BatchError::PathMismatch("batch size is zero".into()));
    }
    if batch_size != bundle.metadata.batch_size {
        return Err(BatchError::PathMismatch(format!(
            "bundle batch size {} differs from metadata batch size {}",
            batch_size, bundle.metadata.batch_size
        )));
    }
    let leaf_index = bundle.leaf_index().ok_or_else(|| {
        BatchError::PathMismatch(format!(
            "segment {} precedes first segment {}",
            bundle.segment_index, bundle.metadata.first_segment
        ))
    })?;
    if leaf_index >= batch_size {
        return Err(BatchError::PathMismatch(format!(
            "segment {} is outside a batch of {} starting at {}",
            bundle.segment_index, batch_size, bundle.metadata.first_segment
        )));
    }
    let bound = ceil_log2(batch_size) as usize + 1;
    if bundle.path.len() > bound {
        return Err(BatchError::PathMismatch(format!(
            "path of {} entries exceeds bound {} for a batch of {}",
            bundle.path.len(),
            bound,
            batch_size
        )));
    }
    let expected = TreeShape::new(batch_size)
        .and_then(|shape| shape.path_sides(leaf_index))
        .ok_or_else(|| BatchError::PathMismatch("no shape for batch".into()))?;
    if !bundle.path.sides().eq(expected.iter().copied()) {
        return Err(BatchError::PathMismatch(format!(
            "path for leaf {} does not follow the shape of a batch of {}",
            leaf_index, batch_size
        )));
    }
    Ok(leaf_index)
}

/// Verifies blocks against a fixed key resolver.
///
/// Holds no state beyond the resolver; calls are independent and may run
/// concurrently.
pub struct BlockVerifier<'a, R: KeyResolver + ?Sized> {
    resolver: &'a R,
}

impl<'a, R: KeyResolver + ?Sized> BlockVerifier<'a, R> {
    /// Verifier backed by `resolver`.
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Verify one block. See [`verify_block`].
    pub fn verify(
        &self,
        content: &[u8],
        bundle: &AuthenticationBundle,
    ) -> CostResult<(), BatchError> {
        verify_block(content, bundle, self.resolver)
    }

    /// Verify each `(content, bundle)` pair independently, returning one
    /// outcome per pair in input order.
    pub fn verify_all<'b, I>(&self, blocks: I) -> CostContext<Vec<Result<(), BatchError>>>
    where
        I: IntoIterator<Item = (&'b [u8], &'b AuthenticationBundle)>,
    {
        let mut cost = OperationCost::default();
        let outcomes: Vec<Result<(), BatchError>> = blocks
            .into_iter()
            .map(|(content, bundle)| self.verify(content, bundle).unwrap_add_cost(&mut cost))
            .collect();
        outcomes.wrap_with_cost(cost)
    }
}
