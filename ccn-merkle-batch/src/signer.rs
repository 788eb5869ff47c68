//! The single root signature per batch.

use std::fmt;

use ccn_batch_costs::{cost_return_on_error_no_add, CostResult, CostsExt, OperationCost};
use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};

use crate::{BatchError, MerkleBatchTree, SharedMetadata};

/// Raw signature bytes over a batch's signed payload.
#[derive(Clone, PartialEq, Eq)]
pub struct RootSignature(Vec<u8>);

impl RootSignature {
    /// Wrap raw signature bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if there are no signature bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RootSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootSignature({})", hex::encode(&self.0))
    }
}

/// Private-key side of the signature provider.
pub trait BatchSigner {
    /// Sign `payload`.
    fn sign_payload(&self, payload: &[u8]) -> Result<RootSignature, BatchError>;

    /// Encoded public key, used to derive the publisher id.
    fn public_key_bytes(&self) -> Vec<u8>;
}

impl BatchSigner for SigningKey {
    fn sign_payload(&self, payload: &[u8]) -> Result<RootSignature, BatchError> {
        Ok(RootSignature(self.sign(payload).to_bytes().to_vec()))
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.verifying_key().to_bytes().to_vec()
    }
}

/// Public-key side of the signature provider.
pub trait SignatureVerifier {
    /// `true` only if `signature` is valid over `payload` for this key.
    fn verify_payload(&self, payload: &[u8], signature: &RootSignature) -> bool;

    /// Encoded public key, used to check the publisher id.
    fn public_key_bytes(&self) -> Vec<u8>;
}

impl SignatureVerifier for VerifyingKey {
    fn verify_payload(&self, payload: &[u8], signature: &RootSignature) -> bool {
        match Signature::from_slice(signature.as_bytes()) {
            Ok(signature) => self.verify_strict(payload, &signature).is_ok(),
            Err(_) => false,
        }
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }
}

/// Sign the root of `tree` together with `metadata`. Exactly one signing
/// operation regardless of the batch size.
pub fn sign_batch<S: BatchSigner + ?Sized>(
    tree: &MerkleBatchTree,
    metadata: &SharedMetadata,
    signer: &S,
) -> CostResult<RootSignature, BatchError> {
    let mut cost = OperationCost::default();

    cost_return_on_error_no_add!(&cost, metadata.check_tree(tree));
    let payload = cost_return_on_error_no_add!(
        &cost,
        metadata
            .signed_payload(&tree.root())
            .map_err(|e| BatchError::ConstructionError(e.to_string()))
    );
    cost.sign_calls += 1;
    let signature = cost_return_on_error_no_add!(
        &cost,
        signer.sign_payload(&payload).map_err(|e| match e {
            BatchError::ConstructionError(_) => e,
            other => BatchError::ConstructionError(format!("signing failed: {}", other)),
        })
    );

    tracing::debug!(
        leaves = tree.leaf_count(),
        publisher = %metadata.publisher,
        root = %hex::encode(tree.root()),
        "signed batch root"
    );
    Ok(signature).wrap_with_cost(cost)
}
