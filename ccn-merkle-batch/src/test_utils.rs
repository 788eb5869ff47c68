//! Test fixtures: deterministic keys and content, counting and failing
//! providers.

use std::cell::Cell;

use ed25519_dalek::SigningKey;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    BatchConfig, BatchError, BatchSigner, Block, Digest, DigestAlgorithm, DigestProvider,
    KeyLocator, MerkleBatchTree, PublisherId, RootSignature, SharedMetadata, TreeBuilder,
};

/// Deterministic signing key.
pub(crate) fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// `count` blocks of `len` random bytes, numbered from `first_segment`.
pub(crate) fn random_blocks(seed: u64, count: usize, len: usize, first_segment: u64) -> Vec<Block> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let mut content = vec![0u8; len];
            rng.fill(&mut content[..]);
            Block::new(first_segment + i as u64, content)
        })
        .collect()
}

/// Build with the default configuration.
pub(crate) fn build(blocks: &[Block]) -> MerkleBatchTree {
    TreeBuilder::new(&BatchConfig::default())
        .build(blocks)
        .unwrap()
        .expect("build should succeed")
}

/// Metadata for `tree` signed by `key`, locating the key by name.
pub(crate) fn metadata_for(tree: &MerkleBatchTree, key: &SigningKey) -> SharedMetadata {
    let publisher = PublisherId::from_public_key(
        tree.algorithm(),
        key.verifying_key().as_bytes(),
    );
    SharedMetadata::for_tree(
        tree,
        publisher,
        KeyLocator::Name(b"/test/keys/treeKey".to_vec()),
        b"/test/data/treeTest/testDoc.txt".to_vec(),
        1_700_000_000_000,
    )
}

/// Signer that counts how often it is asked to sign.
pub(crate) struct CountingSigner {
    pub key: SigningKey,
    pub calls: Cell<u32>,
}

impl CountingSigner {
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            calls: Cell::new(0),
        }
    }
}

impl BatchSigner for CountingSigner {
    fn sign_payload(&self, payload: &[u8]) -> Result<RootSignature, BatchError> {
        self.calls.set(self.calls.get() + 1);
        self.key.sign_payload(payload)
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        BatchSigner::public_key_bytes(&self.key)
    }
}

/// Signer whose backend is unavailable.
pub(crate) struct FailingSigner;

impl BatchSigner for FailingSigner {
    fn sign_payload(&self, _payload: &[u8]) -> Result<RootSignature, BatchError> {
        Err(BatchError::InvalidConfig("signing backend unavailable".into()))
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        vec![0u8; 32]
    }
}

/// Digest provider that fails once it has served `budget` calls.
pub(crate) struct FailingDigest {
    pub algorithm: DigestAlgorithm,
    pub budget: Cell<u32>,
}

impl DigestProvider for FailingDigest {
    fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    fn digest(&self, parts: &[&[u8]]) -> Result<Digest, BatchError> {
        let left = self.budget.get();
        if left == 0 {
            return Err(BatchError::InvalidEncoding("hash device error".into()));
        }
        self.budget.set(left - 1);
        Ok(self.algorithm.hash_parts(parts))
    }
}
