//! Resolving the verification key named by a bundle's key locator.

use ed25519_dalek::VerifyingKey;

use crate::{KeyLocator, PublisherId, SharedMetadata, SignatureVerifier};

/// Key-management collaborator: maps a batch's metadata to a trusted key.
pub trait KeyResolver {
    /// The verification key type produced.
    type Key: SignatureVerifier;

    /// A trusted key for the batch described by `metadata`, if any.
    fn resolve(&self, metadata: &SharedMetadata) -> Option<Self::Key>;
}

/// A single pinned key trusts exactly itself; the publisher id check in the
/// verifier rejects any other publisher.
impl KeyResolver for VerifyingKey {
    type Key = VerifyingKey;

    fn resolve(&self, _metadata: &SharedMetadata) -> Option<VerifyingKey> {
        Some(*self)
    }
}

#[derive(Debug, Clone)]
struct TrustedKey {
    name: Option<Vec<u8>>,
    key: VerifyingKey,
}

/// A set of trusted keys, looked up by locator name, inline key bytes, or
/// publisher id.
///
/// A key found through the locator is preferred only when its digest matches
/// the batch's publisher id; otherwise any trusted key of that publisher is
/// used.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: Vec<TrustedKey>,
}

impl KeyRing {
    /// An empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` without a name.
    pub fn trust(&mut self, key: VerifyingKey) {
        self.keys.push(TrustedKey { name: None, key });
    }

    /// Trust `key` under `name`.
    pub fn trust_named(&mut self, name: impl Into<Vec<u8>>, key: VerifyingKey) {
        self.keys.push(TrustedKey {
            name: Some(name.into()),
            key,
        });
    }

    /// Number of trusted keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if no key is trusted.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for KeyRing {
    type Key = VerifyingKey;

    fn resolve(&self, metadata: &SharedMetadata) -> Option<VerifyingKey> {
        let owns_batch = |trusted: &&TrustedKey| {
            PublisherId::from_public_key(metadata.digest_algorithm, trusted.key.as_bytes())
                == metadata.publisher
        };
        let by_locator: Vec<&TrustedKey> = match &metadata.key_locator {
            KeyLocator::Name(name) => self
                .keys
                .iter()
                .filter(|trusted| trusted.name.as_deref() == Some(name.as_slice()))
                .collect(),
            KeyLocator::Key(bytes) => self
                .keys
                .iter()
                .filter(|trusted| trusted.key.as_bytes().as_slice() == bytes.as_slice())
                .collect(),
        };
        // Locator matches count first only for the batch's own publisher.
        by_locator
            .iter()
            .copied()
            .find(owns_batch)
            .or_else(|| self.keys.iter().find(owns_batch))
            .or_else(|| by_locator.first().copied())
            .map(|trusted| trusted.key)
    }
}
