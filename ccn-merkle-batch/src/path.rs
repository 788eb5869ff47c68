//! Witness paths: extraction from a built tree and bottom-up folding.

use bincode::{Decode, Encode};
use ccn_batch_costs::{cost_return_on_error_no_add, CostResult, CostsExt, OperationCost};

use crate::{hash::node_digest, BatchError, Digest, DigestProvider, MerkleBatchTree};

/// Which side of the current node its sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Side {
    /// Sibling is the left child: `parent = H(sibling, current)`.
    Left,
    /// Sibling is the right child: `parent = H(current, sibling)`.
    Right,
}

/// One step of a witness path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct PathEntry {
    /// Digest of the sibling node.
    pub sibling: Digest,
    /// Side the sibling is on.
    pub side: Side,
}

/// Sibling digests from one leaf up to the root, bottom-up.
///
/// Levels where the leaf's ancestor was promoted unpaired have no entry, so
/// the length varies across leaves of an unbalanced batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct WitnessPath {
    entries: Vec<PathEntry>,
}

impl WitnessPath {
    /// Wrap entries ordered bottom-up.
    pub fn new(entries: Vec<PathEntry>) -> Self {
        Self { entries }
    }

    /// The entries, bottom-up.
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` for the single-leaf batch.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sibling sides, bottom-up.
    pub fn sides(&self) -> impl Iterator<Item = Side> + '_ {
        self.entries.iter().map(|entry| entry.side)
    }

    /// Fold `leaf` through the path and return the candidate root.
    pub fn fold<D: DigestProvider + ?Sized>(
        &self,
        provider: &D,
        leaf: Digest,
    ) -> CostResult<Digest, BatchError> {
        let mut cost = OperationCost::default();
        let mut current = leaf;
        for entry in &self.entries {
            current = cost_return_on_error_no_add!(
                &cost,
                match entry.side {
                    Side::Left => node_digest(provider, &entry.sibling, &current),
                    Side::Right => node_digest(provider, &current, &entry.sibling),
                }
            );
            cost.node_hash_calls += 1;
        }
        Ok(current).wrap_with_cost(cost)
    }
}

impl MerkleBatchTree {
    /// Witness path of leaf `leaf_index` (0-based position in the batch).
    ///
    /// Walks upward through the recorded levels in O(depth).
    pub fn path(&self, leaf_index: u64) -> Result<WitnessPath, BatchError> {
        if leaf_index >= self.leaf_count() {
            return Err(BatchError::PathMismatch(format!(
                "leaf {} is out of range for a batch of {}",
                leaf_index,
                self.leaf_count()
            )));
        }
        let widths = self.shape.level_widths();
        let mut entries = Vec::with_capacity(self.shape.height());
        let mut index = leaf_index;
        for level in 0..self.shape.height() {
            if index % 2 == 1 {
                entries.push(PathEntry {
                    sibling: self.arena(level, index - 1),
                    side: Side::Left,
                });
            } else if index + 1 < widths[level] {
                entries.push(PathEntry {
                    sibling: self.arena(level, index + 1),
                    side: Side::Right,
                });
            }
            index /= 2;
        }
        Ok(WitnessPath::new(entries))
    }

    /// Arena lookup for a position known to be inside the shape.
    fn arena(&self, level: usize, index: u64) -> Digest {
        self.nodes[(self.shape.level_offsets()[level] + index) as usize]
    }
}
