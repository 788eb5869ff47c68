//! Tree shape and construction.
//!
//! Leaves are paired left-to-right at each level. A node left unpaired at the
//! end of a level is promoted unchanged to the next level, never duplicated.
//! Levels are stored bottom-up in one flat arena; level `l` starts at
//! `level_offsets[l]`.
//!
//! ```text
//!   5 leaves:             root
//!                       /      \
//!                  n0123        \
//!                 /     \        \
//!               n01     n23       4   <- promoted twice
//!              /   \   /   \      |
//!             0     1 2     3     4
//! ```

use ccn_batch_costs::{cost_return_on_error_no_add, CostResult, CostsExt, OperationCost};

use crate::{
    hash::{leaf_digest, node_digest},
    BatchConfig, BatchError, Block, Digest, DigestAlgorithm, DigestProvider, LeafHashMode, Side,
};

/// `⌈log₂ n⌉`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        u64::BITS - (n - 1).leading_zeros()
    }
}

/// The shape of a tree over `n` leaves: a pure function of `n`.
///
/// Builder, path extractor and verifier all derive node numbering from this
/// type, so they agree without sharing any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    level_widths: Vec<u64>,
    level_offsets: Vec<u64>,
}

impl TreeShape {
    /// Shape for `leaf_count` leaves, or `None` when `leaf_count == 0` or the
    /// arena size would not fit in a `u64`.
    pub fn new(leaf_count: u64) -> Option<Self> {
        if leaf_count == 0 {
            return None;
        }
        let mut level_widths = vec![leaf_count];
        let mut width = leaf_count;
        while width > 1 {
            width = width.div_ceil(2);
            level_widths.push(width);
        }
        // The arena holds about 2N slots; N near u64::MAX has no shape.
        let mut level_offsets = Vec::with_capacity(level_widths.len());
        let mut offset = 0u64;
        for width in &level_widths {
            level_offsets.push(offset);
            offset = offset.checked_add(*width)?;
        }
        Some(Self {
            level_widths,
            level_offsets,
        })
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> u64 {
        self.level_widths[0]
    }

    /// Number of levels above the leaves; equals `⌈log₂ N⌉`.
    pub fn height(&self) -> usize {
        self.level_widths.len() - 1
    }

    /// Node count per level, leaves first, root last.
    pub fn level_widths(&self) -> &[u64] {
        &self.level_widths
    }

    /// Arena offset of the first node of each level.
    pub fn level_offsets(&self) -> &[u64] {
        &self.level_offsets
    }

    /// Total number of arena slots, promoted nodes included.
    pub fn node_count(&self) -> u64 {
        self.level_offsets[self.height()] + 1
    }

    /// Arena position of node `index` at `level`.
    pub fn node_position(&self, level: usize, index: u64) -> Option<u64> {
        let width = *self.level_widths.get(level)?;
        (index < width).then(|| self.level_offsets[level] + index)
    }

    /// Side of the sibling at every level where `leaf_index`'s ancestor is
    /// paired, bottom-up. Levels where it is promoted contribute nothing.
    pub fn path_sides(&self, leaf_index: u64) -> Option<Vec<Side>> {
        if leaf_index >= self.leaf_count() {
            return None;
        }
        let mut sides = Vec::with_capacity(self.height());
        let mut index = leaf_index;
        for &width in &self.level_widths[..self.height()] {
            if index % 2 == 1 {
                sides.push(Side::Left);
            } else if index + 1 < width {
                sides.push(Side::Right);
            }
            index /= 2;
        }
        Some(sides)
    }

    /// Witness path length of `leaf_index`.
    pub fn path_len(&self, leaf_index: u64) -> Option<usize> {
        self.path_sides(leaf_index).map(|sides| sides.len())
    }

    /// Longest witness path in this shape. Leaf 0 is paired at every level,
    /// so this is the height.
    pub fn max_path_len(&self) -> usize {
        self.height()
    }
}

/// An ephemeral tree over one batch of blocks.
///
/// Built once, consumed by path extraction and batch signing, then dropped.
/// Nothing in a bundle refers back to it.
#[derive(Debug, Clone)]
pub struct MerkleBatchTree {
    pub(crate) shape: TreeShape,
    pub(crate) nodes: Vec<Digest>,
    pub(crate) algorithm: DigestAlgorithm,
    pub(crate) leaf_mode: LeafHashMode,
    pub(crate) first_segment: u64,
}

impl MerkleBatchTree {
    /// Root digest. For a single leaf this is the leaf digest itself.
    pub fn root(&self) -> Digest {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of leaves (N).
    pub fn leaf_count(&self) -> u64 {
        self.shape.leaf_count()
    }

    /// Longest witness path in this tree.
    pub fn max_depth(&self) -> usize {
        self.shape.max_path_len()
    }

    /// The tree's shape.
    pub fn shape(&self) -> &TreeShape {
        &self.shape
    }

    /// Digest algorithm the tree was built with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Leaf-hash mode the tree was built with.
    pub fn leaf_mode(&self) -> LeafHashMode {
        self.leaf_mode
    }

    /// Segment number of leaf 0.
    pub fn first_segment(&self) -> u64 {
        self.first_segment
    }

    /// Digest of node `index` at `level` (level 0 holds the leaves).
    pub fn node(&self, level: usize, index: u64) -> Option<Digest> {
        let position = self.shape.node_position(level, index)?;
        self.nodes.get(position as usize).copied()
    }

    /// Digest of leaf `leaf_index`.
    pub fn leaf_digest(&self, leaf_index: u64) -> Option<Digest> {
        self.node(0, leaf_index)
    }

    /// Witness path length of `leaf_index`.
    pub fn path_len(&self, leaf_index: u64) -> Option<usize> {
        self.shape.path_len(leaf_index)
    }
}

/// Builds a [`MerkleBatchTree`] from an ordered batch of blocks.
pub struct TreeBuilder<'a, D: DigestProvider + ?Sized = DigestAlgorithm> {
    config: &'a BatchConfig,
    provider: &'a D,
}

impl<'a> TreeBuilder<'a, DigestAlgorithm> {
    /// Builder using the builtin provider for `config.digest_algorithm`.
    pub fn new(config: &'a BatchConfig) -> Self {
        Self {
            config,
            provider: &config.digest_algorithm,
        }
    }
}

impl<'a, D: DigestProvider + ?Sized> TreeBuilder<'a, D> {
    /// Builder using an external digest provider.
    pub fn with_provider(config: &'a BatchConfig, provider: &'a D) -> Self {
        Self { config, provider }
    }

    /// Build the tree over `blocks`.
    ///
    /// Fails with [`BatchError::ConstructionError`] on an empty or oversize
    /// batch, an oversize block, mixed leaf modes, non-contiguous segment
    /// numbers, or a digest provider failure. Same blocks always give the
    /// same tree.
    pub fn build(&self, blocks: &[Block]) -> CostResult<MerkleBatchTree, BatchError> {
        let mut cost = OperationCost::default();

        cost_return_on_error_no_add!(&cost, self.check_batch(blocks));
        let shape = cost_return_on_error_no_add!(
            &cost,
            TreeShape::new(blocks.len() as u64)
                .ok_or_else(|| BatchError::ConstructionError("batch is empty".into()))
        );
        let mode = self.config.leaf_mode;

        let mut nodes: Vec<Digest> = Vec::with_capacity(shape.node_count() as usize);
        for block in blocks {
            let leaf = cost_return_on_error_no_add!(
                &cost,
                leaf_digest(self.provider, mode, block.content()).map_err(provider_failure)
            );
            cost.digest_calls += mode.digest_calls();
            nodes.push(leaf);
        }

        for level in 0..shape.height() {
            let start = shape.level_offsets()[level] as usize;
            let width = shape.level_widths()[level] as usize;
            for i in (0..width).step_by(2) {
                let left = nodes[start + i];
                if i + 1 < width {
                    let right = nodes[start + i + 1];
                    let parent = cost_return_on_error_no_add!(
                        &cost,
                        node_digest(self.provider, &left, &right).map_err(provider_failure)
                    );
                    cost.node_hash_calls += 1;
                    nodes.push(parent);
                } else {
                    // Promote
                    nodes.push(left);
                }
            }
        }
        debug_assert_eq!(nodes.len() as u64, shape.node_count());

        let tree = MerkleBatchTree {
            shape,
            nodes,
            algorithm: self.provider.algorithm(),
            leaf_mode: mode,
            first_segment: blocks[0].segment(),
        };
        tracing::debug!(
            leaves = tree.leaf_count(),
            height = tree.max_depth(),
            root = %hex::encode(tree.root()),
            "built merkle batch tree"
        );
        Ok(tree).wrap_with_cost(cost)
    }

    fn check_batch(&self, blocks: &[Block]) -> Result<(), BatchError> {
        let first = blocks
            .first()
            .ok_or_else(|| BatchError::ConstructionError("batch is empty".into()))?;
        if blocks.len() as u64 > self.config.max_batch_size {
            return Err(BatchError::ConstructionError(format!(
                "batch of {} blocks exceeds maximum {}",
                blocks.len(),
                self.config.max_batch_size
            )));
        }
        if self.provider.algorithm() != self.config.digest_algorithm {
            return Err(BatchError::ConstructionError(format!(
                "digest provider implements {:?} but batch is configured for {:?}",
                self.provider.algorithm(),
                self.config.digest_algorithm
            )));
        }
        for (i, block) in blocks.iter().enumerate() {
            if block.content().len() > self.config.max_block_len {
                return Err(BatchError::ConstructionError(format!(
                    "block for segment {} is {} bytes, maximum is {}",
                    block.segment(),
                    block.content().len(),
                    self.config.max_block_len
                )));
            }
            if block.leaf_mode() != self.config.leaf_mode {
                return Err(BatchError::ConstructionError(format!(
                    "block for segment {} declares {:?}, batch uses {:?}",
                    block.segment(),
                    block.leaf_mode(),
                    self.config.leaf_mode
                )));
            }
            let expected = first.segment().checked_add(i as u64).ok_or_else(|| {
                BatchError::ConstructionError("segment numbers overflow".into())
            })?;
            if block.segment() != expected {
                return Err(BatchError::ConstructionError(format!(
                    "block {} has segment {}, expected {}",
                    i,
                    block.segment(),
                    expected
                )));
            }
        }
        Ok(())
    }
}

fn provider_failure(e: BatchError) -> BatchError {
    match e {
        BatchError::ConstructionError(_) => e,
        other => BatchError::ConstructionError(format!("digest provider failed: {}", other)),
    }
}
