//! In-memory perfect binary tree of predicate nodes.
//!
//! A perfect binary tree of depth `D` has `N = 2^D - 1` internal nodes and
//! `2^D` leaves. Internal nodes occupy indices `[0, N)`; leaves occupy
//! `[N, N + 2^D)`. The node at index `i` has children `2i+1` (true branch)
//! and `2i+2` (false branch) -- a true predicate takes the lower-indexed
//! child, so an all-true path reaches the lowest leaf index, matching the
//! §8 worked table. The level of index `i` is `floor(log2(i+1))`.

use digest::Digest;
use sha2::Sha256;

/// The transform applied to the feature value before comparison.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    /// Identity: `w = v`.
    Bypass,
    /// Native square root intrinsic: `w = sqrt(v)`.
    Sqrt,
    /// Natural log intrinsic: `w = ln(v)`.
    Ln,
}

/// The ordered comparison a node applies between the transformed feature
/// value and its bias. NaN inputs compare false for both orderings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Comparator {
    LessThan,
    GreaterThan,
}

/// A single internal node's predicate.
///
/// Semantics: let `v = input[feature_idx]`, `w = op(v)`. The node is "true"
/// iff `comparator(w, bias)` holds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub feature_idx: usize,
    pub op: Op,
    pub comparator: Comparator,
    pub bias: f32,
}

impl TreeNode {
    pub fn new(feature_idx: usize, op: Op, comparator: Comparator, bias: f32) -> Self {
        Self {
            feature_idx,
            op,
            comparator,
            bias,
        }
    }
}

/// A read-only, fully populated binary decision tree.
///
/// The codegen core never mutates a constructed tree; mutation after
/// compilation is a non-goal (§1).
#[derive(Clone, Debug)]
pub struct DecisionTree {
    depth: u32,
    feature_count: usize,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Builds a tree from its internal nodes in breadth-first order.
    ///
    /// Panics if `nodes.len()` is not `2^depth - 1` for some `depth`, or if
    /// any node reads a feature index `>= feature_count`. These are
    /// Misconfiguration errors (§7) and are fatal by design.
    pub fn new(depth: u32, feature_count: usize, nodes: Vec<TreeNode>) -> Self {
        let expected = (1u64 << depth) - 1;
        assert_eq!(
            nodes.len() as u64,
            expected,
            "decision tree of depth {depth} requires exactly {expected} internal nodes, got {}",
            nodes.len()
        );
        assert!(feature_count > 0, "feature_count must be positive");
        for node in &nodes {
            assert!(
                node.feature_idx < feature_count,
                "node reads feature {} but feature_count is {feature_count}",
                node.feature_idx
            );
        }
        Self {
            depth,
            feature_count,
            nodes,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Number of internal nodes, `N = 2^D - 1`.
    pub fn num_internal(&self) -> u64 {
        (1u64 << self.depth) - 1
    }

    /// Number of leaves, `2^D`.
    pub fn num_leaves(&self) -> u64 {
        1u64 << self.depth
    }

    /// The global index one past the last leaf, `N + 2^D`.
    pub fn num_total(&self) -> u64 {
        self.num_internal() + self.num_leaves()
    }

    pub fn node(&self, global_idx: u64) -> &TreeNode {
        &self.nodes[global_idx as usize]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn is_leaf(&self, global_idx: u64) -> bool {
        global_idx >= self.num_internal()
    }

    /// A cache-key fingerprint of this tree's node data, used to detect a
    /// stale object-cache entry (§4.7, §6). Distinct trees of the same shape
    /// produce distinct fingerprints with overwhelming probability; this is
    /// not a cryptographic commitment, just a cheap content digest in the
    /// same spirit as the corpus's own node-content hashing.
    pub fn fingerprint(&self) -> Vec<u8> {
        let mut hash = Sha256::new();
        for node in &self.nodes {
            hash.update(&(node.feature_idx as u64).to_le_bytes());
            hash.update(&[match node.op {
                Op::Bypass => 0,
                Op::Sqrt => 1,
                Op::Ln => 2,
            }]);
            hash.update(&[match node.comparator {
                Comparator::LessThan => 0,
                Comparator::GreaterThan => 1,
            }]);
            hash.update(&node.bias.to_le_bytes());
        }
        hash.finalize().to_vec()
    }
}

/// The level of global index `i`: `floor(log2(i+1))`.
pub fn level_of(global_idx: u64) -> u32 {
    63 - (global_idx + 1).leading_zeros()
}

/// The first global index on level `level`: `2^level - 1`.
pub fn first_index_on_level(level: u32) -> u64 {
    (1u64 << level) - 1
}
