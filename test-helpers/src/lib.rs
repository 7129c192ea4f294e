//! Collaborators deliberately kept out of `dtree-jit`'s core (§1, §6):
//! random tree construction, input-dataset generation, and the interpretive
//! reference evaluator used as the test oracle in §8.

use dtree_jit::{Comparator, DecisionTree, Op, TreeNode};
use rand::prelude::*;
use rand_pcg::Pcg64;

/// Builds a random but well-formed perfect binary tree of the given depth
/// and feature count, seeded for reproducibility.
pub fn random_tree(depth: u32, feature_count: usize, seed: u64) -> DecisionTree {
    let mut rng = Pcg64::seed_from_u64(seed);
    let num_internal = (1u64 << depth) - 1;
    let nodes = (0..num_internal)
        .map(|_| {
            let feature_idx = rng.gen_range(0..feature_count);
            let op = match rng.gen_range(0..3) {
                0 => Op::Bypass,
                1 => Op::Sqrt,
                _ => Op::Ln,
            };
            let comparator = if rng.gen_bool(0.5) {
                Comparator::LessThan
            } else {
                Comparator::GreaterThan
            };
            let bias = rng.gen_range(0.0f32..1.0f32);
            TreeNode::new(feature_idx, op, comparator, bias)
        })
        .collect();
    DecisionTree::new(depth, feature_count, nodes)
}

/// Generates `count` random input vectors in `[0, 1)^feature_count`, seeded
/// for reproducibility.
pub fn random_inputs(count: usize, feature_count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..feature_count).map(|_| rng.gen_range(0.0f32..1.0f32)).collect())
        .collect()
}

fn apply_op(op: Op, v: f32) -> f32 {
    match op {
        Op::Bypass => v,
        Op::Sqrt => v.sqrt(),
        Op::Ln => v.ln(),
    }
}

fn predicate_holds(node: &TreeNode, input: &[f32]) -> bool {
    let w = apply_op(node.op, input[node.feature_idx]);
    match node.comparator {
        // Ordered comparisons: NaN compares false in both directions,
        // deterministically routing to the false branch (§6).
        Comparator::LessThan => w < node.bias,
        Comparator::GreaterThan => w > node.bias,
    }
}

/// The interpretive reference evaluator (§1, §8 oracle): walks the tree one
/// node at a time, without any of the core's subtree partitioning.
///
/// A true predicate takes the lower-indexed child `2i+1`; a false predicate
/// takes `2i+2`. An all-true path therefore reaches the lowest leaf index,
/// matching the §8 worked table (input `0.125`, true at every node, reaches
/// leaf 3, not 6).
pub fn interpret(tree: &DecisionTree, input: &[f32]) -> u64 {
    let mut idx = 0u64;
    while !tree.is_leaf(idx) {
        let node = tree.node(idx);
        idx = if predicate_holds(node, input) {
            2 * idx + 1
        } else {
            2 * idx + 2
        };
    }
    idx
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_tree_is_well_formed() {
        let tree = random_tree(4, 5, 42);
        assert_eq!(tree.depth(), 4);
        assert_eq!(tree.num_internal(), 15);
    }

    #[test]
    fn test_random_inputs_are_in_unit_range() {
        let inputs = random_inputs(100, 3, 7);
        assert_eq!(inputs.len(), 100);
        for input in &inputs {
            assert_eq!(input.len(), 3);
            for &v in input {
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_interpret_depth_two_scenario() {
        // The concrete end-to-end scenario from §8: root splits on
        // feature 0 at 0.5, children at 0.25 and 0.75.
        let nodes = vec![
            TreeNode::new(0, Op::Bypass, Comparator::LessThan, 0.5),
            TreeNode::new(0, Op::Bypass, Comparator::LessThan, 0.25),
            TreeNode::new(0, Op::Bypass, Comparator::LessThan, 0.75),
        ];
        let tree = DecisionTree::new(2, 1, nodes);

        assert_eq!(interpret(&tree, &[0.125]), 3);
        assert_eq!(interpret(&tree, &[0.375]), 4);
        assert_eq!(interpret(&tree, &[0.625]), 5);
        assert_eq!(interpret(&tree, &[0.875]), 6);
    }
}
