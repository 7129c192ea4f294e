//! Codegen emitter: turns a [`DecisionTree`](crate::tree::DecisionTree) plus
//! `(functionDepth, switchDepth)` into one native evaluator function per
//! internal-subtree root, declared and defined on a [`cranelift_module::Module`].

mod emitter;

use cranelift_module::{FuncId, Module, ModuleError};

use crate::tree::DecisionTree;

/// The external-linkage symbol name of the evaluator rooted at `global_idx`.
pub fn evaluator_symbol(global_idx: u64) -> String {
    format!("nodeEvaluator_{global_idx}")
}

/// Declares and defines one evaluator function per node at every level that
/// is a multiple of `function_depth` (levels `0, functionDepth, 2*functionDepth,
/// .., D - functionDepth`), per §4.6. Returns the function roots in emission
/// order together with their [`FuncId`]s.
///
/// Requires `tree.depth() % function_depth == 0` and
/// `function_depth % switch_depth == 0` (§3 invariants); violations are
/// Misconfiguration and are fatal (§7), asserted here rather than returned.
pub fn emit_all_evaluators(
    module: &mut dyn Module,
    tree: &DecisionTree,
    function_depth: u32,
    switch_depth: u32,
) -> Result<Vec<(u64, FuncId)>, ModuleError> {
    assert!(function_depth > 0, "function_depth must be positive");
    assert!(switch_depth > 0, "switch_depth must be positive");
    assert_eq!(
        tree.depth() % function_depth,
        0,
        "tree depth {} is not a multiple of function_depth {function_depth}",
        tree.depth()
    );
    assert_eq!(
        function_depth % switch_depth,
        0,
        "function_depth {function_depth} is not a multiple of switch_depth {switch_depth}"
    );

    let mut out = Vec::new();
    for root in evaluator_roots(tree.depth(), function_depth) {
        log::debug!("emitting evaluator for root {root}");
        let func_id =
            emitter::emit_subtree_evaluation(module, tree, root, function_depth, switch_depth)?;
        out.push((root, func_id));
    }
    Ok(out)
}

/// The global indices of every evaluator root for a tree of depth `depth`
/// partitioned by `function_depth`: one per node at each level that is a
/// multiple of `function_depth` (§4.6).
pub fn evaluator_roots(depth: u32, function_depth: u32) -> Vec<u64> {
    assert_eq!(
        depth % function_depth,
        0,
        "tree depth {depth} is not a multiple of function_depth {function_depth}"
    );
    let mut roots = Vec::new();
    let num_function_levels = depth / function_depth;
    for k in 0..num_function_levels {
        let level = k * function_depth;
        let first = (1u64 << level) - 1;
        let count = 1u64 << level;
        for offset in 0..count {
            roots.push(first + offset);
        }
    }
    roots
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_evaluator_roots_total_matches_invariant() {
        // Total evaluators = sum_{k=0..D/F-1} 2^(k*F) (§3 invariants).
        let depth = 4;
        let function_depth = 2;
        let roots = evaluator_roots(depth, function_depth);
        assert_eq!(roots.len(), 1 + 4); // 2^0 + 2^2
        assert_eq!(roots, vec![0, 3, 4, 5, 6]);
    }
}
