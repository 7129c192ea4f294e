//! Runtime driver: walks the compiled evaluators from the tree root to a
//! leaf (§4.8).

use std::collections::HashMap;

/// The result of [`crate::jit::JitHost::compile`]: a map from internal-node
/// index to its evaluator, plus the shared object keeping those function
/// pointers valid.
pub struct CompiledTree {
    num_internal: u64,
    num_total: u64,
    _library: libloading::Library,
    evaluators: HashMap<u64, unsafe extern "C" fn(*const f32) -> i64>,
}

// Safety: evaluator function pointers are read-only machine code operating
// purely on the caller-supplied input slice; `_library` is never mutated
// after load. Concurrent `run` calls from many threads are sound (§5).
unsafe impl Send for CompiledTree {}
unsafe impl Sync for CompiledTree {}

impl CompiledTree {
    pub(crate) fn new(
        num_internal: u64,
        num_total: u64,
        library: libloading::Library,
        evaluators: HashMap<u64, unsafe extern "C" fn(*const f32) -> i64>,
    ) -> Self {
        Self {
            num_internal,
            num_total,
            _library: library,
            evaluators,
        }
    }

    /// Number of internal nodes, `N = 2^D - 1`.
    pub fn num_internal(&self) -> u64 {
        self.num_internal
    }

    /// One past the last leaf index, `N + 2^D`.
    pub fn num_total(&self) -> u64 {
        self.num_total
    }

    /// Traverses `input` from the tree root (global index 0) to a leaf,
    /// invoking the evaluator at the current index and advancing to its
    /// result, until the index falls in the leaf range `[N, N + 2^D)`.
    ///
    /// Performs no bounds checks on `input`'s length; callers must ensure
    /// `input.len() > max(featureIdx)` across every node the tree can
    /// route to (§4.8).
    pub fn run(&self, input: &[f32]) -> u64 {
        let mut idx = 0u64;
        while idx < self.num_internal {
            let evaluator = self.evaluators[&idx];
            // Safety: `evaluator`'s ABI is `extern "C" fn(*const f32) -> i64`
            // and it reads at most `max(featureIdx) + 1` floats (§6); the
            // caller contract above guarantees `input` is long enough.
            idx = unsafe { evaluator(input.as_ptr()) } as u64;
        }
        idx
    }
}
