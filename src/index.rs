//! Mapping between a subtree-local bit-offset and a global node index.
//!
//! Given a subtree rooted at global index `R` on level `L_R`, a subtree of
//! `levels` levels has internal bit-offsets `0..2^levels - 2` assigned in
//! breadth-first order inside the subtree. For example, a 2-level subtree
//! rooted at global index `1` (level 1) has bit-offsets:
//!
//! ```text
//! bit 0 -> global 1   (the subtree root itself)
//! bit 1 -> global 3   (left child of 1)
//! bit 2 -> global 4   (right child of 1)
//! ```

use crate::tree::{first_index_on_level, level_of};

/// Resolves bit-offset `bit_offset` within a subtree rooted at `root`
/// (whose level is `root_level`) to its global node index.
///
/// 1. `ell = floor(log2(bit_offset + 1))` -- the level within the subtree.
/// 2. `first_on_global_level = 2^(root_level + ell) - 1`.
/// 3. `subtree_root_offset = root - (2^root_level - 1)`.
/// 4. `first_subtree_idx_on_level = first_on_global_level + subtree_root_offset * 2^ell`.
/// 5. Return `first_subtree_idx_on_level + (bit_offset - (2^ell - 1))`.
///
/// At level `root_level + ell` of the full tree, the `2^ell` nodes of this
/// subtree occupy a contiguous block whose starting offset is
/// `subtree_root_offset * 2^ell`.
pub fn bit_offset_to_global_index(root: u64, root_level: u32, bit_offset: u64) -> u64 {
    let ell = level_of(bit_offset);
    let first_on_global_level = first_index_on_level(root_level + ell);
    let subtree_root_offset = root - first_index_on_level(root_level);
    let first_subtree_idx_on_level = first_on_global_level + subtree_root_offset * (1u64 << ell);
    first_subtree_idx_on_level + (bit_offset - (first_index_on_level(ell)))
}

/// Convenience wrapper that derives `root_level` from `root` itself.
pub fn bit_offset_to_global_index_from_root(root: u64, bit_offset: u64) -> u64 {
    bit_offset_to_global_index(root, level_of(root), bit_offset)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_root_subtree_is_identity() {
        // A subtree rooted at the tree's own root (global index 0, level 0)
        // numbers its bit-offsets identically to global indices, since the
        // subtree *is* the whole tree up to `levels`.
        for bit_offset in 0..7u64 {
            assert_eq!(bit_offset_to_global_index(0, 0, bit_offset), bit_offset);
        }
    }

    #[test]
    fn test_subtree_rooted_below_level_zero() {
        // 2-level subtree rooted at global index 1 (level 1): bit 0 is the
        // root itself, bits 1 and 2 are its children 3 and 4.
        assert_eq!(bit_offset_to_global_index(1, 1, 0), 1);
        assert_eq!(bit_offset_to_global_index(1, 1, 1), 3);
        assert_eq!(bit_offset_to_global_index(1, 1, 2), 4);
    }

    #[test]
    fn test_subtree_rooted_at_second_node_on_its_level() {
        // 2-level subtree rooted at global index 2 (level 1, second node on
        // that level): bit 0 is 2, bits 1 and 2 are children 5 and 6.
        assert_eq!(bit_offset_to_global_index(2, 1, 0), 2);
        assert_eq!(bit_offset_to_global_index(2, 1, 1), 5);
        assert_eq!(bit_offset_to_global_index(2, 1, 2), 6);
    }

    #[test]
    fn test_index_arithmetic_inverse_property() {
        // For any subtree of k levels rooted at R, applying the mapping for
        // bit_offset 0..2^k-2 yields 2^k-1 distinct global indices, all
        // within the subtree rooted at R (property 7, §8).
        let root = 5u64;
        let root_level = level_of(root);
        let k = 3u32;
        let num_internal = (1u64 << k) - 1;
        let mut seen = std::collections::BTreeSet::new();
        for bit_offset in 0..num_internal {
            let global = bit_offset_to_global_index(root, root_level, bit_offset);
            assert!(seen.insert(global), "duplicate global index {global}");
        }
        assert_eq!(seen.len(), num_internal as usize);
    }
}
