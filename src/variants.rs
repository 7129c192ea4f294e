//! Variant enumerator.
//!
//! For a leaf descriptor, the **fixed template** is the integer whose bit
//! `b` equals the descriptor's required value at `b` when present, and `0`
//! otherwise. The **variable bit set** is `{0..num_internal}` minus the
//! domain of the descriptor's constraints: those bits correspond to
//! ancestors not on the path to this leaf and are irrelevant for routing.
//!
//! The enumerator emits every integer obtained by OR-ing the fixed template
//! with an arbitrary combination of the variable bits set to `1`. If the
//! variable set has size `v`, exactly `2^v` variants are produced, and their
//! union across all leaves of a subtree equals `{0, .., 2^num_internal - 1}`.

use crate::bitmap::LeafDescriptor;

/// The fixed template and the sorted list of free (don't-care) bit positions
/// for a leaf descriptor within a subtree of `num_internal` internal bits.
fn template_and_free_bits(descriptor: &LeafDescriptor, num_internal: u64) -> (u64, Vec<u64>) {
    let mut template = 0u64;
    for (&bit, &value) in &descriptor.bits {
        if value {
            template |= 1 << bit;
        }
    }
    let free_bits: Vec<u64> = (0..num_internal)
        .filter(|bit| !descriptor.bits.contains_key(bit))
        .collect();
    (template, free_bits)
}

/// Enumerates every condition-vector value that routes to `descriptor`.
pub fn enumerate_variants(descriptor: &LeafDescriptor, num_internal: u64) -> Vec<u64> {
    let (template, free_bits) = template_and_free_bits(descriptor, num_internal);
    let v = free_bits.len();
    let mut variants = Vec::with_capacity(1usize << v);
    for combo in 0u64..(1u64 << v) {
        let mut value = template;
        for (i, &bit) in free_bits.iter().enumerate() {
            if combo & (1 << i) != 0 {
                value |= 1 << bit;
            }
        }
        variants.push(value);
    }
    variants
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bitmap::build_leaf_descriptors;
    use std::collections::BTreeSet;

    #[test]
    fn test_variant_count_matches_free_bit_count() {
        let levels = 3u32;
        let num_internal = (1u64 << levels) - 1;
        for descriptor in build_leaf_descriptors(levels) {
            let (_, free_bits) = template_and_free_bits(&descriptor, num_internal);
            let variants = enumerate_variants(&descriptor, num_internal);
            assert_eq!(variants.len(), 1usize << free_bits.len());
        }
    }

    #[test]
    fn test_variant_exhaustiveness_and_disjointness() {
        // Property 4 (§8): the union of variant sets across all leaves of a
        // k-level subtree equals {0, .., 2^num_internal - 1}, and the sets
        // are pairwise disjoint.
        for levels in 1..=3u32 {
            let num_internal = (1u64 << levels) - 1;
            let descriptors = build_leaf_descriptors(levels);

            let mut seen = BTreeSet::new();
            let mut total = 0usize;
            for descriptor in &descriptors {
                let variants = enumerate_variants(descriptor, num_internal);
                total += variants.len();
                for variant in variants {
                    assert!(
                        seen.insert(variant),
                        "variant {variant} claimed by more than one leaf"
                    );
                }
            }
            let universe: BTreeSet<u64> = (0..(1u64 << num_internal)).collect();
            assert_eq!(seen, universe);
            assert_eq!(total, 1usize << num_internal);
        }
    }
}
