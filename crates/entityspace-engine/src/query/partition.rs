//! Set-partition enumeration.
//!
//! Standalone and independently testable: given `n` sibling conditions,
//! produces every way to carve their indices `0..n` into non-empty blocks,
//! via the classic restricted-growth-string algorithm. The mapping-aware
//! evaluator walks this list and stops at the first partition whose blocks
//! all comply.

/// Every partition of `0..n`, each as a list of blocks (each block a sorted
/// list of indices). Grows as the Bell numbers — callers should
/// short-circuit on the first success rather than materialize all of them
/// for large `n`.
pub fn partitions(n: usize) -> Vec<Vec<Vec<usize>>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    let mut rgs = vec![0usize; n];
    let mut max_so_far = vec![0usize; n];
    generate(0, n, &mut rgs, &mut max_so_far, &mut out);
    out
}

/// Restricted-growth-string generation: `rgs[i]` is the block index of
/// element `i`, constrained to be at most one more than the largest block
/// index used so far, which enumerates each partition exactly once.
fn generate(
    i: usize,
    n: usize,
    rgs: &mut Vec<usize>,
    max_so_far: &mut Vec<usize>,
    out: &mut Vec<Vec<Vec<usize>>>,
) {
    if i == n {
        let block_count = rgs.iter().max().copied().unwrap_or(0) + 1;
        let mut blocks = vec![Vec::new(); block_count];
        for (index, &block) in rgs.iter().enumerate() {
            blocks[block].push(index);
        }
        out.push(blocks);
        return;
    }
    let upper = if i == 0 { 0 } else { max_so_far[i - 1] + 1 };
    for block in 0..=upper {
        rgs[i] = block;
        max_so_far[i] = if i == 0 { block } else { max_so_far[i - 1].max(block) };
        generate(i + 1, n, rgs, max_so_far, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell(n: usize) -> usize {
        partitions(n).len()
    }

    #[test]
    fn bell_numbers_match_known_values() {
        assert_eq!(bell(0), 1);
        assert_eq!(bell(1), 1);
        assert_eq!(bell(2), 2);
        assert_eq!(bell(3), 5);
        assert_eq!(bell(4), 15);
    }

    #[test]
    fn every_partition_covers_all_indices_exactly_once() {
        for block in partitions(4) {
            let mut all: Vec<usize> = block.into_iter().flatten().collect();
            all.sort();
            assert_eq!(all, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn single_index_has_one_partition() {
        assert_eq!(partitions(1), vec![vec![vec![0]]]);
    }

    #[test]
    fn pair_has_two_partitions() {
        let mut p = partitions(2);
        p.sort();
        assert_eq!(p, vec![vec![vec![0], vec![1]], vec![vec![0, 1]]]);
    }
}
