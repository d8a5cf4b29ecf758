//! Label-array bookkeeping.

use crate::types::NOISE;
use std::collections::{BTreeMap, BTreeSet};

/// Distinct non-noise labels in ascending order.
pub fn distinct_labels(labels: &[i32]) -> Vec<i32> {
    labels
        .iter()
        .copied()
        .filter(|&l| l != NOISE)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Member indices of every non-noise label, keyed in ascending label order.
pub fn indices_by_label(labels: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label != NOISE {
            groups.entry(label).or_default().push(i);
        }
    }
    groups
}

/// Renumber non-noise labels to `0..k` preserving their ascending order.
/// Returns the new labels and `k`.
pub fn densify(labels: &[i32]) -> (Vec<i32>, usize) {
    let distinct = distinct_labels(labels);
    let rank: BTreeMap<i32, i32> = distinct
        .iter()
        .enumerate()
        .map(|(rank, &label)| (label, rank as i32))
        .collect();
    let dense = labels
        .iter()
        .map(|label| rank.get(label).copied().unwrap_or(NOISE))
        .collect();
    (dense, distinct.len())
}

/// Renumber clusters in order of their first member's index. Noise stays.
pub(crate) fn relabel_by_first_appearance(labels: &mut [i32]) {
    let mut mapping: BTreeMap<i32, i32> = BTreeMap::new();
    for label in labels.iter_mut() {
        if *label == NOISE {
            continue;
        }
        let next = mapping.len() as i32;
        *label = *mapping.entry(*label).or_insert(next);
    }
}
