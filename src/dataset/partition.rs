//! Computation of fold memberships and percent splits.
//!
//! Memberships hold *positions* into the full-order sequence of an `AccessView`, not storage
//! indices. The instance a position refers to is whatever the full order currently holds there.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{Error, Result};

/// How the full order is currently divided into training and test sets
#[derive(Debug, Clone, PartialEq)]
pub enum Partition {
    /// everything is training data
    None,

    /// `membership[k]` lists the positions of fold `k`; fold `test_fold` is the test set
    Folds {
        test_fold: usize,
        membership: Vec<Vec<usize>>,
    },

    /// the first `test_count` positions are the test set
    Percent { test_count: usize },
}

impl Partition {
    pub fn number_of_folds(&self) -> usize {
        match *self {
            Partition::Folds { ref membership, .. } => membership.len(),
            _ => 0,
        }
    }
}

/// A fold count of 0 or 1 means "no partition"
pub fn is_merge_request(n_folds: usize) -> bool {
    n_folds <= 1
}

/// Folds need at least one more instance than there are folds
pub fn check_fold_count(n_items: usize, n_folds: usize) -> Result<()> {
    if n_folds >= n_items {
        return Err(Error::InvalidArgument(format!(
            "cannot split {} instances into {} folds",
            n_items, n_folds
        )));
    }
    Ok(())
}

/// Number of positions in fold `k` when `n_items` are divided into `n_folds` contiguous folds.
/// The first `n_items % n_folds` folds receive one extra element.
pub fn fold_dimension(n_items: usize, n_folds: usize, k: usize) -> usize {
    let base = n_items / n_folds;
    if k < n_items % n_folds {
        base + 1
    } else {
        base
    }
}

/// Divide positions `0..n_items` into `n_folds` contiguous ranges.
pub fn contiguous_folds(n_items: usize, n_folds: usize) -> Result<Vec<Vec<usize>>> {
    check_fold_count(n_items, n_folds)?;

    let mut folds = Vec::with_capacity(n_folds);
    let mut start = 0;
    for k in 0..n_folds {
        let end = start + fold_dimension(n_items, n_folds, k);
        folds.push((start..end).collect());
        start = end;
    }
    debug_assert_eq!(start, n_items);

    Ok(folds)
}

/// Divide positions into `n_folds` folds so that every class is spread evenly.
///
/// `keys[p]` is the class of the instance at position `p`. Classes are taken in order of first
/// appearance; the members of each class are dealt round-robin starting at fold 0, so fold `i`
/// receives members `i, i + n, i + 2n, ...` of every class.
///
/// Fails with `DegenerateSplit` if any fold ends up empty.
pub fn stratified_folds<K>(keys: &[K], n_folds: usize) -> Result<Vec<Vec<usize>>>
where
    K: Eq + Hash,
{
    let n_items = keys.len();
    check_fold_count(n_items, n_folds)?;

    let mut group_of: HashMap<&K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (position, key) in keys.iter().enumerate() {
        let next = groups.len();
        let g = *group_of.entry(key).or_insert(next);
        if g == next {
            groups.push(Vec::new());
        }
        groups[g].push(position);
    }

    let mut folds = vec![Vec::new(); n_folds];
    for group in &groups {
        for (i, &position) in group.iter().enumerate() {
            folds[i % n_folds].push(position);
        }
    }

    let typical = n_items / n_folds;
    for (k, fold) in folds.iter().enumerate() {
        if fold.is_empty() {
            return Err(Error::DegenerateSplit { fold: k, n_folds });
        }
        if fold.len() < typical {
            warn!(
                "stratified fold {} has only {} of typically {} instances",
                k,
                fold.len(),
                typical
            );
        }
    }

    debug!(
        "stratified {} instances in {} classes into {} folds",
        n_items,
        groups.len(),
        n_folds
    );

    Ok(folds)
}

/// Size of the test slice for a percent split of `n_items`.
pub fn percent_test_count(n_items: usize, percent: u32) -> Result<usize> {
    if percent > 100 {
        return Err(Error::InvalidArgument(format!(
            "test percentage {} outside 0..=100",
            percent
        )));
    }
    Ok((n_items as f64 * f64::from(percent) / 100.0).round() as usize)
}
